use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::normalize_sku;

/// `<base>/X<N>` marks a listing that sells the underlying item in
/// bundles of N units. Any trailing `/X` suffix claims the multiplier
/// syntax; what follows it must be a positive integer.
static MULTIPLIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.+)/X(?P<factor>[^/]*)$").expect("multiplier pattern"));

/// External publication status. `UnderReview` and `Closed` are owned by
/// the marketplace; the reconciliation engine never overwrites them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Paused,
    UnderReview,
    Closed,
}

impl ListingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::UnderReview)
    }
}

/// Composite identifier of a publication: the marketplace id plus an
/// optional variation id. Rendered as `EXTERNAL#VARIATION`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ListingKey {
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
}

impl ListingKey {
    pub fn new(external_id: impl Into<String>, variation_id: Option<String>) -> Self {
        Self {
            external_id: external_id.into(),
            variation_id,
        }
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variation_id {
            Some(variation) => write!(f, "{}#{}", self.external_id, variation),
            None => write!(f, "{}", self.external_id),
        }
    }
}

/// An externally-published representation of an item or composite.
/// Created by a full pull from the marketplace; mutated only by the
/// reconciliation engine and explicit user edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketplaceListing {
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    /// Weak link to an item or composite by SKU; may be unset or stale.
    pub sku: Option<String>,
    pub title: Option<String>,
    pub price: Decimal,
    /// Last known external quantity.
    pub available_quantity: i64,
    pub status: ListingStatus,
    pub sync_enabled: bool,
    /// Buffer subtracted from internal stock before publishing.
    pub safety_stock: i64,
    pub pulled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarketplaceListing {
    pub fn key(&self) -> ListingKey {
        ListingKey::new(self.external_id.clone(), self.variation_id.clone())
    }
}

/// Server-side listing predicate. For `FilterMatchedAll` scopes the filter
/// itself travels to the gateway and is re-evaluated remotely at execution
/// time; it is never expanded into a client-side id list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListingFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_enabled: Option<bool>,
    /// Substring match against the linked SKU (normalized).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Case-insensitive substring match against the listing title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &MarketplaceListing) -> bool {
        if let Some(status) = self.status {
            if listing.status != status {
                return false;
            }
        }
        if let Some(sync_enabled) = self.sync_enabled {
            if listing.sync_enabled != sync_enabled {
                return false;
            }
        }
        if let Some(sku) = &self.sku {
            let needle = normalize_sku(sku);
            match &listing.sku {
                Some(linked) if normalize_sku(linked).contains(&needle) => {}
                _ => return false,
            }
        }
        if let Some(title) = &self.title {
            let needle = title.to_lowercase();
            match &listing.title {
                Some(t) if t.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        true
    }

    /// Human-readable identity used when a filter-scoped batch fails.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status={}", status));
        }
        if let Some(sync_enabled) = self.sync_enabled {
            parts.push(format!("sync_enabled={}", sync_enabled));
        }
        if let Some(sku) = &self.sku {
            parts.push(format!("sku~{}", normalize_sku(sku)));
        }
        if let Some(title) = &self.title {
            parts.push(format!("title~{}", title));
        }
        if parts.is_empty() {
            "filter(all)".to_string()
        } else {
            format!("filter({})", parts.join(","))
        }
    }
}

/// A listing SKU split into its base SKU and bundle factor. A SKU with no
/// `/X<N>` suffix parses with factor 1. The factor affects only the
/// quantity published for the listing, never the base item's own stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuMultiplier {
    pub base: String,
    pub factor: i64,
}

impl SkuMultiplier {
    pub fn parse(sku: &str) -> Result<Self, ServiceError> {
        let normalized = normalize_sku(sku);
        match MULTIPLIER_RE.captures(&normalized) {
            Some(caps) => {
                let raw = &caps["factor"];
                let factor: i64 = raw.parse().map_err(|_| {
                    ServiceError::ValidationError(format!(
                        "malformed SKU multiplier '/X{}' in '{}'",
                        raw, sku
                    ))
                })?;
                if factor < 1 {
                    return Err(ServiceError::ValidationError(format!(
                        "SKU multiplier must be at least 1 in '{}'",
                        sku
                    )));
                }
                Ok(Self {
                    base: caps["base"].to_string(),
                    factor,
                })
            }
            None => Ok(Self {
                base: normalized,
                factor: 1,
            }),
        }
    }
}
