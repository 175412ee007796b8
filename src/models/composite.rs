use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::normalize_sku;

/// One component of a kit/combo. The SKU is a weak reference resolved
/// against the inventory store at read time; the composite never owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComponentRef {
    pub component_sku: String,
    pub quantity: i64,
}

/// How the composite's final price is derived from its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum PricingMode {
    /// `final = sum(component sale prices) * (1 + percent/100)`
    MarkupPercent(Decimal),
    /// Overrides the derived list price entirely.
    FixedPrice(Decimal),
}

/// A kit or combo whose sellable stock is derived from component stock.
/// Derived availability is never stored; see `services::stock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompositeProduct {
    pub sku: String,
    /// Ordered; order is preserved for display but irrelevant to the math.
    pub components: Vec<ComponentRef>,
    pub pricing_mode: PricingMode,
}

impl CompositeProduct {
    /// Validates and normalizes a composite definition. Non-positive
    /// component quantities are a configuration error and are rejected
    /// here, at definition time, so the availability math never sees them.
    pub fn new(
        sku: &str,
        components: Vec<ComponentRef>,
        pricing_mode: PricingMode,
    ) -> Result<Self, ServiceError> {
        let sku = normalize_sku(sku);
        if sku.is_empty() {
            return Err(ServiceError::ValidationError(
                "composite SKU must not be empty".into(),
            ));
        }
        let mut normalized = Vec::with_capacity(components.len());
        for component in components {
            if component.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "component '{}' has non-positive quantity {}",
                    component.component_sku, component.quantity
                )));
            }
            normalized.push(ComponentRef {
                component_sku: normalize_sku(&component.component_sku),
                quantity: component.quantity,
            });
        }
        Ok(Self {
            sku,
            components: normalized,
            pricing_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_non_positive_component_quantity() {
        let result = CompositeProduct::new(
            "KIT-1",
            vec![ComponentRef {
                component_sku: "abc".into(),
                quantity: 0,
            }],
            PricingMode::MarkupPercent(dec!(20)),
        );
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn normalizes_component_skus() {
        let kit = CompositeProduct::new(
            " kit-1 ",
            vec![ComponentRef {
                component_sku: " abc ".into(),
                quantity: 2,
            }],
            PricingMode::FixedPrice(dec!(99.90)),
        )
        .unwrap();
        assert_eq!(kit.sku, "KIT-1");
        assert_eq!(kit.components[0].component_sku, "ABC");
    }
}
