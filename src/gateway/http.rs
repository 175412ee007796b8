use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::MarketplaceConfig;
use crate::errors::ServiceError;
use crate::gateway::{ListingPatch, MarketplaceGateway};
use crate::models::{ListingFilter, ListingKey, MarketplaceListing};

/// Production marketplace client. Every call carries the configured bearer
/// token and a per-request timeout; transient failures (connect errors,
/// timeouts, 429 and 5xx responses) are retried a bounded number of times
/// with exponential backoff and jitter. `update_listing` is idempotent on
/// the remote side, so retrying a patch is safe.
pub struct HttpMarketplaceGateway {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    max_retries: u32,
    retry_backoff: Duration,
    page_size: u64,
}

enum CallError {
    Retryable(ServiceError),
    Fatal(ServiceError),
}

impl CallError {
    fn into_inner(self) -> ServiceError {
        match self {
            Self::Retryable(e) | Self::Fatal(e) => e,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PullPage {
    results: Vec<MarketplaceListing>,
    total: u64,
}

impl HttpMarketplaceGateway {
    pub fn new(config: &MarketplaceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            page_size: config.page_size,
        })
    }

    fn transport_error(err: reqwest::Error) -> CallError {
        if err.is_timeout() {
            CallError::Retryable(ServiceError::GatewayTimeout)
        } else if err.is_connect() {
            CallError::Retryable(ServiceError::GatewayError(err.to_string()))
        } else {
            CallError::Fatal(ServiceError::GatewayError(err.to_string()))
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CallError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = ServiceError::GatewayError(format!("{}: {}", status, body));
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Err(CallError::Retryable(error))
        } else {
            Err(CallError::Fatal(error))
        }
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, call: F) -> Result<T, ServiceError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CallError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(CallError::Retryable(err)) if attempt < self.max_retries => {
                    attempt += 1;
                    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=50));
                    let delay = self.retry_backoff * 2u32.saturating_pow(attempt - 1) + jitter;
                    warn!(op, attempt, error = %err, delay_ms = delay.as_millis() as u64,
                        "transient marketplace failure; retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.into_inner()),
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketplaceGateway for HttpMarketplaceGateway {
    #[instrument(skip(self))]
    async fn pull_all_listings(&self) -> Result<Vec<MarketplaceListing>, ServiceError> {
        let mut listings = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let url = format!(
                "{}/listings?offset={}&limit={}",
                self.base_url, offset, self.page_size
            );
            let page: PullPage = self
                .with_retry("pull_all_listings", || async {
                    let response = self
                        .client
                        .get(&url)
                        .bearer_auth(&self.access_token)
                        .send()
                        .await
                        .map_err(Self::transport_error)?;
                    Self::check(response)
                        .await?
                        .json::<PullPage>()
                        .await
                        .map_err(|e| CallError::Fatal(ServiceError::GatewayError(e.to_string())))
                })
                .await?;

            let fetched = page.results.len() as u64;
            listings.extend(page.results);
            offset += fetched;
            if fetched < self.page_size || offset >= page.total {
                break;
            }
        }
        debug!(count = listings.len(), "pulled listings");
        Ok(listings)
    }

    #[instrument(skip(self, patch), fields(listing = %key))]
    async fn update_listing(
        &self,
        key: &ListingKey,
        patch: &ListingPatch,
    ) -> Result<(), ServiceError> {
        let mut url = format!("{}/listings/{}", self.base_url, key.external_id);
        if let Some(variation) = &key.variation_id {
            url.push_str(&format!("?variation_id={}", variation));
        }
        self.with_retry("update_listing", || async {
            let response = self
                .client
                .put(&url)
                .bearer_auth(&self.access_token)
                .json(patch)
                .send()
                .await
                .map_err(Self::transport_error)?;
            Self::check(response).await.map(|_| ())
        })
        .await
    }

    #[instrument(skip(self, patch))]
    async fn bulk_update_by_filter(
        &self,
        filter: &ListingFilter,
        patch: &ListingPatch,
    ) -> Result<(), ServiceError> {
        let url = format!("{}/listings/bulk", self.base_url);
        let body = serde_json::json!({ "filter": filter, "patch": patch });
        self.with_retry("bulk_update_by_filter", || async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await
                .map_err(Self::transport_error)?;
            Self::check(response).await.map(|_| ())
        })
        .await
    }
}
