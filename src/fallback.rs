use std::time::Duration;

use tokio::time::timeout;

use crate::adapters::{PlatformAdapter, mock_products};
use crate::credentials::CredentialStore;
use crate::data_models::{Attempt, NormalizedProduct, Platform, PlatformStatus, ProductQuery};
use crate::error::{AdapterError, SearchError};

pub const DISABLED_MESSAGE: &str = "platform disabled";

/// What to do for one platform before any I/O happens.
#[derive(Debug)]
pub enum Resolution<'a> {
    Live(&'a PlatformAdapter),
    Mock,
    Skip(String),
}

/// Products and status produced for one platform.
#[derive(Debug, Clone)]
pub struct PlatformOutcome {
    pub products: Vec<NormalizedProduct>,
    pub status: PlatformStatus,
}

impl PlatformOutcome {
    fn new(
        platform: Platform,
        attempted: Attempt,
        succeeded: bool,
        products: Vec<NormalizedProduct>,
        error: Option<String>,
    ) -> Self {
        Self {
            status: PlatformStatus {
                platform,
                attempted,
                succeeded,
                product_count: products.len(),
                error,
            },
            products,
        }
    }

    pub fn skipped(platform: Platform, reason: impl Into<String>) -> Self {
        Self::new(platform, Attempt::Skipped, false, Vec::new(), Some(reason.into()))
    }

    pub fn failed(platform: Platform, error: impl Into<String>) -> Self {
        Self::new(platform, Attempt::Live, false, Vec::new(), Some(error.into()))
    }
}

/// Decides between a live call, mock substitution, and skipping a platform.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy {
    mock_fallback: bool,
}

impl FallbackPolicy {
    pub fn new(mock_fallback: bool) -> Self {
        Self { mock_fallback }
    }

    pub fn mock_fallback(&self) -> bool {
        self.mock_fallback
    }

    fn may_mock(&self, platform: Platform) -> bool {
        self.mock_fallback && platform.supports_mock()
    }

    pub fn resolve<'a>(
        &self,
        platform: Platform,
        adapter: Option<&'a PlatformAdapter>,
        credentials: &CredentialStore,
        enabled: bool,
    ) -> Resolution<'a> {
        if !enabled {
            return Resolution::Skip(DISABLED_MESSAGE.to_string());
        }

        let missing = credentials.missing_for(platform);
        if !missing.is_empty() {
            if self.may_mock(platform) {
                log::info!("{platform}: credentials incomplete, using mock data");
                return Resolution::Mock;
            }
            let error = SearchError::Configuration {
                platform,
                message: format!("missing credentials: {}", missing.join(", ")),
            };
            return Resolution::Skip(error.to_string());
        }

        match adapter {
            Some(adapter) => Resolution::Live(adapter),
            None if self.may_mock(platform) => Resolution::Mock,
            None => Resolution::Skip(format!("no adapter configured for {platform}")),
        }
    }

    /// Produces the outcome for one platform. Never fails: every error ends up
    /// in the returned status.
    pub async fn run(
        &self,
        platform: Platform,
        adapter: Option<&PlatformAdapter>,
        query: &ProductQuery,
        credentials: &CredentialStore,
        enabled: bool,
        adapter_timeout: Duration,
    ) -> PlatformOutcome {
        match self.resolve(platform, adapter, credentials, enabled) {
            Resolution::Skip(reason) => {
                log::info!("{platform}: skipped ({reason})");
                PlatformOutcome::skipped(platform, reason)
            }
            Resolution::Mock => {
                let products = mock_products(platform, query);
                PlatformOutcome::new(platform, Attempt::Mock, true, products, None)
            }
            Resolution::Live(adapter) => {
                let result = timeout(adapter_timeout, adapter.search(query))
                    .await
                    .unwrap_or(Err(AdapterError::Timeout(adapter_timeout)));

                match result {
                    Ok(products) => {
                        log::info!("{platform}: {} products", products.len());
                        PlatformOutcome::new(platform, Attempt::Live, true, products, None)
                    }
                    Err(e) if self.may_mock(platform) => {
                        log::warn!("{platform}: live search failed, using mock data: {e}");
                        let products = mock_products(platform, query);
                        PlatformOutcome::new(platform, Attempt::Mock, true, products, Some(e.to_string()))
                    }
                    Err(e) => {
                        log::error!("{platform}: live search failed: {e}");
                        PlatformOutcome::failed(platform, e.to_string())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::EbayAdapter;
    use crate::credentials::PlatformCredentials;
    use crate::http::HttpClient;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn unreachable_ebay() -> PlatformAdapter {
        let http = HttpClient::new(TIMEOUT, 4096).unwrap();
        EbayAdapter::new("http://127.0.0.1:1/finding", None, http).into()
    }

    fn partial_amazon() -> CredentialStore {
        CredentialStore::new().with_platform(
            Platform::Amazon,
            PlatformCredentials::new().with_secret("access_key", "AK"),
        )
    }

    #[tokio::test]
    async fn disabled_platform_is_skipped() {
        let query = ProductQuery::new("chair");
        let outcome = FallbackPolicy::new(true)
            .run(Platform::Amazon, None, &query, &CredentialStore::new(), false, TIMEOUT)
            .await;

        assert_eq!(outcome.status.attempted, Attempt::Skipped);
        assert!(!outcome.status.succeeded);
        assert_eq!(outcome.status.error.as_deref(), Some(DISABLED_MESSAGE));
        assert!(outcome.products.is_empty());
    }

    #[tokio::test]
    async fn incomplete_credentials_use_mock_when_allowed() {
        let query = ProductQuery::new("tablet").with_max_results(3);
        let outcome = FallbackPolicy::new(true)
            .run(Platform::Amazon, None, &query, &partial_amazon(), true, TIMEOUT)
            .await;

        assert_eq!(outcome.status.attempted, Attempt::Mock);
        assert!(outcome.status.succeeded);
        assert_eq!(outcome.status.product_count, 3);
        assert!(outcome.products.iter().all(|p| p.mock));
    }

    #[tokio::test]
    async fn incomplete_credentials_without_fallback_name_missing_secrets() {
        let query = ProductQuery::new("tablet");
        let outcome = FallbackPolicy::new(false)
            .run(Platform::Amazon, None, &query, &partial_amazon(), true, TIMEOUT)
            .await;

        assert_eq!(outcome.status.attempted, Attempt::Skipped);
        assert!(!outcome.status.succeeded);
        let error = outcome.status.error.unwrap();
        assert!(error.contains("secret_key, partner_tag"), "{error}");
    }

    #[tokio::test]
    async fn ebay_failures_are_never_mocked() {
        let adapter = unreachable_ebay();
        let query = ProductQuery::new("headphones");
        let outcome = FallbackPolicy::new(true)
            .run(Platform::Ebay, Some(&adapter), &query, &CredentialStore::new(), true, TIMEOUT)
            .await;

        assert_eq!(outcome.status.attempted, Attempt::Live);
        assert!(!outcome.status.succeeded);
        assert!(outcome.status.error.is_some());
        assert!(outcome.products.is_empty());
    }

    #[test]
    fn complete_credentials_resolve_to_live() {
        let adapter = unreachable_ebay();
        let resolution =
            FallbackPolicy::new(true).resolve(Platform::Ebay, Some(&adapter), &CredentialStore::new(), true);
        assert!(matches!(resolution, Resolution::Live(_)));
    }
}
