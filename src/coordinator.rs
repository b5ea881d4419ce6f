use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use nanoid::nanoid;
use tokio::time::{Instant, timeout_at};
use tracing::Instrument;

use crate::adapters::{AmazonAdapter, EbayAdapter, PlatformAdapter};
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::data_models::{Platform, ProductQuery, SearchResult};
use crate::error::SearchError;
use crate::fallback::{FallbackPolicy, PlatformOutcome};
use crate::http::HttpClient;

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const TIMEOUT_MESSAGE: &str = "timeout";

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub mock_fallback: bool,
    /// Bound on a single live platform call.
    pub adapter_timeout: Duration,
    /// Bound on the whole search; platforms still running are reported as timed out.
    pub search_timeout: Duration,
    pub disabled: HashSet<Platform>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            mock_fallback: true,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            disabled: HashSet::new(),
        }
    }
}

/// Fans a query out to every requested platform and merges the answers.
///
/// Platforms run as independent tasks: a failure, timeout or panic in one is
/// recorded in its status and never affects the others.
pub struct SearchCoordinator {
    adapters: HashMap<Platform, Arc<PlatformAdapter>>,
    credentials: Arc<CredentialStore>,
    policy: FallbackPolicy,
    settings: SearchSettings,
}

impl SearchCoordinator {
    pub fn new(credentials: CredentialStore, settings: SearchSettings) -> Self {
        Self {
            adapters: HashMap::new(),
            credentials: Arc::new(credentials),
            policy: FallbackPolicy::new(settings.mock_fallback),
            settings,
        }
    }

    pub fn with_adapter(mut self, adapter: impl Into<PlatformAdapter>) -> Self {
        let adapter = adapter.into();
        self.adapters.insert(adapter.platform(), Arc::new(adapter));
        self
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = HttpClient::new(config.adapter_timeout, config.max_response_bytes)?;
        let ebay = EbayAdapter::new(
            config.ebay_endpoint.clone(),
            config.ebay_app_id.clone(),
            http.clone(),
        );
        let mut coordinator =
            Self::new(config.credentials.clone(), config.search_settings()).with_adapter(ebay);

        let amazon_credentials = config
            .credentials
            .get(Platform::Amazon)
            .cloned()
            .unwrap_or_default();
        match AmazonAdapter::new(config.amazon.clone(), &amazon_credentials, http) {
            Ok(amazon) => coordinator = coordinator.with_adapter(amazon),
            Err(e) => log::warn!("amazon live search unavailable: {e}"),
        }

        Ok(coordinator)
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn has_adapter(&self, platform: Platform) -> bool {
        self.adapters.contains_key(&platform)
    }

    pub async fn search(&self, query: ProductQuery) -> Result<SearchResult, SearchError> {
        query.validate()?;

        let request_id = nanoid!(10);
        let span = tracing::info_span!("search", %request_id, term = %query.term());
        let result = self.dispatch(Arc::new(query)).instrument(span).await;
        Ok(result)
    }

    async fn dispatch(&self, query: Arc<ProductQuery>) -> SearchResult {
        let deadline = Instant::now() + self.settings.search_timeout;
        log::info!(
            "searching {:?} for '{}' (max {})",
            query.platforms(),
            query.term(),
            query.max_results()
        );

        let mut handles = Vec::with_capacity(query.platforms().len());
        for &platform in query.platforms() {
            let adapter = self.adapters.get(&platform).cloned();
            let credentials = Arc::clone(&self.credentials);
            let query = Arc::clone(&query);
            let policy = self.policy;
            let enabled = !self.settings.disabled.contains(&platform);
            let adapter_timeout = self.settings.adapter_timeout;

            let span = tracing::info_span!("platform", %platform);
            let handle = tokio::spawn(
                async move {
                    policy
                        .run(
                            platform,
                            adapter.as_deref(),
                            &query,
                            &credentials,
                            enabled,
                            adapter_timeout,
                        )
                        .await
                }
                .instrument(span),
            );
            handles.push((platform, handle));
        }

        // joined in declared order; completion order does not matter
        let mut outcomes = Vec::with_capacity(handles.len());
        for (platform, mut handle) in handles {
            let outcome = match timeout_at(deadline, &mut handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    log::error!("{platform}: search task failed: {e}");
                    PlatformOutcome::failed(platform, format!("search task failed: {e}"))
                }
                Err(_) => {
                    handle.abort();
                    log::warn!("{platform}: no answer before the search deadline");
                    PlatformOutcome::failed(platform, TIMEOUT_MESSAGE)
                }
            };
            outcomes.push(outcome);
        }

        let result = merge(outcomes, &query);
        log::info!("search finished with {} products", result.products.len());
        result
    }
}

/// Combines per-platform outcomes, already in declared platform order.
///
/// Duplicates by `(platform, id)` keep the first occurrence, products whose
/// total price is outside the query bounds are dropped, and the list is then
/// truncated to `max_results`. Order is otherwise preserved.
pub fn merge(outcomes: Vec<PlatformOutcome>, query: &ProductQuery) -> SearchResult {
    let bounds = query.bounds();
    let mut seen = HashSet::new();
    let mut products = Vec::new();
    let mut statuses = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        for product in outcome.products {
            if !seen.insert((product.platform, product.id.clone())) {
                continue;
            }
            if bounds.contains(product.total_price()) {
                products.push(product);
            }
        }
        statuses.push(outcome.status);
    }

    products.truncate(query.max_results());
    SearchResult { products, statuses }
}
