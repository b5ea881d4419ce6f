pub mod amazon;
pub mod ebay;
pub mod mock;

use crate::data_models::{NormalizedProduct, Platform, ProductQuery};
use crate::error::AdapterError;

pub use amazon::{AmazonAdapter, AmazonSettings};
pub use ebay::EbayAdapter;
pub use mock::mock_products;

/// One live integration per platform. The set is closed, so dispatch is a
/// plain match.
#[derive(Debug, Clone)]
pub enum PlatformAdapter {
    Ebay(EbayAdapter),
    Amazon(AmazonAdapter),
}

impl PlatformAdapter {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformAdapter::Ebay(_) => Platform::Ebay,
            PlatformAdapter::Amazon(_) => Platform::Amazon,
        }
    }

    /// Runs the search and returns at most `query.max_results()` products.
    pub async fn search(&self, query: &ProductQuery) -> Result<Vec<NormalizedProduct>, AdapterError> {
        match self {
            PlatformAdapter::Ebay(adapter) => adapter.search(query).await,
            PlatformAdapter::Amazon(adapter) => adapter.search(query).await,
        }
    }
}

impl From<EbayAdapter> for PlatformAdapter {
    fn from(adapter: EbayAdapter) -> Self {
        PlatformAdapter::Ebay(adapter)
    }
}

impl From<AmazonAdapter> for PlatformAdapter {
    fn from(adapter: AmazonAdapter) -> Self {
        PlatformAdapter::Amazon(adapter)
    }
}
