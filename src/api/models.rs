use serde::{Deserialize, Serialize};

use crate::data_models::{NormalizedProduct, Platform, PlatformStatus, ProductQuery};
use crate::money::Money;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: Option<i64>,
    pub platforms: Option<Vec<String>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SearchRequest {
    /// Converts the wire request into a query. Range checks are left to
    /// `ProductQuery::validate`.
    pub fn to_query(&self) -> Result<ProductQuery, String> {
        let mut query = ProductQuery::new(self.query.clone());

        if let Some(max_results) = self.max_results {
            query = query.with_max_results(usize::try_from(max_results).unwrap_or(0));
        }
        if let Some(platforms) = &self.platforms {
            let platforms = platforms
                .iter()
                .map(|p| p.parse::<Platform>())
                .collect::<Result<Vec<_>, _>>()?;
            query = query.with_platforms(platforms);
        }

        let price = |value: Option<f64>, name: &str| -> Result<Option<Money>, String> {
            value
                .map(|v| Money::from_f64(v).ok_or_else(|| format!("{name} is not a valid amount")))
                .transpose()
        };
        Ok(query.with_price_bounds(
            price(self.min_price, "min_price")?,
            price(self.max_price, "max_price")?,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub products: Vec<NormalizedProduct>,
    pub statuses: Vec<PlatformStatus>,
    pub total_results: usize,
    pub processing_time_ms: u128,
}
