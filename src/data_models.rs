use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const MAX_RESULTS_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ebay,
    Amazon,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Ebay, Platform::Amazon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ebay => "ebay",
            Platform::Amazon => "amazon",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Ebay => "eBay",
            Platform::Amazon => "Amazon",
        }
    }

    /// Secrets that must all be present before a live call is allowed.
    pub fn required_secrets(&self) -> &'static [&'static str] {
        match self {
            Platform::Ebay => &[],
            Platform::Amazon => &["access_key", "secret_key", "partner_tag"],
        }
    }

    /// Most items one live request to this platform can return.
    pub fn page_size(&self) -> usize {
        match self {
            Platform::Ebay => 100,
            Platform::Amazon => 10,
        }
    }

    /// Whether mock data may ever stand in for this platform.
    pub fn supports_mock(&self) -> bool {
        matches!(self, Platform::Amazon)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ebay" => Ok(Platform::Ebay),
            "amazon" => Ok(Platform::Amazon),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Inclusive price window applied to a product's total price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: Option<Money>,
    pub max: Option<Money>,
}

impl PriceBounds {
    pub fn new(min: Option<Money>, max: Option<Money>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, amount: Money) -> bool {
        self.min.is_none_or(|min| amount >= min) && self.max.is_none_or(|max| amount <= max)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if bound.is_negative() {
                return Err(ValidationError::NegativePrice(bound));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ValidationError::InvertedPriceBounds { min, max });
            }
        }
        Ok(())
    }
}

/// A search request. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    term: String,
    max_results: usize,
    platforms: Vec<Platform>,
    bounds: PriceBounds,
}

impl ProductQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            max_results: DEFAULT_MAX_RESULTS,
            platforms: Platform::ALL.to_vec(),
            bounds: PriceBounds::default(),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Keeps the declared order; repeated platforms are dropped.
    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        let mut ordered = Vec::new();
        for platform in platforms {
            if !ordered.contains(&platform) {
                ordered.push(platform);
            }
        }
        self.platforms = ordered;
        self
    }

    pub fn with_price_bounds(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.bounds = PriceBounds::new(min, max);
        self
    }

    pub fn term(&self) -> &str {
        self.term.trim()
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn bounds(&self) -> PriceBounds {
        self.bounds
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.term().is_empty() {
            return Err(ValidationError::EmptyTerm);
        }
        if self.max_results == 0 {
            return Err(ValidationError::ZeroMaxResults);
        }
        if self.max_results > MAX_RESULTS_LIMIT {
            return Err(ValidationError::TooManyResults {
                requested: self.max_results,
                limit: MAX_RESULTS_LIMIT,
            });
        }
        if self.platforms.is_empty() {
            return Err(ValidationError::NoPlatforms);
        }
        self.bounds.validate()
    }
}

/// Platform-agnostic product record.
///
/// `total_price` is always `price + shipping_cost`; the price fields are only
/// set through [`NormalizedProduct::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedProduct {
    pub id: String,
    pub name: String,
    price: Money,
    shipping_cost: Money,
    total_price: Money,
    pub currency: String,
    pub rating: Option<f32>,
    pub review_count: u32,
    pub url: String,
    pub image_url: Option<String>,
    pub condition: Option<String>,
    pub seller_feedback_score: Option<i64>,
    pub platform: Platform,
    pub mock: bool,
}

impl NormalizedProduct {
    pub fn new(
        platform: Platform,
        id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        shipping_cost: Money,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            shipping_cost,
            total_price: price + shipping_cost,
            currency: "USD".to_string(),
            rating: None,
            review_count: 0,
            url: String::new(),
            image_url: None,
            condition: None,
            seller_feedback_score: None,
            platform,
            mock: false,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Ratings outside 0.0..=5.0 are treated as absent.
    pub fn with_rating(mut self, rating: Option<f32>) -> Self {
        self.rating = rating.filter(|r| r.is_finite() && (0.0..=5.0).contains(r));
        self
    }

    pub fn with_review_count(mut self, review_count: u32) -> Self {
        self.review_count = review_count;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_condition(mut self, condition: Option<String>) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_seller_feedback_score(mut self, score: Option<i64>) -> Self {
        self.seller_feedback_score = score;
        self
    }

    pub fn as_mock(mut self) -> Self {
        self.mock = true;
        self
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attempt {
    Live,
    Mock,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformStatus {
    pub platform: Platform,
    pub attempted: Attempt,
    pub succeeded: bool,
    pub product_count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub products: Vec<NormalizedProduct>,
    pub statuses: Vec<PlatformStatus>,
}

impl SearchResult {
    pub fn status(&self, platform: Platform) -> Option<&PlatformStatus> {
        self.statuses.iter().find(|s| s.platform == platform)
    }

    pub fn products_from(&self, platform: Platform) -> impl Iterator<Item = &NormalizedProduct> {
        self.products.iter().filter(move |p| p.platform == platform)
    }
}
