//! Amazon Product Advertising API 5.0 `SearchItems`, JSON over a SigV4-signed POST.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::credentials::PlatformCredentials;
use crate::data_models::{NormalizedProduct, Platform, ProductQuery};
use crate::error::{AdapterError, SearchError};
use crate::http::{HttpClient, HttpResponse};
use crate::money::Money;
use crate::signer::{RequestSigner, SignedRequest, SigningParams, UnsignedRequest};

pub const SERVICE: &str = "ProductAdvertisingAPI";
pub const SEARCH_PATH: &str = "/paapi5/searchitems";
pub const DEFAULT_HOST: &str = "webservices.amazon.com";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MARKETPLACE: &str = "www.amazon.com";

const TARGET: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.SearchItems";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const CONTENT_ENCODING: &str = "amz-1.0";
const NO_RESULTS: &str = "NoResults";

const RESOURCES: &[&str] = &[
    "ItemInfo.Title",
    "ItemInfo.ByLineInfo",
    "Offers.Listings.Price",
    "Offers.Listings.Condition",
    "Images.Primary.Large",
    "CustomerReviews.StarRating",
    "CustomerReviews.Count",
];

/// Where and how to reach the API. Credentials are passed separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmazonSettings {
    pub endpoint: String,
    pub region: String,
    pub marketplace: String,
}

impl Default for AmazonSettings {
    fn default() -> Self {
        Self {
            endpoint: format!("https://{DEFAULT_HOST}"),
            region: DEFAULT_REGION.to_string(),
            marketplace: DEFAULT_MARKETPLACE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AmazonAdapter {
    endpoint: Url,
    host: String,
    marketplace: String,
    partner_tag: String,
    signer: RequestSigner,
    http: HttpClient,
}

impl AmazonAdapter {
    pub fn new(
        settings: AmazonSettings,
        credentials: &PlatformCredentials,
        http: HttpClient,
    ) -> Result<Self, SearchError> {
        let config_error = |message: String| SearchError::Configuration {
            platform: Platform::Amazon,
            message,
        };

        let missing = credentials.missing_for(Platform::Amazon);
        if !missing.is_empty() {
            return Err(config_error(format!(
                "missing credentials: {}",
                missing.join(", ")
            )));
        }

        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|e| config_error(format!("invalid endpoint {}: {e}", settings.endpoint)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(config_error(format!("endpoint {endpoint} has no host"))),
        };

        let params = SigningParams::new(
            credentials.get("access_key").unwrap_or_default(),
            credentials.get("secret_key").unwrap_or_default(),
            settings.region.as_str(),
            SERVICE,
        );
        let signer = RequestSigner::new(params).map_err(|e| config_error(e.to_string()))?;

        Ok(Self {
            endpoint,
            host,
            marketplace: settings.marketplace,
            partner_tag: credentials.get("partner_tag").unwrap_or_default().to_string(),
            signer,
            http,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn request_body(&self, query: &ProductQuery) -> Result<Vec<u8>, AdapterError> {
        let bounds = query.bounds();
        let body = SearchItemsRequest {
            keywords: query.term(),
            partner_tag: &self.partner_tag,
            partner_type: "Associates",
            marketplace: &self.marketplace,
            search_index: "All",
            item_count: query.max_results().min(Platform::Amazon.page_size()),
            resources: RESOURCES,
            min_price: bounds.min.map(|m| m.cents()),
            max_price: bounds.max.map(|m| m.cents()),
        };
        serde_json::to_vec(&body).map_err(|e| AdapterError::Parse(e.to_string()))
    }

    /// Builds and signs the request for `timestamp`. The returned body is the
    /// exact byte sequence covered by the signature.
    pub fn build_request(
        &self,
        query: &ProductQuery,
        timestamp: DateTime<Utc>,
    ) -> Result<SignedRequest, AdapterError> {
        let path = format!("{}{SEARCH_PATH}", self.endpoint.path().trim_end_matches('/'));
        let unsigned = UnsignedRequest::new("POST", self.host.as_str(), path)
            .with_scheme(self.endpoint.scheme())
            .with_header("content-type", CONTENT_TYPE)
            .with_header("content-encoding", CONTENT_ENCODING)
            .with_header("x-amz-target", TARGET)
            .with_body(self.request_body(query)?);

        Ok(self.signer.sign(&unsigned, timestamp)?)
    }

    pub async fn search(&self, query: &ProductQuery) -> Result<Vec<NormalizedProduct>, AdapterError> {
        let signed = self.build_request(query, Utc::now())?;
        log::debug!("amazon search: {} at {}", query.term(), signed.amz_date);

        let mut request = self.http.client().post(&signed.url).body(signed.body.clone());
        for (name, value) in &signed.headers {
            // reqwest derives Host from the URL; the value is identical
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = self.http.fetch(request).await?;
        if response.is_success() {
            parse_response(&response.body, query.max_results())
        } else {
            parse_error_response(response)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchItemsRequest<'a> {
    keywords: &'a str,
    partner_tag: &'a str,
    partner_type: &'static str,
    marketplace: &'a str,
    search_index: &'static str,
    item_count: usize,
    resources: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    min_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchItemsResponse {
    search_result: Option<SearchResultJson>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResultJson {
    // kept raw so one malformed item cannot sink the page
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Item {
    #[serde(rename = "ASIN")]
    asin: Option<String>,
    #[serde(rename = "DetailPageURL")]
    detail_page_url: Option<String>,
    item_info: Option<ItemInfo>,
    offers: Option<Offers>,
    images: Option<Images>,
    customer_reviews: Option<CustomerReviews>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemInfo {
    title: Option<DisplayValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DisplayValue {
    display_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Offers {
    #[serde(default)]
    listings: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Listing {
    price: Option<ListingPrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListingPrice {
    amount: Option<f64>,
    currency: Option<String>,
    display_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Images {
    primary: Option<ImageSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageSet {
    large: Option<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CustomerReviews {
    star_rating: Option<StarRating>,
    count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StarRating {
    value: Option<f64>,
}

/// Parses a `SearchItems` body.
///
/// A `NoResults` error is a well-formed empty search and yields `Ok(vec![])`.
/// Any other error list without results is a provider error, and a body that
/// carries neither results nor errors is malformed.
pub fn parse_response(body: &[u8], max_results: usize) -> Result<Vec<NormalizedProduct>, AdapterError> {
    let response: SearchItemsResponse =
        serde_json::from_slice(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

    let Some(search_result) = response.search_result else {
        if response.errors.is_empty() {
            return Err(AdapterError::Parse(
                "response carries neither SearchResult nor Errors".to_string(),
            ));
        }
        return errors_outcome(&response.errors);
    };

    for error in &response.errors {
        log::warn!(
            "amazon returned results with error {:?}: {:?}",
            error.code,
            error.message
        );
    }

    let mut products = Vec::new();
    for value in search_result.items {
        let item = match serde_json::from_value::<Item>(value) {
            Ok(item) => item,
            Err(e) => {
                log::warn!("skipping malformed amazon item: {e}");
                continue;
            }
        };
        match normalize_item(item) {
            Ok(product) => products.push(product),
            Err(reason) => log::warn!("skipping amazon item: {reason}"),
        }
        if products.len() == max_results {
            break;
        }
    }
    Ok(products)
}

/// Interprets a non-2xx reply. PA-API reports `NoResults` and request
/// errors as an `Errors` document under 4xx statuses, so those are read
/// like any other error list; anything else is a plain status error.
pub fn parse_error_response(response: HttpResponse) -> Result<Vec<NormalizedProduct>, AdapterError> {
    match serde_json::from_slice::<SearchItemsResponse>(&response.body) {
        Ok(parsed) if !parsed.errors.is_empty() => errors_outcome(&parsed.errors),
        _ => Err(response.into_status_error()),
    }
}

/// `NoResults` anywhere in the list is an empty search; otherwise the list
/// becomes a provider error.
fn errors_outcome(errors: &[ApiError]) -> Result<Vec<NormalizedProduct>, AdapterError> {
    if errors.iter().any(|e| e.code.as_deref() == Some(NO_RESULTS)) {
        return Ok(Vec::new());
    }
    let message = errors
        .iter()
        .map(|e| {
            format!(
                "{}: {}",
                e.code.as_deref().unwrap_or("Unknown"),
                e.message.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(AdapterError::Provider(message))
}

fn normalize_item(item: Item) -> Result<NormalizedProduct, String> {
    let title = item
        .item_info
        .and_then(|info| info.title)
        .and_then(|t| t.display_value)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or("missing title")?;

    let listing_price = item
        .offers
        .and_then(|o| o.listings.into_iter().next())
        .and_then(|l| l.price)
        .ok_or_else(|| format!("{title}: missing listing price"))?;
    let price = listing_price
        .amount
        .and_then(Money::from_f64)
        .or_else(|| {
            listing_price
                .display_amount
                .as_deref()
                .and_then(Money::parse_display_amount)
        })
        .ok_or_else(|| format!("{title}: unparseable listing price"))?;

    let url = item.detail_page_url.unwrap_or_default();
    let id = item
        .asin
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| url.clone());

    let (rating, review_count) = match item.customer_reviews {
        Some(reviews) => (
            reviews
                .star_rating
                .and_then(|s| s.value)
                .map(|v| ((v * 10.0).round() / 10.0) as f32),
            reviews.count.unwrap_or(0),
        ),
        None => (None, 0),
    };
    let image_url = item
        .images
        .and_then(|i| i.primary)
        .and_then(|p| p.large)
        .and_then(|l| l.url);

    Ok(NormalizedProduct::new(Platform::Amazon, id, title, price, Money::ZERO)
        .with_currency(listing_price.currency.unwrap_or_else(|| "USD".to_string()))
        .with_rating(rating)
        .with_review_count(review_count)
        .with_url(url)
        .with_image_url(image_url)
        .with_condition(Some("New".to_string())))
}
