//! eBay Finding API (`findItemsByKeywords`), XML over GET, no signing.

use serde::Deserialize;

use crate::data_models::{NormalizedProduct, Platform, ProductQuery};
use crate::error::AdapterError;
use crate::http::HttpClient;
use crate::money::Money;

pub const DEFAULT_ENDPOINT: &str = "https://svcs.ebay.com/services/search/FindingService/v1";

#[derive(Debug, Clone)]
pub struct EbayAdapter {
    endpoint: String,
    app_id: Option<String>,
    http: HttpClient,
}

impl EbayAdapter {
    pub fn new(endpoint: impl Into<String>, app_id: Option<String>, http: HttpClient) -> Self {
        Self {
            endpoint: endpoint.into(),
            app_id: app_id.filter(|id| !id.trim().is_empty()),
            http,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_params(&self, query: &ProductQuery) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("OPERATION-NAME".into(), "findItemsByKeywords".into()),
            ("SERVICE-VERSION".into(), "1.0.0".into()),
            ("RESPONSE-DATA-FORMAT".into(), "XML".into()),
            ("REST-PAYLOAD".into(), String::new()),
            ("keywords".into(), query.term().to_string()),
            (
                "paginationInput.entriesPerPage".into(),
                query.max_results().min(Platform::Ebay.page_size()).to_string(),
            ),
        ];
        if let Some(app_id) = &self.app_id {
            params.push(("SECURITY-APPNAME".into(), app_id.clone()));
        }

        // item filters must be numbered without gaps
        let bounds = query.bounds();
        let filters = [("MinPrice", bounds.min), ("MaxPrice", bounds.max)];
        for (index, (name, value)) in filters
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .enumerate()
        {
            params.push((format!("itemFilter({index}).name"), name.to_string()));
            params.push((format!("itemFilter({index}).value"), value.to_string()));
        }
        params
    }

    pub async fn search(&self, query: &ProductQuery) -> Result<Vec<NormalizedProduct>, AdapterError> {
        let params = self.request_params(query);
        log::debug!("ebay search: {} ({} params)", query.term(), params.len());

        let request = self.http.client().get(&self.endpoint).query(&params);
        let body = self.http.execute(request).await?;
        let xml = String::from_utf8(body)
            .map_err(|e| AdapterError::Parse(format!("response is not UTF-8: {e}")))?;

        parse_response(&xml, query.max_results())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindItemsResponse {
    ack: Option<String>,
    error_message: Option<ErrorMessage>,
    search_result: Option<SearchResultXml>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    error: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResultXml {
    #[serde(default)]
    item: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    item_id: Option<String>,
    title: Option<String>,
    #[serde(rename = "viewItemURL")]
    view_item_url: Option<String>,
    #[serde(rename = "galleryURL")]
    gallery_url: Option<String>,
    selling_status: Option<SellingStatus>,
    shipping_info: Option<ShippingInfo>,
    condition: Option<Condition>,
    seller_info: Option<SellerInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SellingStatus {
    current_price: Option<Amount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShippingInfo {
    shipping_service_cost: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    #[serde(rename = "@currencyId")]
    currency_id: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Condition {
    condition_display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SellerInfo {
    feedback_score: Option<String>,
}

/// Parses a Finding API response. A successful search with no items is an
/// empty list, not an error.
pub fn parse_response(xml: &str, max_results: usize) -> Result<Vec<NormalizedProduct>, AdapterError> {
    let response: FindItemsResponse =
        quick_xml::de::from_str(xml).map_err(|e| AdapterError::Parse(e.to_string()))?;

    match response.ack.as_deref().map(str::trim) {
        None => {
            return Err(AdapterError::Parse(
                "response has no ack element".to_string(),
            ));
        }
        Some("Success") | Some("Warning") => {}
        Some(ack) => {
            let ack = ack.to_string();
            let message = response
                .error_message
                .into_iter()
                .flat_map(|m| m.error)
                .filter_map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AdapterError::Provider(if message.is_empty() {
                format!("ack={ack}")
            } else {
                message
            }));
        }
    }

    let Some(search_result) = response.search_result else {
        return Ok(Vec::new());
    };

    let mut products = Vec::new();
    for raw in search_result.item {
        match normalize_item(raw) {
            Ok(product) => products.push(product),
            Err(reason) => log::warn!("skipping ebay item: {reason}"),
        }
        if products.len() == max_results {
            break;
        }
    }
    Ok(products)
}

fn normalize_item(raw: RawItem) -> Result<NormalizedProduct, String> {
    let title = non_empty(raw.title).ok_or("missing title")?;
    let url = non_empty(raw.view_item_url).ok_or("missing viewItemURL")?;
    let price_tag = raw
        .selling_status
        .and_then(|s| s.current_price)
        .ok_or("missing currentPrice")?;
    let price = price_tag
        .value
        .as_deref()
        .and_then(Money::parse_decimal)
        .ok_or_else(|| format!("unparseable price {:?}", price_tag.value))?;

    let shipping = raw
        .shipping_info
        .and_then(|s| s.shipping_service_cost)
        .and_then(|cost| cost.value)
        .and_then(|v| Money::parse_decimal(&v))
        .unwrap_or(Money::ZERO);

    let id = non_empty(raw.item_id).unwrap_or_else(|| url.clone());
    let currency = non_empty(price_tag.currency_id).unwrap_or_else(|| "USD".to_string());
    let condition = raw.condition.and_then(|c| non_empty(c.condition_display_name));
    let feedback = raw
        .seller_info
        .and_then(|s| s.feedback_score)
        .and_then(|score| score.trim().parse::<i64>().ok());

    Ok(NormalizedProduct::new(Platform::Ebay, id, title, price, shipping)
        .with_currency(currency)
        .with_url(url)
        .with_image_url(raw.gallery_url)
        .with_condition(condition)
        .with_seller_feedback_score(feedback))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TWO_ITEMS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<findItemsByKeywordsResponse xmlns="http://www.ebay.com/marketplace/search/v1/services">
  <ack>Success</ack>
  <version>1.13.0</version>
  <searchResult count="2">
    <item>
      <itemId>110001</itemId>
      <title>Wireless Headphones Pro</title>
      <galleryURL>https://i.ebayimg.com/1.jpg</galleryURL>
      <viewItemURL>https://www.ebay.com/itm/110001</viewItemURL>
      <sellerInfo><sellerUserName>audio</sellerUserName><feedbackScore>1520</feedbackScore></sellerInfo>
      <shippingInfo><shippingServiceCost currencyId="USD">4.995</shippingServiceCost></shippingInfo>
      <sellingStatus><currentPrice currencyId="USD">59.99</currentPrice></sellingStatus>
      <condition><conditionId>1000</conditionId><conditionDisplayName>New</conditionDisplayName></condition>
    </item>
    <item>
      <itemId>110002</itemId>
      <title>Budget Earbuds</title>
      <viewItemURL>https://www.ebay.com/itm/110002</viewItemURL>
      <sellingStatus><currentPrice currencyId="GBP">12.5</currentPrice></sellingStatus>
    </item>
  </searchResult>
</findItemsByKeywordsResponse>"#;

    fn adapter() -> EbayAdapter {
        let http = HttpClient::new(Duration::from_secs(1), 1024).unwrap();
        EbayAdapter::new(DEFAULT_ENDPOINT, Some("app-123".into()), http)
    }

    #[test]
    fn parses_items_and_normalizes_prices() {
        let products = parse_response(TWO_ITEMS, 10).unwrap();
        assert_eq!(products.len(), 2);

        let first = &products[0];
        assert_eq!(first.id, "110001");
        assert_eq!(first.name, "Wireless Headphones Pro");
        assert_eq!(first.price(), Money::from_cents(5999));
        assert_eq!(first.shipping_cost(), Money::from_cents(500));
        assert_eq!(first.total_price(), Money::from_cents(6499));
        assert_eq!(first.condition.as_deref(), Some("New"));
        assert_eq!(first.seller_feedback_score, Some(1520));
        assert_eq!(first.image_url.as_deref(), Some("https://i.ebayimg.com/1.jpg"));
        assert_eq!(first.platform, Platform::Ebay);
        assert!(!first.mock);

        let second = &products[1];
        assert_eq!(second.currency, "GBP");
        assert_eq!(second.shipping_cost(), Money::ZERO);
        assert_eq!(second.total_price(), Money::from_cents(1250));
        assert_eq!(second.rating, None);
    }

    #[test]
    fn truncates_to_max_results() {
        let products = parse_response(TWO_ITEMS, 1).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "110001");
    }

    #[test]
    fn items_missing_required_fields_are_skipped() {
        let xml = r#"<findItemsByKeywordsResponse>
  <ack>Success</ack>
  <searchResult count="3">
    <item><itemId>1</itemId><viewItemURL>https://e/1</viewItemURL>
      <sellingStatus><currentPrice currencyId="USD">10.00</currentPrice></sellingStatus></item>
    <item><itemId>2</itemId><title>No price</title><viewItemURL>https://e/2</viewItemURL></item>
    <item><title>Kept</title><viewItemURL>https://e/3</viewItemURL>
      <sellingStatus><currentPrice currencyId="USD">3.00</currentPrice></sellingStatus></item>
  </searchResult>
</findItemsByKeywordsResponse>"#;
        let products = parse_response(xml, 10).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Kept");
        // falls back to the listing URL as identifier
        assert_eq!(products[0].id, "https://e/3");
    }

    #[test]
    fn zero_results_is_empty_success() {
        let xml = r#"<findItemsByKeywordsResponse xmlns="http://www.ebay.com/marketplace/search/v1/services">
  <ack>Success</ack>
  <searchResult count="0"/>
</findItemsByKeywordsResponse>"#;
        assert!(parse_response(xml, 5).unwrap().is_empty());

        let no_result_element = "<findItemsByKeywordsResponse><ack>Success</ack></findItemsByKeywordsResponse>";
        assert!(parse_response(no_result_element, 5).unwrap().is_empty());
    }

    #[test]
    fn failure_ack_is_provider_error() {
        let xml = r#"<findItemsByKeywordsResponse>
  <ack>Failure</ack>
  <errorMessage><error><errorId>11002</errorId><message>Invalid Application: app-123</message></error></errorMessage>
</findItemsByKeywordsResponse>"#;
        match parse_response(xml, 5) {
            Err(AdapterError::Provider(message)) => {
                assert_eq!(message, "Invalid Application: app-123")
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        assert!(matches!(
            parse_response("<findItemsByKeywordsResponse><ack>Success", 5),
            Err(AdapterError::Parse(_))
        ));
        assert!(matches!(
            parse_response("<html><body>Service Unavailable</body></html>", 5),
            Err(AdapterError::Parse(_))
        ));
    }

    #[test]
    fn request_params_carry_keywords_limit_and_contiguous_filters() {
        let query = ProductQuery::new("wireless headphones")
            .with_max_results(250)
            .with_price_bounds(None, Some(Money::from_cents(20_000)));
        let params = adapter().request_params(&query);
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("OPERATION-NAME"), Some("findItemsByKeywords"));
        assert_eq!(get("keywords"), Some("wireless headphones"));
        assert_eq!(get("paginationInput.entriesPerPage"), Some("100"));
        assert_eq!(get("SECURITY-APPNAME"), Some("app-123"));
        assert_eq!(get("itemFilter(0).name"), Some("MaxPrice"));
        assert_eq!(get("itemFilter(0).value"), Some("200.00"));
        assert_eq!(get("itemFilter(1).name"), None);
    }
}
