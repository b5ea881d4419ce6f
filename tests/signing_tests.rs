use anyhow::Result;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::post;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use product_scout::adapters::{AmazonAdapter, AmazonSettings};
use product_scout::coordinator::{SearchCoordinator, SearchSettings};
use product_scout::credentials::{CredentialStore, PlatformCredentials};
use product_scout::data_models::{Attempt, Platform, ProductQuery};
use product_scout::http::HttpClient;
use product_scout::signer::{
    UnsignedRequest, canonical_request, derive_signing_key, string_to_sign,
};

const ACCESS_KEY: &str = "AKIDEXAMPLE";
const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
const EXPECTED_SIGNED_HEADERS: &str = "content-encoding;content-type;host;x-amz-date;x-amz-target";

mod test_helpers {
    use super::*;

    /// Recomputes the signature the way the provider does, from the request as
    /// received on the wire.
    pub fn verify(method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Result<(), String> {
        let header = |name: &str| -> Result<String, String> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| format!("missing header {name}"))
        };

        let authorization = header("authorization")?;
        let fields = authorization
            .strip_prefix("AWS4-HMAC-SHA256 ")
            .ok_or("wrong algorithm")?;
        let mut credential = None;
        let mut signed_headers = None;
        let mut signature = None;
        for part in fields.split(", ") {
            if let Some(v) = part.strip_prefix("Credential=") {
                credential = Some(v);
            } else if let Some(v) = part.strip_prefix("SignedHeaders=") {
                signed_headers = Some(v);
            } else if let Some(v) = part.strip_prefix("Signature=") {
                signature = Some(v);
            }
        }
        let (credential, signed_headers, signature) = (
            credential.ok_or("no credential")?,
            signed_headers.ok_or("no signed headers")?,
            signature.ok_or("no signature")?,
        );
        if signed_headers != EXPECTED_SIGNED_HEADERS {
            return Err(format!("unexpected signed headers {signed_headers}"));
        }

        let (access_key, scope) = credential.split_once('/').ok_or("bad credential")?;
        if access_key != ACCESS_KEY {
            return Err(format!("unknown access key {access_key}"));
        }
        let scope_parts: Vec<&str> = scope.split('/').collect();
        let [date, region, service, "aws4_request"] = scope_parts.as_slice() else {
            return Err(format!("bad scope {scope}"));
        };

        let mut signed = Vec::new();
        for name in signed_headers.split(';') {
            signed.push((name.to_string(), header(name)?));
        }
        let request = UnsignedRequest::new(method.as_str(), header("host")?, uri.path())
            .with_body(body.to_vec());
        let canonical = canonical_request(&request, &signed);

        let to_sign = string_to_sign(&header("x-amz-date")?, scope, &canonical.text);
        let key = derive_signing_key(SECRET_KEY, date, region, service).map_err(|e| e.to_string())?;
        let mut mac = Hmac::<Sha256>::new_from_slice(&key).map_err(|e| e.to_string())?;
        mac.update(to_sign.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if expected == signature {
            Ok(())
        } else {
            Err(format!("signature mismatch: expected {expected}, got {signature}"))
        }
    }

    pub async fn verifying_amazon() -> std::net::SocketAddr {
        let router = Router::new().route(
            "/paapi5/searchitems",
            post(
                |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
                    match verify(&method, &uri, &headers, &body) {
                        Ok(()) => (
                            StatusCode::OK,
                            axum::Json(serde_json::json!({"SearchResult": {"Items": [{
                                "ASIN": "B0SIGNED01",
                                "DetailPageURL": "https://www.amazon.com/dp/B0SIGNED01",
                                "ItemInfo": {"Title": {"DisplayValue": "Verified Tablet"}},
                                "Offers": {"Listings": [{"Price": {"Amount": 129.99, "Currency": "USD"}}]}
                            }]}})),
                        ),
                        Err(reason) => (
                            StatusCode::FORBIDDEN,
                            axum::Json(serde_json::json!({"Errors": [{
                                "Code": "InvalidSignature",
                                "Message": reason
                            }]})),
                        ),
                    }
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    pub fn credentials(secret_key: &str) -> PlatformCredentials {
        PlatformCredentials::new()
            .with_secret("access_key", ACCESS_KEY)
            .with_secret("secret_key", secret_key)
            .with_secret("partner_tag", "scout-20")
    }

    pub fn coordinator(addr: std::net::SocketAddr, secret_key: &str) -> SearchCoordinator {
        let settings = AmazonSettings {
            endpoint: format!("http://{addr}"),
            ..AmazonSettings::default()
        };
        let http = HttpClient::new(Duration::from_secs(5), 64 * 1024).unwrap();
        let adapter = AmazonAdapter::new(settings, &credentials(secret_key), http).unwrap();
        SearchCoordinator::new(
            CredentialStore::new().with_platform(Platform::Amazon, credentials(secret_key)),
            SearchSettings {
                mock_fallback: false,
                ..SearchSettings::default()
            },
        )
        .with_adapter(adapter)
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_signed_request_verifies_on_the_server() -> Result<()> {
    let addr = verifying_amazon().await;
    let query = ProductQuery::new("tablet")
        .with_max_results(3)
        .with_platforms([Platform::Amazon]);

    let result = coordinator(addr, SECRET_KEY).search(query).await?;

    let status = result.status(Platform::Amazon).unwrap();
    assert_eq!(status.attempted, Attempt::Live);
    assert!(status.succeeded, "{:?}", status.error);
    assert_eq!(result.products.len(), 1);
    assert_eq!(result.products[0].name, "Verified Tablet");
    Ok(())
}

#[tokio::test]
async fn test_wrong_secret_is_rejected_by_the_server() -> Result<()> {
    let addr = verifying_amazon().await;
    let query = ProductQuery::new("tablet").with_platforms([Platform::Amazon]);

    let result = coordinator(addr, "not-the-secret").search(query).await?;

    let status = result.status(Platform::Amazon).unwrap();
    assert_eq!(status.attempted, Attempt::Live);
    assert!(!status.succeeded);
    assert!(status.error.as_deref().unwrap().contains("InvalidSignature"));
    Ok(())
}
