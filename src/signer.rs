//! AWS Signature Version 4 request signing.
//!
//! Signing happens in four stages: canonical request, string-to-sign, derived
//! signing key, and the final HMAC. The provider recomputes the canonical
//! request on its side, so every byte here must match what is sent.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::SigningError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SCOPE_TERMINATOR: &str = "aws4_request";
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_STAMP_FORMAT: &str = "%Y%m%d";

#[derive(Clone, PartialEq, Eq)]
pub struct SigningParams {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub service: String,
}

impl SigningParams {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    fn validate(&self) -> Result<(), SigningError> {
        let fields = [
            ("access_key", &self.access_key),
            ("secret_key", &self.secret_key),
            ("region", &self.region),
            ("service", &self.service),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(SigningError::MissingField(name));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SigningParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningParams")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

/// An outbound request before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedRequest {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl UnsignedRequest {
    pub fn new(method: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            scheme: "https".to_string(),
            host: host.into(),
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// A request carrying its `Authorization` header. Header values must be sent
/// exactly as they appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub authorization: String,
    pub amz_date: String,
}

impl SignedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RequestSigner {
    params: SigningParams,
}

impl RequestSigner {
    pub fn new(params: SigningParams) -> Result<Self, SigningError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SigningParams {
        &self.params
    }

    pub fn sign(
        &self,
        request: &UnsignedRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<SignedRequest, SigningError> {
        self.params.validate()?;

        let amz_date = timestamp.format(AMZ_DATE_FORMAT).to_string();
        let date_stamp = timestamp.format(DATE_STAMP_FORMAT).to_string();
        let scope = credential_scope(&date_stamp, &self.params.region, &self.params.service);

        let headers = signed_header_set(request, &amz_date);
        let canonical = canonical_request(request, &headers);
        let to_sign = string_to_sign(&amz_date, &scope, &canonical.text);
        let key = derive_signing_key(
            &self.params.secret_key,
            &date_stamp,
            &self.params.region,
            &self.params.service,
        )?;
        let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            self.params.access_key, canonical.signed_headers
        );

        let mut out_headers = headers;
        out_headers.push(("authorization".to_string(), authorization.clone()));

        let query = canonical_query_string(&request.query);
        let mut url = format!("{}://{}{}", request.scheme, request.host, canonical_uri(&request.path));
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        Ok(SignedRequest {
            method: request.method.clone(),
            url,
            headers: out_headers,
            body: request.body.clone(),
            authorization,
            amz_date,
        })
    }
}

/// Caller headers plus `host` and `x-amz-date`, with any caller-supplied
/// copies of those two (or of `authorization`) replaced.
fn signed_header_set(request: &UnsignedRequest, amz_date: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|(name, _)| {
            !matches!(
                name.to_ascii_lowercase().as_str(),
                "host" | "x-amz-date" | "authorization"
            )
        })
        .cloned()
        .collect();
    headers.push(("host".to_string(), request.host.clone()));
    headers.push(("x-amz-date".to_string(), amz_date.to_string()));
    headers
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    pub text: String,
    pub signed_headers: String,
}

pub fn canonical_request(request: &UnsignedRequest, headers: &[(String, String)]) -> CanonicalRequest {
    let (canonical_headers, signed_headers) = canonical_headers(headers);
    let text = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        canonical_uri(&request.path),
        canonical_query_string(&request.query),
        canonical_headers,
        signed_headers,
        hex_sha256(&request.body),
    );
    CanonicalRequest {
        text,
        signed_headers,
    }
}

pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();
    encoded
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns the newline-terminated header block and the `;`-joined name list.
fn canonical_headers(headers: &[(String, String)]) -> (String, String) {
    let mut merged: std::collections::BTreeMap<String, Vec<String>> = Default::default();
    for (name, value) in headers {
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        merged.entry(name.to_ascii_lowercase()).or_default().push(value);
    }

    let mut block = String::new();
    for (name, values) in &merged {
        block.push_str(name);
        block.push(':');
        block.push_str(&values.join(","));
        block.push('\n');
    }
    let names = merged.keys().cloned().collect::<Vec<_>>().join(";");
    (block, names)
}

pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{date_stamp}/{region}/{service}/{SCOPE_TERMINATOR}")
}

pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex_sha256(canonical_request.as_bytes())
    )
}

pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SigningError::InvalidKey)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hex_sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
