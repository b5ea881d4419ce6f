use std::time::Duration;

use reqwest::RequestBuilder;
use tokio::time::timeout;

use crate::error::AdapterError;

pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;
const ERROR_BODY_PREVIEW: usize = 512;

/// A fully read response, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The status error for this response, carrying a short body preview.
    pub fn into_status_error(self) -> AdapterError {
        let preview = String::from_utf8_lossy(&self.body[..self.body.len().min(ERROR_BODY_PREVIEW)]);
        AdapterError::Status {
            status: self.status,
            body: preview.into_owned(),
        }
    }
}

/// HTTP client with a fixed request timeout and a response size cap.
///
/// Both limits surface as `AdapterError`s, so a slow or oversized provider
/// response can never stall a search.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout_duration: Duration,
    max_response_bytes: usize,
}

impl HttpClient {
    pub fn new(timeout_duration: Duration, max_response_bytes: usize) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("product-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout_duration)
            .connect_timeout(timeout_duration)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AdapterError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_duration,
            max_response_bytes,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout_duration
    }

    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    /// Sends the request and returns the body of a 2xx response.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, AdapterError> {
        let response = self.fetch(request).await?;
        if !response.is_success() {
            return Err(response.into_status_error());
        }
        Ok(response.body)
    }

    /// Sends the request and returns status and body without judging the
    /// status. Timeout and size limits still apply.
    pub async fn fetch(&self, request: RequestBuilder) -> Result<HttpResponse, AdapterError> {
        timeout(self.timeout_duration, self.fetch_inner(request))
            .await
            .map_err(|_| AdapterError::Timeout(self.timeout_duration))?
    }

    async fn fetch_inner(&self, request: RequestBuilder) -> Result<HttpResponse, AdapterError> {
        let mut response = request.send().await.map_err(|e| self.classify_error(e))?;
        let status = response.status().as_u16();

        if let Some(length) = response.content_length() {
            if length > self.max_response_bytes as u64 {
                return Err(AdapterError::ResponseTooLarge {
                    limit: self.max_response_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify_error(e))? {
            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(AdapterError::ResponseTooLarge {
                    limit: self.max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse { status, body })
    }

    fn classify_error(&self, error: reqwest::Error) -> AdapterError {
        if error.is_timeout() {
            AdapterError::Timeout(self.timeout_duration)
        } else {
            AdapterError::Transport(error.to_string())
        }
    }
}
