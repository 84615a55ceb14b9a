//! Authenticated JSON calls to the connector manager.
//!
//! Every request carries `Authorization: ApiKey <key>`, a JSON content type and
//! an `X-Request-Id`. Network failures and 502 responses are retried with
//! [`ExponentialBackoff`] until the wall-clock budget runs out; any other
//! status is final. Responses are classified three ways:
//!
//! ```text
//! 200          → Ok(body)
//! 401          → Error::Unauthorized   (fatal, never retried)
//! anything else → Error::Http           (status + raw body)
//! ```

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{ClientConfig, RetryConfig};
use crate::error::{Error, Result};

mod backoff;
mod request_id;

pub use backoff::ExponentialBackoff;
pub use request_id::{current_request_id, generate_request_id, with_request_id};

/// Path prefix of every connector endpoint.
pub const BASE_PATH: &str = "/api/v1/connectors";

/// `code` of a 401 body when the key is unknown.
pub const INVALID_API_KEY_CODE: i64 = 1;
/// `code` of a 401 body when the key was revoked.
pub const REVOKED_API_KEY_CODE: i64 = 2;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Placeholder body for calls that send none (serialized as `null`).
pub const NO_BODY: Option<&()> = None;

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: i64,
}

/// Why an attempt should be retried.
enum Transient {
    BadGateway(reqwest::Response),
    Network(reqwest::Error),
}

/// HTTP transport bound to one connector manager and one API key.
#[derive(Clone)]
pub struct Transport {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry: config.retry.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, BASE_PATH, path.trim_start_matches('/'))
    }

    /// Sends `body` and decodes the response into `T`.
    ///
    /// Returns `Ok(None)` when the server answered 200 with an empty body.
    pub async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(method, path, body).await?;
        if response.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&response)?))
    }

    /// Sends `body`, expecting no response payload.
    pub async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, body).await.map(|_| ())
    }

    async fn execute<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(&body)?;
        let url = self.url(path);
        let request_id = request_id::resolve_request_id();
        let mut backoff = ExponentialBackoff::new(&self.retry);

        let response = loop {
            let outcome = self
                .http_client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("ApiKey {}", self.api_key))
                .header(CONTENT_TYPE, "application/json")
                .header(REQUEST_ID_HEADER, &request_id)
                .body(payload.clone())
                .send()
                .await;

            let transient = match outcome {
                Ok(response) if response.status() != StatusCode::BAD_GATEWAY => break response,
                Ok(response) => {
                    debug!(path = %path, request_id = %request_id, "try http request error: bad gateway");
                    Transient::BadGateway(response)
                }
                Err(e) => {
                    debug!(path = %path, request_id = %request_id, error = %e, "try http request error");
                    Transient::Network(e)
                }
            };

            match backoff.next_backoff() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(exhausted(transient).await),
            }
        };

        let status = response.status();
        let body = response.bytes().await?;

        match status {
            StatusCode::OK => Ok(body.to_vec()),
            StatusCode::UNAUTHORIZED => Err(unauthorized(&body)),
            _ => Err(Error::Http {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

async fn exhausted(transient: Transient) -> Error {
    match transient {
        Transient::BadGateway(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Error::Http { status, body }
        }
        Transient::Network(e) => Error::Request(e),
    }
}

fn unauthorized(body: &[u8]) -> Error {
    let code = match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(api_error) => Some(api_error.code),
        Err(e) => {
            error!(error = %e, "could not parse api error response");
            None
        }
    };
    let body = String::from_utf8_lossy(body).into_owned();

    match code {
        Some(INVALID_API_KEY_CODE) => error!(
            "The API key is invalid. The connector may have been started with the wrong API key or has been deleted from the manager."
        ),
        Some(REVOKED_API_KEY_CODE) => error!("The API key has been revoked."),
        _ => error!(error = %body, "Could not connect to connector manager, unauthorized"),
    }

    Error::Unauthorized { code, body }
}
