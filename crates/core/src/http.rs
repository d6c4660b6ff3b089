//! HTTP session shared by all backends.
//!
//! Every request goes through [`retry_with_backoff`]: transient statuses
//! (429, 500, 502, 503, 504) and connection failures are retried with
//! exponential backoff, everything else is returned to the caller on the
//! first attempt. Retry exhaustion surfaces as
//! [`Error::UpstreamUnavailable`].

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, backoff::Backoff};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{HttpConfig, RetryConfig};
use crate::{Error, Result};

const TRANSIENT_STATUSES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Worth retrying.
    Transient(String),
    /// Give up immediately.
    Fatal(Error),
}

/// Retry a fallible async operation with exponential backoff.
///
/// `operation_name` is used for logging and as the URL in the error
/// reported on exhaustion.
///
/// # Errors
///
/// Returns the fatal error of an attempt, or
/// [`Error::UpstreamUnavailable`] once `config.max_attempts` attempts
/// failed transiently.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut backoff = create_backoff(config);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match f().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(
                        operation = operation_name,
                        attempts, "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(AttemptError::Transient(message)) => {
                if attempts >= config.max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts,
                        error = %message,
                        "Operation failed after maximum retries"
                    );
                    return Err(Error::upstream(
                        operation_name,
                        format!("{message} (after {attempts} attempts)"),
                    ));
                }

                let Some(duration) = backoff.next_backoff() else {
                    return Err(Error::upstream(operation_name, message));
                };
                warn!(
                    operation = operation_name,
                    attempts,
                    error = %message,
                    retry_in_ms = duration.as_millis(),
                    "Operation failed, retrying"
                );
                tokio::time::sleep(duration).await;
            }
        }
    }
}

/// Create exponential backoff from config
fn create_backoff(config: &RetryConfig) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(config.initial_backoff_ms))
        .with_max_interval(Duration::from_millis(config.max_backoff_ms))
        .with_multiplier(config.backoff_multiplier)
        .with_max_elapsed_time(None) // bounded by max_attempts instead
        .build()
}

fn classify_send_error(url: &str, err: &reqwest::Error) -> AttemptError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        AttemptError::Transient(err.to_string())
    } else {
        AttemptError::Fatal(Error::upstream(url, err.to_string()))
    }
}

/// HTTP client with timeouts, retry and optional bearer credential.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    retry: RetryConfig,
    download_timeout: Duration,
    bearer: Option<String>,
}

impl HttpSession {
    /// Create a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("mercado/", env!("CARGO_PKG_VERSION"))),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            bearer: None,
        })
    }

    /// A session sending `Authorization: Bearer <token>` on every request.
    #[must_use]
    pub fn with_bearer(&self, token: Option<String>) -> Self {
        Self {
            bearer: token,
            ..self.clone()
        }
    }

    /// Send a request and return the first non-transient response.
    ///
    /// Non-success statuses other than the transient ones are returned as
    /// a response so callers can interpret 404s.
    async fn send(&self, method: Method, url: &str, timeout: Option<Duration>) -> Result<Response> {
        retry_with_backoff(&self.retry, url, || {
            let method = method.clone();
            let mut request = self.client.request(method.clone(), url);
            if let Some(token) = &self.bearer {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            async move {
                debug!(%method, %url, "HTTP request");
                let response = request
                    .send()
                    .await
                    .map_err(|e| classify_send_error(url, &e))?;
                let status = response.status();
                if TRANSIENT_STATUSES.contains(&status) {
                    return Err(AttemptError::Transient(format!("HTTP {status}")));
                }
                Ok(response)
            }
        })
        .await
    }

    /// `GET` a URL. Any non-transient status is returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or retries are exhausted.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(Method::GET, url, None).await
    }

    /// `HEAD` a URL and return its status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or retries are exhausted.
    pub async fn head(&self, url: &str) -> Result<StatusCode> {
        Ok(self.send(Method::HEAD, url, None).await?.status())
    }

    /// `GET` a URL and deserialize a JSON body.
    ///
    /// Returns `Ok(None)` on 404.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamUnavailable`] on other non-success statuses
    /// or an invalid body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self.get(url).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::upstream(url, format!("HTTP {status}")));
        }
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| Error::upstream(url, format!("Invalid response body: {e}")))
    }

    /// `GET` a URL and return its body as trimmed text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamUnavailable`] on a non-success status.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(url, format!("HTTP {status}")));
        }
        let text = response
            .text()
            .await
            .map_err(|e| Error::upstream(url, format!("Failed to read body: {e}")))?;
        Ok(text.trim().to_string())
    }

    /// Stream a URL's body into `dest` with the download timeout.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-success status, a broken stream, or a
    /// write failure.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .send(Method::GET, url, Some(self.download_timeout))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(url, format!("HTTP {status}")));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "create download file"))?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::upstream(url, format!("Download interrupted: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "write download"))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "flush download"))?;

        debug!(%url, bytes = written, path = %dest.display(), "Downloaded");
        Ok(written)
    }
}
