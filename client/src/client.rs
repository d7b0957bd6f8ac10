use crate::{backoff, config::Endpoints, Error, Result};
use maffisol_types::api::ApiMessage;
use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry behavior for HTTP requests.
///
/// Only GET requests are retried unless `retry_non_idempotent` is set: the
/// game's POST and PUT actions spend money and move players to jail.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
            retry_non_idempotent: false,
        }
    }
}

/// REST client for the game's backends.
#[derive(Clone)]
pub struct Client {
    pub endpoints: Endpoints,
    pub http_client: reqwest::Client,
    retry_policy: RetryPolicy,
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Maps a non-success response to `Rejected` when the backend explained
/// itself with `{"message": ...}`, and to `FailedWithBody` otherwise.
async fn error_from_response(method: &Method, url: &Url, response: Response) -> Error {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(_) => return Error::Failed(status),
    };
    if let Ok(ApiMessage {
        message: Some(message),
    }) = serde_json::from_str::<ApiMessage>(&text)
    {
        if !message.is_empty() {
            return Error::Rejected { status, message };
        }
    }
    Error::FailedWithBody {
        status,
        body: format!("{method} {url}: {text}"),
    }
}

impl Client {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            endpoints,
            http_client,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Client for backends served from one origin (see [`Endpoints::single`]).
    pub fn for_origin(origin: &str) -> Result<Self> {
        Self::new(Endpoints::single(origin)?)
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Response> {
        let retryable = method == Method::GET || self.retry_policy.retry_non_idempotent;
        let max_attempts = if retryable {
            self.retry_policy.max_attempts.max(1)
        } else {
            1
        };
        let mut backoff = self.retry_policy.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.http_client.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }
            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if attempt >= max_attempts || !is_retryable_status(status) {
                        return Err(error_from_response(&method, &url, response).await);
                    }
                    debug!(%method, %url, %status, attempt, "retrying request");
                }
                Err(err) => {
                    if attempt >= max_attempts || !is_retryable_error(&err) {
                        return Err(err.into());
                    }
                    debug!(%method, %url, error = ?err, attempt, "retrying request");
                }
            }
            let delay = backoff::jittered_backoff(&mut rand::thread_rng(), backoff);
            tokio::time::sleep(delay).await;
            backoff = backoff::next_backoff(backoff, self.retry_policy.max_backoff);
        }
    }

    pub async fn get_with_retry(&self, url: Url) -> Result<Response> {
        self.send(Method::GET, url, None).await
    }

    pub async fn post_with_retry(&self, url: Url, body: &Value) -> Result<Response> {
        self.send(Method::POST, url, Some(body)).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.get_with_retry(url).await?;
        Ok(response.json().await?)
    }

    /// Like [`Client::get_json`], mapping 404 to `None`.
    pub(crate) async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        match self.get_with_retry(url).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let response = self.send(method, url, Some(&body)).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, url, body).await
    }

    /// POST whose response body is not needed.
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<()> {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    /// Bodiless request returning the backend's confirmation text.
    pub(crate) async fn message(&self, method: Method, url: Url) -> Result<String> {
        let response = self.send(method, url.clone(), None).await?;
        let text = response.text().await?;
        match serde_json::from_str::<ApiMessage>(&text) {
            Ok(ApiMessage {
                message: Some(message),
            }) => Ok(message),
            _ => {
                debug!(%url, "confirmation body carried no message");
                Ok(text)
            }
        }
    }

    pub(crate) async fn bodiless_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
    ) -> Result<T> {
        let response = self.send(method, url, None).await?;
        Ok(response.json().await?)
    }
}

/// Joins path segments beneath `base`, percent-encoding each one.
pub(crate) fn join(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::InvalidScheme(base.scheme().to_string()))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}
