//! Shared HTTP plumbing for the upstream clients.
//!
//! `HttpUpstream` owns the `reqwest::Client`, the base URL and the retry
//! policy of one upstream. It performs a single request, turns any
//! non-success status into a classified `UpstreamError`, and wraps the
//! single request in the retry loop.

use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use reqwest::{header, Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::ndjson::LineDecoder;
use crate::retry::{with_retry, Decision, RetryPolicy, RetryState};

/// A lazily evaluated sequence of records from a streaming endpoint
pub type RecordStream<T> = Pin<Box<dyn Stream<Item = Result<T, UpstreamError>> + Send>>;

const NDJSON: &str = "application/x-ndjson";

/// Where an upstream lives and how hard to try reaching it
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Collection URL, e.g. `http://localhost:8080/v1/movieinfos`
    pub base_url: String,
    /// Per-request timeout for single-record and collection fetches
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpUpstream {
    name: &'static str,
    client: Client,
    base: Url,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpUpstream {
    pub(crate) fn new(name: &'static str, config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            UpstreamError::Transport(format!("invalid {name} url {}: {e}", config.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(UpstreamError::Transport(format!(
                "invalid {name} url {}: not a base url",
                config.base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            name,
            client,
            base,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    pub(crate) fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The base URL with `segments` appended as escaped path segments
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET a JSON document, retrying transient faults
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let this = self;
        with_retry(&self.retry, self.name, move || {
            let request = this.client.get(url.clone()).query(query).timeout(this.timeout);
            async move {
                let response = send(request).await?;
                decode(response).await
            }
        })
        .await
    }

    /// POST a JSON document once. Writes are not idempotent and are never retried.
    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(url).json(body).timeout(self.timeout);
        let response = send(request).await?;
        decode(response).await
    }

    /// Open an NDJSON stream.
    ///
    /// Failures to connect and transport failures in the middle of the body
    /// are classified like any other call. Retryable ones re-open the stream
    /// from the beginning after the policy's delay; the attempt budget covers
    /// the whole lifetime of the returned stream. A line that does not
    /// decode ends the stream with `Malformed`.
    pub(crate) fn stream_ndjson<T>(&self, url: Url) -> RecordStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let name = self.name;
        let client = self.client.clone();
        let retry = self.retry.clone();

        Box::pin(stream! {
            let mut state = RetryState::new();

            loop {
                let attempt = state.begin_attempt();
                let mut delivered = 0usize;

                let request = client.get(url.clone()).header(header::ACCEPT, NDJSON);
                let error = match send(request).await {
                    Err(error) => error,
                    Ok(response) => {
                        let mut lines = LineDecoder::new();
                        let mut failure = None;

                        for await chunk in response.bytes_stream() {
                            match chunk {
                                Ok(bytes) => {
                                    for line in lines.push(&bytes) {
                                        match serde_json::from_slice::<T>(&line) {
                                            Ok(record) => {
                                                delivered += 1;
                                                yield Ok(record);
                                            }
                                            Err(e) => {
                                                yield Err(UpstreamError::from(e));
                                                return;
                                            }
                                        }
                                    }
                                }
                                Err(e) => {
                                    failure = Some(UpstreamError::Transport(e.to_string()));
                                    break;
                                }
                            }
                        }

                        match failure {
                            Some(error) => error,
                            None => {
                                if let Some(line) = lines.finish() {
                                    yield serde_json::from_slice::<T>(&line).map_err(UpstreamError::from);
                                }
                                debug!(operation = name, attempt, delivered, "stream completed");
                                return;
                            }
                        }
                    }
                };

                match retry.decide(error.kind(), attempt) {
                    Decision::Retry(delay) => {
                        warn!(
                            operation = name,
                            attempt,
                            delivered,
                            kind = ?error.kind(),
                            %error,
                            ?delay,
                            "stream failed, re-establishing"
                        );
                        state.record_delay(delay);
                        sleep(delay).await;
                    }
                    Decision::Stop(reason) => {
                        warn!(operation = name, attempt, ?reason, %error, "stream failed");
                        yield Err(error);
                        return;
                    }
                }
            }
        })
    }
}

/// Read the whole body, then parse it. A cut body is a transport fault; only
/// a complete body that fails to parse is `Malformed`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Send one request; any non-2xx answer becomes a classified error
async fn send(request: RequestBuilder) -> Result<Response, UpstreamError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::from_status(status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(base: &str) -> HttpUpstream {
        HttpUpstream::new("test", UpstreamConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoint_appends_escaped_segments() {
        let http = upstream("http://localhost:8080/v1/movieinfos");
        assert_eq!(
            http.endpoint(&["abc"]).as_str(),
            "http://localhost:8080/v1/movieinfos/abc"
        );
        assert_eq!(
            http.endpoint(&["a b/c"]).as_str(),
            "http://localhost:8080/v1/movieinfos/a%20b%2Fc"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_is_tolerated() {
        let http = upstream("http://localhost:8080/v1/reviews/");
        assert_eq!(
            http.endpoint(&["stream"]).as_str(),
            "http://localhost:8080/v1/reviews/stream"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = HttpUpstream::new("test", UpstreamConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));

        let err = HttpUpstream::new("test", UpstreamConfig::new("mailto:someone@example.com"))
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[test]
    fn test_config_builder() {
        let config = UpstreamConfig::new("http://localhost:8080/v1/reviews")
            .with_timeout(Duration::from_secs(2))
            .with_retry(RetryPolicy::none());
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.retry.max_retries, 0);
    }
}
