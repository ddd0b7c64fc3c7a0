//! Page fetching over HTTP.
//!
//! [`PageFetcher`] is the seam every network read goes through. [`HttpFetcher`]
//! performs exactly one request per call; [`RetryingFetcher`] wraps any fetcher
//! with a bounded, exponentially backed-off retry for transient failures.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use docmirror_shared::{DocMirrorError, FetchCause, HttpConfig, Result};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Upper bound on the doubling exponent for retry delays.
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Retrieves the raw text of a page.
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its body, or a [`DocMirrorError::Fetch`].
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Single-attempt fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client from the HTTP settings (timeout, user agent, redirects).
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout())
            .build()
            .map_err(|e| DocMirrorError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Use an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!("fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| DocMirrorError::fetch(url.as_str(), classify(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocMirrorError::fetch(
                url.as_str(),
                FetchCause::Status(status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DocMirrorError::fetch(url.as_str(), classify_body(&e)))?;

        debug!(bytes = body.len(), "page fetched");
        Ok(body)
    }
}

/// Map a request error onto the fetch taxonomy.
fn classify(err: &reqwest::Error) -> FetchCause {
    if err.is_timeout() {
        FetchCause::Timeout
    } else if err.is_connect() {
        FetchCause::Connection(err.to_string())
    } else if err.is_body() || err.is_decode() {
        FetchCause::Body(err.to_string())
    } else {
        FetchCause::Client(err.to_string())
    }
}

/// Body reads can still time out mid-stream.
fn classify_body(err: &reqwest::Error) -> FetchCause {
    if err.is_timeout() {
        FetchCause::Timeout
    } else {
        FetchCause::Body(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Retry layer
// ---------------------------------------------------------------------------

/// How many times to retry, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each subsequent one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_SHIFT))
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Wraps a fetcher and retries transient failures.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: PageFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<F: PageFetcher> PageFetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt < self.policy.max_retries && is_transient(&err) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        %url,
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_transient(err: &DocMirrorError) -> bool {
    matches!(err, DocMirrorError::Fetch { cause, .. } if cause.is_transient())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> HttpConfig {
        HttpConfig {
            timeout_secs: 5,
            max_retries: 0,
            retry_delay_ms: 1,
            request_delay_ms: 0,
            user_agent: "docmirror-test".into(),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(RetryPolicy::none().delay_for(5), Duration::ZERO);
    }

    #[tokio::test]
    async fn fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manual/page.htm"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&format!("{}/manual/page.htm", server.uri())).unwrap();
        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<p>hello</p>");
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.htm"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&format!("{}/missing.htm", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();

        match err {
            DocMirrorError::Fetch { url: failed, cause } => {
                assert!(failed.ends_with("/missing.htm"));
                assert_eq!(cause, FetchCause::Status(404));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.htm"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let fetcher = HttpFetcher::with_client(client);
        let url = Url::parse(&format!("{}/slow.htm", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(matches!(
            err,
            DocMirrorError::Fetch {
                cause: FetchCause::Timeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn retrying_fetcher_recovers_from_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.htm"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.htm"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };
        let fetcher = RetryingFetcher::new(HttpFetcher::new(&test_config()).unwrap(), policy);
        let url = Url::parse(&format!("{}/flaky.htm", server.uri())).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn retrying_fetcher_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.htm"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        };
        let fetcher = RetryingFetcher::new(HttpFetcher::new(&test_config()).unwrap(), policy);
        let url = Url::parse(&format!("{}/gone.htm", server.uri())).unwrap();
        assert!(fetcher.fetch(&url).await.is_err());
    }

    #[tokio::test]
    async fn retrying_fetcher_gives_up_after_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down.htm"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };
        let fetcher = RetryingFetcher::new(HttpFetcher::new(&test_config()).unwrap(), policy);
        let url = Url::parse(&format!("{}/down.htm", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(
            err,
            DocMirrorError::Fetch {
                cause: FetchCause::Status(500),
                ..
            }
        ));
    }
}
