use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::browser::fingerprint::FingerprintManager;
use crate::cli::config::{FetchSettings, FingerprintProfile};
use crate::fetch::normalize::NormalizedUrl;
use crate::fetch::{FetchOutcome, FetchStrategy, FetchedPage};

/// Plain HTTP fetch of server-rendered HTML.
///
/// One GET per attempt with a realistic browser header set; transient
/// failures (429, 5xx, timeouts, connection resets) are retried with
/// linear backoff, a 403 classifies as blocked immediately.
pub struct StaticFetch {
    client: Client,
    settings: FetchSettings,
    fingerprints: FingerprintManager,
}

impl StaticFetch {
    pub fn new(settings: FetchSettings, profiles: Vec<FingerprintProfile>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .cookie_store(true);

        if let Some(proxy) = &settings.outbound_proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy)
                    .context(format!("Invalid outbound proxy URL: {}", proxy))?,
            );
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            settings,
            fingerprints: FingerprintManager::new(profiles),
        })
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(fingerprint) = self.fingerprints.random_fingerprint() {
            for (name, value) in &fingerprint.headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    headers.insert(name, value);
                }
            }
        }

        headers
    }

    async fn attempt(&self, url: &NormalizedUrl) -> AttemptOutcome {
        let response = match self.client.get(url.as_str()).headers(self.request_headers()).send().await
        {
            Ok(response) => response,
            Err(e) => {
                return if e.is_timeout() || e.is_connect() {
                    AttemptOutcome::Retry(format!("Request failed: {}", e))
                } else {
                    AttemptOutcome::Done(FetchOutcome::Permanent {
                        reason: format!("Request failed: {}", e),
                    })
                };
            }
        };

        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return AttemptOutcome::Done(FetchOutcome::Blocked {
                status: status.as_u16(),
                message: clip(&message, 200),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return AttemptOutcome::Retry(format!("HTTP {}", status.as_u16()));
        }

        if !status.is_success() {
            return AttemptOutcome::Done(FetchOutcome::Permanent {
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let final_url = response.url().to_string();

        match response.text().await {
            Ok(html) => AttemptOutcome::Done(FetchOutcome::Success(FetchedPage {
                html,
                content_type,
                final_url,
            })),
            Err(e) => AttemptOutcome::Retry(format!("Failed to read response body: {}", e)),
        }
    }
}

enum AttemptOutcome {
    Done(FetchOutcome),
    Retry(String),
}

#[async_trait]
impl FetchStrategy for StaticFetch {
    async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome {
        let max_attempts = self.settings.max_retries + 1;
        let mut last_message = String::new();

        for attempt in 1..=max_attempts {
            debug!("Static fetch attempt {}/{} for {}", attempt, max_attempts, url);

            match self.attempt(url).await {
                AttemptOutcome::Done(outcome) => return outcome,
                AttemptOutcome::Retry(message) => {
                    warn!("Transient fetch failure for {}: {}", url, message);
                    last_message = message;

                    if attempt < max_attempts {
                        let backoff =
                            Duration::from_millis(self.settings.backoff_millis * attempt as u64);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        FetchOutcome::Transient { attempts: max_attempts, message: last_message }
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::AuditorConfig;
    use crate::fetch::normalize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher(max_retries: u32) -> StaticFetch {
        let config = AuditorConfig::default();
        let settings = FetchSettings {
            max_retries,
            backoff_millis: 10,
            timeout_secs: 5,
            ..config.fetch
        };
        StaticFetch::new(settings, config.browser.fingerprints).unwrap()
    }

    #[tokio::test]
    async fn test_success_returns_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>hello landing page</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let url = normalize::normalize(&server.uri()).unwrap();
        match test_fetcher(0).fetch(&url).await {
            FetchOutcome::Success(page) => {
                assert!(page.html.contains("hello landing page"));
                assert_eq!(page.content_type.as_deref(), Some("text/html"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gzip_encoded_body_is_decoded() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"<html><body>compressed landing page copy</body></html>")
            .unwrap();
        let compressed = encoder.finish().unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(compressed)
                    .insert_header("content-type", "text/html")
                    .insert_header("content-encoding", "gzip"),
            )
            .mount(&server)
            .await;

        let url = normalize::normalize(&server.uri()).unwrap();
        match test_fetcher(0).fetch(&url).await {
            FetchOutcome::Success(page) => {
                assert!(page.html.contains("compressed landing page copy"));
            }
            other => panic!("expected decoded body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forbidden_classifies_as_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Access denied"))
            .mount(&server)
            .await;

        let url = normalize::normalize(&server.uri()).unwrap();
        match test_fetcher(2).fetch(&url).await {
            FetchOutcome::Blocked { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Access denied"));
            }
            other => panic!("expected blocked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retry_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let url = normalize::normalize(&server.uri()).unwrap();
        match test_fetcher(2).fetch(&url).await {
            FetchOutcome::Transient { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("503"));
            }
            other => panic!("expected transient, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_then_success_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>recovered</html>"))
            .mount(&server)
            .await;

        let url = normalize::normalize(&server.uri()).unwrap();
        match test_fetcher(2).fetch(&url).await {
            FetchOutcome::Success(page) => assert!(page.html.contains("recovered")),
            other => panic!("expected success after retry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = normalize::normalize(&server.uri()).unwrap();
        match test_fetcher(2).fetch(&url).await {
            FetchOutcome::Permanent { reason } => assert!(reason.contains("404")),
            other => panic!("expected permanent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_not_retried_forever() {
        // Connection refused on a port nothing listens on
        let url = normalize::normalize("http://127.0.0.1:1/").unwrap();
        match test_fetcher(1).fetch(&url).await {
            FetchOutcome::Transient { attempts, .. } => assert!(attempts <= 2),
            FetchOutcome::Permanent { .. } => {}
            other => panic!("expected a failure, got {:?}", other),
        }
    }
}
