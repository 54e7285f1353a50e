use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::browser::fingerprint::FingerprintManager;
use crate::browser::session::BrowserSession;
use crate::cli::config::{BrowserSettings, FetchSettings};
use crate::fetch::normalize::NormalizedUrl;
use crate::fetch::{FetchOutcome, FetchStrategy, FetchedPage};

/// Markers that a bot-mitigation interstitial rendered instead of the page
const CHALLENGE_INDICATORS: &[&str] = &[
    "cf-browser-verification",
    "cf-challenge",
    "cf-turnstile",
    "checking your browser",
    "just a moment",
    "verify you are human",
    "enable javascript and cookies to continue",
    "challenge-platform",
];

/// Headless-browser fetch for JavaScript-dependent pages.
///
/// Every request gets its own browser session, torn down on all exit
/// paths. A semaphore bounds how many rendering sessions may run at once
/// so concurrent requests cannot exhaust memory or file descriptors.
pub struct RenderedFetch {
    browser: BrowserSettings,
    proxy: Option<String>,
    fingerprints: FingerprintManager,
    sessions: Arc<Semaphore>,
}

impl RenderedFetch {
    pub fn new(browser: BrowserSettings, fetch: &FetchSettings) -> Self {
        let sessions = Arc::new(Semaphore::new(browser.max_sessions.max(1)));
        let fingerprints = FingerprintManager::new(browser.fingerprints.clone());

        Self {
            browser,
            proxy: fetch.outbound_proxy.clone(),
            fingerprints,
            sessions,
        }
    }

    fn looks_blocked(html: &str) -> Option<&'static str> {
        let lowered = html.to_lowercase();
        CHALLENGE_INDICATORS
            .iter()
            .find(|indicator| lowered.contains(*indicator))
            .copied()
    }

    /// Classify a rendered document: challenge interstitials count as
    /// blocked, everything else is a success. WebDriver exposes no response
    /// headers, so the page carries no content type.
    fn classify(html: String, url: &NormalizedUrl) -> FetchOutcome {
        if let Some(indicator) = Self::looks_blocked(&html) {
            debug!("Challenge page detected for {}: {}", url, indicator);
            return FetchOutcome::Blocked {
                status: 403,
                message: format!("Bot challenge detected: {}", indicator),
            };
        }

        FetchOutcome::Success(FetchedPage {
            html,
            content_type: None,
            final_url: url.as_str().to_string(),
        })
    }
}

#[async_trait]
impl FetchStrategy for RenderedFetch {
    async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome {
        let _permit = match self.sessions.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return FetchOutcome::Permanent {
                    reason: "Rendering session pool is shut down".to_string(),
                }
            }
        };

        let fingerprint = match self.fingerprints.random_fingerprint() {
            Ok(fingerprint) => fingerprint,
            Err(e) => return FetchOutcome::Permanent { reason: e.to_string() },
        };

        let mut session =
            match BrowserSession::launch(self.browser.clone(), &fingerprint, self.proxy.as_deref())
                .await
            {
                Ok(session) => session,
                Err(e) => {
                    warn!("Failed to launch browser session: {:#}", e);
                    return FetchOutcome::Permanent {
                        reason: format!("Failed to launch browser session: {}", e),
                    };
                }
            };

        let rendered = session.render(url.as_str()).await;

        // Close before classifying so the session never outlives the request
        if let Err(e) = session.close().await {
            warn!("Error closing browser session: {:#}", e);
        }

        let html = match rendered {
            Ok(html) => html,
            Err(e) => {
                return FetchOutcome::Transient {
                    attempts: 1,
                    message: format!("Navigation failed: {}", e),
                }
            }
        };

        Self::classify(html, url)
    }
}
