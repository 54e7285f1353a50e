pub mod normalize;
pub mod rendered;
pub mod static_fetch;

use async_trait::async_trait;

use crate::error::AuditError;
use normalize::NormalizedUrl;

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw (static mode) or rendered (browser mode) document HTML
    pub html: String,
    /// Declared content type, when the transport provided one
    pub content_type: Option<String>,
    /// URL the response ultimately came from, after redirects
    pub final_url: String,
}

/// Outcome of attempting to retrieve a page. Produced by the fetch
/// strategies with the classification already decided, so the boundary
/// never re-derives it from message text.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(FetchedPage),
    /// The site actively rejected us (403 / anti-bot signal)
    Blocked { status: u16, message: String },
    /// Transient network trouble that survived the retry budget
    Transient { attempts: u32, message: String },
    /// Not worth retrying: unreachable host, unusable body
    Permanent { reason: String },
}

impl FetchOutcome {
    /// Resolve the outcome into a page or the matching taxonomy error
    pub fn into_result(self, min_body_len: usize) -> Result<FetchedPage, AuditError> {
        match self {
            FetchOutcome::Success(page) => {
                if page.html.len() < min_body_len {
                    Err(AuditError::InsufficientContent { length: page.html.len() })
                } else {
                    Ok(page)
                }
            }
            FetchOutcome::Blocked { status, message } => {
                Err(AuditError::Blocked { status, message })
            }
            FetchOutcome::Transient { attempts, message } => Err(AuditError::Unreachable(
                format!("{} (after {} attempts)", message, attempts),
            )),
            FetchOutcome::Permanent { reason } => Err(AuditError::Unreachable(reason)),
        }
    }
}

/// A strategy for obtaining page content for a URL.
///
/// Implementations share failure classification; the caller picks static
/// or rendered mode through configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome;
}
