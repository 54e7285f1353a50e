use thiserror::Error;

/// Failure taxonomy for the audit pipeline.
///
/// Every fallible stage classifies its failures at the point of detection,
/// so the request boundary never has to guess a status code from message
/// text. The variant carries whatever detail the user-facing explanation
/// needs.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Malformed request body or a URL that failed normalization
    #[error("Invalid or missing URL. Please provide a valid website URL.")]
    InvalidInput(String),

    /// The target site actively rejected the fetch (403 / anti-bot signal)
    #[error("Website blocked the request")]
    Blocked { status: u16, message: String },

    /// DNS, connection, or timeout failure reaching the target
    #[error("Could not access the website. Please check the URL and try again.")]
    Unreachable(String),

    /// Fetch or extraction produced less text than the minimum threshold
    #[error("Could not extract sufficient content from the website.")]
    InsufficientContent { length: usize },

    /// Missing or rejected completion-backend credentials
    #[error("Service configuration error. Please try again later.")]
    BackendConfig(String),

    /// The completion backend returned a non-success status or an
    /// unparseable payload
    #[error("Analysis failed: {message}")]
    BackendFailure { status: Option<u16>, message: String },

    /// Anything that escaped classification
    #[error("{0}")]
    Unknown(String),
}

impl AuditError {
    /// HTTP status code this failure maps to at the request boundary
    pub fn status_code(&self) -> u16 {
        match self {
            AuditError::InvalidInput(_) => 400,
            AuditError::Unreachable(_) => 400,
            AuditError::Blocked { .. } => 403,
            AuditError::InsufficientContent { .. } => 422,
            AuditError::BackendConfig(_) => 500,
            AuditError::BackendFailure { .. } => 500,
            AuditError::Unknown(_) => 500,
        }
    }

    /// Remediation hints for failures where the caller can do something
    /// about it
    pub fn solutions(&self) -> Option<Vec<&'static str>> {
        match self {
            AuditError::Blocked { .. } => Some(vec![
                "Try again later",
                "Use a professional scraping service",
                "Enable rendered fetch mode with proxy rotation",
            ]),
            _ => None,
        }
    }

    /// Longer explanation attached to the response body, when one exists
    pub fn details(&self) -> Option<&'static str> {
        match self {
            AuditError::Blocked { .. } => {
                Some("The target website has anti-bot protection. Solutions:")
            }
            AuditError::InsufficientContent { .. } => Some(
                "This could happen if the website is using advanced protection, \
                 requires JavaScript that we can't execute, or has very little \
                 content. You might want to try a different URL or a simpler website.",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuditError::InvalidInput("".into()).status_code(), 400);
        assert_eq!(
            AuditError::Blocked { status: 403, message: "forbidden".into() }.status_code(),
            403
        );
        assert_eq!(AuditError::Unreachable("dns".into()).status_code(), 400);
        assert_eq!(AuditError::InsufficientContent { length: 40 }.status_code(), 422);
        assert_eq!(AuditError::BackendConfig("no key".into()).status_code(), 500);
        assert_eq!(
            AuditError::BackendFailure { status: Some(502), message: "bad gateway".into() }
                .status_code(),
            500
        );
    }

    #[test]
    fn test_blocked_carries_solutions() {
        let err = AuditError::Blocked { status: 403, message: "forbidden".into() };
        let solutions = err.solutions().unwrap();
        assert!(!solutions.is_empty());
        assert!(err.details().unwrap().contains("anti-bot"));
    }

    #[test]
    fn test_unclassified_has_no_hints() {
        let err = AuditError::Unknown("boom".into());
        assert!(err.solutions().is_none());
        assert!(err.details().is_none());
    }
}
