use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {attempts} attempt(s)")]
    NavigationTimeout { url: String, attempts: u32 },

    #[error("access denied by {url} (HTTP {status})")]
    AccessDenied { url: String, status: u16 },

    #[error("rate limited by {service} (retry after {retry_after_secs}s)")]
    RateLimited {
        service: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("completion service error: {0}")]
    Completion(String),

    #[error("malformed completion payload for {context}: {reason}")]
    MalformedCompletion {
        context: String,
        reason: String,
        raw: String,
    },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    #[error("pagination limit reached for album {album_id}: exceeded {max_pages} pages")]
    PaginationLimit { album_id: String, max_pages: usize },
}

impl ScrapeError {
    /// Whether this error signals a 403-style access denial.
    ///
    /// Page backends outside this crate may only surface a message, so the
    /// backend's navigation reason is inspected as well as the typed variants.
    /// URLs are never inspected.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        match self {
            ScrapeError::AccessDenied { .. } | ScrapeError::UnexpectedStatus { status: 403, .. } => {
                true
            }
            ScrapeError::Navigation { reason, .. } => {
                let reason = reason.to_ascii_lowercase();
                reason.contains("403") || reason.contains("forbidden")
            }
            _ => false,
        }
    }

    /// Whether a navigation attempt that failed with this error may succeed
    /// if simply repeated.
    #[must_use]
    pub fn is_transient_navigation(&self) -> bool {
        match self {
            ScrapeError::Http(e) => e.is_timeout() || e.is_connect(),
            ScrapeError::NavigationTimeout { .. } => true,
            ScrapeError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access_denied_is_detected() {
        let err = ScrapeError::AccessDenied {
            url: "https://x.com".to_owned(),
            status: 403,
        };
        assert!(err.is_access_denied());
    }

    #[test]
    fn message_mentioning_403_is_detected() {
        let err = ScrapeError::Navigation {
            url: "https://x.com".to_owned(),
            reason: "net::ERR_HTTP_RESPONSE_CODE_FAILURE 403".to_owned(),
        };
        assert!(err.is_access_denied());
    }

    #[test]
    fn unrelated_errors_are_not_access_denied() {
        let err = ScrapeError::Navigation {
            url: "https://x.com".to_owned(),
            reason: "connection reset".to_owned(),
        };
        assert!(!err.is_access_denied());
        let err = ScrapeError::UnexpectedStatus {
            status: 500,
            url: "https://x.com".to_owned(),
        };
        assert!(!err.is_access_denied());
    }

    #[test]
    fn url_mentioning_403_is_not_access_denied() {
        let err = ScrapeError::NavigationTimeout {
            url: "https://shop403.example.com/forbidden-fruit".to_owned(),
            attempts: 1,
        };
        assert!(!err.is_access_denied());
        let err = ScrapeError::Navigation {
            url: "https://shop403.example.com/".to_owned(),
            reason: "connection reset".to_owned(),
        };
        assert!(!err.is_access_denied());
    }

    #[test]
    fn forbidden_reason_is_detected() {
        let err = ScrapeError::Navigation {
            url: "https://x.com".to_owned(),
            reason: "Forbidden".to_owned(),
        };
        assert!(err.is_access_denied());
    }

    #[test]
    fn server_errors_and_timeouts_are_transient() {
        assert!(ScrapeError::UnexpectedStatus {
            status: 502,
            url: "https://x.com".to_owned()
        }
        .is_transient_navigation());
        assert!(ScrapeError::NavigationTimeout {
            url: "https://x.com".to_owned(),
            attempts: 1
        }
        .is_transient_navigation());
        assert!(!ScrapeError::AccessDenied {
            url: "https://x.com".to_owned(),
            status: 403
        }
        .is_transient_navigation());
    }
}
