//! Error types and handling for the campaign builder.
//!
//! Errors are grouped the way the build wizard needs to react to them:
//!
//! - **Validation**: a local precondition failed (missing field, budget or bid
//!   below the minimum, malformed dayparting). Never reaches the remote API.
//! - **Remote rejection**: the platform answered with a non-success envelope.
//!   The remote message is surfaced verbatim.
//! - **Transport**: network failure, or a non-2xx HTTP status. Network errors,
//!   429, 5xx and the platform's throttling codes are retryable.
//! - **Limits**: media caps and batch caps.
//! - **State**: a stage was invoked before its prerequisite identifier existed.
//!
//! No error is fatal to a [`BuildSession`](crate::session::BuildSession): the
//! session keeps its last successful state and the caller may retry the stage.
//!
//! ## Usage
//!
//! ```rust
//! use campaign_builder_rs::CampaignError;
//! use campaign_builder_rs::error::ErrorSeverity;
//!
//! fn report(error: &CampaignError) -> String {
//!     match error.severity() {
//!         ErrorSeverity::Warning => format!("try again: {}", error.user_message()),
//!         _ => error.user_message(),
//!     }
//! }
//! ```

use std::fmt;

/// Result type alias for campaign builder operations.
pub type Result<T> = std::result::Result<T, CampaignError>;

/// Error type for every campaign builder operation.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    /// Local precondition failed. `ad_position` is 1-based when the failure
    /// belongs to a specific ad draft.
    #[error("{}", validation_text(.field, .ad_position, .reason))]
    Validation {
        field: String,
        ad_position: Option<usize>,
        reason: String,
    },

    /// The platform returned a non-success envelope, or a response whose shape
    /// could not be normalized.
    #[error("Remote API rejected request [{code}]: {message}")]
    RemoteRejected { code: i64, message: String },

    /// HTTP-layer failure without a structured remote message.
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Network errors raised by the HTTP client.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A cap was hit (creatives per ad, ads per batch).
    #[error("Limit exceeded: at most {limit} {what}")]
    LimitExceeded { what: String, limit: usize },

    /// A stage was invoked out of order.
    #[error("Invalid build state: expected {expected}, session is at {actual}")]
    InvalidState { expected: String, actual: String },

    /// A media entry with the same id and account already exists in the cache.
    #[error("Media {media_id} is already cached")]
    DuplicateMedia { media_id: String },

    #[error("Build session not found: {token}")]
    SessionNotFound { token: String },

    /// Configuration errors (not retryable)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON processing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors for wrapping other error types
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn validation_text(field: &str, ad_position: &Option<usize>, reason: &str) -> String {
    match ad_position {
        Some(position) => format!("Ad #{position}: {field} {reason}"),
        None => format!("{field} {reason}"),
    }
}

impl CampaignError {
    /// Determines if an error may be retried automatically.
    ///
    /// The HTTP client consults this for read requests only: creation calls
    /// are never idempotent on the remote platform.
    pub fn is_retryable(&self) -> bool {
        match self {
            CampaignError::Network(_) | CampaignError::Transport { .. } => true,
            CampaignError::Http { status, .. } => *status == 429 || *status >= 500,
            // Platform-side throttling and internal errors
            CampaignError::RemoteRejected { code, .. } => matches!(code, 40100 | 50000 | 51021),
            _ => false,
        }
    }

    /// Gets the severity level of the error for logging purposes.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CampaignError::Network(_)
            | CampaignError::Transport { .. }
            | CampaignError::Http { .. }
            | CampaignError::Validation { .. }
            | CampaignError::LimitExceeded { .. }
            | CampaignError::DuplicateMedia { .. } => ErrorSeverity::Warning,

            CampaignError::RemoteRejected { code, .. } => match code {
                // Access token invalid or advertiser not authorized
                40001 | 40002 | 40105 => ErrorSeverity::Critical,
                _ => ErrorSeverity::Error,
            },

            CampaignError::Config { .. } => ErrorSeverity::Critical,

            CampaignError::InvalidState { .. }
            | CampaignError::SessionNotFound { .. }
            | CampaignError::Json(_)
            | CampaignError::Io(_)
            | CampaignError::Internal(_) => ErrorSeverity::Error,
        }
    }

    /// Text suitable for the operator: the remote message verbatim when one
    /// exists, generic text for transport failures.
    pub fn user_message(&self) -> String {
        match self {
            CampaignError::RemoteRejected { message, .. } if !message.is_empty() => {
                message.clone()
            }
            CampaignError::RemoteRejected { code, .. } => {
                format!("The advertising platform rejected the request (code {code})")
            }
            CampaignError::Network(_)
            | CampaignError::Transport { .. }
            | CampaignError::Http { .. } => {
                "Could not reach the advertising platform, please try again".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Creates a remote rejection from response data.
    pub fn from_api_response(code: i64, message: impl Into<String>) -> Self {
        CampaignError::RemoteRejected {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error for a session-level field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CampaignError::Validation {
            field: field.into(),
            ad_position: None,
            reason: reason.into(),
        }
    }

    /// Creates a validation error for a field of the ad at `position` (1-based).
    pub fn ad_validation(
        position: usize,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CampaignError::Validation {
            field: field.into(),
            ad_position: Some(position),
            reason: reason.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        CampaignError::Transport {
            message: message.into(),
        }
    }

    /// Creates a limit error.
    pub fn limit(what: impl Into<String>, limit: usize) -> Self {
        CampaignError::LimitExceeded {
            what: what.into(),
            limit,
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        CampaignError::Config {
            message: message.into(),
        }
    }

    /// True when the platform answered, but not with a success envelope.
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, CampaignError::RemoteRejected { .. })
    }
}

/// Error severity levels for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Recoverable by the operator (fix input, retry)
    Warning,
    /// Standard errors that affect specific operations
    Error,
    /// Misconfiguration or revoked credentials
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryability() {
        assert!(CampaignError::transport("connection reset").is_retryable());

        let validation = CampaignError::validation("budget", "is below the minimum of 20");
        assert!(!validation.is_retryable());

        let throttled = CampaignError::from_api_response(51021, "too many requests");
        assert!(throttled.is_retryable());

        let rejected = CampaignError::from_api_response(40002, "invalid param");
        assert!(!rejected.is_retryable());

        let http = |status| CampaignError::Http {
            status,
            message: String::new(),
        };
        assert!(http(429).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!http(404).is_retryable());
    }

    #[test]
    fn test_error_severity() {
        assert_eq!(
            CampaignError::transport("timeout").severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            CampaignError::config_error("missing access token").severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            CampaignError::from_api_response(40100, "rate limited").severity(),
            ErrorSeverity::Error
        );
    }

    #[test]
    fn test_validation_display_includes_position() {
        let err = CampaignError::ad_validation(2, "destination_url", "is required");
        assert_eq!(err.to_string(), "Ad #2: destination_url is required");

        let err = CampaignError::validation("name", "is required");
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_user_message() {
        let remote = CampaignError::from_api_response(40002, "Budget is too low");
        assert_eq!(remote.user_message(), "Budget is too low");

        let empty = CampaignError::from_api_response(40002, "");
        assert!(empty.user_message().contains("40002"));

        let transport = CampaignError::transport("dns error");
        assert!(!transport.user_message().contains("dns"));
    }
}
