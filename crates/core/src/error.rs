//! Error types for the neo domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all neo operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of a single upstream exchange.
///
/// Every variant is terminal for the exchange: transient statuses are retried
/// inside the provider before one of these surfaces.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not extract reply from response: {0}")]
    Extraction(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Statuses that earn the single retry: rate limiting and server errors.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    /// The upstream status code, when the failure came with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel I/O failed: {0}")]
    Io(String),

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Channel not supported: {0}")]
    NotSupported(String),
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "upstream overloaded".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("upstream overloaded"));
    }

    #[test]
    fn retryable_statuses() {
        assert!(ProviderError::is_retryable_status(429));
        assert!(ProviderError::is_retryable_status(500));
        assert!(ProviderError::is_retryable_status(503));
        assert!(ProviderError::is_retryable_status(599));
        assert!(!ProviderError::is_retryable_status(400));
        assert!(!ProviderError::is_retryable_status(401));
        assert!(!ProviderError::is_retryable_status(404));
        assert!(!ProviderError::is_retryable_status(200));
    }

    #[test]
    fn status_code_only_for_api_errors() {
        let api = ProviderError::ApiError {
            status_code: 429,
            message: String::new(),
        };
        assert_eq!(api.status_code(), Some(429));
        assert_eq!(ProviderError::Timeout("120s".into()).status_code(), None);
    }

    #[test]
    fn extraction_error_is_distinct_from_transport() {
        let err = ProviderError::Extraction("no content field".into());
        assert!(err.to_string().contains("extract"));
        assert!(!matches!(err, ProviderError::Network(_)));
    }
}
