use crate::client::providers::ProviderError;
use std::time::Duration;
use thiserror::Error;

/// Crate-level error type.
///
/// Source adapters report [`ProviderError`]; the aggregation engine never lets
/// those reach its callers. What callers can see are configuration problems and
/// rejected input.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// An adapter could not be set up
    #[error("Provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Other(msg) => Self::Provider(msg),
            other => Self::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = Error::invalid_input("maxResults", "must be between 1 and 100");
        assert_eq!(
            err.to_string(),
            "Invalid input: maxResults - must be between 1 and 100"
        );
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: Error = ProviderError::Other("Invalid proxy URL".to_string()).into();
        assert_eq!(err.to_string(), "Provider error: Invalid proxy URL");

        let err: Error = ProviderError::Network("refused".to_string()).into();
        assert!(matches!(err, Error::Provider(ref msg) if msg == "Network error: refused"));
    }
}
