use registry_browser::BrowserError;
use std::time::Duration;
use thiserror::Error;

/// Failures of a platform call.
///
/// Transport-level trouble (`Network`, `RateLimited`, `Timeout`) is retried;
/// everything else describes the response itself and is not.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("data fetch error: {0}")]
    DataFetch(String),

    #[error("company not found: {0}")]
    CompanyNotFound(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("rate limited{}", .retry_after.map(|d| format!(", retry after {d:?}")).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    #[error("captcha required: {0}")]
    Captcha(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimited { .. } | Self::Timeout(_)
        )
    }

    /// Whether the failure is a rate limit.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::DataFetch(format!("undecodable response body: {err}"))
        } else {
            Self::Network {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_taxonomy() {
        assert!(ClientError::Network {
            status: Some(502),
            message: "bad gateway".to_string()
        }
        .is_retryable());
        assert!(ClientError::RateLimited { retry_after: None }.is_retryable());
        assert!(ClientError::Timeout("10s".to_string()).is_retryable());

        assert!(!ClientError::DataFetch("errno 1".to_string()).is_retryable());
        assert!(!ClientError::CompanyNotFound("1".to_string()).is_retryable());
        assert!(!ClientError::Permission("vip only".to_string()).is_retryable());
        assert!(!ClientError::Captcha("slider".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Network {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "network error (HTTP 502): bad gateway");

        let err = ClientError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 30s");
    }
}
