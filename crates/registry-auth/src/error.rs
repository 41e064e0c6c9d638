use registry_browser::BrowserError;
use std::time::Duration;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login surface could not be driven
    #[error("login failed: {0}")]
    Login(String),

    /// The challenge was not completed within the login timeout
    #[error("login not completed within {0:?}")]
    LoginTimeout(Duration),

    /// A captcha stayed on screen past its own timeout
    #[error("captcha not cleared within {0:?}")]
    Captcha(Duration),

    /// A supplied cookie set did not yield a logged-in session
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// The selected mode needs a credential that was not supplied
    #[error("{mode} login requires {field}")]
    MissingCredential {
        /// Login mode
        mode: &'static str,
        /// Missing credential
        field: &'static str,
    },

    /// Browser failure underneath the login flow
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::MissingCredential {
            mode: "phone",
            field: "a phone number",
        };
        assert_eq!(err.to_string(), "phone login requires a phone number");

        let err = AuthError::LoginTimeout(Duration::from_secs(180));
        assert_eq!(err.to_string(), "login not completed within 180s");
    }

    #[test]
    fn test_browser_error_is_transparent() {
        let err: AuthError = BrowserError::SelectorNotFound(".phone-input".to_string()).into();
        assert_eq!(err.to_string(), "selector not found: .phone-input");
    }
}
