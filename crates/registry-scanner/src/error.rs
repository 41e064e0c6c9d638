use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] registry_core::ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] registry_client::ClientError),

    #[error("Login error: {0}")]
    Auth(#[from] registry_auth::AuthError),

    #[error("Browser error: {0}")]
    Browser(#[from] registry_browser::BrowserError),

    #[error("Storage error: {0}")]
    Store(#[from] registry_store::StoreError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
