//! The platform's `{"errno": 0, "errmsg": "...", "data": ...}` response wrapper.

use crate::error::{ClientError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Errno values with a specific meaning; anything else non-zero is a generic failure.
const ERRNO_PERMISSION: [i64; 2] = [403, 1003];
const ERRNO_NOT_FOUND: [i64; 2] = [404, 1004];

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub errno: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Decode a response body.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| ClientError::DataFetch(format!("response is not a JSON envelope: {e}")))
    }

    /// The payload, or the typed failure the errno stands for.
    ///
    /// `subject` names what was requested and ends up in the error message.
    pub fn into_data(self, subject: &str) -> Result<Value> {
        if self.errno == 0 {
            return Ok(self.data);
        }
        let message = format!(
            "{subject}: errno {} {}",
            self.errno,
            self.errmsg.unwrap_or_default()
        )
        .trim_end()
        .to_string();

        Err(if ERRNO_NOT_FOUND.contains(&self.errno) {
            ClientError::CompanyNotFound(message)
        } else if ERRNO_PERMISSION.contains(&self.errno) {
            ClientError::Permission(message)
        } else {
            ClientError::DataFetch(message)
        })
    }
}
