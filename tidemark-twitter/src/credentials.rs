//! The credential descriptor: one JSON object, four strings.
//!
//! There is no fallback credential and no partial acceptance. A run that
//! cannot load all four fields stops before touching the network.

use serde::Deserialize;
use std::path::Path;

use crate::TwitterError;

/// OAuth 1.0a credential set for one API account.
///
/// Deliberately not `Debug`: instances hold live secrets and must never
/// end up in log output wholesale.
#[derive(Clone, Deserialize)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl TwitterCredentials {
    /// Read and parse the descriptor file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TwitterError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| TwitterError::CredentialsRead {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&text).map_err(|source| TwitterError::CredentialsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
