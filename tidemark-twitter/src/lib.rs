//! Access to the Twitter-style v1.1 search API.
//!
//! - [`TwitterCredentials`]: the four-field JSON credential descriptor
//! - [`oauth`]: OAuth 1.0a HMAC-SHA1 request signing
//! - [`TwitterApi`]: the authenticated handle issuing signed page requests
//! - [`search_domain`]: backward pagination over one domain's matches
//!
//! Rate limiting is the handle's concern: with the wait flag enabled the
//! underlying HTTP client sleeps through 429 windows, so callers only see
//! slow successful pages. Pagination never propagates API errors; it logs
//! them and hands back whatever was already collected.

pub mod client;
pub mod credentials;
pub mod oauth;
pub mod search;
pub mod types;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("failed to read credentials file {path}: {source}")]
    CredentialsRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("credentials file {path} is not a valid descriptor: {source}")]
    CredentialsParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid API base URL {0}")]
    BaseUrl(String),
    #[error("malformed status in search response: {0}")]
    MalformedStatus(String),
    #[error(transparent)]
    Http(#[from] tidemark_http::HttpError),
}

pub use client::{TwitterApi, SEARCH_PAGE_SIZE};
pub use credentials::TwitterCredentials;
pub use search::search_domain;
pub use types::Post;
