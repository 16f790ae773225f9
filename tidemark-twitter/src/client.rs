//! Authenticated client for the v1.1 search endpoint.

use std::borrow::Cow;
use std::time::Duration;

use tidemark_http::{HttpClient, RequestOpts};
use url::Url;

use crate::credentials::TwitterCredentials;
use crate::oauth;
use crate::types::SearchPage;
use crate::TwitterError;

/// Statuses requested per page, the endpoint maximum.
pub const SEARCH_PAGE_SIZE: u32 = 100;

const SEARCH_PATH: &str = "1.1/search/tweets.json";

/// Search API handle. Holds the signing credentials and the transport.
pub struct TwitterApi {
    http: HttpClient,
    credentials: TwitterCredentials,
    /// Absolute endpoint URL without query string, as covered by the
    /// OAuth signature. Must match what the transport sends, so it is
    /// derived from the same base URL.
    search_url: String,
}

impl TwitterApi {
    pub fn new(base_url: &str, credentials: TwitterCredentials) -> Result<Self, TwitterError> {
        let base = Url::parse(base_url).map_err(|e| TwitterError::BaseUrl(e.to_string()))?;
        let search_url = base
            .join(SEARCH_PATH)
            .map_err(|e| TwitterError::BaseUrl(e.to_string()))?
            .to_string();
        let http = HttpClient::new(base_url)?;
        Ok(Self {
            http,
            credentials,
            search_url,
        })
    }

    /// Sleep through 429 responses instead of surfacing them.
    pub fn with_rate_limit_wait(mut self, wait: bool) -> Self {
        self.http = self.http.with_rate_limit_wait(wait);
        self
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.http = self.http.with_timeout(dur);
        self
    }

    /// Fetch one page of search results for `query`.
    ///
    /// `max_id` and `since_id` are inclusive bounds on status ids; each
    /// is sent only when present. Pages are never retried on API errors,
    /// so a failure surfaces to the caller with at most one request on
    /// the wire (rate-limit waits excepted).
    pub async fn search_page(
        &self,
        query: &str,
        max_id: Option<i64>,
        since_id: Option<i64>,
    ) -> Result<SearchPage, TwitterError> {
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("q", Cow::Borrowed(query)),
            ("count", Cow::Owned(SEARCH_PAGE_SIZE.to_string())),
        ];
        if let Some(max_id) = max_id {
            params.push(("max_id", Cow::Owned(max_id.to_string())));
        }
        if let Some(since_id) = since_id {
            params.push(("since_id", Cow::Owned(since_id.to_string())));
        }

        let authorization =
            oauth::authorization_header("GET", &self.search_url, &params, &self.credentials);

        tracing::debug!(
            query = %query,
            max_id = ?max_id,
            since_id = ?since_id,
            "twitter.search.page"
        );

        let page: SearchPage = self
            .http
            .get_json(
                SEARCH_PATH,
                RequestOpts {
                    retries: Some(0),
                    authorization: Some(&authorization),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await?;
        Ok(page)
    }
}
