//! Wire shapes for the v1.1 search endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::TwitterError;

/// `created_at` as the v1.1 API renders it, e.g.
/// `Wed Oct 10 20:19:24 +0000 2018`.
pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// One page of `/1.1/search/tweets.json`.
///
/// Statuses stay as raw JSON values here; [`Post::from_status`] pulls
/// out the handful of fields we key on and keeps the rest verbatim.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub statuses: Vec<Value>,
    #[serde(default)]
    pub search_metadata: Option<SearchMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct SearchMetadata {
    #[serde(default)]
    pub completed_in: Option<f64>,
    #[serde(default)]
    pub count: Option<u32>,
}

/// A single matched status, parsed just far enough to paginate and
/// report on it.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    raw: Value,
}

impl Post {
    /// Lift a raw status object into a [`Post`].
    ///
    /// Requires a numeric `id` and a parseable `created_at`; anything
    /// else about the object is preserved untouched in [`Post::raw_json`].
    pub fn from_status(status: Value) -> Result<Self, TwitterError> {
        let id = status
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| TwitterError::MalformedStatus("missing numeric id".to_string()))?;

        let created_raw = status
            .get("created_at")
            .and_then(Value::as_str)
            .ok_or_else(|| TwitterError::MalformedStatus("missing created_at".to_string()))?;

        let created_at = DateTime::parse_from_str(created_raw, CREATED_AT_FORMAT)
            .map_err(|err| {
                TwitterError::MalformedStatus(format!("bad created_at {created_raw:?}: {err}"))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            created_at,
            raw: status,
        })
    }

    /// The full status object as one line of JSON.
    pub fn raw_json(&self) -> String {
        self.raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_plain_status() {
        let post = Post::from_status(json!({
            "id": 1050118621198921728i64,
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "text": "hello",
        }))
        .unwrap();

        assert_eq!(post.id, 1050118621198921728);
        assert_eq!(post.created_at.to_rfc3339(), "2018-10-10T20:19:24+00:00");
        assert!(post.raw_json().contains("\"text\":\"hello\""));
    }

    #[test]
    fn missing_id_is_malformed() {
        let err = Post::from_status(json!({
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("missing numeric id"));
    }

    #[test]
    fn garbled_created_at_is_malformed() {
        let err = Post::from_status(json!({
            "id": 7,
            "created_at": "sometime last week",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("bad created_at"));
    }

    #[test]
    fn page_tolerates_missing_metadata() {
        let page: SearchPage = serde_json::from_value(json!({
            "statuses": [],
        }))
        .unwrap();
        assert!(page.statuses.is_empty());
        assert!(page.search_metadata.is_none());
    }
}
