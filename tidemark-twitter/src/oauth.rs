//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! The v1.1 endpoints authenticate every request with a signed
//! `Authorization: OAuth ...` header. The signature covers the HTTP
//! method, the request URL without its query string, and every
//! parameter (oauth protocol parameters and query parameters alike),
//! percent-encoded and sorted. Getting any of that wrong produces 401s
//! that look like credential problems, which is why the encoding rules
//! live here in one place with known-answer tests.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::credentials::TwitterCredentials;

type HmacSha1 = Hmac<Sha1>;

/// Build the `Authorization` header value for one request.
///
/// `url` is the absolute request URL without a query string; `query` is
/// every query parameter the request will carry, exactly as sent.
pub fn authorization_header(
    method: &str,
    url: &str,
    query: &[(&str, Cow<'_, str>)],
    credentials: &TwitterCredentials,
) -> String {
    let nonce = hex::encode(rand::random::<[u8; 16]>());
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string();
    header_with(method, url, query, credentials, &nonce, &timestamp)
}

fn header_with(
    method: &str,
    url: &str,
    query: &[(&str, Cow<'_, str>)],
    credentials: &TwitterCredentials,
    nonce: &str,
    timestamp: &str,
) -> String {
    let oauth_params: [(&str, &str); 6] = [
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    // Signature parameters: oauth params plus the query, encoded first,
    // then sorted by encoded name and value.
    let mut pairs: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            query
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v.as_ref()))),
        )
        .collect();
    pairs.sort();

    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    );

    let signing_key = format!(
        "{}&{}",
        percent_encode(&credentials.consumer_secret),
        percent_encode(&credentials.access_token_secret)
    );

    let signature = sign(&base_string, &signing_key);

    let header_params = [
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature", signature.as_str()),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let rendered = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {rendered}")
}

fn sign(base_string: &str, signing_key: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base_string.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Percent-encode per RFC 3986: only `A-Z a-z 0-9 - . _ ~` pass through.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> TwitterCredentials {
        TwitterCredentials {
            consumer_key: "ck-test".to_string(),
            consumer_secret: "cs-secret".to_string(),
            access_token: "at-test".to_string(),
            access_token_secret: "ats-secret".to_string(),
        }
    }

    #[test]
    fn encodes_only_the_unreserved_set() {
        assert_eq!(
            percent_encode("ABCxyz019-._~"),
            "ABCxyz019-._~"
        );
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("a/b?c=d&e"), "a%2Fb%3Fc%3Dd%26e");
        assert_eq!(percent_encode("100%!"), "100%25%21");
        // Multi-byte UTF-8 encodes per byte.
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    // Expected value computed independently with Python's hmac/hashlib
    // over the same base string construction.
    #[test]
    fn known_answer_signature() {
        let query: Vec<(&str, Cow<'_, str>)> = vec![
            ("q", "example.com".into()),
            ("count", "100".into()),
            ("max_id", "987654320".into()),
        ];

        let header = header_with(
            "GET",
            "https://api.twitter.com/1.1/search/tweets.json",
            &query,
            &test_credentials(),
            "0123456789abcdef0123456789abcdef",
            "1700000000",
        );

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"kmyYwyoZn2mYdrWgBdbxOvOad9U%3D\""));
    }

    #[test]
    fn header_carries_all_protocol_params() {
        let header = header_with(
            "GET",
            "https://api.twitter.com/1.1/search/tweets.json",
            &[],
            &test_credentials(),
            "fixednonce",
            "1700000000",
        );

        for key in [
            "oauth_consumer_key=\"ck-test\"",
            "oauth_nonce=\"fixednonce\"",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"1700000000\"",
            "oauth_token=\"at-test\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=\"",
        ] {
            assert!(header.contains(key), "missing {key} in {header}");
        }
        // Query params only influence the signature; they never appear in
        // the header itself.
        assert!(!header.contains("q="));
    }

    #[test]
    fn query_values_change_the_signature() {
        let creds = test_credentials();
        let a: Vec<(&str, Cow<'_, str>)> = vec![("q", "one.example".into())];
        let b: Vec<(&str, Cow<'_, str>)> = vec![("q", "two.example".into())];

        let url = "https://api.twitter.com/1.1/search/tweets.json";
        let sig_a = header_with("GET", url, &a, &creds, "n", "1");
        let sig_b = header_with("GET", url, &b, &creds, "n", "1");
        assert_ne!(sig_a, sig_b);
    }

    #[test]
    fn nonces_are_fresh_per_call() {
        let creds = test_credentials();
        let h1 = authorization_header("GET", "https://api.twitter.com/x", &[], &creds);
        let h2 = authorization_header("GET", "https://api.twitter.com/x", &[], &creds);
        assert_ne!(h1, h2);
    }
}
