use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tidemark_http::{HttpClient, HttpError, RequestOpts};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Responds 429 for the first `limited` hits, then 200 with a JSON body.
struct RateLimitedThenOk {
    hits: Arc<AtomicUsize>,
    limited: usize,
}

impl Respond for RateLimitedThenOk {
    fn respond(&self, _req: &Request) -> ResponseTemplate {
        if self.hits.fetch_add(1, Ordering::SeqCst) < self.limited {
            ResponseTemplate::new(429)
                .insert_header("x-rate-limit-remaining", "0")
                .insert_header("retry-after", "0")
                .set_body_json(json!({
                    "errors": [{"code": 88, "message": "Rate limit exceeded"}]
                }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
        }
    }
}

#[tokio::test]
async fn rate_limit_wait_blocks_then_succeeds() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(RateLimitedThenOk {
            hits: hits.clone(),
            limited: 1,
        })
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri())
        .unwrap()
        .with_retries(0)
        .with_rate_limit_wait(true);

    let got: Value = client
        .get_json("status", RequestOpts::default())
        .await
        .expect("the wait should absorb the 429");

    assert_eq!(got, json!({"ok": true}));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limit_without_wait_surfaces_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"errors": [{"code": 88, "message": "Rate limit exceeded"}]})),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();

    let err = client
        .get_json::<Value>(
            "status",
            RequestOpts {
                retries: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    match err {
        HttpError::Api { status, message, .. } => {
            assert_eq!(status.as_u16(), 429);
            assert_eq!(message, "Rate limit exceeded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_exhaust_retries_then_surface() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));

    struct CountingServerError(Arc<AtomicUsize>);
    impl Respond for CountingServerError {
        fn respond(&self, _req: &Request) -> ResponseTemplate {
            self.0.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(500).set_body_json(json!({"message": "internal"}))
        }
    }

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(CountingServerError(hits.clone()))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();

    let err = client
        .get_json::<Value>(
            "status",
            RequestOpts {
                retries: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Api { status, .. } if status.as_u16() == 500));
    // Initial request plus one retry.
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn query_params_and_authorization_reach_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/search/tweets.json"))
        .and(query_param("q", "example.com"))
        .and(query_param("count", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statuses": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();

    let _: Value = client
        .get_json(
            "1.1/search/tweets.json",
            RequestOpts {
                authorization: Some("OAuth oauth_consumer_key=\"k\""),
                query: Some(vec![
                    ("q", "example.com".into()),
                    ("count", "100".into()),
                ]),
                ..Default::default()
            },
        )
        .await
        .expect("matched mock responds");

    let requests = server.received_requests().await.expect("recording enabled");
    let auth = requests[0]
        .headers
        .get("authorization")
        .expect("authorization header present");
    assert!(auth.to_str().unwrap().starts_with("OAuth "));
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();

    let err = client
        .get_json::<Value>("status", RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Decode(_, snippet) => assert_eq!(snippet, "not json"),
        other => panic!("expected Decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn long_non_ascii_bodies_decode_intact() {
    let server = MockServer::start().await;

    // 503 bytes of valid JSON with a two-byte character straddling the
    // 500-byte snippet cut.
    let body = format!("{}{}{}", r#"{"text":""#, "x".repeat(490), "é\"}");
    assert_eq!(body.len(), 503);
    assert!(!body.is_char_boundary(500));

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();

    let got: Value = client
        .get_json("status", RequestOpts::default())
        .await
        .expect("long non-ascii bodies must decode");

    assert_eq!(got["text"].as_str().unwrap().chars().last(), Some('é'));
}
