//! Tests for the REST call collaborator.

use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RestClient {
    RestClient::new(server.uri())
        .with_header("X-Project", "demo")
        .with_header("Content-Type", "application/json")
        .with_retry(RetryConfig::no_retry())
}

#[test]
fn test_flatten_nested_params() {
    let flat = flatten(&json!({
        "name": "Ada",
        "meta": {"tags": ["a", "b"], "active": true, "score": 3}
    }));

    assert!(flat.contains(&("name".to_string(), "Ada".to_string())));
    assert!(flat.contains(&("meta[tags][0]".to_string(), "a".to_string())));
    assert!(flat.contains(&("meta[tags][1]".to_string(), "b".to_string())));
    assert!(flat.contains(&("meta[active]".to_string(), "true".to_string())));
    assert!(flat.contains(&("meta[score]".to_string(), "3".to_string())));
    assert_eq!(flat.len(), 5);
}

#[test]
fn test_flatten_scalar_root_is_empty() {
    assert!(flatten(&json!("x")).is_empty());
    assert!(flatten(&Value::Null).is_empty());
}

#[test]
fn test_validate_endpoint() {
    assert!(validate_endpoint("https://cloud.example.com/v1").is_ok());
    assert!(validate_endpoint("ftp://files.example.com").is_err());
}

#[tokio::test]
async fn test_json_body_and_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("X-Project", "demo"))
        .and(body_json(json!({"userId": "u1", "email": "a@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"$id": "u1"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server)
        .call(
            Method::POST,
            "/users",
            &[],
            &json!({"userId": "u1", "email": "a@example.com"}),
        )
        .await
        .unwrap();

    assert_eq!(body["$id"], "u1");
}

#[tokio::test]
async fn test_get_sends_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("queries[0]", "limit(1)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server)
        .call(Method::GET, "/users", &[], &json!({"queries": ["limit(1)"]}))
        .await
        .unwrap();

    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_form_encoding_when_not_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/form"))
        .and(body_string_contains("a%5Bb%5D=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server)
        .call(
            Method::POST,
            "/form",
            &[("Content-Type", "application/x-www-form-urlencoded")],
            &json!({"a": {"b": 1}}),
        )
        .await
        .unwrap();

    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_absolute_path_bypasses_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .expect(1)
        .mount(&server)
        .await;

    let rest = RestClient::new("http://unused.invalid").with_retry(RetryConfig::no_retry());
    let url = format!("{}/health", server.uri());
    let body = rest.call(Method::GET, &url, &[], &json!({})).await.unwrap();

    assert_eq!(body, json!("up"));
}

#[tokio::test]
async fn test_status_over_400_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "User already exists"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .call(Method::POST, "/users", &[], &json!({}))
        .await
        .unwrap_err();

    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 409);
            assert!(body.contains("User already exists"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_service_unavailable_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let rest = RestClient::new(server.uri()).with_retry(RetryConfig {
        max_retries: 2,
        initial_delay: std::time::Duration::from_millis(1),
        add_jitter: false,
        ..Default::default()
    });
    let body = rest
        .call(Method::GET, "/flaky", &[], &json!({}))
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
}
