//! End-to-end tests of the executor over the standard transport.

use networking::request::SendAs;
use networking::{HttpClient, Params, ReadAs, RequestError, RequestOptions, RequestState};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

#[tokio::test]
async fn test_get_folds_payload_into_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let url = format!("{}/users", server.uri());
    let response = client
        .get(&url, params(json!({"page": 2, "role": ["admin", "auditor"], "q": null})), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.body().as_text(), Some("ok"));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), Some("page=2&role=admin&role=auditor"));
    assert!(received[0].body.is_empty());
}

#[tokio::test]
async fn test_post_json_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/roles"))
        .and(header("content-type", "application/json;charset=utf-8"))
        .and(header("x-tenant", "acme"))
        .and(body_string(r#"{"name":"auditor","members":[1,2]}"#))
        .respond_with(ResponseTemplate::new(201).insert_header("x-request-id", "r-42"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let options = RequestOptions::new()
        .send_as(SendAs::Json)
        .header("X-Tenant", "acme")
        .header("X-Empty", "");
    let response = client
        .post(
            &format!("{}/roles", server.uri()),
            params(json!({"name": "auditor", "members": [1, 2]})),
            options,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert_eq!(response.get_response_header("X-Request-Id"), Some("r-42"));

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("x-empty").is_none());
}

#[tokio::test]
async fn test_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("content-type", "application/x-www-form-urlencoded;charset=utf-8"))
        .and(body_string("a=1&b=x+y"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client
        .put(&server.uri(), params(json!({"a": 1, "b": "x y"})), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_large_integers_survive_json_parsing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"id": 9007199254740993, "nested": [123456789012345678901234]}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client
        .get(&server.uri(), (), RequestOptions::new().read_as(ReadAs::Json))
        .await
        .unwrap();

    let body = response.body().as_json().unwrap();
    assert_eq!(body["id"].to_string(), "9007199254740993");
    assert_eq!(body["nested"][0].to_string(), "123456789012345678901234");
}

#[tokio::test]
async fn test_server_errors_resolve_but_502_rejects() {
    let server = MockServer::start().await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;
    Mock::given(path("/gateway"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();

    let response = client
        .get(&format!("{}/missing", server.uri()), (), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let err = client
        .get(&format!("{}/gateway", server.uri()), (), RequestOptions::new().read_as(ReadAs::Json))
        .await
        .unwrap_err();
    match err {
        RequestError::GatewayUnavailable { status, body, .. } => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let err = client
        .get(&server.uri(), (), RequestOptions::new().timeout(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_zero_timeout_waits_for_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("late").set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client
        .get(&server.uri(), (), RequestOptions::new().timeout(Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(response.body().as_text(), Some("late"));
}

#[tokio::test]
async fn test_abort_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let pending = client.get(&server.uri(), (), RequestOptions::new());
    let handle = pending.abort_handle();

    let waiter = tokio::spawn(pending);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();

    let result = waiter.await.unwrap();
    assert!(result.unwrap_err().is_aborted());
    assert_eq!(handle.state(), RequestState::Rejected(networking::client::Rejection::Aborted));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = HttpClient::new().unwrap();
    let err = client.get(&uri, (), RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, RequestError::Transport(_)), "{err}");
}
