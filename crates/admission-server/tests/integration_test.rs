mod common;

use axum::{
    body::Body,
    http::{self, Request, Response, header},
};
use common::app;
use http_body_util::BodyExt;
use rstest::*;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn validate_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .uri("/validate")
        .body(body.into())
        .unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

async fn admission_response(response: Response<Body>) -> Value {
    let review: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(review["kind"], json!("AdmissionReview"));
    assert_eq!(review["apiVersion"], json!("admission.k8s.io/v1"));
    review["response"].clone()
}

#[tokio::test]
async fn test_allowed_request() {
    let app = app().await;

    let response = app
        .oneshot(validate_request(include_str!("data/httproute_valid.json")))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(
        admission_response(response).await,
        json!({
            "uid": "0f5c3a6e-2d34-4bd1-9c1c-3c5b0b2f6e01",
            "allowed": true,
            "status": {}
        })
    );
}

#[tokio::test]
async fn test_denied_request_lists_every_error() {
    let app = app().await;

    let response = app
        .oneshot(validate_request(include_str!(
            "data/httproute_duplicate_filters.json"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let response = admission_response(response).await;
    assert_eq!(response["uid"], json!("7b8ac0c5-4b2f-4a4c-8a52-0d5e3f0a9c11"));
    assert_eq!(response["allowed"], json!(false));
    assert_eq!(response["status"]["code"], json!(400));
    assert_eq!(
        response["status"]["message"],
        json!(
            "spec.rules[0].filters: Invalid value: \"RequestHeaderModifier\": cannot be used multiple times in the same rule\n\
             spec.rules[0].filters: Invalid value: \"RequestMirror\": cannot be used multiple times in the same rule"
        )
    );
}

#[tokio::test]
async fn test_gateway_hostname_is_an_ip_address() {
    let app = app().await;

    let response = app
        .oneshot(validate_request(include_str!("data/gateway_ip_hostname.json")))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let response = admission_response(response).await;
    assert_eq!(response["allowed"], json!(false));
    assert_eq!(
        response["status"]["message"],
        json!(
            "spec.listeners[0].hostname: Invalid value: \"1.2.3.4\": must be a DNS hostname, not an IP address"
        )
    );
}

#[tokio::test]
async fn test_gateway_class_controller_is_immutable() {
    let app = app().await;

    let response = app
        .oneshot(validate_request(include_str!(
            "data/gatewayclass_controller_update.json"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let response = admission_response(response).await;
    assert_eq!(response["allowed"], json!(false));
    assert_eq!(
        response["status"]["message"],
        json!("spec.controllerName: Invalid value: \"example.com/bar\": cannot update an immutable field")
    );
}

#[tokio::test]
#[rstest]
#[case::empty_body("", "admission review object is missing\n")]
#[case::wrong_kind(
    include_str!("data/wrong_kind.json"),
    "submitted object is not of kind AdmissionReview\n"
)]
#[case::missing_request(
    include_str!("data/missing_request.json"),
    "admission review request is missing\n"
)]
async fn test_bad_request(#[case] payload: &str, #[case] expected_body: &str) {
    let app = app().await;

    let response = app
        .oneshot(validate_request(payload.to_owned()))
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(body_text(response).await, expected_body);
}

#[tokio::test]
async fn test_malformed_body() {
    let app = app().await;

    let response = app
        .oneshot(validate_request(r#"{"kind": "AdmissionReview", "request": "#))
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body = body_text(response).await;
    assert!(body.ends_with('\n'));
    assert!(!body.trim_end().is_empty());
}

#[tokio::test]
async fn test_unknown_resource() {
    let app = app().await;

    let response = app
        .oneshot(validate_request(include_str!("data/unknown_resource.json")))
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(body_text(response).await, "unknown resource 'brokenroutes'\n");
}

#[tokio::test]
#[rstest]
#[case::delete("DELETE")]
#[case::connect("CONNECT")]
async fn test_operations_not_validated(#[case] operation: &str) {
    let app = app().await;

    let mut review: Value =
        serde_json::from_str(include_str!("data/unknown_resource.json")).unwrap();
    review["request"]["operation"] = json!(operation);
    review["request"]["object"] = Value::Null;

    let response = app
        .oneshot(validate_request(serde_json::to_vec(&review).unwrap()))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        admission_response(response).await,
        json!({"uid": "9a8b7c6d-5e4f-4a3b-9c2d-1e0f9a8b7c44", "allowed": true})
    );
}

#[tokio::test]
#[rstest]
#[case::get(http::Method::GET)]
#[case::put(http::Method::PUT)]
#[case::delete(http::Method::DELETE)]
async fn test_method_not_allowed(#[case] method: http::Method) {
    let app = app().await;

    let request = Request::builder()
        .method(method.clone())
        .uri("/validate")
        .body(Body::from(include_str!("data/httproute_valid.json")))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), 405);
    assert_eq!(
        body_text(response).await,
        format!("invalid method {method}, only POST requests are allowed\n")
    );
}

#[tokio::test]
async fn test_unknown_path() {
    let app = app().await;

    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/mutate")
        .body(Body::from(include_str!("data/httproute_valid.json")))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_identical_requests_get_identical_replies() {
    let app = app().await;
    let payload = include_str!("data/httproute_duplicate_filters.json");

    let first = app
        .clone()
        .oneshot(validate_request(payload))
        .await
        .unwrap();
    let second = app.oneshot(validate_request(payload)).await.unwrap();

    assert_eq!(body_bytes(first).await, body_bytes(second).await);
}

#[tokio::test]
async fn test_reply_echoes_the_request() {
    let app = app().await;
    let payload = include_str!("data/httproute_valid.json");

    let response = app.oneshot(validate_request(payload)).await.unwrap();
    let reply: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let request: Value = serde_json::from_str(payload).unwrap();

    assert_eq!(reply["request"]["uid"], request["request"]["uid"]);
    assert_eq!(reply["request"]["object"], request["request"]["object"]);
    assert_eq!(reply["response"]["uid"], request["request"]["uid"]);
}

mod lifecycle_helpers {
    use admission_server::AdmissionServer;
    use std::{net::SocketAddr, time::Duration};
    use tempfile::TempDir;
    use tokio::{sync::oneshot, task::JoinHandle};
    use tower_http::metrics::in_flight_requests::InFlightRequestsCounter;

    use crate::common::default_test_config;

    pub struct RunningServer {
        pub address: SocketAddr,
        pub in_flight: InFlightRequestsCounter,
        pub shutdown: oneshot::Sender<()>,
        pub task: JoinHandle<anyhow::Result<()>>,
        _certs_dir: TempDir,
    }

    pub async fn start_server(shutdown_timeout: Duration) -> RunningServer {
        // the server config carries its own provider, the client relies on
        // the process default
        let _ = rustls::crypto::ring::default_provider().install_default();

        let certs_dir = tempfile::tempdir().unwrap();
        let mut config = default_test_config(&certs_dir);
        config.addr = SocketAddr::from(([127, 0, 0, 1], 0));
        config.shutdown_timeout = shutdown_timeout;

        let server = AdmissionServer::new_from_config(config).await.unwrap();
        let handle = server.handle();
        let in_flight = server.in_flight_requests();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = shutdown_rx.await;
            Ok(())
        }));
        let address = handle.listening().await.expect("server should be listening");

        RunningServer {
            address,
            in_flight,
            shutdown,
            task,
            _certs_dir: certs_dir,
        }
    }

    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap()
    }

    pub fn validate_url(address: SocketAddr) -> String {
        format!("https://{address}/validate")
    }

    /// Sends a review whose body never ends, the request stays in flight
    pub fn send_stalled_request(address: SocketAddr) -> JoinHandle<reqwest::Result<reqwest::Response>> {
        let body = reqwest::Body::wrap_stream(futures::stream::pending::<
            Result<Vec<u8>, std::io::Error>,
        >());
        tokio::spawn(client().post(validate_url(address)).body(body).send())
    }

    pub async fn wait_for_in_flight(counter: &InFlightRequestsCounter, expected: usize) {
        for _ in 0..250 {
            if counter.get() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {expected} requests in flight, found {}", counter.get());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_after_served_requests() {
    use lifecycle_helpers::*;

    let server = start_server(Duration::from_secs(5)).await;

    let client = client();
    let response = client
        .post(validate_url(server.address))
        .body(include_str!("data/httproute_valid.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    drop(client);

    server.shutdown.send(()).unwrap();
    let result = server.task.await.unwrap();
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_without_request_does_not_fail_shutdown() {
    use lifecycle_helpers::*;

    let server = start_server(Duration::from_secs(1)).await;

    // connected, but never starts the TLS handshake
    let _idle = tokio::net::TcpStream::connect(server.address).await.unwrap();

    server.shutdown.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("shutdown should not hang")
        .unwrap();
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_in_flight_request_completes_during_shutdown() {
    use lifecycle_helpers::*;

    let server = start_server(Duration::from_secs(10)).await;

    let body = reqwest::Body::wrap_stream(futures::stream::once(async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok::<_, std::io::Error>(include_str!("data/httproute_valid.json").as_bytes().to_vec())
    }));
    let request = tokio::spawn(client().post(validate_url(server.address)).body(body).send());
    wait_for_in_flight(&server.in_flight, 1).await;

    server.shutdown.send(()).unwrap();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    let review: Value = response.json().await.unwrap();
    assert_eq!(review["response"]["allowed"], json!(true));

    let result = server.task.await.unwrap();
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_outliving_the_shutdown_timeout_is_fatal() {
    use lifecycle_helpers::*;

    let server = start_server(Duration::from_secs(1)).await;

    let _stalled = send_stalled_request(server.address);
    wait_for_in_flight(&server.in_flight, 1).await;

    server.shutdown.send(()).unwrap();
    let error = server.task.await.unwrap().unwrap_err();
    assert_eq!(
        error.to_string(),
        "in-flight requests did not complete within 1 seconds"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requests_after_shutdown_signal_are_not_served() {
    use lifecycle_helpers::*;

    let server = start_server(Duration::from_secs(3)).await;

    // keeps the server draining
    let _stalled = send_stalled_request(server.address);
    wait_for_in_flight(&server.in_flight, 1).await;

    server.shutdown.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let late_client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let late = late_client
        .post(validate_url(server.address))
        .body(include_str!("data/httproute_valid.json"))
        .send()
        .await;
    assert!(late.is_err(), "{late:?}");
    assert_eq!(server.in_flight.get(), 1);

    assert!(server.task.await.unwrap().is_err());
}
