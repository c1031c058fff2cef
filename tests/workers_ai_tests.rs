//! Workers AI client tests against a local fake upstream
//!
//! The upstream records what it receives and answers with a fixed SSE body, or with an error
//! status for the `fail` account.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use edge_chat_relay::config::{GatewayOptions, InferenceSettings};
use edge_chat_relay::core::chat::{ChatMessage, InferenceRequest};
use edge_chat_relay::core::traits::InferenceBackend;
use edge_chat_relay::infrastructure::workers_ai::WorkersAiClient;
use futures_util::TryStreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};

const SSE_BODY: &str = "data: {\"response\":\"Hi\"}\n\ndata: [DONE]\n\n";

#[derive(Debug, Clone)]
struct Received {
    path: String,
    headers: HeaderMap,
    body: Value,
}

type Log = Arc<Mutex<Vec<Received>>>;

async fn run_model(
    State(log): State<Log>,
    Path((account, model)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    log.lock().unwrap().push(Received {
        path: format!("run {account} {model}"),
        headers,
        body,
    });

    if account == "fail" {
        return (StatusCode::BAD_REQUEST, "bad model input").into_response();
    }

    ([(header::CONTENT_TYPE, "text/event-stream")], SSE_BODY).into_response()
}

async fn run_via_gateway(
    State(log): State<Log>,
    Path((account, gateway, model)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    log.lock().unwrap().push(Received {
        path: format!("gateway {account} {gateway} {model}"),
        headers,
        body,
    });

    ([(header::CONTENT_TYPE, "text/event-stream")], SSE_BODY).into_response()
}

/// Starts the fake upstream and returns its base URL.
async fn start_upstream() -> (String, Log) {
    let log: Log = Arc::default();

    let app = Router::new()
        .route("/accounts/:account/ai/run/*model", post(run_model))
        .route("/gw/:account/:gateway/workers-ai/*model", post(run_via_gateway))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), log)
}

fn client(base_url: &str, account_id: &str, gateway: Option<GatewayOptions>) -> WorkersAiClient {
    WorkersAiClient::new(InferenceSettings {
        base_url: base_url.to_owned(),
        account_id: Some(account_id.to_owned()),
        api_token: Some("secret-token".to_owned()),
        gateway,
    })
}

fn request() -> InferenceRequest {
    InferenceRequest::streaming(vec![
        ChatMessage::system("Be brief."),
        ChatMessage::user("Hello"),
    ])
}

async fn collect(stream: edge_chat_relay::core::traits::ByteStream) -> Bytes {
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    chunks.concat().into()
}

#[tokio::test]
async fn test_run_streams_upstream_body() {
    let (base_url, log) = start_upstream().await;
    let client = client(&base_url, "acc1", None);

    let stream = client
        .run("@cf/meta/llama-3.1-8b-instruct-fp8", request())
        .await
        .unwrap();
    assert_eq!(collect(stream).await, SSE_BODY.as_bytes());

    let received = log.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].path,
        "run acc1 @cf/meta/llama-3.1-8b-instruct-fp8"
    );
    assert_eq!(
        received[0].headers[header::AUTHORIZATION],
        "Bearer secret-token"
    );
    assert_eq!(
        received[0].body,
        serde_json::json!({
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hello"}
            ],
            "max_tokens": 1024,
            "stream": true
        })
    );
}

#[tokio::test]
async fn test_run_fails_on_upstream_error_status() {
    let (base_url, _log) = start_upstream().await;
    let client = client(&base_url, "fail", None);

    let err = client
        .run("@cf/meta/llama", request())
        .await
        .err()
        .unwrap();

    let message = err.to_string();
    assert!(message.contains("400"), "{message}");
    assert!(message.contains("bad model input"), "{message}");
}

#[tokio::test]
async fn test_run_fails_when_upstream_unreachable() {
    let client = client("http://127.0.0.1:9", "acc1", None);

    assert!(client.run("@cf/meta/llama", request()).await.is_err());
}

#[tokio::test]
async fn test_run_requires_credentials() {
    let client = WorkersAiClient::new(InferenceSettings {
        base_url: "http://127.0.0.1:9".to_owned(),
        account_id: Some("acc1".to_owned()),
        api_token: None,
        gateway: None,
    });

    let err = client
        .run("@cf/meta/llama", request())
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("CF_API_TOKEN"));
}

#[tokio::test]
async fn test_run_through_gateway() {
    let (base_url, log) = start_upstream().await;
    let gateway = GatewayOptions {
        id: "chat-gw".to_owned(),
        base_url: format!("{base_url}/gw"),
        skip_cache: true,
        cache_ttl: Some(600),
    };
    let client = client(&base_url, "acc1", Some(gateway.clone()));
    assert_eq!(client.gateway(), Some(&gateway));

    let stream = client
        .run("@cf/meta/llama", request())
        .await
        .unwrap();
    assert_eq!(collect(stream).await, SSE_BODY.as_bytes());

    let received = log.lock().unwrap().clone();
    assert_eq!(received[0].path, "gateway acc1 chat-gw @cf/meta/llama");
    assert_eq!(received[0].headers["cf-aig-skip-cache"], "true");
    assert_eq!(received[0].headers["cf-aig-cache-ttl"], "600");
}
