use std::{collections::HashMap, sync::Arc};

use super::*;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode as AxumStatus},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use shared::{error::TerminateResult, protocol::StreamMessage};
use tokio::{net::TcpListener, sync::Mutex};

const CHAT_ID: &str = "0123456789abcdef0123456789abcdef";

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    accept: Arc<Mutex<Vec<String>>>,
}

async fn spawn_backend(app: Router) -> Result<String, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

async fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/api")
}

fn service_for(base_url: &str) -> ApiService {
    ApiService::new(base_url).expect("valid base url")
}

fn chat_id() -> ChatId {
    ChatId::parse(CHAT_ID).expect("valid chat id")
}

async fn recording_stream(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let message = query.get("message").cloned().unwrap_or_default();
    recorded.queries.lock().await.push(query);
    if let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
        recorded.accept.lock().await.push(accept.to_string());
    }
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        format!("data:echo {message}\n\ndata:second\n\n"),
    )
}

#[test]
fn base_url_is_validated_and_trailing_slash_removed() {
    let service = service_for("http://localhost:8123/api/");
    assert_eq!(service.base_url(), "http://localhost:8123/api");
    assert_eq!(service.health_url(), "http://localhost:8123/api/health");

    assert!(matches!(
        ApiService::new("not a url"),
        Err(ApiClientError::InvalidBaseUrl { .. })
    ));
    assert!(matches!(
        ApiService::new("localhost:8123/api"),
        Err(ApiClientError::UnsupportedScheme { .. })
    ));

    for (base, part) in [
        ("http://localhost:8123/api?v=1", "a query"),
        ("http://localhost:8123/api#top", "a fragment"),
        ("http://localhost:8123/api/?v=1", "a query"),
    ] {
        match ApiService::new(base) {
            Err(ApiClientError::BaseUrlShape { url, part: found }) => {
                assert_eq!(url, base);
                assert_eq!(found, part);
            }
            other => panic!("{base} should be rejected, got {other:?}"),
        }
    }
}

#[test]
fn love_app_url_encodes_reserved_characters() {
    let service = service_for("http://localhost:8123/api");
    let url = service.love_app_chat_url("a b&c=d?e/f#g+h%", Some(&chat_id()));
    assert_eq!(
        url,
        format!(
            "http://localhost:8123/api/ai/loveApp/chat/sse?message=a%20b%26c%3Dd%3Fe%2Ff%23g%2Bh%25&chatId={CHAT_ID}"
        )
    );

    let (_, query) = url.split_once('?').expect("query");
    let message_value = query
        .strip_prefix("message=")
        .and_then(|rest| rest.split('&').next())
        .expect("message param");
    for reserved in [' ', '&', '=', '?', '/', '#', '+'] {
        assert!(
            !message_value.contains(reserved),
            "raw '{reserved}' leaked into {message_value}"
        );
    }
}

#[test]
fn love_app_url_omits_missing_chat_id() {
    let service = service_for("http://localhost:8123/api");
    assert_eq!(
        service.love_app_chat_url("hi", None),
        "http://localhost:8123/api/ai/loveApp/chat/sse?message=hi"
    );
}

#[test]
fn lite_mind_and_simple_urls_encode_unicode() {
    let service = service_for("http://localhost:8123/api");
    assert_eq!(
        service.lite_mind_chat_url("你好 world"),
        "http://localhost:8123/api/ai/liteMind/chat?message=%E4%BD%A0%E5%A5%BD%20world"
    );
    assert_eq!(
        service.simple_chat_url("x;y", Some(&chat_id())),
        format!("http://localhost:8123/api/ai/chat/simple?message=x%3By&chatId={CHAT_ID}")
    );
}

#[tokio::test]
async fn check_server_status_true_on_success() {
    let app = Router::new().route("/api/health", get(|| async { "ok" }));
    let base_url = spawn_backend(app).await.expect("backend");
    let service = service_for(&base_url);

    assert!(service.check_server_status().await);
    assert_eq!(service.probe_server().await, ServerStatus::Online);
}

#[tokio::test]
async fn check_server_status_false_on_server_error() {
    let app = Router::new().route(
        "/api/health",
        get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "down") }),
    );
    let base_url = spawn_backend(app).await.expect("backend");
    let service = service_for(&base_url);

    assert!(!service.check_server_status().await);
    assert_eq!(
        service.probe_server().await,
        ServerStatus::Unhealthy {
            status: StatusCode::INTERNAL_SERVER_ERROR
        }
    );
}

#[tokio::test]
async fn check_server_status_false_when_unreachable() {
    let service = service_for(&refused_base_url().await);

    assert!(!service.check_server_status().await);
    assert!(matches!(
        service.probe_server().await,
        ServerStatus::Unreachable { .. }
    ));
}

#[tokio::test]
async fn love_app_connection_streams_backend_events() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/ai/loveApp/chat/sse", get(recording_stream))
        .with_state(recorded.clone());
    let base_url = spawn_backend(app).await.expect("backend");
    let service = service_for(&base_url);

    let mut conn = service
        .create_love_app_connection("how are you?", Some(&chat_id()))
        .await
        .expect("connection");
    assert!(conn.url().ends_with("message=how%20are%20you%3F&chatId=0123456789abcdef0123456789abcdef"));

    let first = conn.next().await.expect("first").expect("ok");
    let second = conn.next().await.expect("second").expect("ok");
    assert_eq!(first.data, "echo how are you?");
    assert_eq!(second.data, "second");
    assert!(conn.next().await.is_none());

    let queries = recorded.queries.lock().await;
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get("message").map(String::as_str), Some("how are you?"));
    assert_eq!(queries[0].get("chatId").map(String::as_str), Some(CHAT_ID));
    assert_eq!(
        recorded.accept.lock().await.as_slice(),
        ["text/event-stream".to_string()]
    );
}

#[tokio::test]
async fn lite_mind_connection_sends_only_message() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/ai/liteMind/chat", get(recording_stream))
        .with_state(recorded.clone());
    let base_url = spawn_backend(app).await.expect("backend");
    let service = service_for(&base_url);

    let messages: Vec<StreamMessage> = service
        .create_lite_mind_connection("plan a trip")
        .await
        .expect("connection")
        .messages()
        .map(|m| m.expect("ok"))
        .collect()
        .await;
    assert_eq!(
        messages,
        vec![
            StreamMessage::Text("echo plan a trip".to_string()),
            StreamMessage::Text("second".to_string()),
        ]
    );

    let queries = recorded.queries.lock().await;
    assert_eq!(queries[0].len(), 1);
    assert!(!queries[0].contains_key("chatId"));
}

#[tokio::test]
async fn stream_open_surfaces_status_errors() {
    let app = Router::new().route(
        "/api/ai/liteMind/chat",
        get(|| async { (AxumStatus::BAD_REQUEST, "Invalid chatId format") }),
    );
    let base_url = spawn_backend(app).await.expect("backend");
    let service = service_for(&base_url);

    let err = match service.create_lite_mind_connection("hi").await {
        Ok(_) => panic!("expected status error"),
        Err(err) => err,
    };
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert!(!err.is_unreachable());
}

#[tokio::test]
async fn stream_open_surfaces_unreachable_backend() {
    let service = service_for(&refused_base_url().await);
    let err = match service.create_love_app_connection("hi", None).await {
        Ok(_) => panic!("expected transport error"),
        Err(err) => err,
    };
    assert!(err.is_unreachable());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn love_app_sync_returns_whole_reply() {
    let app = Router::new().route(
        "/api/ai/loveApp/chat/sync",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            format!(
                "reply to {} in {}",
                query.get("message").cloned().unwrap_or_default(),
                query.get("chatId").cloned().unwrap_or_default()
            )
        }),
    );
    let base_url = spawn_backend(app).await.expect("backend");
    let service = service_for(&base_url);

    let reply = service
        .love_app_chat_sync("hello there", Some(&chat_id()))
        .await
        .expect("reply");
    assert_eq!(reply, format!("reply to hello there in {CHAT_ID}"));
}

async fn terminate_handler(
    Query(query): Query<HashMap<String, String>>,
) -> (AxumStatus, Json<serde_json::Value>) {
    let chat_id = query.get("chatId").cloned().unwrap_or_default();
    if chat_id == CHAT_ID && query.get("final").map(String::as_str) == Some("true") {
        (
            AxumStatus::OK,
            Json(serde_json::json!({ "chatId": chat_id, "ok": true, "result": "terminated" })),
        )
    } else {
        (
            AxumStatus::NOT_FOUND,
            Json(serde_json::json!({ "chatId": chat_id, "ok": false, "result": "not_found" })),
        )
    }
}

#[tokio::test]
async fn terminate_decodes_both_outcomes() {
    let app = Router::new().route("/api/ai/chat/terminate", post(terminate_handler));
    let base_url = spawn_backend(app).await.expect("backend");
    let service = service_for(&base_url);

    let terminated = service
        .terminate_chat(&chat_id(), true)
        .await
        .expect("terminated");
    assert!(terminated.ok);
    assert_eq!(terminated.result, TerminateResult::Terminated);

    let missing = service
        .terminate_chat(&chat_id(), false)
        .await
        .expect("not found still decodes");
    assert!(!missing.ok);
    assert_eq!(missing.result, TerminateResult::NotFound);
    assert_eq!(missing.chat_id, CHAT_ID);
}

#[tokio::test]
async fn service_is_usable_through_backend_trait() {
    let app = Router::new().route("/api/health", get(|| async { "ok" }));
    let base_url = spawn_backend(app).await.expect("backend");
    let backend: Arc<dyn ChatBackend> = Arc::new(service_for(&base_url));

    assert!(backend.probe_server().await.is_online());
}
