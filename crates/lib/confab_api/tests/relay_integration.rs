//! Integration tests — stub Assistants API on an ephemeral port, build the
//! router, drive it with `tower::ServiceExt::oneshot`, assert the wire
//! contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{Value, json};
use tokio::time::Duration;
use tower::ServiceExt;

use confab_api::config::ApiConfig;
use confab_api::AppState;
use confab_core::turn::PollSettings;
use confab_core::turn::citations::CitationRule;
use confab_core::turn::disclaimer::{DISCLAIMER, DisclaimerPolicy};

/// Binds a stub upstream on an ephemeral port and serves it in the
/// background for the duration of the test.
async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub upstream");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve stub");
    });
    format!("http://{addr}")
}

/// Stub covering the happy paths: run creation returns `queued`, polling
/// returns `poll_run`, listing returns `messages`, the files endpoint
/// returns `file_name` (404 when `None`).
fn stub_upstream(poll_run: Value, messages: Value, file_name: Option<&'static str>) -> Router {
    Router::new()
        .route("/threads", post(|| async { Json(json!({"id": "thread_stub_1"})) }))
        .route(
            "/threads/{tid}/messages",
            post(|| async { Json(json!({"id": "msg_1"})) }).get({
                let messages = messages.clone();
                move || {
                    let messages = messages.clone();
                    async move { Json(messages) }
                }
            }),
        )
        .route(
            "/threads/{tid}/runs",
            post(|| async { Json(json!({"id": "run_1", "status": "queued"})) }),
        )
        .route("/threads/{tid}/runs/{rid}", get({
            let poll_run = poll_run.clone();
            move || {
                let poll_run = poll_run.clone();
                async move { Json(poll_run) }
            }
        }))
        .route(
            "/files/{fid}",
            get(move || async move {
                match file_name {
                    Some(name) => Json(json!({"filename": name})).into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            }),
        )
}

fn completed_run() -> Value {
    json!({"id": "run_1", "status": "completed"})
}

fn assistant_reply(text: &str) -> Value {
    json!({"data": [{
        "role": "assistant",
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    }]})
}

fn cited_reply(text: &str) -> Value {
    json!({"data": [{
        "role": "assistant",
        "content": [{"type": "text", "text": {
            "value": text,
            "annotations": [{
                "type": "file_citation",
                "file_citation": {"file_id": "file-1"}
            }]
        }}]
    }]})
}

fn test_state(base_url: &str, policy: DisclaimerPolicy, rule: CitationRule) -> AppState {
    AppState {
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            api_key: Some("test-key".into()),
            assistant_id: "asst_test".into(),
            base_url: base_url.into(),
            notice_mode: policy,
            citation_rule: rule,
            poll: PollSettings {
                interval: Duration::from_millis(1),
                max_attempts: 3,
            },
        },
    }
}

fn default_state(base_url: &str) -> AppState {
    test_state(base_url, DisclaimerPolicy::Auto, CitationRule::default())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    let resp = app.oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).expect("parse JSON body");
    (status, json)
}

async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
}

#[tokio::test]
async fn completed_turn_returns_reply_and_new_thread() {
    let base = spawn_upstream(stub_upstream(
        completed_run(),
        assistant_reply("All good."),
        None,
    ))
    .await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "All good.");
    assert_eq!(body["threadId"], "thread_stub_1");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["fromBase"], false);
    assert_eq!(body["noticeMode"], "auto");
    assert_eq!(body["contentItems"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn supplied_thread_id_is_echoed_verbatim() {
    let base = spawn_upstream(stub_upstream(
        completed_run(),
        assistant_reply("Continuing."),
        None,
    ))
    .await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = post_json(
        app,
        "/api/chat",
        json!({"message": "hi again", "threadId": "thread_mine"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threadId"], "thread_mine");
}

#[tokio::test]
async fn pending_run_returns_202() {
    let base = spawn_upstream(stub_upstream(
        json!({"id": "run_1", "status": "in_progress"}),
        assistant_reply("unused"),
        None,
    ))
    .await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["threadId"], "thread_stub_1");
    assert!(
        body["info"].as_str().unwrap_or("").contains("Try again"),
        "unexpected info: {}",
        body["info"]
    );
}

#[tokio::test]
async fn requires_action_run_returns_202_with_blocked_info() {
    let base = spawn_upstream(stub_upstream(
        json!({"id": "run_1", "status": "requires_action"}),
        assistant_reply("unused"),
        None,
    ))
    .await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "requires_action");
    assert_eq!(body["threadId"], "thread_stub_1");
    // Blocked runs get distinct wording: retrying alone will not finish them.
    assert!(
        body["info"]
            .as_str()
            .unwrap_or("")
            .contains("required action"),
        "unexpected info: {}",
        body["info"]
    );
}

#[tokio::test]
async fn failed_run_returns_500_without_further_polling() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counted = polls.clone();

    let router = Router::new()
        .route("/threads", post(|| async { Json(json!({"id": "thread_stub_1"})) }))
        .route(
            "/threads/{tid}/messages",
            post(|| async { Json(json!({"id": "msg_1"})) }),
        )
        .route(
            "/threads/{tid}/runs",
            post(|| async { Json(json!({"id": "run_1", "status": "queued"})) }),
        )
        .route(
            "/threads/{tid}/runs/{rid}",
            get(move || {
                let counted = counted.clone();
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "id": "run_1",
                        "status": "failed",
                        "last_error": {"code": "server_error", "message": "boom"}
                    }))
                }
            }),
        );

    let base = spawn_upstream(router).await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "run_failed");
    assert!(
        body["message"].as_str().unwrap_or("").contains("boom"),
        "unexpected message: {}",
        body["message"]
    );
    // Failure is terminal: exactly one status fetch, no budget exhaustion.
    assert_eq!(polls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blank_message_returns_400() {
    // No upstream involved; validation fires before any call.
    let app = confab_api::router(default_state("http://127.0.0.1:1"));

    let (status, body) = post_json(app.clone(), "/api/chat", json!({"message": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = post_json(app, "/api/chat", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_post_chat_returns_405() {
    let app = confab_api::router(default_state("http://127.0.0.1:1"));
    let (status, _) = get_text(app, "/api/chat").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn missing_api_key_returns_500() {
    let mut state = default_state("http://127.0.0.1:1");
    state.config.api_key = None;
    let app = confab_api::router(state);

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "config_error");
}

#[tokio::test]
async fn matching_citation_flags_reply_and_appends_disclaimer_once() {
    let base = spawn_upstream(stub_upstream(
        completed_run(),
        cited_reply("See the manual."),
        Some("Manual_IRPF_2025.pdf"),
    ))
    .await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fromBase"], true);
    let reply = body["reply"].as_str().expect("reply string");
    assert_eq!(reply.matches(DISCLAIMER).count(), 1);
}

#[tokio::test]
async fn unrelated_citation_is_not_flagged() {
    // Marker glyphs in the text must not override the keyword verdict.
    let base = spawn_upstream(stub_upstream(
        completed_run(),
        cited_reply("See this file 【4:0†source】."),
        Some("holiday-photos.zip"),
    ))
    .await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fromBase"], false);
    assert!(!body["reply"].as_str().unwrap_or("").contains(DISCLAIMER));
}

#[tokio::test]
async fn always_mode_appends_disclaimer_without_citation() {
    let base = spawn_upstream(stub_upstream(
        completed_run(),
        assistant_reply("Plain answer."),
        None,
    ))
    .await;
    let state = test_state(&base, DisclaimerPolicy::Always, CitationRule::default());
    let app = confab_api::router(state);

    let (status, body) = post_json(app, "/api/chat", json!({"message": "hi"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fromBase"], false);
    assert_eq!(body["noticeMode"], "always");
    let reply = body["reply"].as_str().expect("reply string");
    assert_eq!(reply.matches(DISCLAIMER).count(), 1);
}

#[tokio::test]
async fn share_create_returns_url() {
    let app = confab_api::router(default_state("http://127.0.0.1:1"));

    let req = Request::builder()
        .method("POST")
        .uri("/api/share")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "chat.example.com")
        .body(Body::from(json!({"threadId": "thread_x"}).to_string()))
        .expect("build request");
    let resp = app.oneshot(req).await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body: Value = serde_json::from_slice(&bytes).expect("parse JSON");
    assert_eq!(
        body["url"],
        "https://chat.example.com/api/share?tid=thread_x"
    );
}

#[tokio::test]
async fn share_create_without_api_key_returns_500() {
    // The mint path makes no upstream call but still requires the credential.
    let mut state = default_state("http://127.0.0.1:1");
    state.config.api_key = None;
    let app = confab_api::router(state);

    let (status, body) = post_json(app, "/api/share", json!({"threadId": "thread_x"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "config_error");
}

#[tokio::test]
async fn share_create_blank_thread_returns_400() {
    let app = confab_api::router(default_state("http://127.0.0.1:1"));
    let (status, body) = post_json(app, "/api/share", json!({"threadId": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn share_view_missing_tid_returns_400_html() {
    let app = confab_api::router(default_state("http://127.0.0.1:1"));
    let (status, body) = get_text(app, "/api/share").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("'tid' is required"), "unexpected body: {body}");
}

#[tokio::test]
async fn share_view_renders_escaped_and_formatted_reply() {
    let base = spawn_upstream(stub_upstream(
        completed_run(),
        assistant_reply("Steps:\n1. register the <form>\n2. submit"),
        None,
    ))
    .await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = get_text(app, "/api/share?tid=thread_x").await;

    assert_eq!(status, StatusCode::OK);
    // List reformatting ran before escaping.
    assert!(body.contains("Steps:\n\n1. register"), "unexpected body: {body}");
    assert!(body.contains("&lt;form&gt;"), "unescaped markup: {body}");
    assert!(!body.contains("<form>"), "raw markup leaked: {body}");
    assert!(body.contains("Thread: thread_x"));
}

#[tokio::test]
async fn share_view_without_assistant_message_uses_sentinel() {
    let base = spawn_upstream(stub_upstream(completed_run(), json!({"data": []}), None)).await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = get_text(app, "/api/share?tid=thread_x").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No reply"), "unexpected body: {body}");
}

#[tokio::test]
async fn share_view_upstream_failure_embeds_escaped_payload() {
    let router = Router::new().route(
        "/threads/{tid}/messages",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"message": "thread <gone>"}})),
            )
        }),
    );
    let base = spawn_upstream(router).await;
    let app = confab_api::router(default_state(&base));

    let (status, body) = get_text(app, "/api/share?tid=thread_x").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Failed to fetch messages"), "unexpected body: {body}");
    assert!(body.contains("&lt;gone&gt;"), "payload not escaped: {body}");
}
