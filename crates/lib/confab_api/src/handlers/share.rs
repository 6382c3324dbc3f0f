//! Share handlers — mint a read-only link for a thread's last reply and
//! render it as a static HTML page.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use confab_core::assistants::AssistantsError;
use confab_core::text::{escape_html, format_lists};
use confab_core::turn::{MESSAGE_FETCH_LIMIT, NO_REPLY_SENTINEL};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::chat::assistants_client;

/// Inbound body for `POST /api/share`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub url: String,
}

/// Query parameters for `GET /api/share`.
#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    #[serde(default)]
    pub tid: String,
}

/// `POST /api/share` — mint the shareable URL for a thread. Pure string
/// composition, no upstream call, but a missing credential is still a 500
/// here like on every other handler.
pub async fn create_share_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ShareRequest>,
) -> AppResult<Json<ShareResponse>> {
    assistants_client(&state)?;

    let thread_id = body.thread_id.trim();
    if thread_id.is_empty() {
        return Err(AppError::Validation("threadId is required".into()));
    }
    Ok(Json(ShareResponse {
        url: share_url(&request_origin(&headers), thread_id),
    }))
}

/// `GET /api/share?tid=...` — render the thread's last assistant reply.
///
/// Errors come back as themed HTML fragments (400/500), never as the JSON
/// error body the other endpoints use.
pub async fn view_share_handler(
    State(state): State<AppState>,
    Query(query): Query<ShareQuery>,
) -> Response {
    let tid = query.tid.trim();
    if tid.is_empty() {
        return html_page(
            StatusCode::BAD_REQUEST,
            "<p>Query parameter 'tid' is required.</p>",
        );
    }

    let client = match assistants_client(&state) {
        Ok(client) => client,
        Err(e) => {
            return html_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("<p>{}</p>", escape_html(&e.to_string())),
            );
        }
    };

    let messages = match client.list_messages(tid, MESSAGE_FETCH_LIMIT).await {
        Ok(messages) => messages,
        Err(AssistantsError::Upstream { status, body }) => {
            tracing::warn!(tid, status, "share view upstream failure");
            return html_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!(
                    "<p>Failed to fetch messages.</p><pre>{}</pre>",
                    escape_html(&body)
                ),
            );
        }
        Err(e) => {
            return html_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!(
                    "<p>Failed to fetch messages.</p><pre>{}</pre>",
                    escape_html(&e.to_string())
                ),
            );
        }
    };

    let reply = messages
        .latest_assistant()
        .and_then(|m| m.first_text())
        .unwrap_or_else(|| NO_REPLY_SENTINEL.to_string());

    let body = format!(
        "<h2>Shared reply</h2><pre>{}</pre>\
         <div class=\"meta\">Thread: {}</div>",
        escape_html(&format_lists(&reply)),
        escape_html(tid),
    );
    html_page(StatusCode::OK, &body)
}

/// `{origin}/api/share?tid={thread_id}` with the thread id URL-encoded.
pub fn share_url(origin: &str, thread_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(thread_id.as_bytes()).collect();
    format!("{origin}/api/share?tid={encoded}")
}

/// Site origin as seen by the client, honoring reverse-proxy headers.
pub fn request_origin(headers: &HeaderMap) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    format!("{proto}://{host}")
}

/// Wraps a fragment in the themed static shell (dark card, light-mode media
/// query) and sets the HTML content type.
fn html_page(status: StatusCode, fragment: &str) -> Response {
    let page = format!(
        "<!doctype html><meta charset=\"utf-8\"><style>\
         body{{font-family:system-ui,-apple-system,Segoe UI,Roboto,sans-serif;\
         margin:24px;background:#0b0f12;color:#e5e7eb}}\
         .card{{max-width:860px;margin:0 auto;border:1px solid #374151;\
         border-radius:12px;padding:16px;background:#111827}}\
         .meta{{opacity:.7;font-size:12px}}\
         pre{{white-space:pre-line;word-wrap:break-word;line-height:1.6;\
         text-align:justify;text-justify:inter-word;hyphens:auto}}\
         @media (prefers-color-scheme: light){{\
         body{{background:#fff;color:#111}}\
         .card{{background:#f8fafc;border-color:#e2e8f0}}}}\
         </style><div class=\"card\">{fragment}</div>"
    );
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        page,
    )
        .into_response()
}
