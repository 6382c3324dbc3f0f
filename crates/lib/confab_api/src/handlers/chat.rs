//! Chat turn handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use confab_core::assistants::AssistantsClient;
use confab_core::assistants::types::RunStatus;
use confab_core::turn::{self, TurnOutcome, TurnSettings};

use crate::AppState;
use crate::error::{AppError, AppResult};

/// Inbound body for `POST /api/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Thread handle from a previous turn; omitted or blank on the first
    /// turn of a conversation.
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Successful turn response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub thread_id: String,
    pub status: String,
    pub content_items: Vec<serde_json::Value>,
    /// Whether the reply was flagged as sourced from the reference base.
    #[serde(rename = "fromBase")]
    pub from_reference: bool,
    pub notice_mode: String,
}

/// Body of the 202 response when the run has not completed yet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub status: String,
    pub thread_id: String,
    pub info: String,
}

/// `POST /api/chat` — run one conversation turn.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Response> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message is required".into()));
    }

    let client = assistants_client(&state)?;
    let settings = TurnSettings {
        assistant_id: state.config.assistant_id.clone(),
        policy: state.config.notice_mode,
        rule: state.config.citation_rule.clone(),
        poll: state.config.poll,
    };

    // Blank threadId means "start a new conversation", same as omitting it.
    let existing_thread = body
        .thread_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let outcome =
        turn::submit_turn(&client, &client, &settings, &body.message, existing_thread).await?;

    match outcome {
        TurnOutcome::Completed(t) => Ok(Json(ChatResponse {
            reply: t.reply,
            thread_id: t.thread_id,
            status: t.status.to_string(),
            content_items: t.content_items,
            from_reference: t.from_reference,
            notice_mode: state.config.notice_mode.to_string(),
        })
        .into_response()),
        TurnOutcome::Pending { thread_id, status } => Ok((
            StatusCode::ACCEPTED,
            Json(PendingResponse {
                status: status.to_string(),
                thread_id,
                info: pending_info(&status).to_string(),
            }),
        )
            .into_response()),
    }
}

fn pending_info(status: &RunStatus) -> &'static str {
    match status {
        RunStatus::RequiresAction => "Run is waiting on a required action.",
        _ => "Run not completed yet. Try again.",
    }
}

/// Builds the upstream client, or fails every request with a 500 when the
/// credential is missing from the environment.
pub(crate) fn assistants_client(state: &AppState) -> AppResult<AssistantsClient> {
    let api_key = state
        .config
        .api_key
        .as_deref()
        .ok_or_else(|| AppError::Config("OPENAI_API_KEY is not set".into()))?;
    Ok(AssistantsClient::with_base_url(
        api_key,
        &state.config.base_url,
    ))
}
