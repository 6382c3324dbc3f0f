//! Turn module — one conversation turn against the Assistants API.
//!
//! A turn acquires a thread (reusing the caller's handle or minting one),
//! appends the user message, starts a run, polls it to a settled status,
//! extracts the newest assistant reply and decides whether to append the
//! sourcing disclaimer.
//!
//! # Public API
//!
//! - [`submit_turn`] — run one full turn
//! - [`acquire_thread`] — the create-or-reuse branch, as a tagged result
//! - [`TurnSettings`] / [`PollSettings`] — per-deployment knobs
//! - [`citations`] — file-citation detection
//! - [`disclaimer`] — disclaimer policy and text

pub mod citations;
pub mod disclaimer;

use thiserror::Error;
use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use crate::assistants::types::RunStatus;
use crate::assistants::{AssistantsClient, AssistantsError};
use self::citations::{CitationRule, FileNameResolver, detect_reference_citation};
use self::disclaimer::DisclaimerPolicy;

/// Reply used when the run completed but no assistant message was found.
/// Not an error condition.
pub const NO_REPLY_SENTINEL: &str = "No reply";

/// How many messages to fetch when looking for the newest assistant reply.
pub const MESSAGE_FETCH_LIMIT: u32 = 10;

/// Errors that end a turn without a result.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    Upstream(#[from] AssistantsError),

    #[error("run {run_id} failed: {details}")]
    RunFailed { run_id: String, details: String },
}

/// Poll loop knobs. Tests inject a near-zero interval and a small attempt
/// budget to exercise both the completed and pending paths without real
/// delay.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

/// Per-deployment settings for a turn.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Assistant configuration id runs are started with.
    pub assistant_id: String,
    pub policy: DisclaimerPolicy,
    pub rule: CitationRule,
    pub poll: PollSettings,
}

/// Outcome of the create-or-reuse thread branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadAcquisition {
    Created(String),
    Reused(String),
}

impl ThreadAcquisition {
    pub fn id(&self) -> &str {
        match self {
            ThreadAcquisition::Created(id) | ThreadAcquisition::Reused(id) => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            ThreadAcquisition::Created(id) | ThreadAcquisition::Reused(id) => id,
        }
    }
}

/// Result of a turn that reached the message-retrieval stage.
#[derive(Debug, Clone)]
pub struct CompletedTurn {
    /// Assistant reply text, with the disclaimer already applied when due.
    pub reply: String,
    pub thread_id: String,
    pub status: RunStatus,
    /// Raw content blocks of the assistant message, echoed to the caller.
    pub content_items: Vec<serde_json::Value>,
    /// Whether a qualifying reference-document citation was detected.
    pub from_reference: bool,
}

/// Outcome of one turn.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Completed(CompletedTurn),
    /// The run did not reach `completed` within the attempt budget (or is
    /// blocked on `requires_action`). The caller retries with the same
    /// thread handle; this is deliberately not an error.
    Pending {
        thread_id: String,
        status: RunStatus,
    },
}

/// Reuses the caller-supplied thread handle unchanged, or mints a new thread
/// upstream. No existence check is performed on a supplied handle; an invalid
/// one surfaces later as an upstream failure.
pub async fn acquire_thread(
    client: &AssistantsClient,
    existing: Option<&str>,
) -> Result<ThreadAcquisition, TurnError> {
    match existing {
        Some(id) if !id.is_empty() => Ok(ThreadAcquisition::Reused(id.to_string())),
        _ => {
            let thread = client.create_thread().await?;
            debug!(thread_id = %thread.id, "created thread");
            Ok(ThreadAcquisition::Created(thread.id))
        }
    }
}

/// Runs one conversation turn.
///
/// `resolver` is consulted only for citation keyword matching; in production
/// it is the [`AssistantsClient`] itself, tests inject a fake.
pub async fn submit_turn<R: FileNameResolver + ?Sized>(
    client: &AssistantsClient,
    resolver: &R,
    settings: &TurnSettings,
    message: &str,
    existing_thread: Option<&str>,
) -> Result<TurnOutcome, TurnError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(TurnError::EmptyMessage);
    }

    let thread_id = acquire_thread(client, existing_thread).await?.into_id();

    client.post_message(&thread_id, "user", message).await?;

    let run = client.create_run(&thread_id, &settings.assistant_id).await?;
    info!(thread_id = %thread_id, run_id = %run.id, "started run");

    let status = poll_run(client, &thread_id, &run, settings.poll).await?;

    if status != RunStatus::Completed {
        info!(thread_id = %thread_id, status = %status, "run not completed, returning pending");
        return Ok(TurnOutcome::Pending { thread_id, status });
    }

    let messages = client.list_messages(&thread_id, MESSAGE_FETCH_LIMIT).await?;

    let assistant_msg = messages.latest_assistant();
    let mut reply = assistant_msg
        .and_then(|m| m.first_text())
        .unwrap_or_else(|| NO_REPLY_SENTINEL.to_string());
    let content_items = assistant_msg.map(|m| m.content.clone()).unwrap_or_default();

    let from_reference = match assistant_msg {
        Some(msg) => detect_reference_citation(resolver, &settings.rule, msg, &reply).await,
        None => false,
    };

    disclaimer::apply(&mut reply, settings.policy, from_reference);

    Ok(TurnOutcome::Completed(CompletedTurn {
        reply,
        thread_id,
        status,
        content_items,
        from_reference,
    }))
}

/// Polls the run until its status settles or the attempt budget is spent.
///
/// The status returned by run creation is checked first, so an already
/// settled run never sleeps. `failed` is terminal for the request and is
/// reported immediately instead of burning the remaining attempts.
async fn poll_run(
    client: &AssistantsClient,
    thread_id: &str,
    run: &crate::assistants::types::Run,
    poll: PollSettings,
) -> Result<RunStatus, TurnError> {
    let mut status = run.status.clone();
    let mut last_error = run.last_error.clone();

    let mut attempts = 0;
    while !status.is_settled() && attempts < poll.max_attempts {
        sleep(poll.interval).await;
        attempts += 1;
        let check = client.get_run(thread_id, &run.id).await?;
        status = check.status;
        last_error = check.last_error;
        debug!(run_id = %run.id, attempt = attempts, status = %status, "polled run");
    }

    if status == RunStatus::Failed {
        let details = last_error
            .map(|e| {
                format!(
                    "{}: {}",
                    e.code.unwrap_or_else(|| "unknown".into()),
                    e.message.unwrap_or_default()
                )
            })
            .unwrap_or_else(|| "no error detail reported".to_string());
        return Err(TurnError::RunFailed {
            run_id: run.id.clone(),
            details,
        });
    }

    Ok(status)
}
