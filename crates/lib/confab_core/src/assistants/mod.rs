//! Assistants module — typed client for the OpenAI Assistants v2 API.
//!
//! Covers the six operations the relay needs: create-thread, post-message,
//! create-run, get-run, list-messages and get-file.
//!
//! # Public API
//!
//! - [`client::AssistantsClient`] — reqwest-backed API client
//! - [`types`] — wire types (threads, runs, messages, annotations)
//! - [`AssistantsError`] — transport/upstream/payload errors

pub mod client;
pub mod types;

pub use client::AssistantsClient;

use thiserror::Error;

/// Errors that can occur while talking to the Assistants API.
#[derive(Debug, Error)]
pub enum AssistantsError {
    #[error("request to assistants API failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream returned a non-success status. The raw body is carried so
    /// callers can surface it for diagnosis.
    #[error("assistants API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed assistants API payload: {0}")]
    Payload(String),
}
