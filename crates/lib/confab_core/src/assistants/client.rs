//! Reqwest-backed client for the Assistants v2 API.
//!
//! Every thread-scoped call sends the bearer credential plus the
//! `OpenAI-Beta: assistants=v2` opt-in header; the files endpoint only needs
//! the credential.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::AssistantsError;
use super::types::{FileInfo, MessageList, Run, Thread};

/// Default API base endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// Client for the Assistants v2 API.
#[derive(Debug, Clone)]
pub struct AssistantsClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AssistantsClient {
    /// Client against the production endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Client against a custom base endpoint (used by tests to point at a
    /// stub server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// `POST /threads` — create a new conversation thread.
    pub async fn create_thread(&self) -> Result<Thread, AssistantsError> {
        let req = self.post(&format!("{}/threads", self.base_url));
        Self::send(req).await
    }

    /// `POST /threads/{id}/messages` — append a message to a thread.
    pub async fn post_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), AssistantsError> {
        let req = self
            .post(&format!("{}/threads/{thread_id}/messages", self.base_url))
            .json(&json!({ "role": role, "content": content }));
        Self::send::<serde_json::Value>(req).await?;
        Ok(())
    }

    /// `POST /threads/{id}/runs` — start a run with the given assistant.
    pub async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, AssistantsError> {
        let req = self
            .post(&format!("{}/threads/{thread_id}/runs", self.base_url))
            .json(&json!({ "assistant_id": assistant_id }));
        Self::send(req).await
    }

    /// `GET /threads/{id}/runs/{run_id}` — fetch run status.
    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantsError> {
        let req = self.get(&format!(
            "{}/threads/{thread_id}/runs/{run_id}",
            self.base_url
        ));
        Self::send(req).await
    }

    /// `GET /threads/{id}/messages?order=desc&limit=N` — newest messages first.
    pub async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<MessageList, AssistantsError> {
        let limit = limit.to_string();
        let req = self
            .get(&format!("{}/threads/{thread_id}/messages", self.base_url))
            .query(&[("order", "desc"), ("limit", limit.as_str())]);
        Self::send(req).await
    }

    /// `GET /files/{id}` — file metadata (name) for citation matching.
    pub async fn get_file(&self, file_id: &str) -> Result<FileInfo, AssistantsError> {
        let req = self
            .http
            .get(format!("{}/files/{file_id}", self.base_url))
            .bearer_auth(&self.api_key);
        Self::send(req).await
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    /// Sends the request and decodes a success payload, or carries the raw
    /// body of a non-success response for diagnosis.
    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, AssistantsError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(AssistantsError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| AssistantsError::Payload(e.to_string()))
    }
}
