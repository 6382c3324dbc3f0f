//! Wire types for the Assistants v2 API.
//!
//! Message content blocks are kept as raw JSON (`serde_json::Value`) because
//! the chat endpoint echoes them back verbatim; typed accessors parse the
//! blocks we actually interpret (`type == "text"`).

use serde::Deserialize;

/// A server-side conversation thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Lifecycle status of an asynchronous run.
///
/// Statuses this crate does not act on (`cancelled`, `expired`, ...) are kept
/// as [`RunStatus::Other`] so a new upstream status never breaks parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    RequiresAction,
    Other(String),
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "requires_action" => RunStatus::RequiresAction,
            _ => RunStatus::Other(s),
        }
    }
}

impl RunStatus {
    /// Statuses that end the poll loop: the run either finished, broke, or
    /// is blocked waiting on tool output we cannot provide.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::RequiresAction
        )
    }

    /// The upstream wire string for this status.
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error detail attached to a failed run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// An asynchronous run against a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Page of thread messages, newest first when listed with `order=desc`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
}

impl MessageList {
    /// The most recent assistant-authored message, if any.
    pub fn latest_assistant(&self) -> Option<&ThreadMessage> {
        self.data.iter().find(|m| m.role == "assistant")
    }
}

/// One message in a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}

impl ThreadMessage {
    /// Parses every `text`-type content block.
    pub fn text_blocks(&self) -> Vec<TextContent> {
        self.content
            .iter()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|block| {
                serde_json::from_value::<TextBlock>(block.clone())
                    .ok()
                    .map(|b| b.text)
            })
            .collect()
    }

    /// The value of the first `text`-type content block, if any.
    pub fn first_text(&self) -> Option<String> {
        self.text_blocks().into_iter().next().map(|t| t.value)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TextBlock {
    text: TextContent,
}

/// The text payload of a content block, with its annotations.
#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// An annotation attached to a text segment.
#[derive(Debug, Clone, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// v2 nests the file reference under `file_citation`; some payloads carry
    /// a flat `file_id`. Both are accepted.
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub file_citation: Option<FileCitation>,
}

impl Annotation {
    /// The cited file id for a `file_citation` annotation, if present.
    pub fn cited_file_id(&self) -> Option<&str> {
        if self.kind != "file_citation" {
            return None;
        }
        self.file_id
            .as_deref()
            .or_else(|| self.file_citation.as_ref().and_then(|c| c.file_id.as_deref()))
    }
}

/// Nested file reference of a `file_citation` annotation.
#[derive(Debug, Clone, Deserialize)]
pub struct FileCitation {
    #[serde(default)]
    pub file_id: Option<String>,
}

/// Metadata for an uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub filename: Option<String>,
}
