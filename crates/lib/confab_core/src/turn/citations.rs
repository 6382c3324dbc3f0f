//! File-citation detection.
//!
//! A reply counts as reference-sourced when an assistant message carries a
//! `file_citation` annotation that the configured [`CitationRule`] accepts.
//! Keyword matching needs the cited file's name, which is looked up through
//! the [`FileNameResolver`] trait so tests can inject a fake instead of the
//! live files endpoint.

use async_trait::async_trait;
use tracing::warn;

use crate::assistants::types::ThreadMessage;
use crate::assistants::{AssistantsClient, AssistantsError};

/// Reference-document name fragments a cited file must contain (keyword
/// mode), matched case-insensitively.
pub const REFERENCE_KEYWORDS: [&str; 4] = ["irpf", "manual", "perguntas", "respostas"];

/// Marker glyphs the rendering layer sometimes embeds around citation
/// sources. Used as a textual fallback when no annotation matched.
const CITATION_MARKER_OPEN: char = '【';
const CITATION_MARKER_CLOSE: char = '】';

/// Resolves a file id to its upstream file name.
#[async_trait]
pub trait FileNameResolver: Send + Sync {
    async fn file_name(&self, file_id: &str) -> Result<Option<String>, AssistantsError>;
}

#[async_trait]
impl FileNameResolver for AssistantsClient {
    async fn file_name(&self, file_id: &str) -> Result<Option<String>, AssistantsError> {
        Ok(self.get_file(file_id).await?.filename)
    }
}

/// How strictly a file citation must match before it flags the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationRule {
    /// Any `file_citation` annotation qualifies.
    Any,
    /// The cited file's name must contain one of the keywords
    /// (case-insensitive substring match).
    Keywords(Vec<String>),
}

impl Default for CitationRule {
    fn default() -> Self {
        CitationRule::Keywords(REFERENCE_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }
}

impl CitationRule {
    /// Whether a citation with the given resolved file name qualifies.
    pub fn matches(&self, file_name: Option<&str>) -> bool {
        match self {
            CitationRule::Any => true,
            CitationRule::Keywords(keywords) => {
                let Some(name) = file_name else {
                    return false;
                };
                let name = name.to_lowercase();
                keywords.iter().any(|k| name.contains(&k.to_lowercase()))
            }
        }
    }
}

/// Scans the assistant message for a qualifying file citation.
///
/// File-name lookup failures never abort the turn; the citation is treated
/// as a non-match. The `【`/`】` marker pair in the reply text sets the flag
/// only when the message carries no citation annotation at all — when
/// annotations are present they are authoritative, otherwise the markers
/// (which accompany every rendered citation) would override the keyword
/// filter.
pub async fn detect_reference_citation<R: FileNameResolver + ?Sized>(
    resolver: &R,
    rule: &CitationRule,
    message: &ThreadMessage,
    reply: &str,
) -> bool {
    let mut saw_citation = false;

    for block in message.text_blocks() {
        for annotation in &block.annotations {
            let Some(file_id) = annotation.cited_file_id() else {
                continue;
            };
            saw_citation = true;
            match rule {
                CitationRule::Any => return true,
                CitationRule::Keywords(_) => {
                    let name = match resolver.file_name(file_id).await {
                        Ok(name) => name,
                        Err(e) => {
                            warn!(file_id, "file metadata lookup failed: {e}");
                            continue;
                        }
                    };
                    if rule.matches(name.as_deref()) {
                        return true;
                    }
                }
            }
        }
    }

    !saw_citation
        && reply.contains(CITATION_MARKER_OPEN)
        && reply.contains(CITATION_MARKER_CLOSE)
}
