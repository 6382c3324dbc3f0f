//! API server configuration.

use confab_core::turn::citations::CitationRule;
use confab_core::turn::disclaimer::DisclaimerPolicy;
use confab_core::turn::PollSettings;

/// Fallback assistant id used when `OPENAI_ASSISTANT_ID` is not set.
pub const DEFAULT_ASSISTANT_ID: &str = "asst_9qPXdrMkeyYHbVZT0LQF2c3n";

/// Configuration for the API server, loaded once at startup and passed into
/// the handlers. Business logic never reads the process environment.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3200").
    pub bind_addr: String,
    /// Bearer credential for the Assistants API. Absence is a 500 for every
    /// handler that needs upstream access, not a startup failure.
    pub api_key: Option<String>,
    /// Assistant configuration id runs are started with.
    pub assistant_id: String,
    /// Assistants API base endpoint.
    pub base_url: String,
    /// Disclaimer policy (`auto` | `always`).
    pub notice_mode: DisclaimerPolicy,
    /// Citation strictness (`any` | `keywords`).
    pub citation_rule: CitationRule,
    /// Run poll loop knobs.
    pub poll: PollSettings,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable              | Default                        |
    /// |-----------------------|--------------------------------|
    /// | `BIND_ADDR`           | `127.0.0.1:3200`               |
    /// | `OPENAI_API_KEY`      | unset (handlers respond 500)   |
    /// | `OPENAI_ASSISTANT_ID` | [`DEFAULT_ASSISTANT_ID`]       |
    /// | `OPENAI_BASE_URL`     | `https://api.openai.com/v1`    |
    /// | `NOTICE_MODE`         | `auto`                         |
    /// | `CITATION_MATCH`      | `keywords`                     |
    pub fn from_env() -> Self {
        let notice_mode = std::env::var("NOTICE_MODE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        let citation_rule = match std::env::var("CITATION_MATCH").as_deref() {
            Ok("any") => CitationRule::Any,
            _ => CitationRule::default(),
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3200".into()),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            assistant_id: std::env::var("OPENAI_ASSISTANT_ID")
                .ok()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| DEFAULT_ASSISTANT_ID.into()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| confab_core::assistants::client::DEFAULT_BASE_URL.into()),
            notice_mode,
            citation_rule,
            poll: PollSettings::default(),
        }
    }
}
