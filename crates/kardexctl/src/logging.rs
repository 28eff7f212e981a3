//! Logging for kardexctl
//!
//! Two channels: `tracing` diagnostics on stderr, and one JSONL audit entry
//! per answered question, appended to a log file with an XDG fallback chain.

use kardex_common::query_engine::QueryAnswer;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber. `RUST_LOG` overrides `-v`.
pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log entry for each answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    /// ISO 8601 timestamp
    pub ts: String,

    /// Request ID (UUID)
    pub req_id: String,

    pub command: String,

    pub query: String,

    /// Resolved intent kind
    pub intent: String,

    pub used_fallback: bool,

    #[serde(default)]
    pub attempts: u32,

    /// Number of records the question ran against
    pub records: usize,

    /// Duration in milliseconds
    pub duration_ms: u64,

    /// Success flag
    pub ok: bool,

    /// Error details if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl QueryLogEntry {
    pub fn from_answer(query: &str, records: usize, answer: &QueryAnswer) -> Self {
        Self {
            ts: Self::now(),
            req_id: Self::generate_req_id(),
            command: "ask".to_string(),
            query: query.to_string(),
            intent: answer.intent.kind.to_string(),
            used_fallback: answer.used_fallback,
            attempts: answer.attempts,
            records,
            duration_ms: answer.duration_ms,
            ok: answer.is_ok(),
            error: answer.error.as_ref().map(|message| ErrorDetails {
                code: "analytics_fallback".to_string(),
                message: message.clone(),
            }),
        }
    }

    /// Discover log file path with fallback chain
    ///
    /// Priority:
    /// 1. $KARDEXCTL_LOG_FILE environment variable (explicit override)
    /// 2. $XDG_STATE_HOME/kardex/queries.jsonl (XDG standard)
    /// 3. ~/.local/state/kardex/queries.jsonl (XDG fallback)
    pub fn discover_log_path() -> Option<PathBuf> {
        discover_log_path_with(|key| std::env::var(key).ok())
    }

    /// Append to the log file, falling back to stderr on failure
    pub fn write(&self) -> Result<(), std::io::Error> {
        let json = serde_json::to_string(self)?;

        if let Some(path) = Self::discover_log_path() {
            match Self::write_to_file(&json, &path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("Cannot write query log {}: {}", path.display(), e);
                }
            }
        }

        eprintln!("{}", json);
        Ok(())
    }

    /// Attempt to write log entry to file
    pub fn write_to_file(json: &str, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Generate request ID
    pub fn generate_req_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Get current timestamp in ISO 8601 format
    pub fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

fn discover_log_path_with<F>(env: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let set = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(path) = set("KARDEXCTL_LOG_FILE") {
        return Some(PathBuf::from(path));
    }
    if let Some(state) = set("XDG_STATE_HOME") {
        return Some(Path::new(&state).join("kardex").join("queries.jsonl"));
    }
    set("HOME").map(|home| {
        Path::new(&home)
            .join(".local")
            .join("state")
            .join("kardex")
            .join("queries.jsonl")
    })
}
