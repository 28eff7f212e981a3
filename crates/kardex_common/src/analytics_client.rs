//! Analytics Fallback - opaque question-over-records engine
//!
//! Questions no deterministic handler understands are sent here together with
//! the records. The real client talks to an OpenAI-compatible endpoint; the
//! fake client is used in tests.

use crate::record::FaultRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

/// Rows included in the CSV preview sent with a question
const PREVIEW_ROWS: usize = 200;

const SYSTEM_PROMPT: &str = "You answer questions about vehicle maintenance work orders. \
The user message contains a CSV table of work orders followed by a question. \
Respond with a single JSON object of the form {\"type\": \"number\" | \"string\" | \"dataframe\", \"value\": ...}. \
For \"dataframe\" the value is a list of row objects.";

/// Analytics fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Extra attempts after the first failure (capped at 3)
    pub max_retries: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Analytics fallback is disabled in configuration")]
    Disabled,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    /// Milliseconds waited
    #[error("Request timeout after {0} ms")]
    Timeout(u64),

    #[error("Analytics fallback returned an empty response")]
    EmptyResponse,

    #[error("{0}")]
    Failed(String),
}

/// A question-answering engine over a record set
pub trait AnalyticsFallback: Send + Sync {
    /// Answer `question` about `records`. Blocking.
    fn query(&self, question: &str, records: &[FaultRecord]) -> Result<Value, AnalyticsError>;
}

/// Analytics fallback over an OpenAI-compatible chat completions API
pub struct HttpAnalyticsClient {
    config: AnalyticsConfig,
}

impl HttpAnalyticsClient {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    // Built per call: a blocking client must not be created or dropped on an
    // async worker thread, and calls always arrive on a blocking thread.
    fn http_client(&self) -> Result<reqwest::blocking::Client, AnalyticsError> {
        reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| AnalyticsError::HttpError(format!("Failed to create HTTP client: {}", e)))
    }
}

impl AnalyticsFallback for HttpAnalyticsClient {
    fn query(&self, question: &str, records: &[FaultRecord]) -> Result<Value, AnalyticsError> {
        if !self.config.enabled {
            return Err(AnalyticsError::Disabled);
        }

        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let user_prompt = format!(
            "Work orders ({} total, first {} shown):\n{}\nQuestion: {}",
            records.len(),
            records.len().min(PREVIEW_ROWS),
            records_preview(records, PREVIEW_ROWS)?,
            question
        );

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        let mut request = self.http_client()?.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        tracing::debug!("Sending analytics query to {} ({} records)", url, records.len());

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                AnalyticsError::Timeout(self.config.timeout_secs.saturating_mul(1000))
            } else {
                AnalyticsError::HttpError(format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(AnalyticsError::HttpError(format!(
                "HTTP {} from analytics endpoint",
                response.status()
            )));
        }

        let response_json: Value = response
            .json()
            .map_err(|e| AnalyticsError::InvalidJson(format!("Failed to parse response: {}", e)))?;

        let text = response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or(AnalyticsError::EmptyResponse)?;

        serde_json::from_str(text)
            .map_err(|e| AnalyticsError::InvalidJson(format!("Model output is not valid JSON: {}", e)))
    }
}

/// Compact CSV of the first `limit` records, with classification columns
pub fn records_preview(records: &[FaultRecord], limit: usize) -> Result<String, AnalyticsError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let fail = |e: csv::Error| AnalyticsError::Failed(format!("Failed to build record preview: {}", e));

    writer
        .write_record([
            "work_order_id",
            "open_date",
            "vehicle_type",
            "main_category",
            "sub_category",
            "nature_of_complaint",
            "job_description",
        ])
        .map_err(fail)?;

    for record in records.iter().take(limit) {
        let open_date = record.open_date.to_string();
        writer
            .write_record([
                record.work_order_id.as_str(),
                open_date.as_str(),
                record.vehicle_type.as_str(),
                record.main_category(),
                record.sub_category().unwrap_or(""),
                record.nature_of_complaint.as_str(),
                record.job_description.as_str(),
            ])
            .map_err(fail)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AnalyticsError::Failed(format!("Failed to build record preview: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AnalyticsError::Failed(e.to_string()))
}

/// Fake analytics fallback for testing
pub struct FakeAnalyticsClient {
    responses: Mutex<Vec<Result<Value, AnalyticsError>>>,
    call_count: Mutex<usize>,
    last_question: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl FakeAnalyticsClient {
    /// Create a fake client with pre-defined responses
    pub fn new(responses: Vec<Result<Value, AnalyticsError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            last_question: Mutex::new(None),
            delay: None,
        }
    }

    pub fn always_valid(json: Value) -> Self {
        Self::new(vec![Ok(json)])
    }

    pub fn always_error(error: AnalyticsError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Sleep before answering, to exercise timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.lock().map(|c| *c).unwrap_or(0)
    }

    pub fn last_question(&self) -> Option<String> {
        self.last_question.lock().ok().and_then(|q| q.clone())
    }
}

impl AnalyticsFallback for FakeAnalyticsClient {
    fn query(&self, question: &str, _records: &[FaultRecord]) -> Result<Value, AnalyticsError> {
        if let Ok(mut count) = self.call_count.lock() {
            *count += 1;
        }
        if let Ok(mut last) = self.last_question.lock() {
            *last = Some(question.to_string());
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| AnalyticsError::Failed("fake client poisoned".to_string()))?;
        match responses.len() {
            0 => Err(AnalyticsError::EmptyResponse),
            // Keep returning the last response
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}
