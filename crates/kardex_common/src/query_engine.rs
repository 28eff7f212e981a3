//! Query Engine - question in, answer text out
//!
//! Pipeline: resolve intent → deterministic handler → format. Generic
//! questions go to the analytics fallback on a blocking thread, bounded by a
//! timeout and a small retry budget. Fallback failures become an apology
//! string; `answer` itself never fails.

use crate::analytics_client::{AnalyticsError, AnalyticsFallback};
use crate::answer_format::ResponseFormatter;
use crate::dispatch::{dispatch, DispatchResult, FallbackAnswer};
use crate::query_intent::{IntentKind, QueryIntent, QueryResolver};
use crate::record::FaultRecord;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Hard upper bound on fallback retries, whatever the configuration says
pub const MAX_RETRIES_CAP: u32 = 3;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const EMPTY_QUERY_ANSWER: &str = "Please provide a query.";

pub const ERROR_PREFIX: &str = "Sorry, there was an error processing your request: ";

/// Everything known about one answered question
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub intent: QueryIntent,
    pub text: String,
    pub used_fallback: bool,
    /// Fallback attempts made (0 when a handler answered)
    pub attempts: u32,
    /// Set when the fallback failed and `text` is an apology
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl QueryAnswer {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct QueryEngine {
    resolver: QueryResolver,
    formatter: ResponseFormatter,
    fallback: Arc<dyn AnalyticsFallback>,
    timeout: Duration,
    max_retries: u32,
}

impl QueryEngine {
    pub fn new(resolver: QueryResolver, fallback: Arc<dyn AnalyticsFallback>) -> Self {
        Self {
            resolver,
            formatter: ResponseFormatter::default(),
            fallback,
            timeout: DEFAULT_TIMEOUT,
            max_retries: 1,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.min(MAX_RETRIES_CAP);
        self
    }

    pub fn with_formatter(mut self, formatter: ResponseFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn resolver(&self) -> &QueryResolver {
        &self.resolver
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Answer a question about `records`
    pub async fn answer(&self, query: &str, records: &[FaultRecord]) -> String {
        self.ask(query, records).await.text
    }

    /// Answer a question and report how it was answered
    pub async fn ask(&self, query: &str, records: &[FaultRecord]) -> QueryAnswer {
        let started = Instant::now();
        let intent = self.resolver.resolve(query);

        let mut answer = QueryAnswer {
            text: String::new(),
            used_fallback: false,
            attempts: 0,
            error: None,
            duration_ms: 0,
            intent,
        };

        if answer.intent.normalized_query.is_empty() {
            answer.text = EMPTY_QUERY_ANSWER.to_string();
            return finish(answer, started);
        }

        if let Some(result) = dispatch(&answer.intent, records, self.resolver.taxonomy()) {
            answer.text = self.formatter.format(answer.intent.kind, &result);
            return finish(answer, started);
        }

        answer.used_fallback = true;
        let (outcome, attempts) = self
            .run_fallback(&answer.intent.normalized_query, records)
            .await;
        answer.attempts = attempts;

        match outcome {
            Ok(value) => {
                let result = DispatchResult::Fallback {
                    answer: FallbackAnswer::from_value(value),
                };
                answer.text = self.formatter.format(IntentKind::Generic, &result);
            }
            Err(e) => {
                tracing::warn!("Analytics fallback failed after {} attempts: {}", attempts, e);
                answer.text = format!("{}{}", ERROR_PREFIX, e);
                answer.error = Some(e.to_string());
            }
        }
        finish(answer, started)
    }

    /// Call the fallback with timeout and retries. Returns the outcome and the attempt count.
    async fn run_fallback(&self, question: &str, records: &[FaultRecord]) -> (Result<Value, AnalyticsError>, u32) {
        let shared: Arc<[FaultRecord]> = records.to_vec().into();
        let attempts_allowed = 1 + self.max_retries;
        let mut last_error = AnalyticsError::EmptyResponse;

        for attempt in 1..=attempts_allowed {
            let fallback = Arc::clone(&self.fallback);
            let records = Arc::clone(&shared);
            let question_owned = question.to_string();

            // Run in blocking thread
            let call = tokio::task::spawn_blocking(move || fallback.query(&question_owned, &records));

            let result = match timeout(self.timeout, call).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(AnalyticsError::Failed(format!("Analytics task failed: {}", e))),
                Err(_) => Err(AnalyticsError::Timeout(millis(self.timeout))),
            };

            match result {
                Ok(value) => return (Ok(value), attempt),
                Err(AnalyticsError::Disabled) => return (Err(AnalyticsError::Disabled), attempt),
                Err(e) => {
                    tracing::debug!("Analytics attempt {}/{} failed: {}", attempt, attempts_allowed, e);
                    last_error = e;
                }
            }
        }

        (Err(last_error), attempts_allowed)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn finish(mut answer: QueryAnswer, started: Instant) -> QueryAnswer {
    answer.duration_ms = millis(started.elapsed());
    tracing::info!(
        "Answered {} query in {}ms (fallback: {}, ok: {})",
        answer.intent.kind,
        answer.duration_ms,
        answer.used_fallback,
        answer.is_ok()
    );
    answer
}
