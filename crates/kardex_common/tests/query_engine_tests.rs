//! Query engine end to end: resolver → handler → formatter, and the
//! analytics fallback path with timeouts and retries.

use chrono::NaiveDate;
use kardex_common::analytics_client::{AnalyticsError, AnalyticsFallback, FakeAnalyticsClient};
use kardex_common::classifier::FaultClassifier;
use kardex_common::clock::FixedClock;
use kardex_common::query_engine::{QueryEngine, ERROR_PREFIX, MAX_RETRIES_CAP};
use kardex_common::query_intent::{IntentKind, QueryResolver};
use kardex_common::record::FaultRecord;
use kardex_common::taxonomy::Taxonomy;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

fn records(classifier: &FaultClassifier) -> Vec<FaultRecord> {
    let rows = [
        ("WO-1", (2022, 1, 10), "14 ft", "Brake noise", "Replace worn brake pad"),
        ("WO-2", (2022, 3, 2), "14 ft", "Brake pull", "Replace brake pad"),
        ("WO-3", (2022, 3, 9), "Lifestyle", "Engine overheat", "Replace radiator"),
        ("WO-4", (2023, 8, 1), "24 ft", "Flat battery", "Replace battery"),
    ];
    let mut records: Vec<FaultRecord> = rows
        .iter()
        .map(|(id, (y, m, d), v, c, j)| {
            FaultRecord::new(id, NaiveDate::from_ymd_opt(*y, *m, *d).unwrap(), v, c, j)
        })
        .collect();
    classifier.classify_all(&mut records);
    records
}

fn setup(fake: FakeAnalyticsClient) -> (QueryEngine, Arc<FakeAnalyticsClient>, Vec<FaultRecord>) {
    let classifier = FaultClassifier::new(Arc::new(Taxonomy::builtin().unwrap()));
    let resolver = QueryResolver::new(&classifier, Arc::new(FixedClock::year(2023)));
    let fake = Arc::new(fake);
    let fallback: Arc<dyn AnalyticsFallback> = fake.clone();
    let engine = QueryEngine::new(resolver, fallback).with_timeout(Duration::from_millis(500));
    (engine, fake, records(&classifier))
}

// ============================================================================
// Deterministic handlers
// ============================================================================

#[tokio::test]
async fn test_year_question() {
    let (engine, fake, records) = setup(FakeAnalyticsClient::new(vec![]));
    let per_year = "Work orders by year:\n- 2022: 3 work orders\n- 2023: 1 work order";
    // a per-year bucket outranks "how many"
    let text = engine.answer("How many work orders per year?", &records).await;
    assert_eq!(text, per_year);
    assert_eq!(engine.answer("faults by year", &records).await, per_year);
    assert_eq!(engine.answer("how many faults in 2022", &records).await, "Faults in 2022: 3");
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_question_naming_two_years() {
    let (engine, _, records) = setup(FakeAnalyticsClient::new(vec![]));
    let text = engine.answer("brake faults in 2022 and 2023 by year", &records).await;
    assert_eq!(text, "Brakes faults in 2022 and 2023 by year:\n- 2022: 2 work orders");

    let text = engine.answer("how many faults in 2022 and 2023", &records).await;
    assert_eq!(text, "Faults in 2022 and 2023: 4");
}

#[tokio::test]
async fn test_top_question() {
    let (engine, _, records) = setup(FakeAnalyticsClient::new(vec![]));
    let text = engine.answer("What are the top 2 fault categories?", &records).await;
    assert_eq!(
        text,
        "Top 2 fault categories:\n- Brakes: 2 faults (50.0%)\n- Electrical: 1 fault (25.0%)"
    );
}

#[tokio::test]
async fn test_filtered_count_with_relative_year() {
    let (engine, _, records) = setup(FakeAnalyticsClient::new(vec![]));
    let answer = engine.ask("how many brake problems last year on 14ft trucks", &records).await;
    assert_eq!(answer.intent.kind, IntentKind::Count);
    assert_eq!(answer.text, "Brakes faults on 14 ft vehicles in 2022: 2");
    assert!(answer.is_ok());
}

// ============================================================================
// Analytics fallback
// ============================================================================

#[tokio::test]
async fn test_generic_question_uses_fallback() {
    let (engine, fake, records) = setup(FakeAnalyticsClient::always_valid(json!({
        "type": "number",
        "value": 4.5
    })));
    let answer = engine.ask("Average days to close a work order?", &records).await;
    assert_eq!(answer.intent.kind, IntentKind::Generic);
    assert!(answer.used_fallback);
    assert_eq!(answer.text, "4.50");
    assert_eq!(fake.call_count(), 1);
    // the preprocessed question is what gets forwarded
    assert_eq!(fake.last_question().as_deref(), Some("average days to close a work order"));
}

#[tokio::test]
async fn test_fallback_error_becomes_apology() {
    let (engine, _, records) = setup(FakeAnalyticsClient::always_error(AnalyticsError::HttpError(
        "connection refused".to_string(),
    )));
    let answer = engine.ask("why do trucks break down", &records).await;
    assert!(answer.text.starts_with(ERROR_PREFIX));
    assert!(answer.text.contains("connection refused"));
    assert!(!answer.is_ok());
}

#[tokio::test]
async fn test_fallback_retries_then_succeeds() {
    let fake = FakeAnalyticsClient::new(vec![
        Err(AnalyticsError::EmptyResponse),
        Ok(json!({"type": "string", "value": "Brakes"})),
    ]);
    let (engine, fake, records) = setup(fake);
    let engine = engine.with_max_retries(2);
    let answer = engine.ask("which part fails first", &records).await;
    assert_eq!(answer.text, "Brakes");
    assert_eq!(answer.attempts, 2);
    assert_eq!(fake.call_count(), 2);
}

#[tokio::test]
async fn test_retries_are_capped() {
    let (engine, fake, records) = setup(FakeAnalyticsClient::always_error(AnalyticsError::EmptyResponse));
    let engine = engine.with_max_retries(50);
    let answer = engine.ask("which part fails first", &records).await;
    assert!(!answer.is_ok());
    assert_eq!(fake.call_count() as u32, 1 + MAX_RETRIES_CAP);
}

#[tokio::test]
async fn test_disabled_fallback_is_not_retried() {
    let (engine, fake, records) = setup(FakeAnalyticsClient::always_error(AnalyticsError::Disabled));
    let engine = engine.with_max_retries(3);
    let text = engine.answer("which part fails first", &records).await;
    assert!(text.starts_with(ERROR_PREFIX));
    assert_eq!(fake.call_count(), 1);
}

#[tokio::test]
async fn test_slow_fallback_times_out() {
    let slow = FakeAnalyticsClient::always_valid(json!(1)).with_delay(Duration::from_millis(300));
    let (engine, _, records) = setup(slow);
    let engine = engine
        .with_timeout(Duration::from_millis(20))
        .with_max_retries(0);
    let answer = engine.ask("which part fails first", &records).await;
    assert!(answer.text.starts_with(ERROR_PREFIX));
    let error = answer.error.unwrap();
    assert!(error.contains("timeout after 20 ms"), "{}", error);
}

#[tokio::test]
async fn test_empty_query() {
    let (engine, fake, records) = setup(FakeAnalyticsClient::new(vec![]));
    assert_eq!(engine.answer("", &records).await, "Please provide a query.");
    assert_eq!(fake.call_count(), 0);
}
