//! Command handlers
//!
//! Each handler loads what it needs from the [`AppContext`], renders a
//! string with one of the `render_*` functions and prints it. Rendering is
//! kept free of I/O so it can be tested directly.

use crate::cli::{Cli, Commands};
use crate::logging::QueryLogEntry;
use crate::output;
use anyhow::{Context, Result};
use kardex_common::analytics_client::{AnalyticsFallback, HttpAnalyticsClient};
use kardex_common::answer_format::{fault_line, format_response, ResponseFormatter, NO_DATA};
use kardex_common::classifier::{ClassificationResult, FaultClassifier};
use kardex_common::clock::SystemClock;
use kardex_common::config::KardexConfig;
use kardex_common::dispatch::DispatchResult;
use kardex_common::ingest::load_records;
use kardex_common::query_engine::QueryEngine;
use kardex_common::query_intent::{IntentKind, QueryResolver};
use kardex_common::record::{FaultRecord, RecordFilter};
use kardex_common::stats::{statistics, top_n, FaultStatistics};
use kardex_common::taxonomy::Taxonomy;
use kardex_common::KardexError;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Loaded configuration plus the validated taxonomy
pub struct AppContext {
    pub config: KardexConfig,
    pub taxonomy: Arc<Taxonomy>,
}

impl AppContext {
    /// `taxonomy_override` wins over `[taxonomy] path` in the config file
    pub fn load(config_path: Option<&Path>, taxonomy_override: Option<&Path>) -> Result<Self> {
        let config = KardexConfig::load(config_path)
            .map_err(|e| KardexError::Config(format!("{:#}", e)))?;
        Self::from_config(config, taxonomy_override)
    }

    pub fn from_config(config: KardexConfig, taxonomy_override: Option<&Path>) -> Result<Self> {
        let taxonomy = match taxonomy_override {
            Some(path) => Taxonomy::load(path),
            None => config.load_taxonomy(),
        }
        .map_err(KardexError::Configuration)?;

        tracing::info!(
            "Taxonomy ready: {} categories, {} keywords",
            taxonomy.len(),
            taxonomy.keyword_count()
        );
        Ok(Self {
            config,
            taxonomy: Arc::new(taxonomy),
        })
    }

    pub fn classifier(&self) -> FaultClassifier {
        FaultClassifier::new(self.taxonomy.clone())
    }

    /// Load and classify a record file
    pub fn load_records(&self, path: &Path) -> Result<Vec<FaultRecord>> {
        let (mut records, report) = load_records(path)
            .with_context(|| format!("Failed to load records from {}", path.display()))?;
        if report.skipped > 0 {
            output::display_warning(&format!(
                "Skipped {} row(s) without a usable open date",
                report.skipped
            ));
        }
        let categorized = self.classifier().classify_all(&mut records);
        tracing::info!(
            "Loaded {} records from {} ({} categorized)",
            records.len(),
            path.display(),
            categorized
        );
        Ok(records)
    }

    /// Query engine wired to the HTTP analytics fallback
    pub fn query_engine(&self) -> QueryEngine {
        let resolver = QueryResolver::with_taxonomy(self.taxonomy.clone(), Arc::new(SystemClock))
            .with_default_top_n(self.config.output.default_top_n);
        let fallback: Arc<dyn AnalyticsFallback> =
            Arc::new(HttpAnalyticsClient::new(self.config.analytics.clone()));
        QueryEngine::new(resolver, fallback)
            .with_formatter(ResponseFormatter::new(self.config.output.list_limit))
            .with_timeout(Duration::from_secs(self.config.analytics.timeout_secs))
            .with_max_retries(self.config.analytics.max_retries)
    }
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::load(cli.config.as_deref(), cli.taxonomy.as_deref())?;

    match cli.command {
        Commands::Classify { text, json } => classify(&ctx, &text.join(" "), json),
        Commands::Taxonomy { json } => taxonomy(&ctx, json),
        Commands::Stats { records, json } => stats(&ctx, &records, json),
        Commands::Top {
            records,
            n,
            sub,
            json,
        } => top(&ctx, &records, n, sub, json),
        Commands::Ask {
            records,
            question,
            json,
        } => ask(&ctx, &records, &question.join(" "), json).await,
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn classify(ctx: &AppContext, text: &str, json: bool) -> Result<()> {
    let result = ctx.classifier().classify(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        output::display_classification(&result, &render_classification(&result));
    }
    Ok(())
}

fn taxonomy(ctx: &AppContext, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ctx.taxonomy.categories())?);
    } else {
        output::display_heading(&format!(
            "Fault taxonomy: {} categories, {} keywords",
            ctx.taxonomy.len(),
            ctx.taxonomy.keyword_count()
        ));
        println!("{}", render_taxonomy(&ctx.taxonomy));
    }
    Ok(())
}

fn stats(ctx: &AppContext, path: &Path, json: bool) -> Result<()> {
    let records = ctx.load_records(path)?;
    let stats = statistics(&records);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", render_stats(&stats));
    }
    Ok(())
}

fn top(ctx: &AppContext, path: &Path, n: Option<usize>, sub: bool, json: bool) -> Result<()> {
    let records = ctx.load_records(path)?;
    let limit = n.unwrap_or(ctx.config.output.default_top_n);
    if json {
        let entries = top_n(&records, limit, sub);
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", render_top(&records, limit, sub));
    }
    Ok(())
}

async fn ask(ctx: &AppContext, path: &Path, question: &str, json: bool) -> Result<()> {
    let records = ctx.load_records(path)?;
    let engine = ctx.query_engine();
    let answer = engine.ask(question, &records).await;

    if let Err(e) = QueryLogEntry::from_answer(question, records.len(), &answer).write() {
        tracing::warn!("Failed to write query log: {}", e);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        output::display_answer(&answer);
    }
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

pub fn render_classification(result: &ClassificationResult) -> String {
    let mut out = format!("Category: {}", result.main_category);
    if let Some(sub) = &result.sub_category {
        let _ = write!(out, " / {}", sub);
    }
    let _ = write!(out, " (confidence {:.2})", result.confidence);
    out
}

pub fn render_taxonomy(taxonomy: &Taxonomy) -> String {
    let mut out = String::new();
    for category in taxonomy.categories() {
        let _ = writeln!(out, "{}: {}", category.name, category.keywords.join(", "));
        for sub in &category.subcategories {
            let _ = writeln!(out, "  - {}: {}", sub.name, sub.keywords.join(", "));
        }
    }
    out.trim_end().to_string()
}

pub fn render_stats(stats: &FaultStatistics) -> String {
    if stats.is_empty() {
        return NO_DATA.to_string();
    }
    let mut out = format!(
        "{} work orders, {} categorized\n\nCategories:\n",
        stats.total_records, stats.categorized_records
    );
    for main in &stats.main_categories {
        let _ = writeln!(out, "{}", fault_line(&main.name, main.count, main.percentage));
        for sub in &main.subcategories {
            let _ = writeln!(out, "  {}", fault_line(&sub.name, sub.count, sub.percentage));
        }
    }
    out.push_str("\nVehicle types:\n");
    for vehicle in &stats.vehicle_types {
        let _ = writeln!(out, "{}", fault_line(&vehicle.name, vehicle.count, vehicle.percentage));
    }
    let _ = write!(
        out,
        "\nSeverity: {} high, {} medium, {} low",
        stats.severity.high, stats.severity.medium, stats.severity.low
    );
    out.trim_end().to_string()
}

/// Same wording as a "top N" question
pub fn render_top(records: &[FaultRecord], limit: usize, by_subcategory: bool) -> String {
    let result = DispatchResult::Ranking {
        scope: RecordFilter::default(),
        by_subcategory,
        entries: top_n(records, limit, by_subcategory),
    };
    format_response(IntentKind::TopN, &result)
}
