//! Kardex Common - fault classification and query answering for work orders
//!
//! Records flow one way: ingest → classify → aggregate → answer questions.
//! The taxonomy is the only configuration the core needs; everything else
//! is computed from the records on demand.

pub mod analytics_client;
pub mod answer_format;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod query_engine;
pub mod query_intent;
pub mod record;
pub mod stats;
pub mod taxonomy;
pub mod vehicle_types;

pub use analytics_client::{AnalyticsConfig, AnalyticsError, AnalyticsFallback, FakeAnalyticsClient, HttpAnalyticsClient};
pub use answer_format::{format_response, ResponseFormatter, NO_DATA};
pub use classifier::{ClassificationResult, FaultClassifier, UNCATEGORIZED};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::KardexConfig;
pub use dispatch::{dispatch, DispatchResult, FallbackAnswer};
pub use error::{KardexError, Result, TaxonomyError};
pub use ingest::{load_records, IngestReport};
pub use query_engine::{QueryAnswer, QueryEngine};
pub use query_intent::{FaultType, IntentKind, QueryEntities, QueryIntent, QueryResolver};
pub use record::{FaultRecord, RecordFilter, Severity, YearMonth};
pub use stats::{statistics, top_n, FaultStatistics, RankedCategory, SeverityCounts};
pub use taxonomy::{Category, Subcategory, Taxonomy};
