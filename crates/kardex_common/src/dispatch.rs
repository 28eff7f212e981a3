//! Deterministic handlers - one pure function per intent kind
//!
//! Handlers only compute. Text is produced by `answer_format`; the generic
//! kind has no handler and goes to the analytics fallback.

use crate::query_intent::{IntentKind, QueryIntent};
use crate::record::{FaultRecord, RecordFilter};
use crate::stats::{
    busiest_months, counts_by_month, counts_by_year, statistics, top_n, CategoryCount, MainCategoryStats,
    MonthCount, RankedCategory, YearCount,
};
use crate::taxonomy::Taxonomy;
use serde::Serialize;
use serde_json::Value;

/// Structured result of a handler (or of the analytics fallback)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchResult {
    YearCounts {
        scope: RecordFilter,
        years: Vec<YearCount>,
    },
    Ranking {
        scope: RecordFilter,
        by_subcategory: bool,
        entries: Vec<RankedCategory>,
    },
    Distribution {
        scope: RecordFilter,
        total: usize,
        categories: Vec<MainCategoryStats>,
        show_subcategories: bool,
    },
    VehicleTypes {
        scope: RecordFilter,
        entries: Vec<CategoryCount>,
    },
    Monthly {
        scope: RecordFilter,
        /// Busiest first when ranked, chronological otherwise
        months: Vec<MonthCount>,
        ranked: bool,
    },
    Count {
        scope: RecordFilter,
        count: usize,
    },
    Records {
        scope: RecordFilter,
        records: Vec<FaultRecord>,
    },
    Categories {
        categories: Vec<CategorySummary>,
    },
    Fallback {
        answer: FallbackAnswer,
    },
}

/// Taxonomy overview entry for "what are the fault categories"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub subcategories: Vec<String>,
}

/// Shape of a value returned by the analytics fallback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FallbackAnswer {
    Number(f64),
    Text(String),
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Other(Value),
}

impl FallbackAnswer {
    /// Interpret a fallback value.
    ///
    /// Understands the `{"type": "number"|"string"|"dataframe", "value": ...}`
    /// envelope, bare scalars, arrays of row objects and column-oriented
    /// objects (`{"col": [..], ..}`). Anything else is kept as raw JSON.
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if let (Some(Value::String(kind)), Some(inner)) = (map.get("type"), map.get("value")) {
                let inner = inner.clone();
                return match kind.as_str() {
                    "number" => match number_of(&inner) {
                        Some(n) => FallbackAnswer::Number(n),
                        None => FallbackAnswer::from_plain(inner),
                    },
                    "string" => match inner {
                        Value::String(s) => FallbackAnswer::Text(s),
                        other => FallbackAnswer::Text(other.to_string()),
                    },
                    "dataframe" => table_of(&inner)
                        .unwrap_or_else(|| FallbackAnswer::from_plain(inner)),
                    _ => FallbackAnswer::from_plain(inner),
                };
            }
        }
        FallbackAnswer::from_plain(value)
    }

    fn from_plain(value: Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(FallbackAnswer::Number)
                .unwrap_or_else(|| FallbackAnswer::Text(n.to_string())),
            Value::String(s) => FallbackAnswer::Text(s),
            other => table_of(&other).unwrap_or(FallbackAnswer::Other(other)),
        }
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn table_of(value: &Value) -> Option<FallbackAnswer> {
    match value {
        // Row-oriented: [{"col": v, ..}, ..]
        Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object) => {
            let mut columns: Vec<String> = Vec::new();
            for row in rows.iter().filter_map(Value::as_object) {
                for key in row.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            let rows = rows
                .iter()
                .filter_map(Value::as_object)
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| row.get(c).map(cell_text).unwrap_or_default())
                        .collect()
                })
                .collect();
            Some(FallbackAnswer::Table { columns, rows })
        }
        // Column-oriented: {"col": [v, ..], ..}
        Value::Object(map) if !map.is_empty() && map.values().all(Value::is_array) => {
            let columns: Vec<String> = map.keys().cloned().collect();
            let height = map
                .values()
                .filter_map(Value::as_array)
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let rows = (0..height)
                .map(|i| {
                    map.values()
                        .map(|col| col.get(i).map(cell_text).unwrap_or_default())
                        .collect()
                })
                .collect();
            Some(FallbackAnswer::Table { columns, rows })
        }
        _ => None,
    }
}

/// Run the handler for a resolved intent. `Generic` has no handler.
pub fn dispatch(intent: &QueryIntent, records: &[FaultRecord], taxonomy: &Taxonomy) -> Option<DispatchResult> {
    let entities = &intent.entities;
    let scope = entities.filter();
    let matching = || scope.iter(records);

    let result = match intent.kind {
        IntentKind::VehicleTypeDistribution => DispatchResult::VehicleTypes {
            entries: statistics(matching()).vehicle_types,
            scope,
        },
        IntentKind::MonthlyTrend => {
            let (months, ranked) = match entities.top_n {
                Some(limit) => (busiest_months(matching(), limit), true),
                None => (counts_by_month(matching()), false),
            };
            DispatchResult::Monthly {
                scope,
                months,
                ranked,
            }
        }
        IntentKind::TopN => {
            // Within a named fault type the interesting ranking is its sub-categories
            let by_subcategory = entities.by_subcategory || entities.fault_type.is_some();
            DispatchResult::Ranking {
                entries: top_n(matching(), entities.limit(), by_subcategory),
                scope,
                by_subcategory,
            }
        }
        IntentKind::List => {
            if scope.is_empty() && mentions_categories(&intent.normalized_query) {
                DispatchResult::Categories {
                    categories: category_summaries(taxonomy),
                }
            } else {
                DispatchResult::Records {
                    records: matching().cloned().collect(),
                    scope,
                }
            }
        }
        IntentKind::Count => DispatchResult::Count {
            count: matching().count(),
            scope,
        },
        IntentKind::Year => DispatchResult::YearCounts {
            years: counts_by_year(matching()),
            scope,
        },
        IntentKind::CategoryDistribution => {
            let stats = statistics(matching());
            DispatchResult::Distribution {
                total: stats.total_records,
                categories: stats.main_categories,
                show_subcategories: entities.by_subcategory || entities.fault_type.is_some(),
                scope,
            }
        }
        IntentKind::Generic => return None,
    };
    Some(result)
}

pub fn category_summaries(taxonomy: &Taxonomy) -> Vec<CategorySummary> {
    taxonomy
        .categories()
        .iter()
        .map(|c| CategorySummary {
            name: c.name.clone(),
            subcategories: c.subcategories.iter().map(|s| s.name.clone()).collect(),
        })
        .collect()
}

fn mentions_categories(query: &str) -> bool {
    query.contains("categor") || query.contains("types of fault")
}
