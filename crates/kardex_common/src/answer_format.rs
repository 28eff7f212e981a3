//! Response Formatter - structured handler results to plain text
//!
//! Deterministic templates, one per result shape:
//! - Ranking → "- Brakes: 40 faults (33.3%)"
//! - Year counts → "- 2022: 45 work orders"
//! - Fallback tables → aligned text columns
//!
//! Empty results always render `NO_DATA`.

use crate::dispatch::{CategorySummary, DispatchResult, FallbackAnswer};
use crate::query_intent::IntentKind;
use crate::record::{FaultRecord, RecordFilter};
use crate::stats::{CategoryCount, MainCategoryStats, MonthCount, RankedCategory, YearCount};
use std::fmt::Write;

pub const NO_DATA: &str = "No data available for analysis.";

/// Records shown before "… and N more"
pub const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct ResponseFormatter {
    list_limit: usize,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self {
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ResponseFormatter {
    pub fn new(list_limit: usize) -> Self {
        Self {
            list_limit: list_limit.max(1),
        }
    }

    pub fn list_limit(&self) -> usize {
        self.list_limit
    }

    pub fn format(&self, kind: IntentKind, result: &DispatchResult) -> String {
        let text = match result {
            DispatchResult::YearCounts { scope, years } => format_years(scope, years),
            DispatchResult::Ranking {
                scope,
                by_subcategory,
                entries,
            } => format_ranking(scope, *by_subcategory, entries),
            DispatchResult::Distribution {
                scope,
                total,
                categories,
                show_subcategories,
            } => format_distribution(scope, *total, categories, *show_subcategories),
            DispatchResult::VehicleTypes { scope, entries } => format_vehicle_types(scope, entries),
            DispatchResult::Monthly {
                scope,
                months,
                ranked,
            } => format_months(scope, months, *ranked),
            DispatchResult::Count { scope, count } => format_count(scope, *count),
            DispatchResult::Records { scope, records } => self.format_records(scope, records),
            DispatchResult::Categories { categories } => format_categories(categories),
            DispatchResult::Fallback { answer } => self.format_fallback(answer),
        };
        tracing::trace!("Formatted {} answer ({} bytes)", kind, text.len());
        text
    }

    // ========================================================================
    // Record lists
    // ========================================================================

    fn format_records(&self, scope: &RecordFilter, records: &[FaultRecord]) -> String {
        if records.is_empty() {
            return NO_DATA.to_string();
        }
        let mut out = format!(
            "{}: {}\n",
            capitalize(&scope.describe()),
            counted(records.len(), "work order")
        );
        for record in records.iter().take(self.list_limit) {
            out.push_str(&record_line(record));
            out.push('\n');
        }
        if records.len() > self.list_limit {
            let _ = writeln!(out, "… and {} more", records.len() - self.list_limit);
        }
        finish(out)
    }

    // ========================================================================
    // Fallback answers
    // ========================================================================

    pub fn format_fallback(&self, answer: &FallbackAnswer) -> String {
        match answer {
            FallbackAnswer::Number(n) => format_number(*n),
            FallbackAnswer::Text(text) if text.trim().is_empty() => NO_DATA.to_string(),
            FallbackAnswer::Text(text) => text.trim().to_string(),
            FallbackAnswer::Table { columns, rows } => self.format_table(columns, rows),
            FallbackAnswer::Other(serde_json::Value::Null) => NO_DATA.to_string(),
            FallbackAnswer::Other(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    /// Left-aligned columns separated by two spaces
    pub fn format_table(&self, columns: &[String], rows: &[Vec<String>]) -> String {
        if rows.is_empty() {
            return NO_DATA.to_string();
        }
        let shown = &rows[..rows.len().min(self.list_limit)];

        let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
        for row in shown {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }

        let render = |cells: &[String]| -> String {
            let line: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    format!("{:<width$}", cell, width = *w)
                })
                .collect();
            line.join("  ").trim_end().to_string()
        };

        let mut out = String::new();
        out.push_str(&render(columns));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in shown {
            out.push_str(&render(row));
            out.push('\n');
        }
        if rows.len() > shown.len() {
            let _ = writeln!(out, "… and {} more", rows.len() - shown.len());
        }
        finish(out)
    }
}

/// Format with the default list limit
pub fn format_response(kind: IntentKind, result: &DispatchResult) -> String {
    ResponseFormatter::default().format(kind, result)
}

// ============================================================================
// Aggregate shapes
// ============================================================================

fn format_years(scope: &RecordFilter, years: &[YearCount]) -> String {
    if years.is_empty() {
        return NO_DATA.to_string();
    }
    let mut out = if scope.is_empty() {
        "Work orders by year:\n".to_string()
    } else {
        format!("{} by year:\n", capitalize(&scope.describe()))
    };
    for y in years {
        let _ = writeln!(out, "- {}: {}", y.year, counted(y.count, "work order"));
    }
    finish(out)
}

fn format_ranking(scope: &RecordFilter, by_subcategory: bool, entries: &[RankedCategory]) -> String {
    if entries.is_empty() {
        return NO_DATA.to_string();
    }
    let what = if by_subcategory {
        "fault sub-categories"
    } else {
        "fault categories"
    };
    let mut out = format!("Top {} {}{}:\n", entries.len(), what, scope_suffix(scope));
    for entry in entries {
        let name = match &entry.parent {
            Some(parent) => format!("{} ({})", entry.name, parent),
            None => entry.name.clone(),
        };
        let _ = writeln!(out, "{}", fault_line(&name, entry.count, entry.percentage));
    }
    finish(out)
}

fn format_distribution(
    scope: &RecordFilter,
    total: usize,
    categories: &[MainCategoryStats],
    show_subcategories: bool,
) -> String {
    if total == 0 {
        return NO_DATA.to_string();
    }
    let mut out = format!("Fault distribution across {} work orders{}:\n", total, scope_suffix(scope));
    for category in categories {
        let _ = writeln!(out, "{}", fault_line(&category.name, category.count, category.percentage));
        if show_subcategories {
            for sub in &category.subcategories {
                let _ = writeln!(out, "  {}", fault_line(&sub.name, sub.count, sub.percentage));
            }
        }
    }
    finish(out)
}

fn format_vehicle_types(scope: &RecordFilter, entries: &[CategoryCount]) -> String {
    if entries.is_empty() {
        return NO_DATA.to_string();
    }
    let mut out = format!("Faults by vehicle type{}:\n", scope_suffix(scope));
    for entry in entries {
        let _ = writeln!(out, "{}", fault_line(&entry.name, entry.count, entry.percentage));
    }
    finish(out)
}

fn format_months(scope: &RecordFilter, months: &[MonthCount], ranked: bool) -> String {
    if months.is_empty() {
        return NO_DATA.to_string();
    }
    let heading = if ranked {
        "Months with the most work orders"
    } else {
        "Work orders by month"
    };
    let mut out = format!("{}{}:\n", heading, scope_suffix(scope));
    for m in months {
        let _ = writeln!(out, "- {}: {}", m.month, counted(m.count, "work order"));
    }
    finish(out)
}

fn format_count(scope: &RecordFilter, count: usize) -> String {
    format!("{}: {}", capitalize(&scope.describe()), count)
}

fn format_categories(categories: &[CategorySummary]) -> String {
    if categories.is_empty() {
        return NO_DATA.to_string();
    }
    let mut out = "Fault categories:\n".to_string();
    for category in categories {
        if category.subcategories.is_empty() {
            let _ = writeln!(out, "- {}", category.name);
        } else {
            let _ = writeln!(out, "- {}: {}", category.name, category.subcategories.join(", "));
        }
    }
    finish(out)
}

// ============================================================================
// Helpers
// ============================================================================

/// `- {name}: {count} faults ({pct:.1}%)`
pub fn fault_line(name: &str, count: usize, percentage: f64) -> String {
    format!("- {}: {} ({:.1}%)", name, counted(count, "fault"), percentage)
}

/// "1 fault", "2 faults", "0 faults"
pub fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn record_line(record: &FaultRecord) -> String {
    let mut text = String::new();
    for part in [&record.nature_of_complaint, &record.job_description] {
        if part.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push_str("; ");
        }
        text.push_str(part);
    }
    let category = match record.sub_category() {
        Some(sub) => format!("{} / {}", record.main_category(), sub),
        None => record.main_category().to_string(),
    };
    format!(
        "- {} ({}, {}): {} [{}]",
        record.work_order_id, record.open_date, record.vehicle_type, text, category
    )
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{:.2}", n)
    }
}

fn scope_suffix(scope: &RecordFilter) -> String {
    if scope.is_empty() {
        String::new()
    } else {
        format!(" ({})", scope.describe())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn finish(mut out: String) -> String {
    while out.ends_with('\n') {
        out.pop();
    }
    out
}
