//! Fault statistics over classified work orders
//!
//! Everything here is recomputed from the records on every call; nothing is
//! cached. Percentages always divide by the live total of the set passed in,
//! and an empty set yields an empty report.

use crate::classifier::UNCATEGORIZED;
use crate::record::{FaultRecord, Severity, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sub-category bucket for categorized records without a sub-category match
pub const UNSPECIFIED_SUBCATEGORY: &str = "Unspecified";

/// Vehicle type bucket for records with a blank vehicle type
pub const UNKNOWN_VEHICLE_TYPE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainCategoryStats {
    pub name: String,
    pub count: usize,
    /// Share of all records
    pub percentage: f64,
    /// Percentages are relative to this category's count
    pub subcategories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultStatistics {
    pub total_records: usize,
    pub categorized_records: usize,
    /// Sorted by descending count; includes "Uncategorized"
    pub main_categories: Vec<MainCategoryStats>,
    /// Sorted by descending count
    pub vehicle_types: Vec<CategoryCount>,
    #[serde(default)]
    pub severity: SeverityCounts,
}

/// Work orders per severity level, over all records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

impl FaultStatistics {
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }

    pub fn main_category_counts(&self) -> BTreeMap<String, usize> {
        self.main_categories
            .iter()
            .map(|m| (m.name.clone(), m.count))
            .collect()
    }

    pub fn sub_category_counts(&self, main: &str) -> Option<&[CategoryCount]> {
        self.main_categories
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(main))
            .map(|m| m.subcategories.as_slice())
    }

    pub fn vehicle_type_count(&self, vehicle_type: &str) -> Option<usize> {
        self.vehicle_types
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(vehicle_type))
            .map(|v| v.count)
    }
}

/// One entry of a top-N ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCategory {
    pub name: String,
    /// Parent main category, set for sub-category rankings
    pub parent: Option<String>,
    pub count: usize,
    /// Share of the parent category for sub-categories, of all records otherwise
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: YearMonth,
    pub count: usize,
}

#[derive(Default)]
struct MainTally {
    count: usize,
    subs: BTreeMap<String, usize>,
}

#[derive(Default)]
struct VehicleTally {
    categorized: usize,
    all: usize,
}

/// Category, sub-category and vehicle-type rollups.
///
/// Vehicle types count their *categorized* records. A type with no
/// categorized records falls back to counting all of its records so that it
/// never silently disappears from the report.
pub fn statistics<'a, I>(records: I) -> FaultStatistics
where
    I: IntoIterator<Item = &'a FaultRecord>,
{
    let mut total = 0usize;
    let mut categorized = 0usize;
    let mut mains: BTreeMap<String, MainTally> = BTreeMap::new();
    let mut vehicles: BTreeMap<String, VehicleTally> = BTreeMap::new();
    let mut severity = SeverityCounts::default();

    for record in records {
        total += 1;
        severity.add(record.severity);
        let is_categorized = record.is_categorized();

        let main = mains.entry(record.main_category().to_string()).or_default();
        main.count += 1;
        if is_categorized {
            categorized += 1;
            let sub = record.sub_category().unwrap_or(UNSPECIFIED_SUBCATEGORY);
            *main.subs.entry(sub.to_string()).or_default() += 1;
        }

        let vehicle = vehicles.entry(vehicle_label(&record.vehicle_type)).or_default();
        vehicle.all += 1;
        if is_categorized {
            vehicle.categorized += 1;
        }
    }

    if total == 0 {
        return FaultStatistics::default();
    }

    let mut main_categories: Vec<MainCategoryStats> = mains
        .into_iter()
        .map(|(name, tally)| MainCategoryStats {
            percentage: percentage(tally.count, total),
            subcategories: ranked(tally.subs, tally.count),
            name,
            count: tally.count,
        })
        .collect();
    main_categories.sort_by(|a, b| b.count.cmp(&a.count));

    let vehicle_counts: BTreeMap<String, usize> = vehicles
        .into_iter()
        .map(|(name, tally)| {
            let count = if tally.categorized > 0 {
                tally.categorized
            } else {
                tally.all
            };
            (name, count)
        })
        .collect();
    let vehicle_total = vehicle_counts.values().sum();

    tracing::debug!(
        "Computed statistics over {} records ({} categorized, {} categories)",
        total,
        categorized,
        main_categories.len()
    );

    FaultStatistics {
        total_records: total,
        categorized_records: categorized,
        main_categories,
        vehicle_types: ranked(vehicle_counts, vehicle_total),
        severity,
    }
}

/// The `limit` most frequent categories (or sub-categories), highest first.
///
/// "Uncategorized" and the "Unspecified" sub-category bucket are never ranked,
/// but they still count towards the totals the percentages divide by.
pub fn top_n<'a, I>(records: I, limit: usize, by_subcategory: bool) -> Vec<RankedCategory>
where
    I: IntoIterator<Item = &'a FaultRecord>,
{
    let stats = statistics(records);
    let mains = stats
        .main_categories
        .into_iter()
        .filter(|m| m.name != UNCATEGORIZED);

    let mut ranking: Vec<RankedCategory> = if by_subcategory {
        mains
            .flat_map(|main| {
                let parent = main.name;
                main.subcategories
                    .into_iter()
                    .filter(|s| s.name != UNSPECIFIED_SUBCATEGORY)
                    .map(move |s| RankedCategory {
                        name: s.name,
                        parent: Some(parent.clone()),
                        count: s.count,
                        percentage: s.percentage,
                    })
            })
            .collect()
    } else {
        mains
            .map(|m| RankedCategory {
                name: m.name,
                parent: None,
                count: m.count,
                percentage: m.percentage,
            })
            .collect()
    };

    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking.truncate(limit);
    ranking
}

/// Record counts per open-date year, oldest first
pub fn counts_by_year<'a, I>(records: I) -> Vec<YearCount>
where
    I: IntoIterator<Item = &'a FaultRecord>,
{
    let mut years: BTreeMap<i32, usize> = BTreeMap::new();
    for record in records {
        *years.entry(record.year()).or_default() += 1;
    }
    years
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}

/// Record counts per open-date month, oldest first
pub fn counts_by_month<'a, I>(records: I) -> Vec<MonthCount>
where
    I: IntoIterator<Item = &'a FaultRecord>,
{
    let mut months: BTreeMap<YearMonth, usize> = BTreeMap::new();
    for record in records {
        *months.entry(record.month()).or_default() += 1;
    }
    months
        .into_iter()
        .map(|(month, count)| MonthCount { month, count })
        .collect()
}

/// Months with the most work orders, busiest first (ties oldest first)
pub fn busiest_months<'a, I>(records: I, limit: usize) -> Vec<MonthCount>
where
    I: IntoIterator<Item = &'a FaultRecord>,
{
    let mut months = counts_by_month(records);
    months.sort_by(|a, b| b.count.cmp(&a.count));
    months.truncate(limit);
    months
}

fn vehicle_label(vehicle_type: &str) -> String {
    let trimmed = vehicle_type.trim();
    if trimmed.is_empty() {
        UNKNOWN_VEHICLE_TYPE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Counts sorted by descending count; ties stay in name order
fn ranked(counts: BTreeMap<String, usize>, total: usize) -> Vec<CategoryCount> {
    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, count)| CategoryCount {
            percentage: percentage(count, total),
            name,
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassificationResult;
    use chrono::NaiveDate;

    fn record(id: &str, ymd: (i32, u32, u32), vehicle: &str, main: Option<&str>, sub: Option<&str>) -> FaultRecord {
        let date = NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap();
        let mut r = FaultRecord::new(id, date, vehicle, "", "");
        r.set_classification(match main {
            Some(m) => ClassificationResult {
                main_category: m.to_string(),
                sub_category: sub.map(str::to_string),
                confidence: 0.6,
            },
            None => ClassificationResult::uncategorized(),
        });
        r
    }

    fn sample() -> Vec<FaultRecord> {
        vec![
            record("1", (2022, 1, 5), "14 ft", Some("Brakes"), Some("Brake Pads")),
            record("2", (2022, 1, 9), "14 ft", Some("Brakes"), Some("Brake Pads")),
            record("3", (2022, 2, 1), "14 ft", Some("Brakes"), None),
            record("4", (2023, 2, 1), "Lifestyle", Some("Engine"), Some("Cooling System")),
            record("5", (2023, 3, 1), "Lifestyle", None, None),
            record("6", (2023, 3, 2), "24 ft", None, None),
        ]
    }

    #[test]
    fn test_empty_records_give_empty_report() {
        let stats = statistics(&Vec::<FaultRecord>::new());
        assert!(stats.is_empty());
        assert!(stats.main_categories.is_empty());
        assert!(top_n(&Vec::<FaultRecord>::new(), 3, false).is_empty());
    }

    #[test]
    fn test_main_counts_sum_to_total() {
        let records = sample();
        let stats = statistics(&records);
        let counts = stats.main_category_counts();
        assert_eq!(counts.values().sum::<usize>(), records.len());
        assert_eq!(counts["Brakes"], 3);
        assert_eq!(counts[UNCATEGORIZED], 2);

        let pct: f64 = stats.main_categories.iter().map(|m| m.percentage).sum();
        assert!((pct - 100.0).abs() < 1e-9);
        assert_eq!(stats.main_categories[0].name, "Brakes");
    }

    #[test]
    fn test_sub_percentages_relative_to_parent() {
        let stats = statistics(&sample());
        let subs = stats.sub_category_counts("brakes").unwrap();
        assert_eq!(subs[0].name, "Brake Pads");
        assert_eq!(subs[0].count, 2);
        assert!((subs[0].percentage - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(subs[1].name, UNSPECIFIED_SUBCATEGORY);
        assert!(stats.sub_category_counts(UNCATEGORIZED).unwrap().is_empty());
    }

    #[test]
    fn test_vehicle_type_fallback_counts_all_records() {
        let stats = statistics(&sample());
        assert_eq!(stats.vehicle_type_count("14 ft"), Some(3));
        // one categorized Lifestyle record out of two
        assert_eq!(stats.vehicle_type_count("Lifestyle"), Some(1));
        // no categorized 24 ft records: fall back to all of them
        assert_eq!(stats.vehicle_type_count("24 ft"), Some(1));
    }

    #[test]
    fn test_blank_vehicle_type_is_unknown() {
        let records = vec![record("1", (2022, 1, 1), "  ", Some("Brakes"), None)];
        assert_eq!(statistics(&records).vehicle_type_count(UNKNOWN_VEHICLE_TYPE), Some(1));
    }

    #[test]
    fn test_top_n_main() {
        let top = top_n(&sample(), 3, false);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Brakes");
        assert_eq!(top[0].count, 3);
        assert!((top[0].percentage - 50.0).abs() < 1e-9);
        assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_top_n_subcategories_carry_parent() {
        let top = top_n(&sample(), 1, true);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Brake Pads");
        assert_eq!(top[0].parent.as_deref(), Some("Brakes"));
    }

    #[test]
    fn test_time_buckets() {
        let records = sample();
        let years = counts_by_year(&records);
        assert_eq!(years, vec![YearCount { year: 2022, count: 3 }, YearCount { year: 2023, count: 3 }]);

        let months = counts_by_month(&records);
        assert_eq!(months.len(), 4);
        assert_eq!(months[0].month, YearMonth { year: 2022, month: 1 });

        let busiest = busiest_months(&records, 2);
        assert_eq!(busiest[0].month, YearMonth { year: 2022, month: 1 });
        assert_eq!(busiest[1].month, YearMonth { year: 2023, month: 3 });
    }

    #[test]
    fn test_severity_counts() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut records = sample();
        records.push(FaultRecord::new("7", date, "14 ft", "Urgent: brakes gone", ""));
        records.push(FaultRecord::new("8", date, "14 ft", "Routine service", ""));

        let stats = statistics(&records);
        assert_eq!(stats.severity, SeverityCounts { high: 1, medium: 6, low: 1 });
        assert_eq!(stats.severity.get(Severity::High), 1);
        assert_eq!(statistics(&Vec::<FaultRecord>::new()).severity, SeverityCounts::default());
    }

    #[test]
    fn test_statistics_are_idempotent() {
        let records = sample();
        assert_eq!(statistics(&records), statistics(&records));
    }
}
