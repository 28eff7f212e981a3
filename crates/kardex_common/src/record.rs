//! Work-order records and filters over them
//!
//! Records are plain values held in an ordinary `Vec`. Filtering is done with
//! free functions and `RecordFilter`, never by wrapping a table type.

use crate::classifier::{ClassificationResult, UNCATEGORIZED};
use crate::vehicle_types::vehicle_type_matches;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One maintenance work order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    #[serde(alias = "wo_no", alias = "work_order")]
    pub work_order_id: String,
    pub open_date: NaiveDate,
    #[serde(default, alias = "done_date")]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub nature_of_complaint: String,
    #[serde(default, alias = "description")]
    pub job_description: String,
    /// Derived from urgency words in the complaint and job text
    #[serde(default)]
    pub severity: Severity,
    /// Set once at ingestion; only changed by explicit re-classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
}

impl FaultRecord {
    pub fn new(
        work_order_id: &str,
        open_date: NaiveDate,
        vehicle_type: &str,
        nature_of_complaint: &str,
        job_description: &str,
    ) -> Self {
        Self {
            work_order_id: work_order_id.to_string(),
            open_date,
            completion_date: None,
            vehicle_type: vehicle_type.to_string(),
            nature_of_complaint: nature_of_complaint.to_string(),
            job_description: job_description.to_string(),
            severity: Severity::from_text(&format!("{} {}", nature_of_complaint, job_description)),
            classification: None,
        }
    }

    pub fn with_completion_date(mut self, date: NaiveDate) -> Self {
        self.completion_date = Some(date);
        self
    }

    /// Complaint and job description joined and case-folded
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.nature_of_complaint, self.job_description)
            .trim()
            .to_lowercase()
    }

    pub fn set_classification(&mut self, result: ClassificationResult) {
        self.classification = Some(result);
    }

    pub fn main_category(&self) -> &str {
        self.classification
            .as_ref()
            .map(|c| c.main_category.as_str())
            .unwrap_or(UNCATEGORIZED)
    }

    pub fn sub_category(&self) -> Option<&str> {
        self.classification
            .as_ref()
            .and_then(|c| c.sub_category.as_deref())
    }

    pub fn confidence(&self) -> f64 {
        self.classification.as_ref().map(|c| c.confidence).unwrap_or(0.0)
    }

    pub fn is_categorized(&self) -> bool {
        self.classification
            .as_ref()
            .map(ClassificationResult::is_categorized)
            .unwrap_or(false)
    }

    pub fn year(&self) -> i32 {
        self.open_date.year()
    }

    pub fn month(&self) -> YearMonth {
        YearMonth {
            year: self.open_date.year(),
            month: self.open_date.month(),
        }
    }
}

/// Calendar month bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

const HIGH_SEVERITY_WORDS: &[&str] = &["urgent", "emergency", "critical"];
const LOW_SEVERITY_WORDS: &[&str] = &["routine", "regular", "normal"];

/// Urgency of a work order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    /// High on urgent wording, low on routine wording, medium otherwise.
    /// Urgent wording wins when both appear; only whole words count.
    pub fn from_text(text: &str) -> Self {
        let text = text.to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let mentions = |list: &[&str]| words.iter().any(|w| list.contains(w));
        if mentions(HIGH_SEVERITY_WORDS) {
            Severity::High
        } else if mentions(LOW_SEVERITY_WORDS) {
            Severity::Low
        } else {
            Severity::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunctive filter over records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub year: Option<i32>,
    /// Any of these years; checked alongside `year`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub years: Vec<i32>,
    pub vehicle_type: Option<String>,
    pub main_category: Option<String>,
    pub sub_category: Option<String>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.year.is_none()
            && self.years.is_empty()
            && self.vehicle_type.is_none()
            && self.main_category.is_none()
            && self.sub_category.is_none()
    }

    pub fn matches(&self, record: &FaultRecord) -> bool {
        if let Some(year) = self.year {
            if record.year() != year {
                return false;
            }
        }
        if !self.years.is_empty() && !self.years.contains(&record.year()) {
            return false;
        }
        if let Some(vehicle_type) = &self.vehicle_type {
            if !vehicle_type_matches(&record.vehicle_type, vehicle_type) {
                return false;
            }
        }
        if let Some(main) = &self.main_category {
            if !record.main_category().eq_ignore_ascii_case(main) {
                return false;
            }
        }
        if let Some(sub) = &self.sub_category {
            match record.sub_category() {
                Some(s) if s.eq_ignore_ascii_case(sub) => {}
                _ => return false,
            }
        }
        true
    }

    pub fn iter<'a>(&'a self, records: &'a [FaultRecord]) -> impl Iterator<Item = &'a FaultRecord> + 'a {
        records.iter().filter(move |r| self.matches(r))
    }

    /// Human-readable scope, e.g. "Brakes faults on 14 ft vehicles in 2022"
    pub fn describe(&self) -> String {
        let mut out = match (&self.main_category, &self.sub_category) {
            (Some(main), Some(sub)) => format!("{} / {} faults", main, sub),
            (Some(main), None) => format!("{} faults", main),
            _ => "faults".to_string(),
        };
        if let Some(vehicle_type) = &self.vehicle_type {
            out.push_str(&format!(" on {} vehicles", vehicle_type));
        }
        if let Some(year) = self.year {
            out.push_str(&format!(" in {}", year));
        } else if !self.years.is_empty() {
            out.push_str(&format!(" in {}", join_years(&self.years)));
        }
        out
    }
}

/// "2021", "2021 and 2022", "2021, 2022 and 2023"
fn join_years(years: &[i32]) -> String {
    let names: Vec<String> = years.iter().map(i32::to_string).collect();
    match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

pub fn filter_records<'a>(records: &'a [FaultRecord], filter: &RecordFilter) -> Vec<&'a FaultRecord> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

pub fn filter_by_year(records: &[FaultRecord], year: i32) -> Vec<&FaultRecord> {
    records.iter().filter(|r| r.year() == year).collect()
}

pub fn filter_by_vehicle_type<'a>(records: &'a [FaultRecord], vehicle_type: &str) -> Vec<&'a FaultRecord> {
    records
        .iter()
        .filter(|r| vehicle_type_matches(&r.vehicle_type, vehicle_type))
        .collect()
}

/// Records of a main category, optionally narrowed to one sub-category
pub fn filter_by_fault_type<'a>(
    records: &'a [FaultRecord],
    main_category: &str,
    sub_category: Option<&str>,
) -> Vec<&'a FaultRecord> {
    let filter = RecordFilter {
        main_category: Some(main_category.to_string()),
        sub_category: sub_category.map(str::to_string),
        ..RecordFilter::default()
    };
    filter_records(records, &filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn classified(id: &str, y: i32, vehicle: &str, main: &str, sub: Option<&str>) -> FaultRecord {
        let mut r = FaultRecord::new(id, date(y, 3, 1), vehicle, "", "");
        r.set_classification(ClassificationResult {
            main_category: main.to_string(),
            sub_category: sub.map(str::to_string),
            confidence: 0.5,
        });
        r
    }

    #[test]
    fn test_classification_text() {
        let r = FaultRecord::new("WO1", date(2023, 1, 2), "14 ft", "Brake NOISE", "Replace pads");
        assert_eq!(r.classification_text(), "brake noise replace pads");
    }

    #[test]
    fn test_unclassified_record_reads_as_uncategorized() {
        let r = FaultRecord::new("WO1", date(2023, 1, 2), "14 ft", "", "");
        assert_eq!(r.main_category(), UNCATEGORIZED);
        assert!(r.sub_category().is_none());
        assert!(!r.is_categorized());
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let records = vec![
            classified("1", 2022, "14FT", "Brakes", Some("Brake Pads")),
            classified("2", 2023, "14 ft", "Brakes", None),
            classified("3", 2022, "Lifestyle", "Engine", None),
        ];

        let filter = RecordFilter {
            year: Some(2022),
            vehicle_type: Some("14 ft".to_string()),
            ..Default::default()
        };
        let ids: Vec<&str> = filter.iter(&records).map(|r| r.work_order_id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);

        let filter = RecordFilter {
            main_category: Some("brakes".to_string()),
            sub_category: Some("brake pads".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_records(&records, &filter).len(), 1);
        assert_eq!(filter_records(&records, &RecordFilter::default()).len(), 3);
    }

    #[test]
    fn test_free_filters() {
        let records = vec![
            classified("1", 2022, "14FT", "Brakes", None),
            classified("2", 2023, "Lifestyle", "Engine", None),
        ];
        assert_eq!(filter_by_year(&records, 2023).len(), 1);
        assert_eq!(filter_by_vehicle_type(&records, "14 feet").len(), 1);
        assert_eq!(filter_by_fault_type(&records, "engine", None).len(), 1);
        assert!(filter_by_fault_type(&records, "Engine", Some("Cooling System")).is_empty());
    }

    #[test]
    fn test_describe() {
        let filter = RecordFilter {
            year: Some(2022),
            vehicle_type: Some("14 ft".to_string()),
            main_category: Some("Brakes".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.describe(), "Brakes faults on 14 ft vehicles in 2022");
        assert_eq!(RecordFilter::default().describe(), "faults");

        let filter = RecordFilter {
            years: vec![2021, 2022, 2023],
            ..Default::default()
        };
        assert_eq!(filter.describe(), "faults in 2021, 2022 and 2023");
    }

    #[test]
    fn test_year_set_filter() {
        let records = vec![
            classified("1", 2021, "14 ft", "Brakes", None),
            classified("2", 2022, "14 ft", "Brakes", None),
            classified("3", 2023, "14 ft", "Engine", None),
        ];
        let filter = RecordFilter {
            years: vec![2021, 2023],
            ..Default::default()
        };
        let ids: Vec<&str> = filter.iter(&records).map(|r| r.work_order_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_severity_from_wording() {
        assert_eq!(Severity::from_text("URGENT: brake failure"), Severity::High);
        assert_eq!(Severity::from_text("Critical leak, routine check due"), Severity::High);
        assert_eq!(Severity::from_text("Routine service"), Severity::Low);
        assert_eq!(Severity::from_text("Brake noise"), Severity::Medium);
        assert_eq!(Severity::from_text("Abnormal noise"), Severity::Medium);

        let r = FaultRecord::new("WO1", date(2023, 1, 2), "14 ft", "Emergency call-out", "Tow");
        assert_eq!(r.severity, Severity::High);
    }

    #[test]
    fn test_year_month_display() {
        assert_eq!(YearMonth { year: 2023, month: 4 }.to_string(), "2023-04");
    }
}
