//! Query Intent Resolver - natural language questions to structured intents
//!
//! Resolution is keyword based and never fails: anything not recognized is
//! `IntentKind::Generic` and goes to the analytics fallback.
//!
//! Examples:
//! - "top 5 brake faults in 2022" → TopN, n=5, Brakes, 2022
//! - "show me all faults on 14ft trucks" → List, vehicle 14 ft
//! - "how many electrical problems last year" → Count, Electrical, year-1
//! - "faults per vehicle type" → VehicleTypeDistribution
//! - "which months had the most faults" → MonthlyTrend

use crate::classifier::FaultClassifier;
use crate::clock::Clock;
use crate::record::RecordFilter;
use crate::taxonomy::{Category, Taxonomy};
use crate::vehicle_types::extract_vehicle_type;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Ranking size when a question does not name one
pub const DEFAULT_TOP_N: usize = 3;

const NUMBER_WORDS: &[(&str, usize)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

const RANKING_WORDS: &[&str] = &[
    "top", "most", "highest", "biggest", "largest", "frequent", "worst", "busiest", "peak",
];
const LIST_PHRASES: &[&str] = &["list", "show all", "all the", "what are the", "which are the", "every"];
const COUNT_PHRASES: &[&str] = &["how many", "count", "number of", "total"];
const YEAR_WORDS: &[&str] = &["year", "years", "yearly", "annual", "annually", "when"];
/// Ask for one count per year, so they outrank the count phrases
const YEAR_BUCKET_PHRASES: &[&str] = &[
    "per year",
    "by year",
    "each year",
    "every year",
    "year by year",
    "yearly",
    "annual",
    "annually",
];
const DISTRIBUTION_WORDS: &[&str] = &[
    "distribution",
    "breakdown",
    "categories",
    "category",
    "percentage",
    "percentages",
    "split",
    "types of fault",
    "types of faults",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    VehicleTypeDistribution,
    MonthlyTrend,
    TopN,
    List,
    Count,
    Year,
    CategoryDistribution,
    Generic,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::VehicleTypeDistribution => "vehicle_type_distribution",
            IntentKind::MonthlyTrend => "monthly_trend",
            IntentKind::TopN => "top_n",
            IntentKind::List => "list",
            IntentKind::Count => "count",
            IntentKind::Year => "year",
            IntentKind::CategoryDistribution => "category_distribution",
            IntentKind::Generic => "generic",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault type mentioned in a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultType {
    pub main: String,
    pub sub: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEntities {
    /// First year named (or implied by "last year" and friends)
    pub year: Option<i32>,
    /// Every literal year named, in order of appearance
    #[serde(default)]
    pub years: Vec<i32>,
    pub vehicle_type: Option<String>,
    pub fault_type: Option<FaultType>,
    pub top_n: Option<usize>,
    pub by_subcategory: bool,
}

impl QueryEntities {
    /// Record filter built from the year(s), vehicle type and fault type.
    /// Two or more literal years widen the scope to all of them.
    pub fn filter(&self) -> RecordFilter {
        let (year, years) = if self.years.len() > 1 {
            (None, self.years.clone())
        } else {
            (self.year, Vec::new())
        };
        RecordFilter {
            year,
            years,
            vehicle_type: self.vehicle_type.clone(),
            main_category: self.fault_type.as_ref().map(|f| f.main.clone()),
            sub_category: self.fault_type.as_ref().and_then(|f| f.sub.clone()),
        }
    }

    pub fn limit(&self) -> usize {
        self.top_n.unwrap_or(DEFAULT_TOP_N)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub kind: IntentKind,
    pub entities: QueryEntities,
    /// Preprocessed question, forwarded as-is to the analytics fallback
    pub normalized_query: String,
}

pub struct QueryResolver {
    taxonomy: Arc<Taxonomy>,
    clock: Arc<dyn Clock>,
    default_top_n: usize,
}

impl QueryResolver {
    /// Share the classifier's keyword tables
    pub fn new(classifier: &FaultClassifier, clock: Arc<dyn Clock>) -> Self {
        Self::with_taxonomy(Arc::clone(classifier.taxonomy()), clock)
    }

    pub fn with_taxonomy(taxonomy: Arc<Taxonomy>, clock: Arc<dyn Clock>) -> Self {
        Self {
            taxonomy,
            clock,
            default_top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_default_top_n(mut self, n: usize) -> Self {
        self.default_top_n = n.max(1);
        self
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Resolve a question into an intent
    pub fn resolve(&self, query: &str) -> QueryIntent {
        let normalized = preprocess(query);
        let words = Words::new(&normalized);

        let mut entities = QueryEntities {
            year: self.extract_year(&normalized),
            years: extract_years(&normalized),
            vehicle_type: extract_vehicle_type(&normalized).map(str::to_string),
            fault_type: self.extract_fault_type(&normalized),
            top_n: extract_top_n(&normalized),
            by_subcategory: mentions_subcategories(&words),
        };

        let ranking = has_ranking_word(&words);
        let kind = classify_intent(&normalized, &words, &entities, ranking);
        // "faults per month" wants the whole trend; only rankings get a default size
        let ranked = kind == IntentKind::TopN || (kind == IntentKind::MonthlyTrend && ranking);
        if ranked && entities.top_n.is_none() {
            entities.top_n = Some(self.default_top_n);
        }

        tracing::debug!("Resolved '{}' as {} ({:?})", normalized, kind, entities);
        QueryIntent {
            kind,
            entities,
            normalized_query: normalized,
        }
    }

    /// Literal year first, then relative phrases against the clock
    pub fn extract_year(&self, query: &str) -> Option<i32> {
        if let Some(year) = year_pattern()
            .captures(query)
            .and_then(|c| c[1].parse::<i32>().ok())
        {
            return Some(year);
        }

        let words = Words::new(query);
        let current = self.clock.current_year();
        if words.has("this year") || words.has("current year") {
            Some(current)
        } else if words.has("last year") || words.has("previous year") {
            Some(current - 1)
        } else if words.has("next year") {
            Some(current + 1)
        } else {
            None
        }
    }

    /// First fault type named in the question.
    ///
    /// Category names win over main keywords, which win over sub-category
    /// keywords; within a pass the taxonomy order decides.
    pub fn extract_fault_type(&self, query: &str) -> Option<FaultType> {
        let words = Words::new(query);
        let categories = self.taxonomy.categories();

        let category = categories
            .iter()
            .find(|c| words.has_term(&c.name))
            .or_else(|| {
                categories
                    .iter()
                    .find(|c| c.keywords.iter().any(|k| words.has_term(k)))
            })
            .or_else(|| {
                categories.iter().find(|c| {
                    c.subcategories
                        .iter()
                        .any(|s| words.has_term(&s.name) || s.keywords.iter().any(|k| words.has_term(k)))
                })
            })?;

        Some(FaultType {
            main: category.name.clone(),
            sub: mentioned_subcategory(category, &words),
        })
    }
}

/// All literal years, deduplicated, in order of appearance
pub fn extract_years(query: &str) -> Vec<i32> {
    let mut years = Vec::new();
    for caps in year_pattern().captures_iter(query) {
        if let Ok(year) = caps[1].parse::<i32>() {
            if !years.contains(&year) {
                years.push(year);
            }
        }
    }
    years
}

fn mentioned_subcategory(category: &Category, words: &Words) -> Option<String> {
    category
        .subcategories
        .iter()
        .find(|s| words.has_term(&s.name))
        .or_else(|| {
            category
                .subcategories
                .iter()
                .find(|s| s.keywords.iter().any(|k| words.has_term(k)))
        })
        .map(|s| s.name.clone())
}

/// Lowercase, strip filler, collapse whitespace, map synonyms to "fault(s)"
pub fn preprocess(query: &str) -> String {
    let lower = query.trim().to_lowercase();
    let lower = lower.trim_end_matches(['?', '!', '.']);
    let stripped = filler_pattern().replace_all(lower, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_article = article_pattern().replace(&collapsed, "");
    synonym_pattern()
        .replace_all(&without_article, "fault${2}")
        .trim()
        .to_string()
}

/// Explicit ranking size: "top 5", "top five", "5 most common"
pub fn extract_top_n(query: &str) -> Option<usize> {
    if let Some(n) = top_digits_pattern()
        .captures(query)
        .and_then(|c| c[1].parse::<usize>().ok())
        .filter(|n| *n > 0)
    {
        return Some(n);
    }

    let words = Words::new(query);
    for (word, n) in NUMBER_WORDS {
        if words.has(&format!("top {}", word)) {
            return Some(*n);
        }
    }

    leading_count_pattern()
        .captures(query)
        .and_then(|c| number_value(&c[1]))
        .filter(|n| *n > 0)
}

fn number_value(token: &str) -> Option<usize> {
    token.parse::<usize>().ok().or_else(|| {
        NUMBER_WORDS
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, n)| *n)
    })
}

fn mentions_subcategories(words: &Words) -> bool {
    words.has("sub") || words.tokens.iter().any(|t| t.starts_with("subcategor"))
}

fn has_ranking_word(words: &Words) -> bool {
    RANKING_WORDS.iter().any(|w| words.has(w))
}

fn classify_intent(normalized: &str, words: &Words, entities: &QueryEntities, ranking: bool) -> IntentKind {
    let months = words.has("month") || words.has("months") || words.has("monthly");

    if vehicle_distribution_pattern().is_match(normalized) {
        IntentKind::VehicleTypeDistribution
    } else if months
        && (ranking || words.has("monthly") || words.has("per month") || words.has("by month") || words.has("trend"))
    {
        IntentKind::MonthlyTrend
    } else if ranking || entities.top_n.is_some() {
        IntentKind::TopN
    } else if mentions_list(words) || normalized.starts_with("all ") {
        IntentKind::List
    } else if YEAR_BUCKET_PHRASES.iter().any(|p| words.has(p)) {
        IntentKind::Year
    } else if COUNT_PHRASES.iter().any(|p| words.has(p)) {
        IntentKind::Count
    } else if entities.year.is_some() || YEAR_WORDS.iter().any(|w| words.has(w)) {
        IntentKind::Year
    } else if DISTRIBUTION_WORDS.iter().any(|w| words.has(w)) {
        IntentKind::CategoryDistribution
    } else {
        IntentKind::Generic
    }
}

/// List triggers; "every year" asks for a per-year count instead
fn mentions_list(words: &Words) -> bool {
    LIST_PHRASES
        .iter()
        .filter(|p| **p != "every" || !words.has("every year"))
        .any(|p| words.has(p))
}

/// Word-boundary phrase matching over the alphanumeric tokens of a text
struct Words {
    tokens: Vec<String>,
    padded: String,
}

impl Words {
    fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let padded = format!(" {} ", tokens.join(" "));
        Self { tokens, padded }
    }

    /// Exact phrase on token boundaries
    fn has(&self, phrase: &str) -> bool {
        self.padded.contains(&format!(" {} ", phrase))
    }

    /// Taxonomy term, tolerating a plural "s" on its last word
    fn has_term(&self, term: &str) -> bool {
        let term = tokenize(term).join(" ");
        !term.is_empty() && (self.has(&term) || self.has(&format!("{}s", term)))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Patterns
// ============================================================================

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\b((?:19|20)\d{2})\b")
}

fn top_digits_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\btop\s+(\d+)\b")
}

fn leading_count_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(
        &RE,
        r"\b(\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten)\s+(?:most|highest|biggest|largest|worst)\b",
    )
}

fn filler_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\b(?:show|tell|give)\s+(?:me|us)\b|\bplease\b")
}

fn article_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^(?:the|a|an)\s+")
}

fn synonym_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\b(problem|issue|failure|defect)(s?)\b")
}

fn vehicle_distribution_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(
        &RE,
        r"\b(?:per|by|each|across|every|which)\s+(?:vehicle|truck)\s*types?\b|\bvehicle\s+types\b",
    )
}
