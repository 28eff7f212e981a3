//! Fault Classifier - weighted keyword scoring against the taxonomy
//!
//! Every category is scored independently:
//!
//! ```text
//! main_score     = main keywords found in text
//! sub_score      = keywords found for the best sub-category
//! match_density  = (main_score + sub_score) / max(1, total keywords of category)
//! category_score = main_score + 0.5 * sub_score + 2 * match_density
//! ```
//!
//! The highest scoring category wins; ties go to the category listed first in
//! the taxonomy. Confidence is derived from the winner's own score and
//! density. Classification is a pure function of (taxonomy, text).

use crate::record::FaultRecord;
use crate::taxonomy::{Category, Taxonomy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Label for text that matched no category
pub const UNCATEGORIZED: &str = "Uncategorized";

const SUB_SCORE_WEIGHT: f64 = 0.5;
const DENSITY_WEIGHT: f64 = 2.0;
const CONFIDENCE_SCORE_DIVISOR: f64 = 4.0;
const CONFIDENCE_DENSITY_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub main_category: String,
    pub sub_category: Option<String>,
    /// 0.0 - 1.0
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn uncategorized() -> Self {
        Self {
            main_category: UNCATEGORIZED.to_string(),
            sub_category: None,
            confidence: 0.0,
        }
    }

    pub fn is_categorized(&self) -> bool {
        self.main_category != UNCATEGORIZED
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::uncategorized()
    }
}

/// Score breakdown for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore<'a> {
    pub category: &'a Category,
    pub main_matches: usize,
    pub best_sub: Option<&'a str>,
    pub sub_matches: usize,
    pub match_density: f64,
    pub score: f64,
}

pub struct FaultClassifier {
    taxonomy: Arc<Taxonomy>,
}

impl FaultClassifier {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    /// Shared keyword tables, also used by the query resolver
    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }

    /// Classify free text. Empty text is Uncategorized with confidence 0.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return ClassificationResult::uncategorized();
        }

        let mut winner: Option<CategoryScore<'_>> = None;
        for category in self.taxonomy.categories() {
            let candidate = score_category(category, &text);
            let best_so_far = winner.as_ref().map(|w| w.score).unwrap_or(0.0);
            // Strictly greater: earlier categories keep ties
            if candidate.score > best_so_far {
                winner = Some(candidate);
            }
        }

        match winner {
            Some(w) => ClassificationResult {
                main_category: w.category.name.clone(),
                sub_category: w.best_sub.map(str::to_string),
                confidence: confidence(w.score, w.match_density),
            },
            None => ClassificationResult::uncategorized(),
        }
    }

    /// Classify text that may be missing altogether
    pub fn classify_optional(&self, text: Option<&str>) -> ClassificationResult {
        text.map(|t| self.classify(t))
            .unwrap_or_else(ClassificationResult::uncategorized)
    }

    pub fn classify_record(&self, record: &FaultRecord) -> ClassificationResult {
        self.classify(&record.classification_text())
    }

    /// Per-category scores for a text, in taxonomy order
    pub fn explain<'a>(&'a self, text: &str) -> Vec<CategoryScore<'a>> {
        let text = text.trim().to_lowercase();
        self.taxonomy
            .categories()
            .iter()
            .map(|c| score_category(c, &text))
            .collect()
    }

    /// Classify every record in place and return how many were categorized
    pub fn classify_all(&self, records: &mut [FaultRecord]) -> usize {
        let mut categorized = 0;
        for record in records.iter_mut() {
            let result = self.classify_record(record);
            if result.is_categorized() {
                categorized += 1;
            }
            record.set_classification(result);
        }
        tracing::debug!(
            "Classified {} records ({} categorized, {} uncategorized)",
            records.len(),
            categorized,
            records.len() - categorized
        );
        categorized
    }
}

fn count_matches(keywords: &[String], text: &str) -> usize {
    keywords.iter().filter(|k| text.contains(k.as_str())).count()
}

fn score_category<'a>(category: &'a Category, text: &str) -> CategoryScore<'a> {
    let main_matches = count_matches(&category.keywords, text);

    let mut best_sub = None;
    let mut sub_matches = 0;
    for sub in &category.subcategories {
        let candidate = count_matches(&sub.keywords, text);
        if candidate > sub_matches {
            best_sub = Some(sub.name.as_str());
            sub_matches = candidate;
        }
    }

    let total_keywords = category.total_keywords().max(1);
    let match_density = (main_matches + sub_matches) as f64 / total_keywords as f64;
    let score = main_matches as f64
        + SUB_SCORE_WEIGHT * sub_matches as f64
        + DENSITY_WEIGHT * match_density;

    CategoryScore {
        category,
        main_matches,
        best_sub,
        sub_matches,
        match_density,
        score,
    }
}

fn confidence(score: f64, match_density: f64) -> f64 {
    (score / CONFIDENCE_SCORE_DIVISOR + match_density * CONFIDENCE_DENSITY_WEIGHT).min(1.0)
}
