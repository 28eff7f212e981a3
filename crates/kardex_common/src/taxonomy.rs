//! Fault taxonomy - category → sub-category → keyword tables
//!
//! The taxonomy is the single source of truth for fault keywords: the
//! classifier scores record text against it and the query resolver uses the
//! same tables to spot fault types in questions.
//!
//! YAML layout:
//!
//! ```yaml
//! fault_categories:          # optional wrapper key
//!   Brakes:
//!     keywords: [brake, braking]
//!     subcategories:
//!       Brake Pads:
//!         keywords: [brake pad, pads]
//! ```
//!
//! Document order is preserved and is the classification tie-break order.

use crate::error::TaxonomyError;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::Path;

/// Taxonomy shipped with the crate
pub const BUILTIN_TAXONOMY: &str = include_str!("../../../config/fault_categories.yaml");

/// Optional top-level wrapper key around the category map
const WRAPPER_KEY: &str = "fault_categories";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subcategory {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<String>,
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            subcategories: Vec::new(),
        }
    }

    pub fn with_subcategory(mut self, name: &str, keywords: &[&str]) -> Self {
        self.subcategories.push(Subcategory {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        });
        self
    }

    /// Main keywords plus every sub-category keyword
    pub fn total_keywords(&self) -> usize {
        self.keywords.len()
            + self
                .subcategories
                .iter()
                .map(|s| s.keywords.len())
                .sum::<usize>()
    }

    /// Case-insensitive sub-category lookup
    pub fn subcategory(&self, name: &str) -> Option<&Subcategory> {
        self.subcategories
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    fn is_reachable(&self) -> bool {
        !self.keywords.is_empty() || self.subcategories.iter().any(|s| !s.keywords.is_empty())
    }
}

/// Ordered, validated fault taxonomy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    /// Validate and normalize a list of categories.
    ///
    /// Keywords are trimmed and lower-cased. Sub-categories with no keywords
    /// are allowed (they are simply never selected), but every category must
    /// have at least one keyword somewhere.
    pub fn from_categories(categories: Vec<Category>) -> Result<Self, TaxonomyError> {
        if categories.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(categories.len());

        for mut category in categories {
            category.name = category.name.trim().to_string();
            if category.name.is_empty() {
                return Err(TaxonomyError::Schema(
                    "category names must not be blank".to_string(),
                ));
            }
            if !seen.insert(category.name.to_lowercase()) {
                return Err(TaxonomyError::DuplicateCategory(category.name));
            }

            category.keywords = normalize_keywords(&category.name, category.keywords)?;
            for sub in &mut category.subcategories {
                sub.name = sub.name.trim().to_string();
                sub.keywords = normalize_keywords(&category.name, std::mem::take(&mut sub.keywords))?;
            }

            if !category.is_reachable() {
                return Err(TaxonomyError::Unreachable(category.name));
            }
            normalized.push(category);
        }

        Ok(Self {
            categories: normalized,
        })
    }

    /// Parse a taxonomy from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self, TaxonomyError> {
        let doc: Value = serde_yaml::from_str(text)?;
        let categories = parse_document(doc)?;
        Self::from_categories(categories)
    }

    /// Load a taxonomy file. A missing or malformed file is fatal.
    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        if !path.exists() {
            return Err(TaxonomyError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let taxonomy = Self::from_yaml_str(&text)?;
        tracing::info!(
            "Loaded taxonomy from {}: {} categories, {} keywords",
            path.display(),
            taxonomy.len(),
            taxonomy.keyword_count()
        );
        Ok(taxonomy)
    }

    /// The taxonomy bundled with the crate
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_yaml_str(BUILTIN_TAXONOMY)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Case-insensitive category lookup
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn subcategory(&self, category: &str, subcategory: &str) -> Option<&Subcategory> {
        self.category(category)?.subcategory(subcategory)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn keyword_count(&self) -> usize {
        self.categories.iter().map(Category::total_keywords).sum()
    }
}

fn normalize_keywords(category: &str, keywords: Vec<String>) -> Result<Vec<String>, TaxonomyError> {
    keywords
        .into_iter()
        .map(|k| {
            let k = k.trim().to_lowercase();
            if k.is_empty() {
                Err(TaxonomyError::BlankKeyword {
                    category: category.to_string(),
                })
            } else {
                Ok(k)
            }
        })
        .collect()
}

// ============================================================================
// YAML walking
// ============================================================================

fn parse_document(doc: Value) -> Result<Vec<Category>, TaxonomyError> {
    let root = match doc {
        Value::Mapping(map) => map,
        Value::Null => return Err(TaxonomyError::Empty),
        other => {
            return Err(TaxonomyError::Schema(format!(
                "expected a mapping of categories, found {}",
                value_kind(&other)
            )))
        }
    };

    let root = unwrap_wrapper(root)?;
    let mut categories = Vec::with_capacity(root.len());

    for (key, value) in root {
        let name = key_name(&key, "category")?;
        let body = match value {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            other => {
                return Err(TaxonomyError::Schema(format!(
                    "category '{}' must be a mapping, found {}",
                    name,
                    value_kind(&other)
                )))
            }
        };

        let keywords = match body.get("keywords") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => parse_keyword_list(v, &name)?,
        };

        let subcategories = match body.get("subcategories") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Mapping(subs)) => parse_subcategories(subs, &name)?,
            Some(other) => {
                return Err(TaxonomyError::Schema(format!(
                    "subcategories of '{}' must be a mapping, found {}",
                    name,
                    value_kind(other)
                )))
            }
        };

        categories.push(Category {
            name,
            keywords,
            subcategories,
        });
    }

    Ok(categories)
}

fn unwrap_wrapper(root: Mapping) -> Result<Mapping, TaxonomyError> {
    if root.len() != 1 {
        return Ok(root);
    }
    match root.get(WRAPPER_KEY) {
        Some(Value::Mapping(inner)) => Ok(inner.clone()),
        Some(Value::Null) => Err(TaxonomyError::Empty),
        Some(other) => Err(TaxonomyError::Schema(format!(
            "'{}' must be a mapping, found {}",
            WRAPPER_KEY,
            value_kind(other)
        ))),
        None => Ok(root),
    }
}

fn parse_subcategories(subs: &Mapping, category: &str) -> Result<Vec<Subcategory>, TaxonomyError> {
    let mut out = Vec::with_capacity(subs.len());
    for (key, value) in subs {
        let name = key_name(key, "sub-category")?;
        let keywords = match value {
            Value::Null => Vec::new(),
            Value::Mapping(body) => match body.get("keywords") {
                None | Some(Value::Null) => Vec::new(),
                Some(v) => {
                    let list = parse_keyword_list(v, category)?;
                    if list.is_empty() {
                        return Err(TaxonomyError::EmptySubcategory {
                            category: category.to_string(),
                            subcategory: name,
                        });
                    }
                    list
                }
            },
            other => {
                return Err(TaxonomyError::Schema(format!(
                    "sub-category '{} / {}' must be a mapping, found {}",
                    category,
                    name,
                    value_kind(other)
                )))
            }
        };
        out.push(Subcategory { name, keywords });
    }
    Ok(out)
}

fn parse_keyword_list(value: &Value, category: &str) -> Result<Vec<String>, TaxonomyError> {
    let items = value.as_sequence().ok_or_else(|| {
        TaxonomyError::Schema(format!(
            "keywords of '{}' must be a list, found {}",
            category,
            value_kind(value)
        ))
    })?;

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            // Bare numeric keywords (fault codes such as 404) arrive as numbers
            Value::Number(n) => Ok(n.to_string()),
            other => Err(TaxonomyError::Schema(format!(
                "keyword in '{}' must be a string, found {}",
                category,
                value_kind(other)
            ))),
        })
        .collect()
}

fn key_name(key: &Value, what: &str) -> Result<String, TaxonomyError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        other => Err(TaxonomyError::Schema(format!(
            "{} names must be strings, found {}",
            what,
            value_kind(other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
