//! Known vehicle types and spelling-tolerant matching
//!
//! Kardex sheets and user questions spell vehicle sizes many ways
//! ("14ft", "14 FT", "14 feet", "14-foot"). Everything is compared through
//! `normalize_vehicle_type`.

use regex::Regex;
use std::sync::OnceLock;

/// Canonical name and the pattern that recognizes it in a question
const KNOWN_VEHICLE_TYPES: &[(&str, &str)] = &[
    ("10 ft", r"\b10\s*-?\s*(?:ft|feet|foot|footer)\b"),
    ("14 ft", r"\b14\s*-?\s*(?:ft|feet|foot|footer)\b"),
    ("16 ft", r"\b16\s*-?\s*(?:ft|feet|foot|footer)\b"),
    ("24 ft", r"\b24\s*-?\s*(?:ft|feet|foot|footer)\b"),
    ("Lifestyle", r"\blife\s*-?\s*styles?\b"),
    ("Prime Mover", r"\bprime\s*-?\s*movers?\b"),
];

fn patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        KNOWN_VEHICLE_TYPES
            .iter()
            .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (re, *name)))
            .collect()
    })
}

fn unit_pattern() -> &'static Regex {
    static UNIT: OnceLock<Regex> = OnceLock::new();
    UNIT.get_or_init(|| Regex::new(r"(?:footer|feet|foot)\b").expect("static regex"))
}

/// Canonical names of the vehicle types recognized in questions
pub fn known_vehicle_types() -> Vec<&'static str> {
    KNOWN_VEHICLE_TYPES.iter().map(|(name, _)| *name).collect()
}

/// Find the first known vehicle type mentioned in a (lower-cased) question
pub fn extract_vehicle_type(query: &str) -> Option<&'static str> {
    let query = query.to_lowercase();
    patterns()
        .iter()
        .filter_map(|(re, name)| re.find(&query).map(|m| (m.start(), *name)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, name)| name)
}

/// Lower-case, unify length units to "ft", drop separators
pub fn normalize_vehicle_type(value: &str) -> String {
    let lower = value.to_lowercase();
    unit_pattern()
        .replace_all(&lower, "ft")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Does a record's vehicle type refer to the wanted type?
///
/// Sheet names often carry extra words ("14FT Box Truck"), so the wanted type
/// only has to appear inside the normalized record type.
pub fn vehicle_type_matches(record_type: &str, wanted: &str) -> bool {
    let wanted = normalize_vehicle_type(wanted);
    if wanted.is_empty() {
        return false;
    }
    normalize_vehicle_type(record_type).contains(&wanted)
}
