//! Fault classifier behaviour over the bundled taxonomy

use chrono::NaiveDate;
use kardex_common::classifier::{ClassificationResult, FaultClassifier, UNCATEGORIZED};
use kardex_common::record::FaultRecord;
use kardex_common::taxonomy::{Category, Taxonomy};
use std::sync::Arc;

fn builtin_classifier() -> FaultClassifier {
    FaultClassifier::new(Arc::new(Taxonomy::builtin().unwrap()))
}

// ============================================================================
// Keyword property
// ============================================================================

/// Does `keyword` contain a keyword of some category other than `owner`?
fn overlaps_other_category(taxonomy: &Taxonomy, owner: &str, keyword: &str) -> bool {
    taxonomy
        .categories()
        .iter()
        .filter(|c| c.name != owner)
        .any(|c| {
            c.keywords
                .iter()
                .chain(c.subcategories.iter().flat_map(|s| s.keywords.iter()))
                .any(|k| keyword.contains(k.as_str()))
        })
}

#[test]
fn test_each_main_keyword_classifies_to_its_category() {
    let classifier = builtin_classifier();
    let taxonomy = Arc::clone(classifier.taxonomy());

    for category in taxonomy.categories() {
        for keyword in &category.keywords {
            if overlaps_other_category(&taxonomy, &category.name, keyword) {
                continue;
            }
            let result = classifier.classify(keyword);
            assert_eq!(result.main_category, category.name, "keyword '{}'", keyword);
            assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        }
    }
}

#[test]
fn test_each_sub_keyword_selects_its_subcategory() {
    let classifier = builtin_classifier();
    let taxonomy = Arc::clone(classifier.taxonomy());

    for category in taxonomy.categories() {
        for sub in &category.subcategories {
            for keyword in &sub.keywords {
                if overlaps_other_category(&taxonomy, &category.name, keyword) {
                    continue;
                }
                let result = classifier.classify(keyword);
                assert_eq!(result.main_category, category.name, "keyword '{}'", keyword);
                assert!(result.sub_category.is_some(), "keyword '{}'", keyword);
            }
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_brake_pad_end_to_end() {
    let taxonomy = Taxonomy::from_categories(vec![
        Category::new("Brakes", &["brake"]).with_subcategory("Brake Pads", &["brake pad"]),
    ])
    .unwrap();
    let classifier = FaultClassifier::new(Arc::new(taxonomy));

    let result = classifier.classify("Replace worn brake pad");
    assert_eq!(result.main_category, "Brakes");
    assert_eq!(result.sub_category.as_deref(), Some("Brake Pads"));
    assert!(result.confidence > 0.0);
}

#[test]
fn test_real_work_orders() {
    let classifier = builtin_classifier();
    let cases = [
        ("Engine overheating", "Replace radiator and coolant", "Engine", Some("Cooling System")),
        ("Flat battery", "Jump start, replace battery", "Electrical", Some("Battery")),
        ("AC not cold", "Regas, refrigerant top", "Air Conditioning", Some("Cooling Performance")),
        ("Puncture rear left", "Repair puncture", "Tyres & Wheels", Some("Puncture")),
    ];
    for (complaint, job, main, sub) in cases {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let record = FaultRecord::new("WO", date, "14 ft", complaint, job);
        let result = classifier.classify_record(&record);
        assert_eq!(result.main_category, main, "{} / {}", complaint, job);
        assert_eq!(result.sub_category.as_deref(), sub, "{} / {}", complaint, job);
    }
}

#[test]
fn test_short_words_inside_longer_words_do_not_match() {
    let classifier = builtin_classifier();

    let result = classifier.classify("absorber leaking");
    assert_eq!(result.main_category, "Suspension & Steering");
    assert_eq!(result.sub_category.as_deref(), Some("Shock Absorbers"));

    assert_eq!(classifier.classify("engine block cracked").main_category, "Engine");

    let result = classifier.classify("14ft box truck brake noise");
    assert_eq!(result.main_category, "Brakes");
    assert!(result.sub_category.is_none());

    let result = classifier.classify("abs light on");
    assert_eq!(result.main_category, "Brakes");
}

#[test]
fn test_classify_all_sets_every_record() {
    let classifier = builtin_classifier();
    let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut records = vec![
        FaultRecord::new("1", date, "14 ft", "Brake noise", ""),
        FaultRecord::new("2", date, "14 ft", "", ""),
        FaultRecord::new("3", date, "14 ft", "Customer request", "Wash vehicle"),
    ];

    let categorized = classifier.classify_all(&mut records);
    assert_eq!(categorized, 1);
    assert!(records.iter().all(|r| r.classification.is_some()));
    assert_eq!(records[1].classification, Some(ClassificationResult::uncategorized()));
    assert_eq!(records[2].main_category(), UNCATEGORIZED);

    // idempotent
    let before = records.clone();
    classifier.classify_all(&mut records);
    assert_eq!(before, records);
}
