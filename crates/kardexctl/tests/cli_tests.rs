//! kardexctl against files on disk: config, taxonomy override, record
//! loading, rendering and exit codes.

use clap::Parser;
use kardex_common::config::KardexConfig;
use kardexctl::cli::{Cli, Commands};
use kardexctl::commands::{render_stats, render_taxonomy, render_top, AppContext};
use kardexctl::errors::{exit_code_for, EXIT_CONFIG_ERROR, EXIT_INPUT_ERROR};
use std::fs;
use tempfile::TempDir;

const RECORDS: &str = "\
WO No,Open Date,Nature of Complaint,Job Description,Vehicle Type
WO-1,2022-01-10,Brake noise,Replace worn brake pad,14 ft
WO-2,2022-03-02,Brake pull,Replace brake pad,14 ft
WO-3,2022-03-09,Engine overheat,Replace radiator,Lifestyle
WO-4,2023-08-01,Customer request,Wash,24 ft
";

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_top_command_output() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "wo.csv", RECORDS);
    let ctx = AppContext::from_config(KardexConfig::default(), None).unwrap();
    let records = ctx.load_records(&path).unwrap();

    assert_eq!(
        render_top(&records, 2, false),
        "Top 2 fault categories:\n- Brakes: 2 faults (50.0%)\n- Engine: 1 fault (25.0%)"
    );
}

#[test]
fn test_stats_command_output() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "wo.csv", RECORDS);
    let ctx = AppContext::from_config(KardexConfig::default(), None).unwrap();
    let records = ctx.load_records(&path).unwrap();

    let text = render_stats(&kardex_common::statistics(&records));
    assert!(text.starts_with("4 work orders, 3 categorized"));
    assert!(text.contains("- Brakes: 2 faults (50.0%)"));
    assert!(text.contains("- Uncategorized: 1 fault (25.0%)"));
    assert!(text.contains("Vehicle types:\n- 14 ft: 2 faults"));
    assert!(text.ends_with("Severity: 0 high, 4 medium, 0 low"));
}

#[test]
fn test_taxonomy_override() {
    let dir = TempDir::new().unwrap();
    let yaml = write(
        &dir,
        "custom.yaml",
        "fault_categories:\n  Hydraulics:\n    keywords: [hydraulic, hose]\n    subcategories:\n      Leaks:\n        keywords: [leak]\n",
    );
    let ctx = AppContext::from_config(KardexConfig::default(), Some(yaml.as_path())).unwrap();
    assert_eq!(ctx.taxonomy.len(), 1);
    assert_eq!(render_taxonomy(&ctx.taxonomy), "Hydraulics: hydraulic, hose\n  - Leaks: leak");

    let result = ctx.classifier().classify("hydraulic hose leak");
    assert_eq!(result.main_category, "Hydraulics");
    assert_eq!(result.sub_category.as_deref(), Some("Leaks"));
}

#[test]
fn test_missing_taxonomy_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let err = AppContext::from_config(KardexConfig::default(), Some(dir.path().join("none.yaml").as_path()))
        .err()
        .unwrap();
    assert_eq!(exit_code_for(&err), EXIT_CONFIG_ERROR);
}

#[test]
fn test_bad_config_file_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "config.toml", "[output\nlist_limit = ");
    let err = AppContext::load(Some(config.as_path()), None).err().unwrap();
    assert_eq!(exit_code_for(&err), EXIT_CONFIG_ERROR);
}

#[test]
fn test_missing_records_exits_with_input_code() {
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::from_config(KardexConfig::default(), None).unwrap();
    let err = ctx.load_records(&dir.path().join("absent.csv")).unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_INPUT_ERROR);

    let xlsx = write(&dir, "wo.xlsx", "");
    let err = ctx.load_records(&xlsx).unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_INPUT_ERROR);
}

#[test]
fn test_config_output_settings_reach_top_default() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "config.toml", "[output]\ndefault_top_n = 5\n");
    let ctx = AppContext::load(Some(config.as_path()), None).unwrap();
    assert_eq!(ctx.config.output.default_top_n, 5);

    let cli = Cli::try_parse_from(["kardexctl", "top", "--records", "wo.csv", "--sub"]).unwrap();
    match cli.command {
        Commands::Top { n, sub, .. } => {
            assert_eq!(n, None);
            assert!(sub);
        }
        other => panic!("unexpected {:?}", other),
    }
}
