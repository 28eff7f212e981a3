//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap.
//! Keeps argument parsing separate from execution logic.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Kardex fault analytics CLI
#[derive(Parser, Debug)]
#[command(name = "kardexctl")]
#[command(about = "Kardex - work-order fault classification and questions", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $KARDEX_CONFIG and defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Taxonomy YAML file (overrides the config file)
    #[arg(long, global = true)]
    pub taxonomy: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a complaint or job description
    Classify {
        /// Text to classify
        #[arg(required = true)]
        text: Vec<String>,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Validate and print the loaded taxonomy
    Taxonomy {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Fault statistics for a record file
    Stats {
        /// Records file (.csv or .json)
        #[arg(long)]
        records: PathBuf,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Most frequent fault categories
    Top {
        /// Records file (.csv or .json)
        #[arg(long)]
        records: PathBuf,

        /// Number of entries (default from config)
        #[arg(short = 'n', long)]
        n: Option<usize>,

        /// Rank sub-categories instead of main categories
        #[arg(long)]
        sub: bool,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Ask a question about a record file
    Ask {
        /// Records file (.csv or .json)
        #[arg(long)]
        records: PathBuf,

        /// The question
        #[arg(required = true)]
        question: Vec<String>,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_globals() {
        let cli = Cli::try_parse_from([
            "kardexctl",
            "-vv",
            "ask",
            "--records",
            "wo.csv",
            "top",
            "5",
            "faults",
            "--config",
            "k.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("k.toml")));
        match cli.command {
            Commands::Ask { question, records, json } => {
                assert_eq!(question.join(" "), "top 5 faults");
                assert_eq!(records, PathBuf::from("wo.csv"));
                assert!(!json);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_top_requires_records() {
        assert!(Cli::try_parse_from(["kardexctl", "top", "-n", "3"]).is_err());
    }
}
