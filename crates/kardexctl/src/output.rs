//! Output formatting - plain ASCII terminal output
//!
//! Text comes pre-rendered from `commands`; this module only adds colour.

use kardex_common::classifier::ClassificationResult;
use kardex_common::query_engine::QueryAnswer;
use owo_colors::OwoColorize;

/// Display a classification with a colour-coded confidence
pub fn display_classification(result: &ClassificationResult, rendered: &str) {
    let marker = if !result.is_categorized() {
        "[NONE]".bright_red().to_string()
    } else if result.confidence >= 0.7 {
        "[OK]".bright_green().to_string()
    } else {
        "[LOW]".yellow().to_string()
    };
    println!("{} {}", marker, rendered);
}

/// Display an answer; apologies and fallback answers are marked
pub fn display_answer(answer: &QueryAnswer) {
    if !answer.is_ok() {
        println!("{}", answer.text.bright_red());
        return;
    }
    println!("{}", answer.text);
    if answer.used_fallback {
        println!("{}", "[answered by analytics fallback]".dimmed());
    }
}

/// Display a section heading
pub fn display_heading(title: &str) {
    println!("{}", title.bold().cyan());
}

/// Display a warning about input data
pub fn display_warning(message: &str) {
    eprintln!("[WARNING] {}", message.yellow());
}

/// Display an error
pub fn display_error(message: &str) {
    eprintln!();
    eprintln!("[ERROR] {}", message.red());
    eprintln!();
}
