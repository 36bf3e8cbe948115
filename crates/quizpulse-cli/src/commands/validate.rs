//! The `quizpulse validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(attempts_path: PathBuf) -> Result<()> {
    let records = quizpulse_core::parser::load_attempts(&attempts_path)?;
    println!(
        "Attempt store: {} ({} records)",
        attempts_path.display(),
        records.len()
    );

    let warnings = quizpulse_core::parser::validate_records(&records);
    tracing::debug!(records = records.len(), warnings = warnings.len(), "validated attempt store");
    for w in &warnings {
        println!("  [#{} {}] WARNING: {}", w.index, w.quiz_id, w.message);
    }

    if warnings.is_empty() {
        println!("All records valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
