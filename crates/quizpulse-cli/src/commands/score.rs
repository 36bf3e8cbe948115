//! The `quizpulse score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quizpulse_core::parser::load_submission;
use quizpulse_core::scoring::evaluate_submission;

pub fn execute(submission_path: PathBuf) -> Result<()> {
    let submission = load_submission(&submission_path)?;
    let record = evaluate_submission(&submission).with_context(|| {
        format!("invalid submission: {}", submission_path.display())
    })?;

    eprintln!(
        "{} :: score {:.3} ({})",
        record.quiz_id, record.score, record.outcome
    );
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}
