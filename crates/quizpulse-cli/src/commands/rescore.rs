//! The `quizpulse rescore` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quizpulse_core::parser;

pub fn execute(attempts_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let mut records = parser::parse_attempts_file(&attempts_path)?;
    tracing::debug!(store = %attempts_path.display(), records = records.len(), "rescoring");
    let warnings = parser::rescore_all(&mut records);

    for w in &warnings {
        eprintln!("  [#{} {}] skipped: {}", w.index, w.quiz_id, w.message);
    }

    let json = serde_json::to_string_pretty(&records).context("failed to serialize records")?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write records to {}", path.display()))?;
            tracing::info!(path = %path.display(), records = records.len(), "wrote rescored records");
            eprintln!("Rescored {} record(s) into {}", records.len(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
