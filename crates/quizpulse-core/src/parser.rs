//! JSON attempt-store loader.
//!
//! Loads attempt records and submissions from JSON files and directories,
//! and validates stored records against the scoring rules.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AttemptRecord, AttemptSubmission};

/// A store file holds either one record or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonRecords {
    Many(Vec<AttemptRecord>),
    One(Box<AttemptRecord>),
}

/// Parse a single JSON file of attempt records.
pub fn parse_attempts_file(path: &Path) -> Result<Vec<AttemptRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read attempts file: {}", path.display()))?;

    parse_attempts_str(&content, path)
}

/// Parse a JSON string of attempt records (useful for testing).
pub fn parse_attempts_str(content: &str, source_path: &Path) -> Result<Vec<AttemptRecord>> {
    let parsed: JsonRecords = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?;

    Ok(match parsed {
        JsonRecords::Many(records) => records,
        JsonRecords::One(record) => vec![*record],
    })
}

/// Load records from a file, or recursively from every `.json` file in a directory.
///
/// Unreadable files inside a directory are skipped with a warning; an
/// explicitly named file that fails to parse is an error.
pub fn load_attempts(path: &Path) -> Result<Vec<AttemptRecord>> {
    if path.is_dir() {
        load_attempts_directory(path)
    } else {
        parse_attempts_file(path)
    }
}

fn load_attempts_directory(dir: &Path) -> Result<Vec<AttemptRecord>> {
    let mut records = Vec::new();

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            records.extend(load_attempts_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            match parse_attempts_file(&path) {
                Ok(found) => records.extend(found),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    tracing::debug!(dir = %dir.display(), records = records.len(), "loaded attempt store");
    Ok(records)
}

/// Load a raw submission from a JSON file.
pub fn load_submission(path: &Path) -> Result<AttemptSubmission> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submission: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse submission: {}", path.display()))
}

/// Distinct `(account_id, child_index)` pairs present in `records`.
pub fn learners(records: &[AttemptRecord]) -> BTreeSet<(String, String)> {
    records
        .iter()
        .map(|r| (r.account_id.clone(), r.child_index.clone()))
        .collect()
}

/// A problem found in a stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// Position of the record in the loaded list.
    pub index: usize,
    pub quiz_id: String,
    pub message: String,
}

impl ValidationWarning {
    fn new(index: usize, record: &AttemptRecord, message: impl Into<String>) -> Self {
        Self {
            index,
            quiz_id: record.quiz_id.clone(),
            message: message.into(),
        }
    }
}

/// Check stored records for common issues.
///
/// Flags records whose stored score or outcome disagrees with what the
/// scoring rules produce from their per-question data.
pub fn validate_records(records: &[AttemptRecord]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        if !seen.insert((&record.account_id, &record.child_index, &record.quiz_id, record.start_time)) {
            warnings.push(ValidationWarning::new(
                index,
                record,
                format!("duplicate attempt started at {}", record.start_time.to_rfc3339()),
            ));
        }
    }

    for (index, record) in records.iter().enumerate() {
        if !record.score.is_finite() || !(0.0..=1.0).contains(&record.score) {
            warnings.push(ValidationWarning::new(
                index,
                record,
                format!("score {} is outside [0, 1]", record.score),
            ));
        }

        let mut expected = record.clone();
        match expected.rescore() {
            Err(e) => warnings.push(ValidationWarning::new(index, record, e.to_string())),
            Ok(()) => {
                if (expected.score - record.score).abs() > 1e-9 {
                    warnings.push(ValidationWarning::new(
                        index,
                        record,
                        format!(
                            "stored score {:.4} differs from recomputed {:.4}",
                            record.score, expected.score
                        ),
                    ));
                }
                if expected.outcome != record.outcome {
                    warnings.push(ValidationWarning::new(
                        index,
                        record,
                        format!(
                            "stored outcome {} differs from recomputed {}",
                            record.outcome, expected.outcome
                        ),
                    ));
                }
            }
        }
    }

    warnings
}

/// Recompute score and outcome of every record in place.
///
/// Records that cannot be rescored are left untouched and reported.
pub fn rescore_all(records: &mut [AttemptRecord]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut changed = 0usize;

    for (index, record) in records.iter_mut().enumerate() {
        let before = (record.score, record.outcome);
        match record.rescore() {
            Ok(()) => {
                if before != (record.score, record.outcome) {
                    changed += 1;
                }
            }
            Err(e) => {
                tracing::warn!(quiz = %record.quiz_id, index, "cannot rescore: {e}");
                warnings.push(ValidationWarning::new(index, record, e.to_string()));
            }
        }
    }

    tracing::info!(records = records.len(), changed, "rescored attempt store");
    warnings
}
