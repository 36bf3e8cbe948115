//! Input validation errors.
//!
//! Scoring, classification and period selection reject malformed input
//! synchronously with [`InvalidInput`]. Sparse data is never an error: metric
//! categories that cannot be computed are simply absent from the snapshot.

use thiserror::Error;

/// Errors raised when a submission, record or period key cannot be processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    /// A quiz must have at least one question.
    #[error("question count must be at least 1")]
    NoQuestions,

    /// The per-question arrays do not match the quiz's question count.
    #[error(
        "per-question arrays must have {expected} entries \
         (correct={correct}, hint_count={hints}, wrong_count={wrong})"
    )]
    LengthMismatch {
        expected: usize,
        correct: usize,
        hints: usize,
        wrong: usize,
    },

    /// A correctness flag was something other than 0 or 1.
    #[error("correct[{index}] must be 0 or 1, got {value}")]
    InvalidCorrectFlag { index: usize, value: u32 },

    /// Elapsed time was negative or not a finite number.
    #[error("time spent must be a finite, non-negative number of seconds, got {0}")]
    InvalidTimeSpent(f64),

    /// The attempt ended at or before the moment it started.
    #[error("end_time ({end}) must be after start_time ({start})")]
    EndNotAfterStart { start: String, end: String },

    /// A period key did not have the `YYYY-Www` shape or named a week that does not exist.
    #[error("malformed ISO week key: {0:?} (expected YYYY-Www)")]
    MalformedPeriodKey(String),

    /// A period selector was none of `weekly`, `all` or a week key.
    #[error("unknown period mode: {0:?} (expected \"weekly\", \"all\" or YYYY-Www)")]
    UnknownPeriodMode(String),
}

impl InvalidInput {
    /// Name of the input field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            InvalidInput::NoQuestions => "question_count",
            InvalidInput::LengthMismatch { .. } => "questions",
            InvalidInput::InvalidCorrectFlag { .. } => "correct",
            InvalidInput::InvalidTimeSpent(_) => "time_spent",
            InvalidInput::EndNotAfterStart { .. } => "end_time",
            InvalidInput::MalformedPeriodKey(_) | InvalidInput::UnknownPeriodMode(_) => "period",
        }
    }
}
