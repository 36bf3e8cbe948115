//! Core data model types for quizpulse.
//!
//! These are the types exchanged with the submission boundary, the attempt
//! store and the presentation layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome counts for a single question within an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    /// Whether the question was eventually answered correctly.
    pub correct: bool,
    /// Hints used on this question.
    #[serde(default)]
    pub hint_count: u32,
    /// Wrong answers given before (or instead of) the correct one.
    #[serde(default)]
    pub wrong_count: u32,
}

/// The quiz an attempt was made against, as known to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizInfo {
    /// Quiz identifier in the external store.
    pub id: String,
    /// Number of questions in the quiz.
    pub question_count: usize,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

/// A raw quiz submission, before scoring.
///
/// The three per-question arrays are positionally aligned and must each have
/// `quiz.question_count` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSubmission {
    /// Guardian or educator account the learner belongs to.
    pub account_id: String,
    /// Which child of the account made the attempt.
    pub child_index: String,
    pub quiz: QuizInfo,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 1 if the question was eventually answered correctly, else 0.
    pub correct: Vec<u32>,
    pub hint_count: Vec<u32>,
    pub wrong_count: Vec<u32>,
}

/// How an attempt ended. Exactly one applies to every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every question was eventually answered correctly.
    Completed,
    /// Not completed, with three or more wrong answers in total.
    Failed,
    /// Not completed, with fewer than three wrong answers in total.
    Abandoned,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(Outcome::Completed),
            "failed" => Ok(Outcome::Failed),
            "abandoned" | "aborted" => Ok(Outcome::Abandoned),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// A scored, classified attempt as handed to (and read back from) the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub account_id: String,
    pub child_index: String,
    pub quiz_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Per-question outcomes, in quiz order.
    pub questions: Vec<QuestionOutcome>,
    /// Normalized score in `[0, 1]`.
    pub score: f64,
    pub outcome: Outcome,
}

impl AttemptRecord {
    /// Wall-clock seconds between start and end.
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    /// Number of questions eventually answered correctly.
    pub fn correct_count(&self) -> usize {
        self.questions.iter().filter(|q| q.correct).count()
    }

    /// Wrong answers summed over all questions.
    pub fn total_wrong(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.wrong_count)).sum()
    }

    pub fn total_hints(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.hint_count)).sum()
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}
