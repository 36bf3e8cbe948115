//! Per-attempt scoring and outcome classification.
//!
//! The weights and time bounds here are fixed: historical scores were
//! computed with them and stay comparable only as long as they do not move.

use crate::error::InvalidInput;
use crate::model::{AttemptRecord, AttemptSubmission, Outcome, QuestionOutcome};

/// Weight of the average per-question success rate.
pub const ACCURACY_WEIGHT: f64 = 0.8;
/// Weight of the speed term.
pub const SPEED_WEIGHT: f64 = 0.2;
/// Seconds per correct answer under which full speed credit is given.
pub const MIN_TIME_SECS: f64 = 15.0;
/// Seconds per correct answer beyond which no speed credit is given.
pub const MAX_TIME_SECS: f64 = 360.0;
/// Total wrong answers at which an unfinished attempt counts as failed.
pub const FAILED_WRONG_THRESHOLD: u64 = 3;

/// Speed credit for a given time per correct answer.
///
/// 1 below [`MIN_TIME_SECS`], 0 beyond [`MAX_TIME_SECS`], linear in between.
pub fn speed_factor(time_per_question: f64) -> f64 {
    if time_per_question < MIN_TIME_SECS {
        1.0
    } else if time_per_question <= MAX_TIME_SECS {
        1.0 - (time_per_question - MIN_TIME_SECS) / (MAX_TIME_SECS - MIN_TIME_SECS)
    } else {
        0.0
    }
}

/// Compute the normalized score of an attempt.
///
/// score = 0.8 · mean(correct_i / (wrong_i + hint_i + 1)) + 0.2 · speed
///
/// where speed is [`speed_factor`] of `time_spent_secs / Σcorrect_i` (0 when
/// nothing was answered correctly).
pub fn score(
    question_count: usize,
    correct: &[u32],
    hints: &[u32],
    wrong: &[u32],
    time_spent_secs: f64,
) -> Result<f64, InvalidInput> {
    if question_count == 0 {
        return Err(InvalidInput::NoQuestions);
    }
    if correct.len() != question_count
        || hints.len() != question_count
        || wrong.len() != question_count
    {
        return Err(InvalidInput::LengthMismatch {
            expected: question_count,
            correct: correct.len(),
            hints: hints.len(),
            wrong: wrong.len(),
        });
    }
    if let Some((index, &value)) = correct.iter().enumerate().find(|&(_, &c)| c > 1) {
        return Err(InvalidInput::InvalidCorrectFlag { index, value });
    }
    if !time_spent_secs.is_finite() || time_spent_secs < 0.0 {
        return Err(InvalidInput::InvalidTimeSpent(time_spent_secs));
    }

    let sum_success_rate: f64 = correct
        .iter()
        .zip(hints)
        .zip(wrong)
        .map(|((&c, &h), &w)| c as f64 / (w as f64 + h as f64 + 1.0))
        .sum();
    let avg_success_rate = sum_success_rate / question_count as f64;

    let correct_count: u64 = correct.iter().map(|&c| u64::from(c)).sum();
    let time_per_question = if correct_count == 0 {
        0.0
    } else {
        time_spent_secs / correct_count as f64
    };

    Ok(ACCURACY_WEIGHT * avg_success_rate + SPEED_WEIGHT * speed_factor(time_per_question))
}

/// Classify how an attempt ended.
///
/// Completed wins outright; otherwise [`FAILED_WRONG_THRESHOLD`] wrong answers
/// separate failed from abandoned.
pub fn classify(correct_count: usize, total_wrong: u64, question_count: usize) -> Outcome {
    if correct_count == question_count {
        Outcome::Completed
    } else if total_wrong >= FAILED_WRONG_THRESHOLD {
        Outcome::Failed
    } else {
        Outcome::Abandoned
    }
}

/// Validate, score and classify a submission into a storable record.
pub fn evaluate_submission(submission: &AttemptSubmission) -> Result<AttemptRecord, InvalidInput> {
    if submission.end_time <= submission.start_time {
        return Err(InvalidInput::EndNotAfterStart {
            start: submission.start_time.to_rfc3339(),
            end: submission.end_time.to_rfc3339(),
        });
    }

    let question_count = submission.quiz.question_count;
    let time_spent =
        (submission.end_time - submission.start_time).num_milliseconds() as f64 / 1000.0;
    let score = score(
        question_count,
        &submission.correct,
        &submission.hint_count,
        &submission.wrong_count,
        time_spent,
    )?;

    let questions: Vec<QuestionOutcome> = submission
        .correct
        .iter()
        .zip(&submission.hint_count)
        .zip(&submission.wrong_count)
        .map(|((&c, &h), &w)| QuestionOutcome {
            correct: c == 1,
            hint_count: h,
            wrong_count: w,
        })
        .collect();

    let correct_count = questions.iter().filter(|q| q.correct).count();
    let total_wrong: u64 = submission.wrong_count.iter().map(|&w| u64::from(w)).sum();
    let outcome = classify(correct_count, total_wrong, question_count);

    tracing::debug!(
        quiz = %submission.quiz.id,
        child = %submission.child_index,
        score,
        %outcome,
        "scored attempt"
    );

    Ok(AttemptRecord {
        account_id: submission.account_id.clone(),
        child_index: submission.child_index.clone(),
        quiz_id: submission.quiz.id.clone(),
        subject: submission.quiz.subject.clone(),
        chapter: submission.quiz.chapter.clone(),
        level: submission.quiz.level.clone(),
        start_time: submission.start_time,
        end_time: submission.end_time,
        questions,
        score,
        outcome,
    })
}

impl AttemptRecord {
    /// Recompute score and outcome from the stored per-question outcomes.
    ///
    /// Used for corrective maintenance of records already in the store.
    pub fn rescore(&mut self) -> Result<(), InvalidInput> {
        if self.end_time <= self.start_time {
            return Err(InvalidInput::EndNotAfterStart {
                start: self.start_time.to_rfc3339(),
                end: self.end_time.to_rfc3339(),
            });
        }
        let correct: Vec<u32> = self.questions.iter().map(|q| u32::from(q.correct)).collect();
        let hints: Vec<u32> = self.questions.iter().map(|q| q.hint_count).collect();
        let wrong: Vec<u32> = self.questions.iter().map(|q| q.wrong_count).collect();

        self.score = score(
            self.questions.len(),
            &correct,
            &hints,
            &wrong,
            self.duration_secs(),
        )?;
        self.outcome = classify(self.correct_count(), self.total_wrong(), self.questions.len());
        Ok(())
    }
}
