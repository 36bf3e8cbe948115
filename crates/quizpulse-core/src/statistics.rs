//! Window-scoped metrics over a learner's attempts.
//!
//! Every category is computed independently and is `None` when the data it
//! needs is missing (no attempts, no prior window, no subject tags), so a
//! snapshot never carries a NaN ratio.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{AttemptRecord, Outcome};

/// Tunables for metric computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Length of the reporting window in days (engagement denominator).
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Score at or above which an attempt counts as a high score.
    #[serde(default = "default_high_score_threshold")]
    pub high_score_threshold: f64,
    /// Average score at or above which a subject counts as mastered.
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: f64,
    /// Score below which even a completed attempt counts as unsuccessful for perseverance.
    #[serde(default = "default_retry_score_floor")]
    pub retry_score_floor: f64,
    /// Length in days of the prior window that progress and speed compare against.
    #[serde(default = "default_comparison_window_days")]
    pub comparison_window_days: u32,
}

fn default_window_days() -> u32 {
    7
}
fn default_high_score_threshold() -> f64 {
    0.8
}
fn default_mastery_threshold() -> f64 {
    0.7
}
fn default_retry_score_floor() -> f64 {
    0.5
}
fn default_comparison_window_days() -> u32 {
    7
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            high_score_threshold: default_high_score_threshold(),
            mastery_threshold: default_mastery_threshold(),
            retry_score_floor: default_retry_score_floor(),
            comparison_window_days: default_comparison_window_days(),
        }
    }
}

/// Practice regularity within the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    /// Distinct UTC calendar days with at least one attempt.
    pub active_days: u32,
    pub window_days: u32,
    /// Attempts in the current window.
    pub recent_attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// Attempts scoring at or above the high-score threshold.
    pub high_scores: usize,
    pub total: usize,
    pub average_score: f64,
}

impl Performance {
    pub fn high_score_ratio(&self) -> f64 {
        self.high_scores as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub completed: usize,
    pub started: usize,
}

impl Completion {
    pub fn ratio(&self) -> f64 {
        self.completed as f64 / self.started as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abandonment {
    pub abandoned: usize,
    pub total: usize,
}

impl Abandonment {
    pub fn ratio(&self) -> f64 {
        self.abandoned as f64 / self.total as f64
    }
}

/// A subject and its average score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    pub score: f64,
}

/// Best score in a subject this window, against the best of the prior window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub subject: String,
    pub best_score: f64,
    pub previous_best: Option<f64>,
}

impl SubjectRecord {
    /// Whether this window's best beats the previous best (or there was none).
    pub fn is_new_best(&self) -> bool {
        self.previous_best.map_or(true, |prev| self.best_score > prev)
    }
}

/// Retrying the same quiz after not succeeding on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Perseverance {
    /// Attempts made on a quiz after an unsuccessful attempt on it.
    pub retries: usize,
    /// Retries that ended completed.
    pub improved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diversity {
    /// Distinct subjects practised.
    pub subjects: usize,
    /// 0–100; higher means attempts are spread more evenly across subjects.
    pub balance_score: u32,
    /// The subject with the fewest attempts (lowest average on ties).
    pub least_practised: Option<String>,
}

/// The quiz with the longest run of consecutive failed attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentFailure {
    pub quiz_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeMetrics {
    pub total_minutes: f64,
    pub avg_minutes_per_attempt: f64,
}

/// Per-subject attempt statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub count: usize,
    pub completed: usize,
    pub average_score: f64,
}

/// Attempts and average score for one chapter of a subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterStats {
    pub attempts: usize,
    pub average_score: f64,
}

/// Chapter key for attempts whose quiz names no chapter.
pub const UNKNOWN_CHAPTER: &str = "unknown";

/// Aggregate metrics for one learner over one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Attempts in the current window.
    pub total_attempts: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<Engagement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,
    /// Longest run of consecutive completed attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Completion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abandonment: Option<Abandonment>,
    /// Mean score change against the prior window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Mastered subjects, best first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastery: Option<Vec<SubjectScore>>,
    /// Fractional reduction in average attempt duration against the prior window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<SubjectRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perseverance: Option<Perseverance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diversity: Option<Diversity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_failure: Option<PersistentFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeMetrics>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subjects: BTreeMap<String, SubjectStats>,
    /// Subject, then chapter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub chapters: BTreeMap<String, BTreeMap<String, ChapterStats>>,
}

impl MetricsSnapshot {
    /// True when no category could be computed.
    pub fn is_empty(&self) -> bool {
        self.engagement.is_none()
            && self.performance.is_none()
            && self.streak.is_none()
            && self.completion.is_none()
            && self.abandonment.is_none()
            && self.progress.is_none()
            && self.mastery.is_none()
            && self.speed.is_none()
            && self.records.is_none()
            && self.perseverance.is_none()
            && self.diversity.is_none()
            && self.persistent_failure.is_none()
            && self.time.is_none()
            && self.subjects.is_empty()
            && self.chapters.is_empty()
    }
}

/// Reduces attempt records into a [`MetricsSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Aggregate the current window, comparing against `prior` when given.
    pub fn aggregate(
        &self,
        current: &[&AttemptRecord],
        prior: Option<&[&AttemptRecord]>,
    ) -> MetricsSnapshot {
        self.aggregate_over(current, prior, self.config.window_days)
    }

    /// Like [`aggregate`](Self::aggregate), with an explicit window length for engagement.
    pub fn aggregate_over(
        &self,
        current: &[&AttemptRecord],
        prior: Option<&[&AttemptRecord]>,
        window_days: u32,
    ) -> MetricsSnapshot {
        // Records arrive unordered from the store.
        let mut current: Vec<&AttemptRecord> = current.to_vec();
        current.sort_by_key(|r| r.start_time);
        let prior = prior.filter(|p| !p.is_empty());

        let has_history = !current.is_empty() || prior.is_some();
        let subjects = subject_stats(&current);

        let snapshot = MetricsSnapshot {
            total_attempts: current.len(),
            engagement: has_history.then(|| engagement(&current, window_days)),
            performance: self.performance(&current),
            streak: (!current.is_empty()).then(|| longest_completed_streak(&current)),
            completion: (!current.is_empty()).then(|| Completion {
                completed: current.iter().filter(|r| r.is_completed()).count(),
                started: current.len(),
            }),
            abandonment: (!current.is_empty()).then(|| Abandonment {
                abandoned: current
                    .iter()
                    .filter(|r| r.outcome == Outcome::Abandoned)
                    .count(),
                total: current.len(),
            }),
            progress: prior.and_then(|p| score_delta(&current, p)),
            mastery: self.mastery(&subjects),
            speed: prior.and_then(|p| speed_improvement(&current, p)),
            records: prior.and_then(|p| subject_records(&current, p)),
            perseverance: (!current.is_empty()).then(|| self.perseverance(&current)),
            diversity: diversity(&subjects),
            persistent_failure: persistent_failure(&current),
            time: time_metrics(&current),
            chapters: chapter_stats(&current),
            subjects,
        };

        tracing::debug!(
            attempts = snapshot.total_attempts,
            prior = prior.map_or(0, |p| p.len()),
            "aggregated metrics window"
        );

        snapshot
    }

    fn performance(&self, current: &[&AttemptRecord]) -> Option<Performance> {
        let average_score = mean(current.iter().map(|r| r.score))?;
        Some(Performance {
            high_scores: current
                .iter()
                .filter(|r| r.score >= self.config.high_score_threshold)
                .count(),
            total: current.len(),
            average_score,
        })
    }

    fn mastery(&self, subjects: &BTreeMap<String, SubjectStats>) -> Option<Vec<SubjectScore>> {
        if subjects.is_empty() {
            return None;
        }
        let mut mastered: Vec<SubjectScore> = subjects
            .iter()
            .filter(|(_, s)| s.average_score >= self.config.mastery_threshold)
            .map(|(subject, s)| SubjectScore {
                subject: subject.clone(),
                score: s.average_score,
            })
            .collect();
        mastered.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Some(mastered)
    }

    fn perseverance(&self, current: &[&AttemptRecord]) -> Perseverance {
        let mut pending_failure: BTreeMap<&str, bool> = BTreeMap::new();
        let mut result = Perseverance::default();

        for r in current {
            let pending = pending_failure.entry(r.quiz_id.as_str()).or_insert(false);
            if *pending {
                result.retries += 1;
                if r.is_completed() {
                    result.improved += 1;
                }
            }
            *pending = !r.is_completed() || r.score < self.config.retry_score_floor;
        }

        result
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn engagement(current: &[&AttemptRecord], window_days: u32) -> Engagement {
    let days: BTreeSet<_> = current.iter().map(|r| r.start_time.date_naive()).collect();
    Engagement {
        active_days: days.len() as u32,
        window_days,
        recent_attempts: current.len(),
    }
}

/// Longest run of consecutive completed attempts; `current` must be chronological.
fn longest_completed_streak(current: &[&AttemptRecord]) -> u32 {
    let mut streak = 0u32;
    let mut best = 0u32;
    for r in current {
        if r.is_completed() {
            streak += 1;
            best = best.max(streak);
        } else {
            streak = 0;
        }
    }
    best
}

fn score_delta(current: &[&AttemptRecord], prior: &[&AttemptRecord]) -> Option<f64> {
    let now = mean(current.iter().map(|r| r.score))?;
    let before = mean(prior.iter().map(|r| r.score))?;
    Some(now - before)
}

fn speed_improvement(current: &[&AttemptRecord], prior: &[&AttemptRecord]) -> Option<f64> {
    let now = mean(current.iter().map(|r| r.duration_secs()))?;
    let before = mean(prior.iter().map(|r| r.duration_secs()))?;
    if before <= 0.0 {
        return None;
    }
    Some((before - now) / before)
}

fn subject_stats(current: &[&AttemptRecord]) -> BTreeMap<String, SubjectStats> {
    let mut totals: BTreeMap<String, (SubjectStats, f64)> = BTreeMap::new();
    for r in current {
        let Some(subject) = &r.subject else {
            continue;
        };
        let (stats, score_sum) = totals.entry(subject.clone()).or_default();
        stats.count += 1;
        if r.is_completed() {
            stats.completed += 1;
        }
        *score_sum += r.score;
    }

    totals
        .into_iter()
        .map(|(subject, (mut stats, score_sum))| {
            stats.average_score = score_sum / stats.count as f64;
            (subject, stats)
        })
        .collect()
}

fn chapter_stats(current: &[&AttemptRecord]) -> BTreeMap<String, BTreeMap<String, ChapterStats>> {
    let mut totals: BTreeMap<String, BTreeMap<String, (usize, f64)>> = BTreeMap::new();
    for r in current {
        let Some(subject) = &r.subject else {
            continue;
        };
        let chapter = r.chapter.as_deref().unwrap_or(UNKNOWN_CHAPTER);
        let (attempts, score_sum) = totals
            .entry(subject.clone())
            .or_default()
            .entry(chapter.to_string())
            .or_default();
        *attempts += 1;
        *score_sum += r.score;
    }

    totals
        .into_iter()
        .map(|(subject, chapters)| {
            let chapters = chapters
                .into_iter()
                .map(|(chapter, (attempts, score_sum))| {
                    let stats = ChapterStats {
                        attempts,
                        average_score: score_sum / attempts as f64,
                    };
                    (chapter, stats)
                })
                .collect();
            (subject, chapters)
        })
        .collect()
}

fn best_by_subject<'a>(records: &[&'a AttemptRecord]) -> BTreeMap<&'a str, f64> {
    let mut best: BTreeMap<&str, f64> = BTreeMap::new();
    for r in records {
        if let Some(subject) = r.subject.as_deref() {
            let entry = best.entry(subject).or_insert(r.score);
            *entry = entry.max(r.score);
        }
    }
    best
}

fn subject_records(current: &[&AttemptRecord], prior: &[&AttemptRecord]) -> Option<Vec<SubjectRecord>> {
    let current_best = best_by_subject(current);
    if current_best.is_empty() {
        return None;
    }
    let prior_best = best_by_subject(prior);
    Some(
        current_best
            .into_iter()
            .map(|(subject, best_score)| SubjectRecord {
                subject: subject.to_string(),
                best_score,
                previous_best: prior_best.get(subject).copied(),
            })
            .collect(),
    )
}

fn diversity(subjects: &BTreeMap<String, SubjectStats>) -> Option<Diversity> {
    let total: usize = subjects.values().map(|s| s.count).sum();
    if total == 0 {
        return None;
    }
    let max_share = subjects
        .values()
        .map(|s| s.count as f64 / total as f64)
        .fold(0.0, f64::max);
    let least_practised = subjects
        .iter()
        .min_by(|(_, a), (_, b)| {
            a.count.cmp(&b.count).then(
                a.average_score
                    .partial_cmp(&b.average_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        })
        .map(|(subject, _)| subject.clone());

    Some(Diversity {
        subjects: subjects.len(),
        balance_score: (100.0 - max_share * 50.0).clamp(0.0, 100.0) as u32,
        least_practised,
    })
}

/// Longest run of consecutive failed attempts on a single quiz; `current` must be chronological.
fn persistent_failure(current: &[&AttemptRecord]) -> Option<PersistentFailure> {
    let mut runs: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for r in current {
        let (run, best) = runs.entry(r.quiz_id.as_str()).or_default();
        if r.outcome == Outcome::Failed {
            *run += 1;
            *best = (*best).max(*run);
        } else {
            *run = 0;
        }
    }

    let mut worst: Option<PersistentFailure> = None;
    for (quiz_id, (_, best)) in runs {
        if best > 0 && worst.as_ref().map_or(true, |w| best > w.count) {
            worst = Some(PersistentFailure {
                quiz_id: quiz_id.to_string(),
                count: best,
            });
        }
    }
    worst
}

fn time_metrics(current: &[&AttemptRecord]) -> Option<TimeMetrics> {
    let avg_secs = mean(current.iter().map(|r| r.duration_secs()))?;
    let total_secs: f64 = current.iter().map(|r| r.duration_secs()).sum();
    Some(TimeMetrics {
        total_minutes: total_secs / 60.0,
        avg_minutes_per_attempt: avg_secs / 60.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionOutcome;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 18, 9, 0, 0).unwrap()
    }

    fn attempt(
        quiz: &str,
        subject: Option<&str>,
        hours: i64,
        minutes: i64,
        score: f64,
        outcome: Outcome,
    ) -> AttemptRecord {
        let start = base() + Duration::hours(hours);
        AttemptRecord {
            account_id: "acc".into(),
            child_index: "0".into(),
            quiz_id: quiz.into(),
            subject: subject.map(Into::into),
            chapter: None,
            level: None,
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            questions: vec![QuestionOutcome {
                correct: outcome == Outcome::Completed,
                hint_count: 0,
                wrong_count: 0,
            }],
            score,
            outcome,
        }
    }

    fn refs(records: &[AttemptRecord]) -> Vec<&AttemptRecord> {
        records.iter().collect()
    }

    #[test]
    fn empty_input_yields_empty_snapshot() {
        let engine = MetricsEngine::default();
        let snapshot = engine.aggregate(&[], None);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_attempts, 0);

        let none: Vec<&AttemptRecord> = Vec::new();
        let snapshot = engine.aggregate(&[], Some(none.as_slice()));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn no_current_attempts_with_history_keeps_engagement() {
        let prior = vec![attempt("q1", None, -100, 5, 0.9, Outcome::Completed)];
        let prior = refs(&prior);
        let snapshot = MetricsEngine::default().aggregate(&[], Some(prior.as_slice()));
        let engagement = snapshot.engagement.unwrap();
        assert_eq!(engagement.recent_attempts, 0);
        assert_eq!(engagement.active_days, 0);
        assert!(snapshot.performance.is_none());
        assert!(snapshot.progress.is_none());
    }

    #[test]
    fn basic_window_metrics() {
        let records = vec![
            attempt("q1", Some("math"), 0, 5, 0.9, Outcome::Completed),
            attempt("q2", Some("math"), 2, 5, 0.85, Outcome::Completed),
            attempt("q3", Some("french"), 26, 5, 0.4, Outcome::Abandoned),
            attempt("q4", Some("french"), 50, 5, 0.3, Outcome::Failed),
        ];
        let snapshot = MetricsEngine::default().aggregate(&refs(&records), None);

        let engagement = snapshot.engagement.as_ref().unwrap();
        assert_eq!(engagement.active_days, 3);
        assert_eq!(engagement.window_days, 7);

        let perf = snapshot.performance.as_ref().unwrap();
        assert_eq!(perf.high_scores, 2);
        assert_eq!(perf.total, 4);
        assert!((perf.average_score - 0.6125).abs() < 1e-9);
        assert!((perf.high_score_ratio() - 0.5).abs() < 1e-9);

        assert_eq!(snapshot.streak, Some(2));
        assert_eq!(
            snapshot.completion,
            Some(Completion {
                completed: 2,
                started: 4
            })
        );
        assert!((snapshot.abandonment.as_ref().unwrap().ratio() - 0.25).abs() < 1e-9);

        let mastery = snapshot.mastery.as_ref().unwrap();
        assert_eq!(mastery.len(), 1);
        assert_eq!(mastery[0].subject, "math");

        let diversity = snapshot.diversity.as_ref().unwrap();
        assert_eq!(diversity.subjects, 2);
        assert_eq!(diversity.balance_score, 75);
        assert_eq!(diversity.least_practised.as_deref(), Some("french"));

        assert!(snapshot.progress.is_none());
        assert!(snapshot.speed.is_none());
        assert!(snapshot.records.is_none());

        let time = snapshot.time.as_ref().unwrap();
        assert!((time.total_minutes - 20.0).abs() < 1e-9);
        assert!((time.avg_minutes_per_attempt - 5.0).abs() < 1e-9);
    }

    #[test]
    fn streak_scans_chronologically_regardless_of_input_order() {
        let records = vec![
            attempt("q5", None, 5, 5, 0.9, Outcome::Completed),
            attempt("q1", None, 1, 5, 0.9, Outcome::Completed),
            attempt("q3", None, 3, 5, 0.2, Outcome::Abandoned),
            attempt("q4", None, 4, 5, 0.9, Outcome::Completed),
            attempt("q2", None, 2, 5, 0.9, Outcome::Completed),
            attempt("q6", None, 6, 5, 0.9, Outcome::Completed),
        ];
        let snapshot = MetricsEngine::default().aggregate(&refs(&records), None);
        assert_eq!(snapshot.streak, Some(3));
    }

    #[test]
    fn progress_and_speed_against_prior_window() {
        let prior = vec![
            attempt("q1", Some("math"), -72, 10, 0.5, Outcome::Completed),
            attempt("q2", Some("math"), -70, 10, 0.6, Outcome::Completed),
        ];
        let current = vec![
            attempt("q1", Some("math"), 0, 8, 0.7, Outcome::Completed),
            attempt("q3", Some("art"), 1, 7, 0.8, Outcome::Completed),
        ];
        let prior = refs(&prior);
        let snapshot =
            MetricsEngine::default().aggregate(&refs(&current), Some(prior.as_slice()));

        assert!((snapshot.progress.unwrap() - 0.2).abs() < 1e-9);
        assert!((snapshot.speed.unwrap() - 0.25).abs() < 1e-9);

        let records = snapshot.records.unwrap();
        assert_eq!(records.len(), 2);
        let art = records.iter().find(|r| r.subject == "art").unwrap();
        assert_eq!(art.previous_best, None);
        assert!(art.is_new_best());
        let math = records.iter().find(|r| r.subject == "math").unwrap();
        assert_eq!(math.previous_best, Some(0.6));
        assert!(math.is_new_best());
    }

    #[test]
    fn perseverance_counts_retries_after_failure() {
        let records = vec![
            attempt("q1", None, 0, 5, 0.3, Outcome::Failed),
            attempt("q1", None, 1, 5, 0.2, Outcome::Abandoned),
            attempt("q1", None, 2, 5, 0.8, Outcome::Completed),
            attempt("q1", None, 3, 5, 0.9, Outcome::Completed),
            attempt("q2", None, 4, 5, 0.9, Outcome::Completed),
        ];
        let snapshot = MetricsEngine::default().aggregate(&refs(&records), None);
        assert_eq!(
            snapshot.perseverance,
            Some(Perseverance {
                retries: 2,
                improved: 1
            })
        );
    }

    #[test]
    fn persistent_failure_tracks_consecutive_runs_per_quiz() {
        let records = vec![
            attempt("q1", None, 0, 5, 0.1, Outcome::Failed),
            attempt("q2", None, 1, 5, 0.1, Outcome::Failed),
            attempt("q1", None, 2, 5, 0.1, Outcome::Failed),
            attempt("q1", None, 3, 5, 0.1, Outcome::Failed),
            attempt("q2", None, 4, 5, 0.9, Outcome::Completed),
            attempt("q2", None, 5, 5, 0.1, Outcome::Failed),
        ];
        let snapshot = MetricsEngine::default().aggregate(&refs(&records), None);
        assert_eq!(
            snapshot.persistent_failure,
            Some(PersistentFailure {
                quiz_id: "q1".into(),
                count: 3
            })
        );

        let completed_only = vec![attempt("q1", None, 0, 5, 0.9, Outcome::Completed)];
        let snapshot = MetricsEngine::default().aggregate(&refs(&completed_only), None);
        assert!(snapshot.persistent_failure.is_none());
    }

    #[test]
    fn untagged_attempts_leave_subject_metrics_absent() {
        let records = vec![attempt("q1", None, 0, 5, 0.9, Outcome::Completed)];
        let prior = vec![attempt("q1", None, -48, 5, 0.5, Outcome::Completed)];
        let prior = refs(&prior);
        let snapshot = MetricsEngine::default().aggregate(&refs(&records), Some(prior.as_slice()));
        assert!(snapshot.mastery.is_none());
        assert!(snapshot.diversity.is_none());
        assert!(snapshot.records.is_none());
        assert!(snapshot.subjects.is_empty());
        assert!(snapshot.chapters.is_empty());
        assert!(snapshot.progress.is_some());
    }

    #[test]
    fn chapter_distribution_nests_under_subject() {
        let mut records = vec![
            attempt("q1", Some("math"), 0, 5, 0.4, Outcome::Abandoned),
            attempt("q2", Some("math"), 1, 5, 0.8, Outcome::Completed),
            attempt("q3", Some("math"), 2, 5, 0.9, Outcome::Completed),
            attempt("q4", Some("french"), 3, 5, 0.7, Outcome::Completed),
            attempt("q5", None, 4, 5, 0.1, Outcome::Failed),
        ];
        records[0].chapter = Some("fractions".into());
        records[1].chapter = Some("fractions".into());
        records[2].chapter = Some("geometry".into());

        let snapshot = MetricsEngine::default().aggregate(&refs(&records), None);
        assert_eq!(snapshot.chapters.len(), 2);

        let math = &snapshot.chapters["math"];
        assert_eq!(math["fractions"].attempts, 2);
        assert!((math["fractions"].average_score - 0.6).abs() < 1e-9);
        assert_eq!(math["geometry"].attempts, 1);

        let french = &snapshot.chapters["french"];
        assert_eq!(french[UNKNOWN_CHAPTER].attempts, 1);
        assert!((french[UNKNOWN_CHAPTER].average_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn explicit_window_length() {
        let records = vec![attempt("q1", None, 0, 5, 0.9, Outcome::Completed)];
        let snapshot = MetricsEngine::default().aggregate_over(&refs(&records), None, 30);
        assert_eq!(snapshot.engagement.unwrap().window_days, 30);
    }
}
