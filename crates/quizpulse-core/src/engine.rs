//! Report pipeline.
//!
//! Selects a learner's period, derives the prior comparison window,
//! aggregates metrics and generates feedback.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::QuizpulseConfig;
use crate::error::InvalidInput;
use crate::messages::MessageGenerator;
use crate::model::AttemptRecord;
use crate::period::{latest_week_key, parse_week_key, within, PeriodMode, WeekRange};
use crate::report::{PeriodSummary, ProgressReport};
use crate::statistics::MetricsEngine;

/// Builds [`ProgressReport`]s from stored attempts.
///
/// Holds only immutable configuration, so one engine can serve many learners
/// from many threads.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    metrics: MetricsEngine,
    feedback: MessageGenerator,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(QuizpulseConfig::default())
    }
}

impl AnalyticsEngine {
    pub fn new(config: QuizpulseConfig) -> Self {
        Self {
            metrics: MetricsEngine::new(config.metrics),
            feedback: MessageGenerator::new(config.messages, config.alerts),
        }
    }

    /// Build a progress report for one learner.
    ///
    /// Records belonging to other learners are ignored. An empty selection
    /// still yields a report (with a fallback message); only a malformed
    /// week key is an error.
    pub fn build_report(
        &self,
        account_id: &str,
        child_index: &str,
        records: &[AttemptRecord],
        mode: &PeriodMode,
    ) -> Result<ProgressReport, InvalidInput> {
        let span = tracing::info_span!("build_report", account = account_id, child = child_index, period = %mode);
        let _enter = span.enter();

        let learner: Vec<AttemptRecord> = records
            .iter()
            .filter(|r| r.account_id == account_id && r.child_index == child_index)
            .cloned()
            .collect();

        let range = match mode {
            PeriodMode::All => None,
            PeriodMode::Weekly => latest_week_key(&learner)
                .map(|key| parse_week_key(&key).map(|range| (key, range)))
                .transpose()?,
            PeriodMode::Week(key) => Some((key.clone(), parse_week_key(key)?)),
        };

        let config = self.metrics.config();
        let (period, snapshot) = match range {
            Some((key, WeekRange { start, end })) => {
                // A window reaching past the earliest representable instant has no prior.
                let comparison_start = start.checked_sub_signed(Duration::days(i64::from(
                    config.comparison_window_days,
                )));
                let current = within(&learner, start, end);
                let prior = comparison_start.map(|from| within(&learner, from, start));
                tracing::debug!(
                    week = %key,
                    current = current.len(),
                    prior = prior.as_ref().map_or(0, Vec::len),
                    "selected period"
                );
                let snapshot = self.metrics.aggregate(&current, prior.as_deref());
                let period = PeriodSummary {
                    mode: mode.clone(),
                    key: Some(key),
                    start: Some(start),
                    end: Some(end),
                    comparison_start,
                };
                (period, snapshot)
            }
            None if matches!(mode, PeriodMode::All) => {
                let mut current: Vec<&AttemptRecord> = learner.iter().collect();
                current.sort_by_key(|r| r.start_time);
                let start = current.first().map(|r| r.start_time);
                let end = current.last().map(|r| r.end_time);
                let window_days = span_days(start, end).unwrap_or(config.window_days);
                let snapshot = self.metrics.aggregate_over(&current, None, window_days);
                let period = PeriodSummary {
                    mode: mode.clone(),
                    key: None,
                    start,
                    end,
                    comparison_start: None,
                };
                (period, snapshot)
            }
            None => {
                tracing::debug!("no attempts to select a week from");
                let snapshot = self.metrics.aggregate(&[], None);
                (PeriodSummary::empty(mode.clone()), snapshot)
            }
        };

        let feedback = self.feedback.generate(&snapshot);

        tracing::info!(
            attempts = snapshot.total_attempts,
            messages = feedback.messages.len(),
            alerts = feedback.alerts.len(),
            "assembled progress report"
        );

        Ok(ProgressReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            account_id: account_id.to_string(),
            child_index: child_index.to_string(),
            period,
            snapshot,
            messages: feedback.messages,
            alerts: feedback.alerts,
        })
    }
}

/// Calendar days touched by `[start, end]`, counting both ends.
fn span_days(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<u32> {
    let (start, end) = (start?, end?);
    let days = (end.date_naive() - start.date_naive()).num_days() + 1;
    u32::try_from(days.max(1)).ok()
}
