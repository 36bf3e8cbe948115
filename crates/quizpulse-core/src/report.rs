//! Progress report types with JSON persistence and Markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messages::{round_percent, Alert, Message};
use crate::period::PeriodMode;
use crate::statistics::MetricsSnapshot;

/// A complete progress report for one learner and one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub account_id: String,
    pub child_index: String,
    pub period: PeriodSummary,
    pub snapshot: MetricsSnapshot,
    pub messages: Vec<Message>,
    pub alerts: Vec<Alert>,
}

/// Which slice of history the report covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub mode: PeriodMode,
    /// ISO week key, for weekly reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Start of the prior window compared against; it ends at `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_start: Option<DateTime<Utc>>,
}

impl PeriodSummary {
    /// A period with nothing selected.
    pub fn empty(mode: PeriodMode) -> Self {
        Self {
            mode,
            key: None,
            start: None,
            end: None,
            comparison_start: None,
        }
    }

    /// Short human label, e.g. `2025-W34` or `all attempts`.
    pub fn label(&self) -> String {
        match (&self.key, &self.mode) {
            (Some(key), _) => key.clone(),
            (None, PeriodMode::All) => "all attempts".to_string(),
            (None, _) => "no attempts".to_string(),
        }
    }
}

impl ProgressReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ProgressReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let s = &self.snapshot;
        let mut md = String::new();

        md.push_str(&format!(
            "## Progress report: {} (child {})\n\n",
            self.account_id, self.child_index
        ));
        md.push_str(&format!(
            "**Period:** {} | **Attempts:** {}\n\n",
            self.period.label(),
            s.total_attempts
        ));

        let mut rows: Vec<(&str, String)> = Vec::new();
        if let Some(e) = &s.engagement {
            rows.push((
                "Active days",
                format!("{} / {}", e.active_days, e.window_days),
            ));
        }
        if let Some(p) = &s.performance {
            rows.push((
                "Average score",
                format!("{}%", round_percent(p.average_score)),
            ));
            rows.push((
                "High scores",
                format!("{} / {}", p.high_scores, p.total),
            ));
        }
        if let Some(c) = &s.completion {
            rows.push((
                "Completed",
                format!("{} / {} ({}%)", c.completed, c.started, round_percent(c.ratio())),
            ));
        }
        if let Some(a) = &s.abandonment {
            rows.push(("Abandoned", format!("{} / {}", a.abandoned, a.total)));
        }
        if let Some(streak) = s.streak {
            rows.push(("Best streak", streak.to_string()));
        }
        if let Some(delta) = s.progress {
            rows.push(("Progress", format!("{:+} pts", round_percent(delta))));
        }
        if let Some(speed) = s.speed {
            rows.push(("Speed gain", format!("{:+}%", round_percent(speed))));
        }
        if let Some(t) = &s.time {
            rows.push((
                "Time spent",
                format!(
                    "{:.1} min ({:.1} min/quiz)",
                    t.total_minutes, t.avg_minutes_per_attempt
                ),
            ));
        }

        if !rows.is_empty() {
            md.push_str("| Metric | Value |\n");
            md.push_str("|--------|-------|\n");
            for (metric, value) in &rows {
                md.push_str(&format!("| {metric} | {value} |\n"));
            }
            md.push('\n');
        }

        if !s.subjects.is_empty() {
            md.push_str("### Subjects\n\n");
            md.push_str("| Subject | Attempts | Completed | Average |\n");
            md.push_str("|---------|----------|-----------|---------|\n");
            for (subject, stats) in &s.subjects {
                md.push_str(&format!(
                    "| {} | {} | {} | {}% |\n",
                    subject,
                    stats.count,
                    stats.completed,
                    round_percent(stats.average_score)
                ));
            }
            md.push('\n');
        }

        if !s.chapters.is_empty() {
            md.push_str("### Chapters\n\n");
            md.push_str("| Subject | Chapter | Attempts | Average |\n");
            md.push_str("|---------|---------|----------|---------|\n");
            for (subject, chapters) in &s.chapters {
                for (chapter, stats) in chapters {
                    md.push_str(&format!(
                        "| {} | {} | {} | {}% |\n",
                        subject,
                        chapter,
                        stats.attempts,
                        round_percent(stats.average_score)
                    ));
                }
            }
            md.push('\n');
        }

        if !self.messages.is_empty() {
            md.push_str("### Highlights\n\n");
            for m in &self.messages {
                md.push_str(&format!("- **{}** ({}): {}\n", m.category, m.tier, m.text));
            }
            md.push('\n');
        }

        if !self.alerts.is_empty() {
            md.push_str("### Alerts\n\n");
            md.push_str("| Severity | Alert | Recommendation |\n");
            md.push_str("|----------|-------|----------------|\n");
            for a in &self.alerts {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    a.severity, a.text, a.recommendation
                ));
            }
        }

        md
    }

    /// Returns true if any alert was raised.
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}
