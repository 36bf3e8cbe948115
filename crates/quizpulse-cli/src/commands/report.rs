//! The `quizpulse report` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizpulse_core::config::load_config_from;
use quizpulse_core::messages::round_percent;
use quizpulse_core::parser;
use quizpulse_core::period::PeriodMode;
use quizpulse_core::report::ProgressReport;
use quizpulse_core::AnalyticsEngine;

use super::resolve_learner;

#[allow(clippy::too_many_arguments)]
pub fn execute(
    attempts_path: PathBuf,
    period: String,
    account: Option<String>,
    child: Option<String>,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
    fail_on_alerts: bool,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let mode: PeriodMode = period.parse()?;
    let records = parser::load_attempts(&attempts_path)?;
    let (account, child) = resolve_learner(&records, account, child)?;
    tracing::debug!(
        store = %attempts_path.display(),
        records = records.len(),
        %account,
        %child,
        "loaded attempt store"
    );

    let report = AnalyticsEngine::new(config).build_report(&account, &child, &records, &mode)?;

    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&report)?,
        "markdown" | "md" => report.to_markdown(),
        "text" => render_text(&report),
        other => anyhow::bail!("unknown format: {other} (expected text, json or markdown)"),
    };

    match output {
        Some(path) if format == "json" => {
            report.save_json(&path)?;
            tracing::info!(path = %path.display(), report = %report.id, "saved report");
            eprintln!("Report saved to: {}", path.display());
        }
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)?;
            tracing::info!(path = %path.display(), report = %report.id, "saved report");
            eprintln!("Report saved to: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if fail_on_alerts && report.has_alerts() {
        std::process::exit(1);
    }

    Ok(())
}

fn render_text(report: &ProgressReport) -> String {
    let s = &report.snapshot;
    let mut out = format!(
        "Progress for {}/{} ({}): {} attempt(s)\n",
        report.account_id,
        report.child_index,
        report.period.label(),
        s.total_attempts
    );

    if !s.subjects.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Subject", "Attempts", "Completed", "Average"]);
        for (subject, stats) in &s.subjects {
            table.add_row(vec![
                Cell::new(subject),
                Cell::new(stats.count),
                Cell::new(stats.completed),
                Cell::new(format!("{}%", round_percent(stats.average_score))),
            ]);
        }
        out.push_str(&format!("\n{table}\n"));
    }

    out.push('\n');
    for m in &report.messages {
        out.push_str(&format!("  + [{} {}] {}\n", m.category, m.tier, m.text));
    }

    if !report.alerts.is_empty() {
        out.push_str("\nAlerts:\n");
        for a in &report.alerts {
            out.push_str(&format!(
                "  [{}] {} {}\n",
                a.severity, a.text, a.recommendation
            ));
        }
    }

    out
}
