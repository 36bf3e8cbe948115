//! The `quizpulse weeks` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizpulse_core::messages::round_percent;
use quizpulse_core::parser;
use quizpulse_core::period::group_by_iso_week;

pub fn execute(attempts_path: PathBuf) -> Result<()> {
    let records = parser::load_attempts(&attempts_path)?;
    let weeks = group_by_iso_week(&records);

    if weeks.is_empty() {
        println!("No attempts found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Week", "Attempts", "Completed", "Average score"]);

    for (key, bucket) in &weeks {
        let completed = bucket.iter().filter(|r| r.is_completed()).count();
        let average = bucket.iter().map(|r| r.score).sum::<f64>() / bucket.len() as f64;
        table.add_row(vec![
            Cell::new(key),
            Cell::new(bucket.len()),
            Cell::new(completed),
            Cell::new(format!("{}%", round_percent(average))),
        ]);
    }

    println!("{table}");
    Ok(())
}
