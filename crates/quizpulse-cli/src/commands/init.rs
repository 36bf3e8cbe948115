//! The `quizpulse init` command.

use anyhow::Result;

use quizpulse_core::config::QuizpulseConfig;

pub fn execute() -> Result<()> {
    // Create quizpulse.toml
    if std::path::Path::new("quizpulse.toml").exists() {
        println!("quizpulse.toml already exists, skipping.");
    } else {
        let config = format!(
            "# quizpulse configuration\n# Every value below is the built-in default.\n\n{}",
            QuizpulseConfig::default().to_toml()?
        );
        std::fs::write("quizpulse.toml", config)?;
        println!("Created quizpulse.toml");
    }

    // Create example attempt store
    std::fs::create_dir_all("attempts")?;
    let example_path = std::path::Path::new("attempts/example.json");
    if example_path.exists() {
        println!("attempts/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_ATTEMPTS)?;
        println!("Created attempts/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: quizpulse validate --attempts attempts/example.json");
    println!("  2. Run: quizpulse weeks --attempts attempts");
    println!("  3. Run: quizpulse report --attempts attempts --format markdown");

    Ok(())
}

const EXAMPLE_ATTEMPTS: &str = r#"[
  {
    "account_id": "family-1",
    "child_index": "0",
    "quiz_id": "fractions-1",
    "subject": "math",
    "chapter": "fractions",
    "start_time": "2025-08-12T16:00:00Z",
    "end_time": "2025-08-12T16:04:00Z",
    "questions": [
      { "correct": true, "hint_count": 0, "wrong_count": 0 },
      { "correct": true, "hint_count": 1, "wrong_count": 0 },
      { "correct": false, "hint_count": 0, "wrong_count": 2 }
    ],
    "score": 0.5391304347826087,
    "outcome": "abandoned"
  },
  {
    "account_id": "family-1",
    "child_index": "0",
    "quiz_id": "fractions-1",
    "subject": "math",
    "chapter": "fractions",
    "start_time": "2025-08-18T16:00:00Z",
    "end_time": "2025-08-18T16:03:00Z",
    "questions": [
      { "correct": true, "hint_count": 0, "wrong_count": 0 },
      { "correct": true, "hint_count": 0, "wrong_count": 0 },
      { "correct": true, "hint_count": 0, "wrong_count": 1 }
    ],
    "score": 0.8405797101449276,
    "outcome": "completed"
  },
  {
    "account_id": "family-1",
    "child_index": "0",
    "quiz_id": "colours-2",
    "subject": "art",
    "start_time": "2025-08-20T17:30:00Z",
    "end_time": "2025-08-20T17:32:30Z",
    "questions": [
      { "correct": true, "hint_count": 0, "wrong_count": 0 },
      { "correct": true, "hint_count": 0, "wrong_count": 0 }
    ],
    "score": 0.9652173913043479,
    "outcome": "completed"
  }
]
"#;
