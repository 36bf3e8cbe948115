//! quizpulse CLI: score quiz attempts and report learner progress.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizpulse", version, about = "Quiz attempt scoring and progress analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a raw submission and print the resulting attempt record
    Score {
        /// Path to a submission JSON file
        #[arg(long)]
        submission: PathBuf,
    },

    /// Build a progress report for one learner
    Report {
        /// Attempt store: a JSON file or a directory of JSON files
        #[arg(long)]
        attempts: PathBuf,

        /// Period: weekly, all, or an ISO week key like 2025-W34
        #[arg(long, default_value = "weekly")]
        period: String,

        /// Account ID (required when the store holds several learners)
        #[arg(long)]
        account: Option<String>,

        /// Child index within the account
        #[arg(long)]
        child: Option<String>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exit code 1 if the report raises any alert
        #[arg(long)]
        fail_on_alerts: bool,
    },

    /// Summarize attempts per ISO week
    Weeks {
        /// Attempt store: a JSON file or a directory of JSON files
        #[arg(long)]
        attempts: PathBuf,
    },

    /// Check stored attempt records against the scoring rules
    Validate {
        /// Attempt store: a JSON file or a directory of JSON files
        #[arg(long)]
        attempts: PathBuf,
    },

    /// Recompute score and outcome of stored records
    Rescore {
        /// Attempt store JSON file
        #[arg(long)]
        attempts: PathBuf,

        /// Where to write the rescored records (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create a starter config and example attempt store
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizpulse=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score { submission } => commands::score::execute(submission),
        Commands::Report {
            attempts,
            period,
            account,
            child,
            format,
            output,
            config,
            fail_on_alerts,
        } => commands::report::execute(
            attempts,
            period,
            account,
            child,
            format,
            output,
            config,
            fail_on_alerts,
        ),
        Commands::Weeks { attempts } => commands::weeks::execute(attempts),
        Commands::Validate { attempts } => commands::validate::execute(attempts),
        Commands::Rescore { attempts, output } => commands::rescore::execute(attempts, output),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
