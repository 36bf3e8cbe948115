//! Configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::messages::{AlertPolicy, MessagePolicy};
use crate::statistics::MetricsConfig;

/// Environment variable overriding `metrics.comparison_window_days`.
pub const COMPARISON_WINDOW_ENV: &str = "QUIZPULSE_COMPARISON_WINDOW_DAYS";

/// Longest accepted reporting or comparison window, about a century.
pub const MAX_WINDOW_DAYS: u32 = 36_525;

/// Top-level quizpulse configuration.
///
/// Scoring weights and time bounds are deliberately absent: they are fixed
/// so that stored scores stay comparable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizpulseConfig {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub messages: MessagePolicy,
    #[serde(default)]
    pub alerts: AlertPolicy,
}

impl QuizpulseConfig {
    /// Render as TOML, e.g. for a starter config file.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    /// Reject window lengths the report pipeline cannot use.
    pub fn validate(&self) -> Result<()> {
        check_window_days("metrics.window_days", self.metrics.window_days)?;
        check_window_days(
            "metrics.comparison_window_days",
            self.metrics.comparison_window_days,
        )
    }
}

fn check_window_days(name: &str, days: u32) -> Result<()> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        anyhow::bail!("{name} must be between 1 and {MAX_WINDOW_DAYS} days, got {days}");
    }
    Ok(())
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `quizpulse.toml` in the current directory
/// 2. `~/.config/quizpulse/config.toml`
///
/// Environment variable override: `QUIZPULSE_COMPARISON_WINDOW_DAYS`.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizpulseConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizpulse.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizpulseConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Parse a TOML document into a config, defaulting anything missing.
pub fn parse_config(content: &str) -> Result<QuizpulseConfig> {
    let config: QuizpulseConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut QuizpulseConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = lookup(COMPARISON_WINDOW_ENV) {
        let days: u32 = raw
            .trim()
            .parse()
            .with_context(|| format!("{COMPARISON_WINDOW_ENV} must be a whole number of days, got {raw:?}"))?;
        check_window_days(COMPARISON_WINDOW_ENV, days)?;
        config.metrics.comparison_window_days = days;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizpulse"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = QuizpulseConfig::default();
        assert_eq!(config.metrics.window_days, 7);
        assert_eq!(config.metrics.comparison_window_days, 7);
        assert_eq!(config.messages.streak_amazing, 5);
        assert_eq!(config.alerts.high_abandon_ratio, 0.5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml_str = r#"
[metrics]
comparison_window_days = 14

[alerts]
effort_floor_minutes = 3.5
"#;
        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.metrics.comparison_window_days, 14);
        assert_eq!(config.metrics.mastery_threshold, 0.7);
        assert_eq!(config.alerts.effort_floor_minutes, 3.5);
        assert_eq!(config.alerts.persistent_failure_count, 3);
        assert_eq!(config.messages, MessagePolicy::default());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(parse_config("").unwrap(), QuizpulseConfig::default());
    }

    #[test]
    fn starter_toml_parses_back() {
        let config = QuizpulseConfig::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[metrics]"));
        assert_eq!(parse_config(&rendered).unwrap(), config);
    }

    #[test]
    fn env_override_sets_comparison_window() {
        let mut config = QuizpulseConfig::default();
        apply_env_overrides(&mut config, |key| {
            (key == COMPARISON_WINDOW_ENV).then(|| "28".to_string())
        })
        .unwrap();
        assert_eq!(config.metrics.comparison_window_days, 28);

        let mut config = QuizpulseConfig::default();
        assert!(apply_env_overrides(&mut config, |_| Some("soon".into())).is_err());
        assert!(apply_env_overrides(&mut config, |_| Some("0".into())).is_err());
        assert!(apply_env_overrides(&mut config, |_| Some("4000000000".into())).is_err());
        apply_env_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config.metrics.comparison_window_days, 7);
    }

    #[test]
    fn toml_window_lengths_are_bounded() {
        for doc in [
            "[metrics]\ncomparison_window_days = 0\n",
            "[metrics]\ncomparison_window_days = 4000000000\n",
            "[metrics]\nwindow_days = 0\n",
        ] {
            let err = parse_config(doc).unwrap_err();
            assert!(err.to_string().contains("must be between"), "{doc}: {err}");
        }
        let config = parse_config("[metrics]\ncomparison_window_days = 36525\n").unwrap();
        assert_eq!(config.metrics.comparison_window_days, MAX_WINDOW_DAYS);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/quizpulse.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[messages]\nmastery_multiple = 3\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.messages.mastery_multiple, 3);
    }
}
