//! Encouragement messages and alerts derived from a [`MetricsSnapshot`].
//!
//! Every category is a small ordered table of [`TierRule`]s built from
//! [`MessagePolicy`]; the first rule whose bound the metric satisfies names
//! the tier. Messages carry their category and tier so a presentation layer
//! can localize them; the `text` field is the default English rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::statistics::{
    Completion, Diversity, Engagement, MetricsSnapshot, Performance, Perseverance, SubjectRecord,
    SubjectScore,
};

/// Round a ratio to the nearest whole percent.
pub fn round_percent(ratio: f64) -> i64 {
    (ratio * 100.0).round() as i64
}

/// What a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Engagement,
    Performance,
    Streak,
    Completion,
    Progress,
    Mastery,
    Speed,
    Records,
    Perseverance,
    Diversity,
    /// Fallback when no other category applies.
    General,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Engagement => "engagement",
            Category::Performance => "performance",
            Category::Streak => "streak",
            Category::Completion => "completion",
            Category::Progress => "progress",
            Category::Mastery => "mastery",
            Category::Speed => "speed",
            Category::Records => "records",
            Category::Perseverance => "perseverance",
            Category::Diversity => "diversity",
            Category::General => "general",
        };
        write!(f, "{name}")
    }
}

/// Bound a measured value must satisfy for a tier to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `value >= x`
    AtLeast(f64),
    /// `value > x`
    Above(f64),
    /// `value == x`, for counts
    Exactly(f64),
}

impl Bound {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Bound::AtLeast(x) => value >= x,
            Bound::Above(x) => value > x,
            Bound::Exactly(x) => value == x,
        }
    }
}

/// One row of a tier table over metric values of type `T`.
///
/// `measure` extracts the number the bound is checked against and `render`
/// produces the default English text for this tier.
pub struct TierRule<T> {
    pub tier: &'static str,
    pub bound: Bound,
    measure: fn(&T) -> f64,
    render: fn(&T) -> String,
}

impl<T> TierRule<T> {
    pub fn new(
        tier: &'static str,
        bound: Bound,
        measure: fn(&T) -> f64,
        render: fn(&T) -> String,
    ) -> Self {
        Self {
            tier,
            bound,
            measure,
            render,
        }
    }

    pub fn matches(&self, value: &T) -> bool {
        self.bound.matches((self.measure)(value))
    }

    pub fn render(&self, value: &T) -> String {
        (self.render)(value)
    }
}

impl<T> fmt::Debug for TierRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierRule")
            .field("tier", &self.tier)
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

/// First rule in `rules` that `value` satisfies.
pub fn first_match<'r, T>(rules: &'r [TierRule<T>], value: &T) -> Option<&'r TierRule<T>> {
    rules.iter().find(|rule| rule.matches(value))
}

/// First rule, in table order, that any of `values` satisfies, with that value.
pub fn first_match_any<'r, 'v, T>(
    rules: &'r [TierRule<T>],
    values: &'v [T],
) -> Option<(&'r TierRule<T>, &'v T)> {
    rules
        .iter()
        .find_map(|rule| values.iter().find(|v| rule.matches(v)).map(|v| (rule, v)))
}

/// Thresholds for message tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePolicy {
    #[serde(default = "default_engagement_high_days")]
    pub engagement_high_days: u32,
    #[serde(default = "default_engagement_medium_days")]
    pub engagement_medium_days: u32,
    #[serde(default = "default_performance_excellent")]
    pub performance_excellent: f64,
    #[serde(default = "default_performance_good")]
    pub performance_good: f64,
    #[serde(default = "default_streak_amazing")]
    pub streak_amazing: u32,
    #[serde(default = "default_streak_great")]
    pub streak_great: u32,
    #[serde(default = "default_completion_perfect")]
    pub completion_perfect: f64,
    #[serde(default = "default_completion_good")]
    pub completion_good: f64,
    #[serde(default = "default_progress_amazing")]
    pub progress_amazing: f64,
    #[serde(default = "default_progress_good")]
    pub progress_good: f64,
    /// Mastered subjects needed for the "multiple" tier.
    #[serde(default = "default_mastery_multiple")]
    pub mastery_multiple: usize,
    #[serde(default = "default_speed_amazing")]
    pub speed_amazing: f64,
    #[serde(default = "default_speed_good")]
    pub speed_good: f64,
    /// Best score that counts as an absolute record.
    #[serde(default = "default_absolute_record_score")]
    pub absolute_record_score: f64,
    #[serde(default = "default_perseverance_amazing")]
    pub perseverance_amazing: usize,
    #[serde(default = "default_perseverance_good")]
    pub perseverance_good: usize,
    #[serde(default = "default_diversity_perfect_balance")]
    pub diversity_perfect_balance: u32,
    #[serde(default = "default_diversity_good_subjects")]
    pub diversity_good_subjects: usize,
}

fn default_engagement_high_days() -> u32 {
    5
}
fn default_engagement_medium_days() -> u32 {
    3
}
fn default_performance_excellent() -> f64 {
    0.8
}
fn default_performance_good() -> f64 {
    0.6
}
fn default_streak_amazing() -> u32 {
    5
}
fn default_streak_great() -> u32 {
    3
}
fn default_completion_perfect() -> f64 {
    0.9
}
fn default_completion_good() -> f64 {
    0.7
}
fn default_progress_amazing() -> f64 {
    0.15
}
fn default_progress_good() -> f64 {
    0.05
}
fn default_mastery_multiple() -> usize {
    2
}
fn default_speed_amazing() -> f64 {
    0.2
}
fn default_speed_good() -> f64 {
    0.1
}
fn default_absolute_record_score() -> f64 {
    0.95
}
fn default_perseverance_amazing() -> usize {
    3
}
fn default_perseverance_good() -> usize {
    1
}
fn default_diversity_perfect_balance() -> u32 {
    80
}
fn default_diversity_good_subjects() -> usize {
    3
}

impl Default for MessagePolicy {
    fn default() -> Self {
        Self {
            engagement_high_days: default_engagement_high_days(),
            engagement_medium_days: default_engagement_medium_days(),
            performance_excellent: default_performance_excellent(),
            performance_good: default_performance_good(),
            streak_amazing: default_streak_amazing(),
            streak_great: default_streak_great(),
            completion_perfect: default_completion_perfect(),
            completion_good: default_completion_good(),
            progress_amazing: default_progress_amazing(),
            progress_good: default_progress_good(),
            mastery_multiple: default_mastery_multiple(),
            speed_amazing: default_speed_amazing(),
            speed_good: default_speed_good(),
            absolute_record_score: default_absolute_record_score(),
            perseverance_amazing: default_perseverance_amazing(),
            perseverance_good: default_perseverance_good(),
            diversity_perfect_balance: default_diversity_perfect_balance(),
            diversity_good_subjects: default_diversity_good_subjects(),
        }
    }
}

impl MessagePolicy {
    pub fn engagement_rules(&self) -> Vec<TierRule<Engagement>> {
        fn days(e: &Engagement) -> f64 {
            f64::from(e.active_days)
        }
        vec![
            TierRule::new(
                "high",
                Bound::AtLeast(f64::from(self.engagement_high_days)),
                days,
                |e| format!("Outstanding commitment: practised on {} of the last {} days!", e.active_days, e.window_days),
            ),
            TierRule::new(
                "medium",
                Bound::AtLeast(f64::from(self.engagement_medium_days)),
                days,
                |e| format!("Good regularity: {} of {} days.", e.active_days, e.window_days),
            ),
            TierRule::new("low", Bound::Above(0.0), days, |e| {
                format!("A habit is forming: {} day(s) of practice.", e.active_days)
            }),
        ]
    }

    pub fn performance_rules(&self) -> Vec<TierRule<Performance>> {
        vec![
            TierRule::new(
                "excellent",
                Bound::AtLeast(self.performance_excellent),
                Performance::high_score_ratio,
                |p| format!("Impressive mastery: {} of {} quizzes scored high!", p.high_scores, p.total),
            ),
            TierRule::new(
                "good",
                Bound::AtLeast(self.performance_good),
                Performance::high_score_ratio,
                |p| format!("Strong results: {} quizzes scored high.", p.high_scores),
            ),
            TierRule::new(
                "average",
                Bound::Above(0.0),
                Performance::high_score_ratio,
                |p| format!("{} great result(s) this period.", p.high_scores),
            ),
        ]
    }

    pub fn streak_rules(&self) -> Vec<TierRule<u32>> {
        fn length(streak: &u32) -> f64 {
            f64::from(*streak)
        }
        vec![
            TierRule::new(
                "amazing",
                Bound::AtLeast(f64::from(self.streak_amazing)),
                length,
                |n| format!("Amazing streak: {n} quizzes completed in a row!"),
            ),
            TierRule::new(
                "great",
                Bound::AtLeast(f64::from(self.streak_great)),
                length,
                |n| format!("On a roll: {n} completions in a row."),
            ),
        ]
    }

    pub fn completion_rules(&self) -> Vec<TierRule<Completion>> {
        vec![
            TierRule::new(
                "perfect",
                Bound::AtLeast(self.completion_perfect),
                Completion::ratio,
                |c| format!("Real perseverance: finished {} of {} quizzes started!", c.completed, c.started),
            ),
            TierRule::new(
                "good",
                Bound::AtLeast(self.completion_good),
                Completion::ratio,
                |c| format!("Good completion rate: {}% of quizzes finished.", round_percent(c.ratio())),
            ),
            TierRule::new("average", Bound::Above(0.0), Completion::ratio, |c| {
                format!("Keep going! {} quiz(zes) finished this period.", c.completed)
            }),
        ]
    }

    pub fn progress_rules(&self) -> Vec<TierRule<f64>> {
        fn delta(d: &f64) -> f64 {
            *d
        }
        vec![
            TierRule::new(
                "amazing",
                Bound::AtLeast(self.progress_amazing),
                delta,
                |d| format!("Rocketing progress: average score up {} points!", round_percent(*d)),
            ),
            TierRule::new(
                "good",
                Bound::AtLeast(self.progress_good),
                delta,
                |d| format!("Clear improvement: +{} points.", round_percent(*d)),
            ),
            TierRule::new("average", Bound::Above(0.0), delta, |d| {
                format!("Slight improvement in score (+{} points).", round_percent(*d))
            }),
        ]
    }

    /// Rules over the mastered subjects, best first.
    pub fn mastery_rules(&self) -> Vec<TierRule<Vec<SubjectScore>>> {
        vec![
            TierRule::new(
                "multiple",
                Bound::AtLeast(self.mastery_multiple as f64),
                |subjects: &Vec<SubjectScore>| subjects.len() as f64,
                |subjects: &Vec<SubjectScore>| {
                    let names: Vec<&str> = subjects.iter().map(|m| m.subject.as_str()).collect();
                    format!("Multi-subject expert: mastered {}!", names.join(", "))
                },
            ),
            TierRule::new(
                "single",
                Bound::Exactly(1.0),
                |subjects: &Vec<SubjectScore>| subjects.len() as f64,
                |subjects: &Vec<SubjectScore>| {
                    subjects
                        .first()
                        .map(|m| {
                            format!("Excellent mastery of {} ({}%)!", m.subject, round_percent(m.score))
                        })
                        .unwrap_or_default()
                },
            ),
        ]
    }

    pub fn speed_rules(&self) -> Vec<TierRule<f64>> {
        fn gain(g: &f64) -> f64 {
            *g
        }
        vec![
            TierRule::new(
                "amazing",
                Bound::AtLeast(self.speed_amazing),
                gain,
                |g| format!("Lightning fast: quizzes finished {}% faster!", round_percent(*g)),
            ),
            TierRule::new(
                "good",
                Bound::AtLeast(self.speed_good),
                gain,
                |g| format!("Response time improved by {}%.", round_percent(*g)),
            ),
        ]
    }

    /// Rules over each subject's best score; the first tier any subject reaches wins.
    pub fn records_rules(&self) -> Vec<TierRule<SubjectRecord>> {
        fn new_best(r: &SubjectRecord) -> f64 {
            if r.is_new_best() {
                r.best_score
            } else {
                f64::NEG_INFINITY
            }
        }
        fn gain_over_previous(r: &SubjectRecord) -> f64 {
            r.previous_best
                .map_or(f64::NEG_INFINITY, |prev| r.best_score - prev)
        }
        vec![
            TierRule::new(
                "absolute",
                Bound::AtLeast(self.absolute_record_score),
                new_best,
                |r| format!("Absolute record: {}% in {}!", round_percent(r.best_score), r.subject),
            ),
            TierRule::new(
                "personal",
                Bound::Above(0.0),
                gain_over_previous,
                |r| format!("Personal best beaten: {}% in {}.", round_percent(r.best_score), r.subject),
            ),
        ]
    }

    pub fn perseverance_rules(&self) -> Vec<TierRule<Perseverance>> {
        fn improved(p: &Perseverance) -> f64 {
            p.improved as f64
        }
        vec![
            TierRule::new(
                "amazing",
                Bound::AtLeast(self.perseverance_amazing as f64),
                improved,
                |p| format!("Incredible determination: {} successful retries!", p.improved),
            ),
            TierRule::new(
                "good",
                Bound::AtLeast(self.perseverance_good as f64),
                improved,
                |p| format!("Perseverance pays off: {} setback(s) overcome.", p.improved),
            ),
        ]
    }

    pub fn diversity_rules(&self) -> Vec<TierRule<Diversity>> {
        vec![
            TierRule::new(
                "perfect",
                Bound::AtLeast(f64::from(self.diversity_perfect_balance)),
                |d: &Diversity| f64::from(d.balance_score),
                |d: &Diversity| format!("Perfect balance across {} subjects!", d.subjects),
            ),
            TierRule::new(
                "good",
                Bound::AtLeast(self.diversity_good_subjects as f64),
                |d: &Diversity| d.subjects as f64,
                |d: &Diversity| format!("Good variety: {} subjects studied.", d.subjects),
            ),
        ]
    }
}

/// Thresholds for alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Abandonment ratio strictly above which a high alert fires.
    #[serde(default = "default_high_abandon_ratio")]
    pub high_abandon_ratio: f64,
    /// Abandonment ratio strictly above which a medium alert fires.
    #[serde(default = "default_medium_abandon_ratio")]
    pub medium_abandon_ratio: f64,
    #[serde(default = "default_persistent_failure_count")]
    pub persistent_failure_count: usize,
    #[serde(default = "default_low_score_threshold")]
    pub low_score_threshold: f64,
    /// Minutes per attempt under which effort is considered too low.
    #[serde(default = "default_effort_floor_minutes")]
    pub effort_floor_minutes: f64,
}

fn default_high_abandon_ratio() -> f64 {
    0.5
}
fn default_medium_abandon_ratio() -> f64 {
    0.2
}
fn default_persistent_failure_count() -> usize {
    3
}
fn default_low_score_threshold() -> f64 {
    0.5
}
fn default_effort_floor_minutes() -> f64 {
    2.0
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            high_abandon_ratio: default_high_abandon_ratio(),
            medium_abandon_ratio: default_medium_abandon_ratio(),
            persistent_failure_count: default_persistent_failure_count(),
            low_score_threshold: default_low_score_threshold(),
            effort_floor_minutes: default_effort_floor_minutes(),
        }
    }
}

/// A positive, tiered message about one metric category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub category: Category,
    pub tier: String,
    pub text: String,
}

impl Message {
    fn new(category: Category, tier: &str, text: String) -> Self {
        Self {
            category,
            tier: tier.to_string(),
            text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighAbandonRate,
    MediumAbandonRate,
    PersistentFailure,
    LowAverageScore,
    LowEffortTime,
    NoRecentActivity,
}

impl AlertKind {
    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::HighAbandonRate | AlertKind::PersistentFailure => Severity::High,
            AlertKind::MediumAbandonRate
            | AlertKind::LowAverageScore
            | AlertKind::LowEffortTime => Severity::Medium,
            AlertKind::NoRecentActivity => Severity::Low,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            AlertKind::HighAbandonRate => {
                "Try shorter sessions or easier quizzes so attempts get finished."
            }
            AlertKind::MediumAbandonRate => {
                "Encourage finishing each quiz before starting a new one."
            }
            AlertKind::PersistentFailure => {
                "Review the chapter together before retrying this quiz."
            }
            AlertKind::LowAverageScore => {
                "Revisit the basics and use hints to work through hard questions."
            }
            AlertKind::LowEffortTime => {
                "Take more time to read each question before answering."
            }
            AlertKind::NoRecentActivity => "Plan a short practice session this week.",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertKind::HighAbandonRate => "high_abandon_rate",
            AlertKind::MediumAbandonRate => "medium_abandon_rate",
            AlertKind::PersistentFailure => "persistent_failure",
            AlertKind::LowAverageScore => "low_average_score",
            AlertKind::LowEffortTime => "low_effort_time",
            AlertKind::NoRecentActivity => "no_recent_activity",
        };
        write!(f, "{name}")
    }
}

/// A condition worth a guardian's attention, with a suggested action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub text: String,
    pub recommendation: String,
}

impl Alert {
    fn new(kind: AlertKind, text: String) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            text,
            recommendation: kind.recommendation().to_string(),
        }
    }
}

/// Messages and alerts for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub messages: Vec<Message>,
    pub alerts: Vec<Alert>,
}

/// Turns snapshots into [`Feedback`].
#[derive(Debug, Clone, Default)]
pub struct MessageGenerator {
    messages: MessagePolicy,
    alerts: AlertPolicy,
}

impl MessageGenerator {
    pub fn new(messages: MessagePolicy, alerts: AlertPolicy) -> Self {
        Self { messages, alerts }
    }

    pub fn generate(&self, snapshot: &MetricsSnapshot) -> Feedback {
        let mut messages = self.messages_for(snapshot);
        if messages.is_empty() {
            messages.push(Message::new(
                Category::General,
                "fallback",
                "Keep practising! Every quiz is a step forward.".to_string(),
            ));
        }
        let alerts = self.alerts_for(snapshot);

        tracing::debug!(
            messages = messages.len(),
            alerts = alerts.len(),
            "generated feedback"
        );

        Feedback { messages, alerts }
    }

    fn messages_for(&self, s: &MetricsSnapshot) -> Vec<Message> {
        let p = &self.messages;
        let mut out = Vec::new();

        fn push<T>(out: &mut Vec<Message>, category: Category, rules: &[TierRule<T>], value: &T) {
            if let Some(rule) = first_match(rules, value) {
                out.push(Message::new(category, rule.tier, rule.render(value)));
            }
        }

        if let Some(e) = &s.engagement {
            push(&mut out, Category::Engagement, &p.engagement_rules(), e);
        }
        if let Some(perf) = &s.performance {
            push(&mut out, Category::Performance, &p.performance_rules(), perf);
        }
        if let Some(streak) = &s.streak {
            push(&mut out, Category::Streak, &p.streak_rules(), streak);
        }
        if let Some(c) = &s.completion {
            push(&mut out, Category::Completion, &p.completion_rules(), c);
        }
        if let Some(delta) = &s.progress {
            push(&mut out, Category::Progress, &p.progress_rules(), delta);
        }
        if let Some(mastered) = &s.mastery {
            push(&mut out, Category::Mastery, &p.mastery_rules(), mastered);
        }
        if let Some(gain) = &s.speed {
            push(&mut out, Category::Speed, &p.speed_rules(), gain);
        }
        if let Some(records) = &s.records {
            if let Some((rule, r)) = first_match_any(&p.records_rules(), records) {
                out.push(Message::new(Category::Records, rule.tier, rule.render(r)));
            }
        }
        if let Some(ps) = &s.perseverance {
            push(&mut out, Category::Perseverance, &p.perseverance_rules(), ps);
        }
        if let Some(d) = &s.diversity {
            push(&mut out, Category::Diversity, &p.diversity_rules(), d);
        }

        out
    }

    fn alerts_for(&self, s: &MetricsSnapshot) -> Vec<Alert> {
        let p = &self.alerts;
        let mut out = Vec::new();

        if let Some(a) = &s.abandonment {
            let ratio = a.ratio();
            let kind = if ratio > p.high_abandon_ratio {
                Some(AlertKind::HighAbandonRate)
            } else if ratio > p.medium_abandon_ratio {
                Some(AlertKind::MediumAbandonRate)
            } else {
                None
            };
            if let Some(kind) = kind {
                out.push(Alert::new(
                    kind,
                    format!(
                        "{}% of quizzes were abandoned ({} of {}).",
                        round_percent(ratio),
                        a.abandoned,
                        a.total
                    ),
                ));
            }
        }

        if let Some(f) = &s.persistent_failure {
            if f.count >= p.persistent_failure_count {
                out.push(Alert::new(
                    AlertKind::PersistentFailure,
                    format!("Failed quiz {} {} times in a row.", f.quiz_id, f.count),
                ));
            }
        }

        if let Some(perf) = &s.performance {
            if perf.average_score < p.low_score_threshold {
                out.push(Alert::new(
                    AlertKind::LowAverageScore,
                    format!(
                        "Average score is {}%.",
                        round_percent(perf.average_score)
                    ),
                ));
            }
        }

        if let Some(t) = &s.time {
            if t.avg_minutes_per_attempt < p.effort_floor_minutes {
                out.push(Alert::new(
                    AlertKind::LowEffortTime,
                    format!(
                        "Only {:.1} minutes spent per quiz on average.",
                        t.avg_minutes_per_attempt
                    ),
                ));
            }
        }

        if let Some(e) = &s.engagement {
            if e.recent_attempts == 0 {
                out.push(Alert::new(
                    AlertKind::NoRecentActivity,
                    format!("No quizzes in the last {} days.", e.window_days),
                ));
            }
        }

        out
    }
}
