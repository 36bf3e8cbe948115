//! quizpulse-core: attempt scoring and learner progress analytics.
//!
//! Scores individual quiz attempts, groups them into ISO weeks, aggregates
//! window metrics and turns them into tiered messages and alerts. Everything
//! here is synchronous and free of I/O except the file helpers in [`parser`]
//! and [`report`].

pub mod config;
pub mod engine;
pub mod error;
pub mod messages;
pub mod model;
pub mod parser;
pub mod period;
pub mod report;
pub mod scoring;
pub mod statistics;

pub use engine::AnalyticsEngine;
pub use error::InvalidInput;
