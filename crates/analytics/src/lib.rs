//! # Hive Analytics Engine
//!
//! This crate provides the tools for quantitative analysis of strategy performance.
//! It acts as the "unbiased judge" of the system, and hosts the hive penalty scorer that
//! feeds its verdicts back to the strategies.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O. It depends only on `core-types` and `configuration`.
//! - **Stateless Calculation:** The `AnalyticsEngine` takes raw trading data as input and
//!   produces a `PerformanceReport` as output.
//! - **Stateful Feedback:** The `HiveScorer` is the one stateful component: it accumulates
//!   a penalty per reason tag across closed trades and emits `HiveSignal`s when a tag
//!   crosses its thresholds.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The main struct that contains the calculation logic.
//! - `PerformanceReport`: The standardized struct that holds all performance metrics.
//! - `TagStats`: Per reason tag trade statistics.
//! - `HiveScorer`: The reason-tag penalty scorer.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

pub mod engine;
pub mod error;
pub mod hive;
pub mod report;

pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use hive::HiveScorer;
pub use report::{PerformanceReport, TagStats};
