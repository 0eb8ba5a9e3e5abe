//! # Hive Executor Crate
//!
//! This crate provides the components for simulated trade execution and portfolio state
//! management. It defines a generic `Executor` trait, a `SimulatedExecutor` for
//! backtesting, and a long-only `Portfolio` that tracks the account.
//!
//! ## Architectural Principles
//!
//! - **State vs. Logic Decoupling:** The `Executor` trait is a pure calculator that
//!   determines the effects of a trade (fees and slippage) without mutating state. The
//!   `Portfolio` is the state machine that applies executions to cash and positions.
//! - **Execution Abstraction:** The backtester only sees the `Executor` trait, so the fill
//!   model can be swapped without touching the event loop.
//!
//! ## Public API
//!
//! - `Executor`: The core trait for all execution engines.
//! - `SimulatedExecutor`: The "virtual exchange" for backtesting.
//! - `Portfolio`: The in-memory state manager for a trading account.
//! - `ExecutorError`: The specific error types that can be returned from this crate.

pub mod error;
pub mod portfolio;
pub mod simulated;

pub use error::ExecutorError;
pub use portfolio::Portfolio;
pub use simulated::{Executor, SimulatedExecutor};
