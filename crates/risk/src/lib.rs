//! # Hive Risk Management
//!
//! Turns a strategy `Decision` (what and why) into a sized `OrderRequest` (how much).
//!
//! ## Architectural Principles
//!
//! - **Separation of Concerns:** Strategies never see money. They emit a sizing
//!   `weight`; this crate converts it into a quantity against the portfolio.
//! - **Snapshot In, Order Out:** The manager is given an immutable `PortfolioSnapshot`
//!   and holds no state of its own, so it is trivially shared across optimizer workers.
//!
//! ## Public API
//!
//! - `RiskManager`: The trait every sizing policy implements.
//! - `SimpleRiskManager`: Fixed-fractional sizing with cash and exposure caps.
//! - `PortfolioSnapshot`: The portfolio view the manager sizes against.

pub mod error;
pub mod simple_manager;

pub use error::RiskError;
pub use simple_manager::SimpleRiskManager;

use core_types::{Decision, OrderRequest, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A point-in-time view of the portfolio, valued at the current tick's prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub total_equity: Decimal,
    pub positions: Vec<Position>,
}

impl PortfolioSnapshot {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}

pub trait RiskManager: Send + Sync {
    /// Sizes a decision. A buy is sized from the decision's weight; a sell always
    /// closes the whole position.
    fn size(&self, decision: &Decision, portfolio: &PortfolioSnapshot) -> Result<OrderRequest, RiskError>;
}
