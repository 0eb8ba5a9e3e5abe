//! # Hive Indicators
//!
//! Rolling-window technical indicators. Each indicator is a closed-form formula over
//! a slice of prices, oldest first, so it can be evaluated against a [`PriceWindow`]
//! or any other contiguous buffer.
//!
//! Every function returns `None` when the indicator is undefined for its input
//! (too few values, zero variance) rather than a sentinel number.

pub mod stats;
pub mod window;

pub use stats::{atr, bollinger, linear_regression, mean, rsi, std_dev, z_score, Bands, Regression};
pub use window::PriceWindow;
