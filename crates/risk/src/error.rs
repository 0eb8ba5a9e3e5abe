use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Risk parameters from configuration are invalid: {0}")]
    InvalidParameters(String),

    #[error("Insufficient portfolio equity ({0}) to execute trade based on risk rules.")]
    InsufficientEquity(Decimal),

    #[error("The provided entry price ({0}) is zero or negative.")]
    InvalidEntryPrice(Decimal),

    #[error("Order for {symbol} is too small after sizing (notional {notional}).")]
    OrderTooSmall { symbol: String, notional: Decimal },

    #[error("No open position in {0} to sell.")]
    NoPosition(String),
}
