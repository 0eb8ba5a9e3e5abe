use crate::enums::{OrderSide, ReasonTag};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single market tick: the latest price of every symbol quoted at `timestamp`.
///
/// A `BTreeMap` is used so that iteration is always in lexical symbol order, which
/// keeps strategy output deterministic across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub timestamp: DateTime<Utc>,
    pub prices: BTreeMap<String, Decimal>,
}

impl PriceUpdate {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            prices: BTreeMap::new(),
        }
    }

    /// Builder-style helper, mostly useful in tests and fixtures.
    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }
}

/// The output of a strategy: buy or sell one symbol, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    /// The price the strategy observed when deciding.
    pub price: Decimal,
    /// Sizing multiplier handed to the risk manager. 1 is the base size.
    pub weight: Decimal,
    pub reason: ReasonTag,
}

impl Decision {
    pub fn buy(
        timestamp: DateTime<Utc>,
        symbol: &str,
        price: Decimal,
        weight: Decimal,
        reason: ReasonTag,
    ) -> Self {
        Self {
            decision_id: Uuid::new_v4(),
            timestamp,
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            price,
            weight,
            reason,
        }
    }

    pub fn sell(timestamp: DateTime<Utc>, symbol: &str, price: Decimal, reason: ReasonTag) -> Self {
        Self {
            decision_id: Uuid::new_v4(),
            timestamp,
            symbol: symbol.to_string(),
            side: OrderSide::Sell,
            price,
            weight: Decimal::ONE,
            reason,
        }
    }
}

/// A sized order, produced by the risk manager from a `Decision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Reference price for the simulated fill.
    pub price: Decimal,
    pub reason: ReasonTag,
}

/// A confirmed fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: Uuid,
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: ReasonTag,
}

/// An open long position. Entry price is the quantity-weighted average of all fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub opened_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Number of buy fills that built this position (1 + DCA adds).
    pub fills: u32,
}

impl Position {
    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity
    }
}

/// A completed round trip, from the first buy fill to the closing sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    /// Fees paid on every fill of the round trip.
    pub fees: Decimal,
    pub entry_reason: ReasonTag,
    pub exit_reason: ReasonTag,
    pub fills: u32,
}

impl Trade {
    pub fn gross_profit(&self) -> Decimal {
        (self.exit_price - self.entry_price) * self.quantity
    }

    pub fn net_profit(&self) -> Decimal {
        self.gross_profit() - self.fees
    }

    /// Net return on the capital committed to the trade, in percent.
    pub fn return_pct(&self) -> Decimal {
        let cost = self.entry_price * self.quantity;
        if cost.is_zero() {
            return Decimal::ZERO;
        }
        self.net_profit() / cost * Decimal::ONE_HUNDRED
    }

    pub fn is_win(&self) -> bool {
        self.net_profit() > Decimal::ZERO
    }
}

/// Feedback from the hive penalty scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HiveSignal {
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub penalized_tags: Vec<ReasonTag>,
    #[serde(default)]
    pub cleared_tags: Vec<ReasonTag>,
    #[serde(default)]
    pub paused_symbols: Vec<String>,
    #[serde(default)]
    pub resumed_symbols: Vec<String>,
}

impl HiveSignal {
    pub fn penalize(timestamp: DateTime<Utc>, tag: ReasonTag) -> Self {
        Self {
            timestamp: Some(timestamp),
            penalized_tags: vec![tag],
            ..Self::default()
        }
    }

    pub fn clear(timestamp: DateTime<Utc>, tag: ReasonTag) -> Self {
        Self {
            timestamp: Some(timestamp),
            cleared_tags: vec![tag],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.penalized_tags.is_empty()
            && self.cleared_tags.is_empty()
            && self.paused_symbols.is_empty()
            && self.resumed_symbols.is_empty()
    }
}
