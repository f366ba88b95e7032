//! Shared gateway types: bars, positions, accounts, orders, market clock.

use std::fmt;

use chrono::{DateTime, Utc};
use longshort::{PositionSide, Side, Symbol};

/// Bar width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Minute,
    Day,
}

/// Parameters for a recent-bars request.
#[derive(Debug, Clone)]
pub struct BarRequest {
    pub timeframe: Timeframe,
    /// Maximum number of bars, newest last.
    pub limit: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BarRequest {
    /// The single most recent one-minute bar.
    pub fn latest() -> Self {
        Self {
            timeframe: Timeframe::Minute,
            limit: 1,
            start: None,
            end: None,
        }
    }

    /// Up to `limit` daily bars ending at `end`.
    ///
    /// The window starts `2 * limit` calendar days back so weekends and
    /// holidays still leave `limit` trading days.
    pub fn daily(limit: usize, end: DateTime<Utc>) -> Self {
        Self {
            timeframe: Timeframe::Day,
            limit,
            start: Some(end - chrono::Duration::days(2 * limit as i64)),
            end: Some(end),
        }
    }
}

/// A price bar. Only the close is used by the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub close_cents: i64,
}

/// Broker-reported position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub symbol: Symbol,
    pub side: PositionSide,
    /// Positive = long, negative = short.
    pub qty: i64,
    /// Signed market value (negative for shorts at most brokers).
    pub market_value_cents: i64,
}

/// Account snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub equity_cents: i64,
    pub buying_power_cents: i64,
    pub cash_cents: i64,
}

/// Opaque order ID returned by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An order still working at the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrder {
    pub id: OrderId,
    pub symbol: Symbol,
}

/// How long a market order stays working.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TimeInForce {
    #[default]
    Day,
    Gtc,
    Ioc,
    Fok,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
            TimeInForce::Ioc => "ioc",
            TimeInForce::Fok => "fok",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market order to submit. Quantity is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub qty: u64,
    pub time_in_force: TimeInForce,
}

/// Market clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub timestamp: DateTime<Utc>,
    pub is_open: bool,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}
