//! Broker and quote gateway for longshort.
//!
//! Provides the `Gateway` trait the rebalancer talks to, so the strategy
//! never sees transport, authentication or rate limiting. Implementations:
//!
//! - **Mock** (always built): scripted in-memory gateway for tests
//! - **Alpaca** (feature `alpaca`): Alpaca trading + market-data REST API

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "alpaca")]
pub mod alpaca;

pub use error::BrokerError;
pub use types::*;

use chrono::{DateTime, Utc};
use longshort::Symbol;

/// Everything a rebalance cycle needs from the outside world.
///
/// Calls block. Implementations must be shareable across threads: the
/// rebalancer issues per-symbol requests concurrently.
pub trait Gateway: Send + Sync {
    /// Recent bars for `symbol`, oldest first.
    ///
    /// Fails with [`BrokerError::DataUnavailable`] when no bars come back.
    fn recent_bars(&self, symbol: Symbol, request: &BarRequest) -> Result<Vec<Bar>, BrokerError>;

    /// All open positions.
    fn positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Orders still working, submitted no later than `until`.
    fn open_orders(&self, until: DateTime<Utc>, limit: usize) -> Result<Vec<OpenOrder>, BrokerError>;

    /// Cancel a working order.
    ///
    /// Fails with [`BrokerError::OrderNotFound`] or [`BrokerError::AlreadyFilled`]
    /// when there is nothing left to cancel.
    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError>;

    /// Place a market order. Fails with [`BrokerError::OrderRejected`] when declined.
    fn place_market_order(&self, order: &MarketOrder) -> Result<OrderId, BrokerError>;

    /// Account snapshot.
    fn account(&self) -> Result<Account, BrokerError>;

    /// Market clock.
    fn clock(&self) -> Result<Clock, BrokerError>;
}

impl<G: Gateway + ?Sized> Gateway for Box<G> {
    fn recent_bars(&self, symbol: Symbol, request: &BarRequest) -> Result<Vec<Bar>, BrokerError> {
        (**self).recent_bars(symbol, request)
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        (**self).positions()
    }

    fn open_orders(&self, until: DateTime<Utc>, limit: usize) -> Result<Vec<OpenOrder>, BrokerError> {
        (**self).open_orders(until, limit)
    }

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError> {
        (**self).cancel_order(id)
    }

    fn place_market_order(&self, order: &MarketOrder) -> Result<OrderId, BrokerError> {
        (**self).place_market_order(order)
    }

    fn account(&self) -> Result<Account, BrokerError> {
        (**self).account()
    }

    fn clock(&self) -> Result<Clock, BrokerError> {
        (**self).clock()
    }
}
