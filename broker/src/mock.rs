//! Mock gateway for testing: implements `Gateway` with scripted responses.
//!
//! Use this in integration tests to simulate broker and market-data
//! responses without network calls.
//!
//! ```
//! use longshort::Symbol;
//! use longshort_broker::mock::MockGateway;
//!
//! let gateway = MockGateway::builder()
//!     .with_daily_closes(Symbol::new("AAPL"), &[180_00, 185_00])
//!     .with_price(Symbol::new("AAPL"), 185_00)
//!     .with_position(Symbol::new("AAPL"), 100, 185_00)
//!     .reject_orders_for(Symbol::new("TSLA"))
//!     .build();
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use longshort::{PositionSide, Symbol};

use crate::Gateway;
use crate::error::BrokerError;
use crate::types::*;

/// Builder for `MockGateway`.
pub struct MockGatewayBuilder {
    daily_closes: Vec<(Symbol, Vec<i64>)>,
    prices: Vec<(Symbol, i64)>,
    positions: Vec<Position>,
    open_orders: Vec<OpenOrder>,
    account: Account,
    clock: Clock,
    rejected: Vec<Symbol>,
    bar_failures: Vec<Symbol>,
    positions_error: Option<BrokerError>,
    disconnected: bool,
}

impl MockGatewayBuilder {
    /// Daily closes (oldest first) returned for `Timeframe::Day` requests.
    pub fn with_daily_closes(mut self, symbol: Symbol, closes: &[i64]) -> Self {
        self.daily_closes.push((symbol, closes.to_vec()));
        self
    }

    /// Latest close returned for `Timeframe::Minute` requests.
    pub fn with_price(mut self, symbol: Symbol, price_cents: i64) -> Self {
        self.prices.push((symbol, price_cents));
        self
    }

    /// Held position; negative `qty` = short. Market value is `qty * price`.
    pub fn with_position(mut self, symbol: Symbol, qty: i64, price_cents: i64) -> Self {
        self.positions.push(Position {
            symbol,
            side: PositionSide::from_signed(qty),
            qty,
            market_value_cents: qty * price_cents,
        });
        self
    }

    pub fn with_open_order(mut self, id: &str, symbol: Symbol) -> Self {
        self.open_orders.push(OpenOrder {
            id: OrderId(id.to_string()),
            symbol,
        });
        self
    }

    pub fn with_account(mut self, equity_cents: i64, cash_cents: i64) -> Self {
        self.account.equity_cents = equity_cents;
        self.account.buying_power_cents = cash_cents;
        self.account.cash_cents = cash_cents;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Every order for `symbol` comes back `OrderRejected`.
    pub fn reject_orders_for(mut self, symbol: Symbol) -> Self {
        self.rejected.push(symbol);
        self
    }

    /// Every bar request for `symbol` fails with `DataUnavailable`.
    pub fn fail_bars_for(mut self, symbol: Symbol) -> Self {
        self.bar_failures.push(symbol);
        self
    }

    /// Every positions listing fails with `err`.
    pub fn fail_positions_with(mut self, err: BrokerError) -> Self {
        self.positions_error = Some(err);
        self
    }

    /// Start with the gateway unreachable.
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    pub fn build(self) -> MockGateway {
        MockGateway {
            daily_closes: self.daily_closes,
            prices: self.prices,
            positions: Mutex::new(self.positions),
            account: self.account,
            clock: self.clock,
            rejected: self.rejected,
            bar_failures: self.bar_failures,
            positions_error: self.positions_error,
            disconnected: AtomicBool::new(self.disconnected),
            next_order_id: AtomicU64::new(1),
            open_orders: Mutex::new(self.open_orders),
            placed_orders: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }
}

/// A mock gateway that records orders and cancellations.
pub struct MockGateway {
    daily_closes: Vec<(Symbol, Vec<i64>)>,
    prices: Vec<(Symbol, i64)>,
    positions: Mutex<Vec<Position>>,
    account: Account,
    clock: Clock,
    rejected: Vec<Symbol>,
    bar_failures: Vec<Symbol>,
    positions_error: Option<BrokerError>,
    disconnected: AtomicBool,
    next_order_id: AtomicU64,
    open_orders: Mutex<Vec<OpenOrder>>,
    placed_orders: Mutex<Vec<MarketOrder>>,
    cancelled: Mutex<Vec<OrderId>>,
}

impl MockGateway {
    pub fn builder() -> MockGatewayBuilder {
        let epoch = Utc.with_ymd_and_hms(2026, 1, 5, 15, 0, 0).unwrap();
        MockGatewayBuilder {
            daily_closes: Vec::new(),
            prices: Vec::new(),
            positions: Vec::new(),
            open_orders: Vec::new(),
            account: Account {
                id: "mock-account".into(),
                equity_cents: 100_000_00,
                buying_power_cents: 100_000_00,
                cash_cents: 100_000_00,
            },
            clock: Clock {
                timestamp: epoch,
                is_open: true,
                next_open: epoch + chrono::Duration::hours(24),
                next_close: epoch + chrono::Duration::hours(6),
            },
            rejected: Vec::new(),
            bar_failures: Vec::new(),
            positions_error: None,
            disconnected: false,
        }
    }

    /// All orders that reached the gateway (rejected ones included), in arrival order.
    pub fn placed_orders(&self) -> Vec<MarketOrder> {
        self.placed_orders.lock().unwrap().clone()
    }

    /// Orders placed for `symbol`.
    pub fn orders_for(&self, symbol: Symbol) -> Vec<MarketOrder> {
        self.placed_orders()
            .into_iter()
            .filter(|o| o.symbol == symbol)
            .collect()
    }

    /// IDs of successfully cancelled orders.
    pub fn cancelled(&self) -> Vec<OrderId> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Drop every held position, as if they were all closed between cycles.
    pub fn clear_positions(&self) {
        self.positions.lock().unwrap().clear();
    }

    /// Simulate losing (or regaining) the connection mid-run.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    fn require_connected(&self) -> Result<(), BrokerError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(BrokerError::Connection("mock: gateway unreachable".into()));
        }
        Ok(())
    }

    fn bar(close_cents: i64, timestamp: DateTime<Utc>) -> Bar {
        Bar {
            timestamp,
            close_cents,
        }
    }
}

impl Gateway for MockGateway {
    fn recent_bars(&self, symbol: Symbol, request: &BarRequest) -> Result<Vec<Bar>, BrokerError> {
        self.require_connected()?;
        if self.bar_failures.contains(&symbol) {
            return Err(BrokerError::DataUnavailable(symbol.as_str().to_string()));
        }

        let bars: Vec<Bar> = match request.timeframe {
            Timeframe::Day => self
                .daily_closes
                .iter()
                .find(|(s, _)| *s == symbol)
                .map(|(_, closes)| {
                    let skip = closes.len().saturating_sub(request.limit);
                    closes[skip..]
                        .iter()
                        .enumerate()
                        .map(|(i, &c)| {
                            Self::bar(c, self.clock.timestamp + chrono::Duration::days(i as i64))
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Timeframe::Minute => self
                .prices
                .iter()
                .find(|(s, _)| *s == symbol)
                .map(|&(_, p)| vec![Self::bar(p, self.clock.timestamp)])
                .unwrap_or_default(),
        };

        if bars.is_empty() {
            return Err(BrokerError::DataUnavailable(symbol.as_str().to_string()));
        }
        Ok(bars)
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        self.require_connected()?;
        if let Some(err) = &self.positions_error {
            return Err(err.clone());
        }
        Ok(self.positions.lock().unwrap().clone())
    }

    fn open_orders(&self, _until: DateTime<Utc>, limit: usize) -> Result<Vec<OpenOrder>, BrokerError> {
        self.require_connected()?;
        let open = self.open_orders.lock().unwrap();
        Ok(open.iter().take(limit).cloned().collect())
    }

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError> {
        self.require_connected()?;
        let mut open = self.open_orders.lock().unwrap();
        match open.iter().position(|o| o.id == *id) {
            Some(idx) => {
                open.remove(idx);
                self.cancelled.lock().unwrap().push(id.clone());
                Ok(())
            }
            None => Err(BrokerError::OrderNotFound(id.0.clone())),
        }
    }

    fn place_market_order(&self, order: &MarketOrder) -> Result<OrderId, BrokerError> {
        self.require_connected()?;
        self.placed_orders.lock().unwrap().push(*order);

        if self.rejected.contains(&order.symbol) {
            return Err(BrokerError::OrderRejected {
                symbol: order.symbol.as_str().to_string(),
                reason: "mock: insufficient buying power".into(),
            });
        }
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        Ok(OrderId(format!("mock-{id}")))
    }

    fn account(&self) -> Result<Account, BrokerError> {
        self.require_connected()?;
        Ok(self.account.clone())
    }

    fn clock(&self) -> Result<Clock, BrokerError> {
        self.require_connected()?;
        Ok(self.clock)
    }
}
