//! Alpaca broker implementation.

pub mod client;
pub mod types;

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use longshort::{PositionSide, Side, Symbol};

use crate::Gateway;
use crate::error::BrokerError;
use crate::types::*;
use client::AlpacaClient;
use types::{BarInfo, OrderRequest, PositionInfo};

/// Connection settings for [`AlpacaGateway`].
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    pub key_id: String,
    pub secret_key: String,
    /// Trading API, e.g. [`client::PAPER_URL`].
    pub base_url: String,
    /// Market-data API, e.g. [`client::DATA_URL`].
    pub data_url: String,
    /// Market-data feed ("iex" or "sip").
    pub feed: String,
    pub timeout: Duration,
}

/// Alpaca gateway implementing the generic `Gateway` trait.
///
/// Uses the REST API for all operations. Blocking (sync) via reqwest::blocking.
pub struct AlpacaGateway {
    client: AlpacaClient,
}

impl AlpacaGateway {
    pub fn connect(config: &AlpacaConfig) -> Result<Self, BrokerError> {
        let client = AlpacaClient::new(
            &config.key_id,
            &config.secret_key,
            &config.base_url,
            &config.data_url,
            &config.feed,
            config.timeout,
        )?;
        Ok(Self { client })
    }

    fn timeframe(tf: Timeframe) -> &'static str {
        match tf {
            Timeframe::Minute => "1Min",
            Timeframe::Day => "1Day",
        }
    }

    fn to_bar(info: &BarInfo) -> Bar {
        Bar {
            timestamp: info.timestamp,
            close_cents: dollars_to_cents(info.close),
        }
    }
}

/// Convert a dollar amount to integer cents, rounding to nearest.
pub fn dollars_to_cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Parse a decimal dollar string (e.g. "185.50") to cents.
pub fn parse_cents(s: &str) -> Result<i64, BrokerError> {
    s.trim()
        .parse::<f64>()
        .map(dollars_to_cents)
        .map_err(|e| BrokerError::Other(format!("bad amount {s:?}: {e}")))
}

/// Parse a decimal share quantity (e.g. "-12", "3.0") to whole shares.
pub fn parse_qty(s: &str) -> Result<i64, BrokerError> {
    s.trim()
        .parse::<f64>()
        .map(|q| q.round() as i64)
        .map_err(|e| BrokerError::Other(format!("bad quantity {s:?}: {e}")))
}

/// Convert an Alpaca position to the gateway type.
pub fn to_position(info: &PositionInfo) -> Result<Position, BrokerError> {
    let symbol =
        Symbol::try_new(&info.symbol).ok_or_else(|| BrokerError::InvalidSymbol(info.symbol.clone()))?;
    let side = match info.side.as_str() {
        "short" => PositionSide::Short,
        "long" => PositionSide::Long,
        other => return Err(BrokerError::Other(format!("unknown position side {other:?}"))),
    };
    Ok(Position {
        symbol,
        side,
        qty: parse_qty(&info.qty)?,
        market_value_cents: parse_cents(&info.market_value)?,
    })
}

/// Convert a positions listing, skipping entries the strategy cannot trade
/// (option contracts, unknown sides, unparsable amounts).
pub fn to_positions(infos: &[PositionInfo]) -> Vec<Position> {
    infos
        .iter()
        .filter_map(|info| match to_position(info) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Skipping position {}: {e}", info.symbol);
                None
            }
        })
        .collect()
}

impl Gateway for AlpacaGateway {
    fn recent_bars(&self, symbol: Symbol, request: &BarRequest) -> Result<Vec<Bar>, BrokerError> {
        let bars = if request.timeframe == Timeframe::Minute && request.limit <= 1 && request.start.is_none() {
            vec![Self::to_bar(&self.client.latest_bar(symbol.as_str())?)]
        } else {
            self.client
                .bars(
                    symbol.as_str(),
                    Self::timeframe(request.timeframe),
                    request.limit,
                    request.start,
                    request.end,
                )?
                .iter()
                .map(Self::to_bar)
                .collect()
        };

        if bars.is_empty() {
            return Err(BrokerError::DataUnavailable(symbol.as_str().to_string()));
        }
        Ok(bars)
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(to_positions(&self.client.positions()?))
    }

    fn open_orders(&self, until: DateTime<Utc>, limit: usize) -> Result<Vec<OpenOrder>, BrokerError> {
        self.client
            .open_orders(until, limit)?
            .into_iter()
            .map(|o| {
                let symbol = Symbol::try_new(&o.symbol)
                    .ok_or_else(|| BrokerError::InvalidSymbol(o.symbol.clone()))?;
                Ok(OpenOrder {
                    id: OrderId(o.id),
                    symbol,
                })
            })
            .collect()
    }

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError> {
        self.client.cancel_order(&id.0)
    }

    fn place_market_order(&self, order: &MarketOrder) -> Result<OrderId, BrokerError> {
        let side = match order.side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        let request = OrderRequest {
            symbol: order.symbol.as_str(),
            qty: order.qty.to_string(),
            side,
            order_type: "market",
            time_in_force: order.time_in_force.as_str(),
        };
        let resp = self.client.submit_order(&request)?;
        Ok(OrderId(resp.id))
    }

    fn account(&self) -> Result<Account, BrokerError> {
        let info = self.client.account()?;
        Ok(Account {
            equity_cents: parse_cents(&info.equity)?,
            buying_power_cents: parse_cents(&info.buying_power)?,
            cash_cents: parse_cents(&info.cash)?,
            id: info.id,
        })
    }

    fn clock(&self) -> Result<Clock, BrokerError> {
        let info = self.client.clock()?;
        Ok(Clock {
            timestamp: info.timestamp,
            is_open: info.is_open,
            next_open: info.next_open,
            next_close: info.next_close,
        })
    }
}
