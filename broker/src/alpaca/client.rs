//! Alpaca REST API client (trading + market data).

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::types::{
    AccountInfo, ApiError, BarInfo, BarsPage, ClockInfo, LatestBar, OrderInfo, OrderRequest,
    PositionInfo,
};
use crate::error::BrokerError;

pub const PAPER_URL: &str = "https://paper-api.alpaca.markets";
pub const LIVE_URL: &str = "https://api.alpaca.markets";
pub const DATA_URL: &str = "https://data.alpaca.markets";

/// Which call produced a non-2xx status, for error mapping.
#[derive(Debug, Clone, Copy)]
pub enum Endpoint<'a> {
    Read,
    Bars(&'a str),
    Cancel(&'a str),
    Order(&'a str),
}

/// Map an HTTP error status to the gateway taxonomy.
pub fn error_for_status(endpoint: Endpoint<'_>, status: u16, body: &str) -> BrokerError {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());

    match (endpoint, status) {
        (_, 401) => BrokerError::Auth(message),
        (_, 429) => BrokerError::RateLimit,
        (_, s) if s >= 500 => BrokerError::Connection(format!("server returned {s}: {message}")),
        (Endpoint::Cancel(id), 404) => BrokerError::OrderNotFound(id.to_string()),
        (Endpoint::Cancel(id), 422) => BrokerError::AlreadyFilled(id.to_string()),
        (Endpoint::Order(symbol), 403 | 422) => BrokerError::OrderRejected {
            symbol: symbol.to_string(),
            reason: message,
        },
        (Endpoint::Bars(symbol), 400 | 404 | 422) => BrokerError::DataUnavailable(symbol.to_string()),
        (_, 403) => BrokerError::Auth(message),
        (_, s) => BrokerError::Other(format!("request returned {s}: {message}")),
    }
}

/// Blocking Alpaca REST client.
pub struct AlpacaClient {
    client: Client,
    key_id: String,
    secret_key: Zeroizing<String>,
    base_url: String,
    data_url: String,
    feed: String,
}

impl AlpacaClient {
    /// Create a client. Credentials come from the caller, never from this crate.
    pub fn new(
        key_id: &str,
        secret_key: &str,
        base_url: &str,
        data_url: &str,
        feed: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            key_id: key_id.to_string(),
            secret_key: Zeroizing::new(secret_key.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            data_url: data_url.trim_end_matches('/').to_string(),
            feed: feed.to_string(),
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", self.secret_key.as_str())
    }

    fn send(&self, builder: RequestBuilder, endpoint: Endpoint<'_>) -> Result<Response, BrokerError> {
        let resp = self
            .authed(builder)
            .send()
            .map_err(|e| BrokerError::Connection(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            return Err(error_for_status(endpoint, status, &body));
        }
        Ok(resp)
    }

    fn json<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, BrokerError> {
        resp.json::<T>()
            .map_err(|e| BrokerError::Other(format!("failed to parse {what}: {e}")))
    }

    /// GET /v2/account
    pub fn account(&self) -> Result<AccountInfo, BrokerError> {
        let url = format!("{}/v2/account", self.base_url);
        let resp = self.send(self.client.get(&url), Endpoint::Read)?;
        Self::json(resp, "account")
    }

    /// GET /v2/positions
    pub fn positions(&self) -> Result<Vec<PositionInfo>, BrokerError> {
        let url = format!("{}/v2/positions", self.base_url);
        let resp = self.send(self.client.get(&url), Endpoint::Read)?;
        Self::json(resp, "positions")
    }

    /// GET /v2/orders?status=open
    pub fn open_orders(&self, until: DateTime<Utc>, limit: usize) -> Result<Vec<OrderInfo>, BrokerError> {
        let url = format!("{}/v2/orders", self.base_url);
        let request = self.client.get(&url).query(&[
            ("status", "open".to_string()),
            ("until", rfc3339(until)),
            ("limit", limit.to_string()),
        ]);
        let resp = self.send(request, Endpoint::Read)?;
        Self::json(resp, "orders")
    }

    /// DELETE /v2/orders/{id}
    pub fn cancel_order(&self, id: &str) -> Result<(), BrokerError> {
        let url = format!("{}/v2/orders/{id}", self.base_url);
        self.send(self.client.delete(&url), Endpoint::Cancel(id))?;
        Ok(())
    }

    /// POST /v2/orders
    pub fn submit_order(&self, order: &OrderRequest<'_>) -> Result<OrderInfo, BrokerError> {
        let url = format!("{}/v2/orders", self.base_url);
        debug!(
            "Submitting Alpaca order: {} {} {} ({})",
            order.side, order.qty, order.symbol, order.time_in_force
        );
        let resp = self.send(self.client.post(&url).json(order), Endpoint::Order(order.symbol))?;
        Self::json(resp, "order response")
    }

    /// GET /v2/clock
    pub fn clock(&self) -> Result<ClockInfo, BrokerError> {
        let url = format!("{}/v2/clock", self.base_url);
        let resp = self.send(self.client.get(&url), Endpoint::Read)?;
        Self::json(resp, "clock")
    }

    /// GET /v2/stocks/{symbol}/bars, newest `limit` bars, returned oldest first.
    pub fn bars(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<BarInfo>, BrokerError> {
        let url = format!("{}/v2/stocks/{symbol}/bars", self.data_url);
        let mut query = vec![
            ("timeframe", timeframe.to_string()),
            ("limit", limit.to_string()),
            ("sort", "desc".to_string()),
            ("feed", self.feed.clone()),
        ];
        if let Some(start) = start {
            query.push(("start", rfc3339(start)));
        }
        if let Some(end) = end {
            query.push(("end", rfc3339(end)));
        }

        let resp = self.send(self.client.get(&url).query(&query), Endpoint::Bars(symbol))?;
        let page: BarsPage = Self::json(resp, "bars")?;
        let mut bars = page.bars.unwrap_or_default();
        bars.reverse();
        Ok(bars)
    }

    /// GET /v2/stocks/{symbol}/bars/latest
    pub fn latest_bar(&self, symbol: &str) -> Result<BarInfo, BrokerError> {
        let url = format!("{}/v2/stocks/{symbol}/bars/latest", self.data_url);
        let request = self.client.get(&url).query(&[("feed", self.feed.as_str())]);
        let resp = self.send(request, Endpoint::Bars(symbol))?;
        let latest: LatestBar = Self::json(resp, "latest bar")?;
        Ok(latest.bar)
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
