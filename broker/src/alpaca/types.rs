//! Alpaca-specific API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account (GET /v2/account). Amounts are decimal strings.
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub equity: String,
    pub buying_power: String,
    pub cash: String,
}

/// Position (GET /v2/positions).
#[derive(Debug, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    /// Signed share count, negative for shorts.
    pub qty: String,
    pub side: String,
    pub market_value: String,
}

/// Order (GET/POST /v2/orders). Only the fields the gateway reads.
#[derive(Debug, Deserialize)]
pub struct OrderInfo {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub status: String,
}

/// Order submission body (POST /v2/orders).
#[derive(Debug, Serialize)]
pub struct OrderRequest<'a> {
    pub symbol: &'a str,
    pub qty: String,
    pub side: &'a str,
    #[serde(rename = "type")]
    pub order_type: &'a str,
    pub time_in_force: &'a str,
}

/// Market clock (GET /v2/clock).
#[derive(Debug, Deserialize)]
pub struct ClockInfo {
    pub timestamp: DateTime<Utc>,
    pub is_open: bool,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}

/// One bar from the market-data API.
#[derive(Debug, Deserialize)]
pub struct BarInfo {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "c")]
    pub close: f64,
}

/// Bars page (GET /v2/stocks/{symbol}/bars). `bars` is null when empty.
#[derive(Debug, Deserialize)]
pub struct BarsPage {
    #[serde(default)]
    pub bars: Option<Vec<BarInfo>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Latest bar (GET /v2/stocks/{symbol}/bars/latest).
#[derive(Debug, Deserialize)]
pub struct LatestBar {
    pub bar: BarInfo,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}
