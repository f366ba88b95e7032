//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use longshort::{LongLeverage, Symbol};
use longshort_broker::TimeInForce;
use longshort_broker::alpaca::AlpacaConfig;
use longshort_broker::alpaca::client::{DATA_URL, PAPER_URL};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the gateway lives. Credentials are read from the named environment
/// variables at connect time and never stored in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_data_url")]
    pub data_url: String,
    #[serde(default = "default_feed")]
    pub feed: String,
    #[serde(default = "default_key_id_env")]
    pub key_id_env: String,
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    PAPER_URL.into()
}
fn default_data_url() -> String {
    DATA_URL.into()
}
fn default_feed() -> String {
    "iex".into()
}
fn default_key_id_env() -> String {
    "APCA_API_KEY_ID".into()
}
fn default_secret_key_env() -> String {
    "APCA_API_SECRET_KEY".into()
}
fn default_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            data_url: default_data_url(),
            feed: default_feed(),
            key_id_env: default_key_id_env(),
            secret_key_env: default_secret_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

/// What counts as "account equity" when sizing buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquitySource {
    /// Sum of market value over open positions.
    #[default]
    Positions,
    /// The broker's reported account equity.
    Account,
}

/// Lifetime of the set of symbols handled by reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistPolicy {
    /// Fresh every cycle.
    #[default]
    PerCycle,
    /// Accumulates for the life of the process; a symbol reconciled once is
    /// never batch-ordered again.
    Persistent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Fixed universe, in configured order (ties in ranking keep this order).
    pub universe: Vec<String>,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_short_fraction")]
    pub short_fraction: f64,
    #[serde(default)]
    pub long_leverage: LongLeverage,
    #[serde(default)]
    pub equity_source: EquitySource,
    #[serde(default)]
    pub blacklist: BlacklistPolicy,
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

/// Longest lookback accepted, in trading days.
pub const MAX_LOOKBACK: usize = 1000;

fn default_lookback() -> usize {
    10
}
fn default_short_fraction() -> f64 {
    0.30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Upper bound on concurrent order submissions within a phase.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_orders: usize,
    #[serde(default = "default_open_order_limit")]
    pub open_order_limit: usize,
}

fn default_max_parallel() -> usize {
    8
}
fn default_open_order_limit() -> usize {
    100
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_parallel_orders: default_max_parallel(),
            open_order_limit: default_open_order_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Liquidate once the close is this near.
    #[serde(default = "default_close_buffer")]
    pub close_buffer_mins: i64,
    #[serde(default = "default_open_poll")]
    pub open_poll_secs: u64,
}

fn default_interval() -> u64 {
    60
}
fn default_close_buffer() -> i64 {
    15
}
fn default_open_poll() -> u64 {
    60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            close_buffer_mins: default_close_buffer(),
            open_poll_secs: default_open_poll(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        let s = &self.strategy;
        let mut seen = FxHashSet::default();
        for name in &s.universe {
            if Symbol::try_new(name).is_none() {
                return Err(Error::Config(format!(
                    "universe symbol {name:?} must be 1..=8 ASCII bytes"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::Config(format!("duplicate universe symbol: {name}")));
            }
        }
        if s.universe.len() < 4 {
            return Err(Error::Config(format!(
                "universe needs at least 4 symbols to fill a bucket, got {}",
                s.universe.len()
            )));
        }
        if !(2..=MAX_LOOKBACK).contains(&s.lookback) {
            return Err(Error::Config(format!(
                "lookback must be in [2, {MAX_LOOKBACK}], got {}",
                s.lookback
            )));
        }
        if !s.short_fraction.is_finite() || !(0.0..=1.0).contains(&s.short_fraction) {
            return Err(Error::Config("short_fraction must be in [0.0, 1.0]".into()));
        }
        if self.execution.max_parallel_orders == 0 {
            return Err(Error::Config("max_parallel_orders must be > 0".into()));
        }
        if self.execution.open_order_limit == 0 {
            return Err(Error::Config("open_order_limit must be > 0".into()));
        }
        if self.schedule.interval_secs == 0 {
            return Err(Error::Config("interval_secs must be > 0".into()));
        }
        if self.schedule.close_buffer_mins < 0 {
            return Err(Error::Config("close_buffer_mins must be >= 0".into()));
        }
        Ok(())
    }

    /// The universe as symbols, in configured order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.strategy
            .universe
            .iter()
            .filter_map(|s| Symbol::try_new(s))
            .collect()
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Gateway settings with credentials pulled from the environment.
    pub fn alpaca(&self) -> Result<AlpacaConfig> {
        let c = &self.connection;
        Ok(AlpacaConfig {
            key_id: read_env(&c.key_id_env)?,
            secret_key: read_env(&c.secret_key_env)?,
            base_url: c.base_url.clone(),
            data_url: c.data_url.clone(),
            feed: c.feed.clone(),
            timeout: Duration::from_secs(c.timeout_secs),
        })
    }
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Credentials(format!("environment variable {name} is not set"))),
    }
}
