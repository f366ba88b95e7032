//! JSONL audit trail logging.
//!
//! Each rebalance cycle appends events to an audit.jsonl file, one JSON
//! object per line, so a partially rebalanced portfolio can be explained
//! after the fact.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use longshort::{Bucket, Buckets, Instrument, PendingOrder, Symbol};
use serde::Serialize;

use crate::batch::BatchOutcome;
use crate::error::Result;
use crate::reconcile::CancelSummary;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

fn names(symbols: &[Symbol]) -> Vec<&str> {
    symbols.iter().map(|s| s.as_str()).collect()
}

fn dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

pub fn log_cycle_started(audit: &mut AuditLog, cycle: u64, universe_len: usize) -> Result<()> {
    audit.log(
        "cycle_started",
        serde_json::json!({
            "cycle": cycle,
            "universe": universe_len,
        }),
    )
}

pub fn log_ranked(audit: &mut AuditLog, ranked: &[Instrument], stale: &[Symbol]) -> Result<()> {
    let scores: Vec<_> = ranked
        .iter()
        .map(|i| serde_json::json!({ "symbol": i.symbol.as_str(), "score": dollars(i.score) }))
        .collect();
    audit.log(
        "ranked",
        serde_json::json!({
            "ranking": scores,
            "stale": names(stale),
        }),
    )
}

fn bucket_json(bucket: &Bucket) -> serde_json::Value {
    serde_json::json!({
        "members": names(&bucket.members),
        "equity": dollars(bucket.equity_cents),
        "qty": bucket.qty,
    })
}

pub fn log_buckets_sized(audit: &mut AuditLog, buckets: &Buckets) -> Result<()> {
    audit.log(
        "buckets_sized",
        serde_json::json!({
            "long": bucket_json(&buckets.long),
            "short": bucket_json(&buckets.short),
        }),
    )
}

pub fn log_orders_cancelled(audit: &mut AuditLog, summary: &CancelSummary) -> Result<()> {
    audit.log(
        "orders_cancelled",
        serde_json::json!({
            "cancelled": summary.cancelled,
            "already_gone": summary.already_gone,
            "failed": summary.failed,
        }),
    )
}

/// One reconciliation decision and whether the broker accepted it.
pub fn log_position_reconciled(
    audit: &mut AuditLog,
    order: &PendingOrder,
    accepted: bool,
) -> Result<()> {
    audit.log(
        "position_reconciled",
        serde_json::json!({
            "symbol": order.symbol.as_str(),
            "side": format!("{}", order.side),
            "qty": order.qty,
            "description": order.description,
            "accepted": accepted,
        }),
    )
}

pub fn log_batch_completed(
    audit: &mut AuditLog,
    bucket: &Bucket,
    qty: i64,
    outcome: &BatchOutcome,
) -> Result<()> {
    audit.log(
        "batch_completed",
        serde_json::json!({
            "bucket": format!("{}", bucket.kind),
            "qty": qty,
            "executed": names(&outcome.executed),
            "incomplete": names(&outcome.incomplete),
        }),
    )
}

pub fn log_adjustment(
    audit: &mut AuditLog,
    bucket: &Bucket,
    executed_total_cents: Option<i64>,
) -> Result<()> {
    audit.log(
        "adjustment",
        serde_json::json!({
            "bucket": format!("{}", bucket.kind),
            "original_qty": bucket.qty,
            "adjusted_qty": bucket.adjusted_qty,
            "executed_total": executed_total_cents.map(dollars),
        }),
    )
}

pub fn log_cycle_completed(
    audit: &mut AuditLog,
    cycle: u64,
    bought: &[Symbol],
    sold: &[Symbol],
) -> Result<()> {
    audit.log(
        "cycle_completed",
        serde_json::json!({
            "cycle": cycle,
            "bought": names(bought),
            "sold": names(sold),
        }),
    )
}

pub fn log_liquidated(audit: &mut AuditLog, closed: &[Symbol], failed: &[Symbol]) -> Result<()> {
    audit.log(
        "liquidated",
        serde_json::json!({
            "closed": names(closed),
            "failed": names(failed),
        }),
    )
}
