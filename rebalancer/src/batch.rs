//! Batch order executor: one uniform order per bucket member, submitted
//! concurrently, with an adjustment pass when some members are rejected.

use log::{debug, info, warn};
use longshort::bucket::share_qty;
use longshort::{Bucket, Side, Symbol};
use longshort_broker::{BrokerError, Gateway, MarketOrder, OrderId, TimeInForce};
use rayon::ThreadPool;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::allocator;
use crate::audit::{self, AuditLog};
use crate::error::{self, Result};

/// Which members of a batch the broker accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub executed: Vec<Symbol>,
    pub incomplete: Vec<Symbol>,
}

/// Both passes over one bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketExecution {
    pub batch: BatchOutcome,
    /// Present only when the adjustment pass ran.
    pub adjustment: Option<BatchOutcome>,
}

/// Place a market order for `qty` shares.
///
/// `qty <= 0` succeeds without calling the gateway and returns `None`.
pub fn submit_order<G: Gateway + ?Sized>(
    gateway: &G,
    symbol: Symbol,
    qty: i64,
    side: Side,
    time_in_force: TimeInForce,
) -> std::result::Result<Option<OrderId>, BrokerError> {
    if qty <= 0 {
        debug!("{symbol}: {side} {qty} skipped (nothing to trade)");
        return Ok(None);
    }
    let order = MarketOrder {
        symbol,
        side,
        qty: qty as u64,
        time_in_force,
    };
    let id = gateway.place_market_order(&order)?;
    info!("{symbol}: {side} {qty} submitted ({id})");
    Ok(Some(id))
}

/// Submit `qty` on `side` for every member not in `blacklist`.
///
/// Submissions run on `pool` and are joined before returning. Rejections
/// land in `incomplete`; a connectivity failure fails the whole batch.
pub fn send_batch_order<G: Gateway + ?Sized>(
    gateway: &G,
    qty: i64,
    members: &[Symbol],
    side: Side,
    blacklist: &FxHashSet<Symbol>,
    time_in_force: TimeInForce,
    pool: &ThreadPool,
) -> Result<BatchOutcome> {
    let todo: Vec<Symbol> = members
        .iter()
        .copied()
        .filter(|s| !blacklist.contains(s))
        .collect();

    let results: Vec<(Symbol, std::result::Result<Option<OrderId>, BrokerError>)> =
        pool.install(|| {
            todo.par_iter()
                .map(|&symbol| (symbol, submit_order(gateway, symbol, qty, side, time_in_force)))
                .collect()
        });

    let mut outcome = BatchOutcome::default();
    for (symbol, result) in results {
        match result {
            Ok(_) => outcome.executed.push(symbol),
            Err(e) if e.is_connectivity() => return Err(error::connection(e)),
            Err(e) => {
                warn!("{symbol}: {side} {qty} incomplete: {e}");
                outcome.incomplete.push(symbol);
            }
        }
    }
    Ok(outcome)
}

/// Uniform quantity the bucket's equity buys across the executed members.
///
/// `None` when the executed total is unknown or not positive.
pub fn adjusted_qty(equity_cents: i64, executed_total_cents: Option<i64>) -> Option<i64> {
    executed_total_cents.and_then(|total| share_qty(equity_cents, total))
}

/// Run the batch pass for `bucket`, then the adjustment pass if any member
/// came back incomplete.
///
/// The adjustment pass sends `adjusted_qty - qty` more shares to the
/// executed members on the same side. A bucket with unknown `qty` is skipped.
pub fn execute_bucket<G: Gateway + ?Sized>(
    gateway: &G,
    bucket: &mut Bucket,
    blacklist: &FxHashSet<Symbol>,
    time_in_force: TimeInForce,
    pool: &ThreadPool,
    mut audit: Option<&mut AuditLog>,
) -> Result<BucketExecution> {
    bucket.adjusted_qty = None;
    let Some(qty) = bucket.qty else {
        warn!("{} bucket: quantity unknown, batch skipped", bucket.kind);
        return Ok(BucketExecution::default());
    };
    let side = bucket.kind.entry_side();

    let batch = send_batch_order(gateway, qty, &bucket.members, side, blacklist, time_in_force, pool)?;
    info!(
        "{} bucket: {} executed, {} incomplete",
        bucket.kind,
        batch.executed.len(),
        batch.incomplete.len()
    );
    if let Some(log) = audit.as_deref_mut() {
        audit::log_batch_completed(log, bucket, qty, &batch)?;
    }

    if batch.incomplete.is_empty() {
        return Ok(BucketExecution {
            batch,
            adjustment: None,
        });
    }

    let executed_total = pool.install(|| allocator::total_price(gateway, &batch.executed))?;
    bucket.adjusted_qty = adjusted_qty(bucket.equity_cents, executed_total);
    if let Some(log) = audit.as_deref_mut() {
        audit::log_adjustment(log, bucket, executed_total)?;
    }

    let Some(adjusted) = bucket.adjusted_qty else {
        warn!("{} bucket: no executed price to adjust against", bucket.kind);
        return Ok(BucketExecution {
            batch,
            adjustment: None,
        });
    };

    info!(
        "{} bucket: adjusting {qty} -> {adjusted} across {} members",
        bucket.kind,
        batch.executed.len()
    );
    let adjustment = send_batch_order(
        gateway,
        adjusted - qty,
        &batch.executed,
        side,
        blacklist,
        time_in_force,
        pool,
    )?;
    if let Some(log) = audit.as_deref_mut() {
        audit::log_batch_completed(log, bucket, adjusted - qty, &adjustment)?;
    }

    Ok(BucketExecution {
        batch,
        adjustment: Some(adjustment),
    })
}
