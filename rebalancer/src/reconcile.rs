//! Position reconciliation: clear stale orders, then move every held
//! position toward the freshly sized buckets.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use longshort::decision::{self, Holding};
use longshort::{PendingOrder, Symbol};
use longshort_broker::{BrokerError, Gateway, OrderId, TimeInForce};
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::audit::{self, AuditLog};
use crate::batch;
use crate::cycle::CycleState;
use crate::error::{self, Result};

/// Result of cancelling open orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelSummary {
    pub cancelled: usize,
    /// Filled or gone before the cancel reached the broker.
    pub already_gone: usize,
    pub failed: usize,
}

/// What the reconciliation pass did.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// One decision per held position, in broker order. No-ops included.
    pub orders: Vec<PendingOrder>,
    /// Symbols whose corrective order the broker declined.
    pub rejected: Vec<Symbol>,
    /// Positions could not be listed; nothing was decided or submitted.
    pub holdings_unknown: bool,
}

/// Cancel every open order submitted up to `now`.
///
/// Cancellation is best-effort: orders already filled or gone are counted
/// and ignored.
pub fn cancel_open_orders<G: Gateway + ?Sized>(
    gateway: &G,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<CancelSummary> {
    let mut summary = CancelSummary::default();
    let open = match gateway.open_orders(now, limit) {
        Ok(open) => open,
        Err(e) if e.is_connectivity() => return Err(error::connection(e)),
        Err(e) => {
            warn!("Could not list open orders: {e}");
            return Ok(summary);
        }
    };

    for order in &open {
        match gateway.cancel_order(&order.id) {
            Ok(()) => {
                debug!("Cancelled {} ({})", order.id, order.symbol);
                summary.cancelled += 1;
            }
            Err(e) if e.is_already_gone() => summary.already_gone += 1,
            Err(e) if e.is_connectivity() => return Err(error::connection(e)),
            Err(e) => {
                warn!("Could not cancel {} ({}): {e}", order.id, order.symbol);
                summary.failed += 1;
            }
        }
    }

    if !open.is_empty() {
        info!(
            "Open orders: {} cancelled, {} already gone, {} failed",
            summary.cancelled, summary.already_gone, summary.failed
        );
    }
    Ok(summary)
}

/// Decide and submit one corrective order per held position.
///
/// Positions are refetched here. Orders go out concurrently on `pool`; once
/// all have returned, every held symbol joins `state.blacklist` and accepted
/// orders are added to `state.executed`.
pub fn reconcile_positions<G: Gateway + ?Sized>(
    gateway: &G,
    state: &mut CycleState,
    time_in_force: TimeInForce,
    pool: &ThreadPool,
    mut audit: Option<&mut AuditLog>,
) -> Result<ReconcileOutcome> {
    let Some(positions) = error::recoverable(gateway.positions(), "positions")? else {
        warn!("Holdings unknown, reconciliation skipped");
        return Ok(ReconcileOutcome {
            holdings_unknown: true,
            ..ReconcileOutcome::default()
        });
    };
    let orders: Vec<PendingOrder> = positions
        .iter()
        .map(|p| {
            let holding = Holding {
                symbol: p.symbol,
                side: p.side,
                qty: p.qty.abs(),
            };
            decision::decide(&holding, &state.buckets)
        })
        .collect();

    let results: Vec<std::result::Result<Option<OrderId>, BrokerError>> = pool.install(|| {
        orders
            .par_iter()
            .map(|o| batch::submit_order(gateway, o.symbol, o.qty, o.side, time_in_force))
            .collect()
    });

    let mut outcome = ReconcileOutcome::default();
    for (order, result) in orders.iter().zip(results) {
        let accepted = match result {
            Ok(_) => true,
            Err(e) if e.is_connectivity() => return Err(error::connection(e)),
            Err(e) => {
                warn!("{}: {} ({} {}) failed: {e}", order.symbol, order.description, order.side, order.qty);
                outcome.rejected.push(order.symbol);
                false
            }
        };
        if order.is_noop() {
            debug!("{}: {}, nothing to do", order.symbol, order.description);
        }

        state.blacklist.insert(order.symbol);
        if accepted && !order.is_noop() {
            state.executed.record(order.side, order.symbol);
        }
        if let Some(log) = audit.as_deref_mut() {
            audit::log_position_reconciled(log, order, accepted)?;
        }
    }

    outcome.orders = orders;
    Ok(outcome)
}
