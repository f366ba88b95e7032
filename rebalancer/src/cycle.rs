//! Rebalance orchestrator.
//!
//! One cycle runs its phases strictly in order:
//! rerank → cancel open orders → reconcile positions → long batch
//! (+ adjustment) → short batch (+ adjustment). Per-item failures are
//! handled inside each phase; only a lost gateway ends a cycle early.

use std::fmt;

use chrono::{DateTime, Utc};
use log::{info, warn};
use longshort::{Buckets, Instrument, Side, Symbol, rank};
use longshort_broker::{BrokerError, Gateway, OrderId};
use rayon::ThreadPool;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::allocator;
use crate::audit::{self, AuditLog};
use crate::batch::{self, BucketExecution};
use crate::config::{BlacklistPolicy, Config};
use crate::error::{self, Error, Result};
use crate::ranker;
use crate::reconcile::{self, CancelSummary, ReconcileOutcome};

/// Symbols with an accepted order this cycle, split by side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub bought: Vec<Symbol>,
    pub sold: Vec<Symbol>,
}

impl Ledger {
    pub fn record(&mut self, side: Side, symbol: Symbol) {
        match side {
            Side::Buy => self.bought.push(symbol),
            Side::Sell => self.sold.push(symbol),
        }
    }
}

/// State scoped to a single cycle.
#[derive(Debug, Clone)]
pub struct CycleState {
    pub buckets: Buckets,
    /// Symbols handled by reconciliation; the batch passes skip them.
    pub blacklist: FxHashSet<Symbol>,
    pub executed: Ledger,
}

impl CycleState {
    pub fn new(buckets: Buckets) -> Self {
        Self {
            buckets,
            blacklist: FxHashSet::default(),
            executed: Ledger::default(),
        }
    }
}

/// Everything one cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub ranked: Vec<Instrument>,
    pub stale: Vec<Symbol>,
    pub buckets: Buckets,
    pub cancelled: CancelSummary,
    pub reconciled: ReconcileOutcome,
    pub long: BucketExecution,
    pub short: BucketExecution,
    pub executed: Ledger,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CYCLE {}:", self.cycle)?;
        for bucket in [&self.buckets.long, &self.buckets.short] {
            let qty = match bucket.qty {
                Some(q) => q.to_string(),
                None => "-".into(),
            };
            let members: Vec<&str> = bucket.members.iter().map(|s| s.as_str()).collect();
            writeln!(
                f,
                "  {:6} {:>6} shares  ${:>12.2}  [{}]",
                bucket.kind.to_string(),
                qty,
                bucket.equity_cents as f64 / 100.0,
                members.join(", "),
            )?;
            if let Some(adj) = bucket.adjusted_qty {
                writeln!(f, "  {:6} {:>6} adjusted", "", adj)?;
            }
        }
        if !self.stale.is_empty() {
            let stale: Vec<&str> = self.stale.iter().map(|s| s.as_str()).collect();
            writeln!(f, "  Stale scores: {}", stale.join(", "))?;
        }
        if self.reconciled.holdings_unknown {
            writeln!(f, "  Holdings unknown: no orders placed")?;
        }

        writeln!(f, "\n  {:8} {:>6} {:>6}  {}", "Symbol", "Side", "Qty", "Reason")?;
        for o in self.reconciled.orders.iter().filter(|o| !o.is_noop()) {
            writeln!(
                f,
                "  {:8} {:>6} {:>6}  {}",
                o.symbol.as_str(),
                o.side.to_string(),
                o.qty,
                o.description
            )?;
        }

        let bought: Vec<&str> = self.executed.bought.iter().map(|s| s.as_str()).collect();
        let sold: Vec<&str> = self.executed.sold.iter().map(|s| s.as_str()).collect();
        writeln!(f, "\n  Bought: {}", bought.join(", "))?;
        writeln!(f, "  Sold:   {}", sold.join(", "))?;
        Ok(())
    }
}

/// Outcome of closing every position.
#[derive(Debug, Clone, Default)]
pub struct LiquidationReport {
    pub cancelled: CancelSummary,
    pub closed: Vec<Symbol>,
    pub failed: Vec<Symbol>,
}

/// Long-lived driver: owns the gateway, the scored universe and the
/// order pool, and runs cycles on demand.
pub struct Rebalancer<G: Gateway> {
    gateway: G,
    config: Config,
    universe: Vec<Instrument>,
    /// Carried across cycles under `BlacklistPolicy::Persistent` only.
    carried_blacklist: FxHashSet<Symbol>,
    pool: ThreadPool,
    audit: Option<AuditLog>,
    cycles: u64,
}

impl<G: Gateway> Rebalancer<G> {
    pub fn new(gateway: G, config: Config) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.execution.max_parallel_orders)
            .thread_name(|i| format!("longshort-order-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("failed to build order pool: {e}")))?;

        Ok(Self {
            universe: rank::universe(&config.symbols()),
            gateway,
            config,
            carried_blacklist: FxHashSet::default(),
            pool,
            audit: None,
            cycles: 0,
        })
    }

    /// Record every phase to `audit`.
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current scores in configured order.
    pub fn universe(&self) -> &[Instrument] {
        &self.universe
    }

    /// Run one full rebalance cycle.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let cycle = self.cycles;
        let strategy = &self.config.strategy;
        let tif = strategy.time_in_force;
        info!("Cycle {cycle} started ({} instruments)", self.universe.len());
        if let Some(log) = self.audit.as_mut() {
            audit::log_cycle_started(log, cycle, self.universe.len())?;
        }

        let now = self.now()?;

        // Rerank
        let gateway = &self.gateway;
        let universe = &mut self.universe;
        let ranking = self
            .pool
            .install(|| ranker::rerank(gateway, universe, strategy.lookback, now))?;
        if let Some(log) = self.audit.as_mut() {
            audit::log_ranked(log, &ranking.ranked, &ranking.stale)?;
        }

        let buckets = self
            .pool
            .install(|| allocator::allocate(gateway, &ranking.ranked, strategy))?;
        if let Some(log) = self.audit.as_mut() {
            audit::log_buckets_sized(log, &buckets)?;
        }

        let mut state = CycleState::new(buckets);
        if strategy.blacklist == BlacklistPolicy::Persistent {
            state.blacklist.clone_from(&self.carried_blacklist);
        }

        // CancelOpenOrders
        let cancelled =
            reconcile::cancel_open_orders(gateway, self.config.execution.open_order_limit, now)?;
        if let Some(log) = self.audit.as_mut() {
            audit::log_orders_cancelled(log, &cancelled)?;
        }

        // ReconcilePositions
        let reconciled =
            reconcile::reconcile_positions(gateway, &mut state, tif, &self.pool, self.audit.as_mut())?;
        if strategy.blacklist == BlacklistPolicy::Persistent {
            self.carried_blacklist.extend(state.blacklist.iter().copied());
        }

        // BatchOrderLong, BatchOrderShort
        let (long, short) = if reconciled.holdings_unknown {
            warn!("Cycle {cycle}: holdings unknown, batch orders skipped");
            (BucketExecution::default(), BucketExecution::default())
        } else {
            self.execute_buckets(&mut state)?
        };
        for (bucket, run) in [(&state.buckets.long, &long), (&state.buckets.short, &short)] {
            if bucket.qty.is_some_and(|q| q > 0) {
                for &symbol in &run.batch.executed {
                    state.executed.record(bucket.kind.entry_side(), symbol);
                }
            }
        }

        if let Some(log) = self.audit.as_mut() {
            audit::log_cycle_completed(log, cycle, &state.executed.bought, &state.executed.sold)?;
        }
        info!(
            "Cycle {cycle} done: {} bought, {} sold",
            state.executed.bought.len(),
            state.executed.sold.len()
        );

        Ok(CycleReport {
            cycle,
            ranked: ranking.ranked,
            stale: ranking.stale,
            buckets: state.buckets,
            cancelled,
            reconciled,
            long,
            short,
            executed: state.executed,
        })
    }

    /// Cancel open orders and close every position at market.
    pub fn liquidate_all(&mut self) -> Result<LiquidationReport> {
        let now = self.now()?;
        let gateway = &self.gateway;
        let tif = self.config.strategy.time_in_force;

        let cancelled =
            reconcile::cancel_open_orders(gateway, self.config.execution.open_order_limit, now)?;
        let positions = gateway.positions().map_err(error::gateway)?;

        let results: Vec<(Symbol, std::result::Result<Option<OrderId>, BrokerError>)> =
            self.pool.install(|| {
                positions
                    .par_iter()
                    .map(|p| {
                        let side = p.side.closing_side();
                        (p.symbol, batch::submit_order(gateway, p.symbol, p.qty.abs(), side, tif))
                    })
                    .collect()
            });

        let mut report = LiquidationReport {
            cancelled,
            ..Default::default()
        };
        for (symbol, result) in results {
            match result {
                Ok(_) => report.closed.push(symbol),
                Err(e) if e.is_connectivity() => return Err(error::connection(e)),
                Err(e) => {
                    warn!("{symbol}: close failed: {e}");
                    report.failed.push(symbol);
                }
            }
        }

        info!(
            "Liquidated {} positions ({} failed)",
            report.closed.len(),
            report.failed.len()
        );
        if let Some(log) = self.audit.as_mut() {
            audit::log_liquidated(log, &report.closed, &report.failed)?;
        }
        Ok(report)
    }

    fn execute_buckets(&mut self, state: &mut CycleState) -> Result<(BucketExecution, BucketExecution)> {
        let tif = self.config.strategy.time_in_force;
        let long = batch::execute_bucket(
            &self.gateway,
            &mut state.buckets.long,
            &state.blacklist,
            tif,
            &self.pool,
            self.audit.as_mut(),
        )?;
        let short = batch::execute_bucket(
            &self.gateway,
            &mut state.buckets.short,
            &state.blacklist,
            tif,
            &self.pool,
            self.audit.as_mut(),
        )?;
        Ok((long, short))
    }

    /// Broker time, or local time when the clock read fails for a reason
    /// other than connectivity.
    fn now(&self) -> Result<DateTime<Utc>> {
        Ok(match error::recoverable(self.gateway.clock(), "clock")? {
            Some(clock) => clock.timestamp,
            None => Utc::now(),
        })
    }

    /// Cancel open orders outside a cycle (used at startup).
    pub fn cancel_open_orders(&mut self) -> Result<CancelSummary> {
        let now = self.now()?;
        let summary =
            reconcile::cancel_open_orders(&self.gateway, self.config.execution.open_order_limit, now)?;
        if let Some(log) = self.audit.as_mut() {
            audit::log_orders_cancelled(log, &summary)?;
        }
        Ok(summary)
    }
}
