// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! End-to-end rebalance cycles against the mock gateway.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use longshort::{Side, Symbol};
use longshort_broker::{BrokerError, Clock};
use longshort_broker::mock::{MockGateway, MockGatewayBuilder};
use longshort_rebalancer::audit::AuditLog;
use longshort_rebalancer::config::Config;
use longshort_rebalancer::cycle::Rebalancer;
use longshort_rebalancer::error::Error;
use longshort_rebalancer::schedule::Scheduler;

fn s(i: usize) -> Symbol {
    Symbol::new(&format!("S{i}"))
}

fn config(blacklist: &str) -> Config {
    Config::from_toml(&format!(
        r#"
[strategy]
universe = ["S0", "S1", "S2", "S3", "S4", "S5", "S6", "S7"]
lookback = 10
short_fraction = 0.30
equity_source = "account"
blacklist = "{blacklist}"

[execution]
max_parallel_orders = 4

[schedule]
interval_secs = 60
close_buffer_mins = 15
open_poll_secs = 30
"#
    ))
    .unwrap()
}

/// Eight symbols scored 5, 4, 3, 2, 1, 0, -1, -2 cents. Short bucket (S7, S6)
/// totals $100, long bucket (S1, S0) totals $200, equity $10,000.
fn scenario() -> MockGatewayBuilder {
    let scores = [5, 4, 3, 2, 1, 0, -1, -2];
    let prices = [100_00, 100_00, 70_00, 70_00, 70_00, 70_00, 50_00, 50_00];
    let mut builder = MockGateway::builder().with_account(10_000_00, 10_000_00);
    for i in 0..8 {
        builder = builder
            .with_daily_closes(s(i), &[100_00, 100_00 + scores[i]])
            .with_price(s(i), prices[i]);
    }
    builder
}

fn qtys(gw: &MockGateway, sym: Symbol) -> Vec<(Side, u64)> {
    gw.orders_for(sym).iter().map(|o| (o.side, o.qty)).collect()
}

// ============================================================================
// Full cycle
// ============================================================================

#[test]
fn eight_symbol_cycle_sizes_and_fills_buckets() {
    let mut rb = Rebalancer::new(scenario().build(), config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    assert_eq!(report.buckets.short.members, [s(7), s(6)]);
    assert_eq!(report.buckets.long.members, [s(1), s(0)]);
    assert_eq!(report.buckets.short.equity_cents, 3_000_00);
    assert_eq!(report.buckets.long.equity_cents, 13_000_00);
    assert_eq!(report.buckets.short.qty, Some(30));
    assert_eq!(report.buckets.long.qty, Some(65));

    let gw = rb.gateway();
    assert_eq!(qtys(gw, s(0)), [(Side::Buy, 65)]);
    assert_eq!(qtys(gw, s(1)), [(Side::Buy, 65)]);
    assert_eq!(qtys(gw, s(6)), [(Side::Sell, 30)]);
    assert_eq!(qtys(gw, s(7)), [(Side::Sell, 30)]);
    assert_eq!(gw.placed_orders().len(), 4);

    assert_eq!(report.executed.bought, [s(1), s(0)]);
    assert_eq!(report.executed.sold, [s(7), s(6)]);
    assert!(report.stale.is_empty());
}

#[test]
fn report_renders_buckets_and_ledger() {
    let mut rb = Rebalancer::new(scenario().build(), config("per_cycle")).unwrap();
    let text = rb.run_cycle().unwrap().to_string();
    assert!(text.contains("CYCLE 1:"));
    assert!(text.contains("Long"));
    assert!(text.contains("S1, S0"));
    assert!(text.contains("Sold:   S7, S6"));
}

#[test]
fn zero_equity_places_no_orders() {
    let gw = scenario().with_account(0, 0).build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    assert_eq!(report.buckets.long.qty, Some(0));
    assert!(rb.gateway().placed_orders().is_empty());
    assert!(report.executed.bought.is_empty());
    assert!(report.long.adjustment.is_none());
}

#[test]
fn missing_price_skips_bucket_sizing() {
    // S7 has bars for ranking but no latest price.
    let mut builder = MockGateway::builder().with_account(10_000_00, 10_000_00);
    for i in 0..8 {
        builder = builder.with_daily_closes(s(i), &[100_00, 100_00 - i as i64]);
        if i != 7 {
            builder = builder.with_price(s(i), 50_00);
        }
    }
    let mut rb = Rebalancer::new(builder.build(), config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    assert_eq!(report.buckets.short.qty, None);
    assert!(rb.gateway().orders_for(s(6)).is_empty());
    assert!(!rb.gateway().orders_for(s(0)).is_empty());
}

// ============================================================================
// Adjustment pass
// ============================================================================

#[test]
fn rejected_long_member_triggers_adjustment() {
    let gw = scenario().reject_orders_for(s(0)).build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    // $13,000 over the one executed $100 member.
    assert_eq!(report.buckets.long.adjusted_qty, Some(130));
    assert_eq!(report.long.batch.incomplete, [s(0)]);
    assert_eq!(qtys(rb.gateway(), s(1)), [(Side::Buy, 65), (Side::Buy, 65)]);
    assert_eq!(rb.gateway().orders_for(s(0)).len(), 1);

    assert!(report.short.adjustment.is_none());
    assert_eq!(report.buckets.short.adjusted_qty, None);
}

#[test]
fn whole_bucket_rejected_leaves_adjustment_unknown() {
    let gw = scenario()
        .reject_orders_for(s(6))
        .reject_orders_for(s(7))
        .build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    assert_eq!(report.short.batch.incomplete.len(), 2);
    assert_eq!(report.buckets.short.adjusted_qty, None);
    assert!(report.short.adjustment.is_none());
    assert_eq!(rb.gateway().orders_for(s(7)).len(), 1);
}

// ============================================================================
// Reconciliation and blacklist
// ============================================================================

#[test]
fn held_positions_are_reconciled_not_batch_ordered() {
    let gw = scenario()
        .with_position(s(1), 60, 100_00)
        .with_position(s(3), 20, 70_00)
        .with_position(s(7), -40, 50_00)
        .build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();
    let gw = rb.gateway();

    // In-bucket long below target: add the shortfall, no batch order on top.
    assert_eq!(qtys(gw, s(1)), [(Side::Buy, 5)]);
    // Out of both buckets: unwind plus the short target.
    assert_eq!(qtys(gw, s(3)), [(Side::Sell, 50)]);
    // Short above target: buy back the excess.
    assert_eq!(qtys(gw, s(7)), [(Side::Buy, 10)]);
    // Untouched members still get the batch order.
    assert_eq!(qtys(gw, s(0)), [(Side::Buy, 65)]);
    assert_eq!(qtys(gw, s(6)), [(Side::Sell, 30)]);

    assert_eq!(report.reconciled.orders.len(), 3);
}

#[test]
fn open_orders_are_cancelled_before_reconciling() {
    let gw = scenario()
        .with_open_order("stale-1", s(0))
        .with_open_order("stale-2", s(5))
        .build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    assert_eq!(report.cancelled.cancelled, 2);
    assert_eq!(rb.gateway().cancelled().len(), 2);
}

#[test]
fn per_cycle_blacklist_is_fresh_each_cycle() {
    let mut rb = Rebalancer::new(
        scenario().with_position(s(1), 65, 100_00).build(),
        config("per_cycle"),
    )
    .unwrap();
    rb.run_cycle().unwrap();
    assert!(rb.gateway().orders_for(s(1)).is_empty());

    rb.gateway().clear_positions();
    rb.run_cycle().unwrap();
    assert_eq!(qtys(rb.gateway(), s(1)), [(Side::Buy, 65)]);
}

#[test]
fn persistent_blacklist_carries_over() {
    let mut rb = Rebalancer::new(
        scenario().with_position(s(1), 65, 100_00).build(),
        config("persistent"),
    )
    .unwrap();
    rb.run_cycle().unwrap();

    rb.gateway().clear_positions();
    let report = rb.run_cycle().unwrap();
    assert!(rb.gateway().orders_for(s(1)).is_empty());
    assert_eq!(report.cycle, 2);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn stale_score_on_bar_failure() {
    let gw = scenario().fail_bars_for(s(0)).build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    assert_eq!(report.stale, [s(0)]);
    assert_eq!(rb.universe()[0].score, 0);
    // S0 now ties at zero with S5 and keeps its earlier configured position.
    assert_eq!(report.buckets.long.members, [s(2), s(1)]);
}

#[test]
fn disconnection_fails_the_cycle() {
    let gw = scenario().disconnected().build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    assert!(matches!(rb.run_cycle(), Err(Error::Connection(_))));
    assert!(rb.gateway().placed_orders().is_empty());
}

#[test]
fn rate_limited_positions_skip_orders_without_failing() {
    let gw = scenario()
        .with_position(s(1), 10, 100_00)
        .fail_positions_with(BrokerError::RateLimit)
        .build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.run_cycle().unwrap();

    assert!(report.reconciled.holdings_unknown);
    assert!(report.to_string().contains("Holdings unknown"));
    assert!(rb.gateway().placed_orders().is_empty());
    assert!(report.executed.bought.is_empty());
    assert!(report.long.adjustment.is_none());
}

// ============================================================================
// Liquidation and scheduling
// ============================================================================

#[test]
fn liquidate_closes_both_directions() {
    let gw = scenario()
        .with_position(s(1), 10, 100_00)
        .with_position(s(7), -5, 50_00)
        .with_open_order("o-1", s(3))
        .build();
    let mut rb = Rebalancer::new(gw, config("per_cycle")).unwrap();
    let report = rb.liquidate_all().unwrap();

    assert_eq!(report.cancelled.cancelled, 1);
    assert_eq!(report.closed.len(), 2);
    assert_eq!(qtys(rb.gateway(), s(1)), [(Side::Sell, 10)]);
    assert_eq!(qtys(rb.gateway(), s(7)), [(Side::Buy, 5)]);
}

fn clock(is_open: bool, mins_to_close: i64) -> Clock {
    let now = Utc.with_ymd_and_hms(2026, 1, 5, 20, 0, 0).unwrap();
    Clock {
        timestamp: now,
        is_open,
        next_open: now + chrono::Duration::hours(13),
        next_close: now + chrono::Duration::minutes(mins_to_close),
    }
}

#[test]
fn scheduler_waits_while_closed() {
    let gw = scenario().with_clock(clock(false, 600)).build();
    let mut sched = Scheduler::new(Rebalancer::new(gw, config("per_cycle")).unwrap());

    assert_eq!(sched.tick().unwrap(), Duration::from_secs(30));
    assert!(sched.into_inner().gateway().placed_orders().is_empty());
}

#[test]
fn scheduler_rebalances_on_interval() {
    let gw = scenario().with_clock(clock(true, 120)).build();
    let mut sched = Scheduler::new(Rebalancer::new(gw, config("per_cycle")).unwrap());

    assert_eq!(sched.tick().unwrap(), Duration::from_secs(60));
    assert_eq!(sched.into_inner().gateway().placed_orders().len(), 4);
}

#[test]
fn scheduler_liquidates_near_close() {
    let gw = scenario()
        .with_position(s(4), 10, 70_00)
        .with_clock(clock(true, 10))
        .build();
    let mut sched = Scheduler::new(Rebalancer::new(gw, config("per_cycle")).unwrap());

    // Sleeps past the close plus one open poll.
    assert_eq!(sched.tick().unwrap(), Duration::from_secs(10 * 60 + 30));
    let rb = sched.into_inner();
    // Unwind during the cycle, then the close-out of the same position.
    assert_eq!(rb.gateway().orders_for(s(4)).len(), 2);
}

// ============================================================================
// Audit trail
// ============================================================================

#[test]
fn cycle_writes_audit_events_in_phase_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    let gw = scenario().reject_orders_for(s(0)).build();
    let mut rb = Rebalancer::new(gw, config("per_cycle"))
        .unwrap()
        .with_audit(AuditLog::open(&path).unwrap());
    rb.run_cycle().unwrap();

    let events: Vec<String> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(
        events,
        [
            "cycle_started",
            "ranked",
            "buckets_sized",
            "orders_cancelled",
            "batch_completed",
            "adjustment",
            "batch_completed",
            "batch_completed",
            "cycle_completed",
        ]
    );
}
