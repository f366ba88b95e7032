//! Reconciliation decision table.
//!
//! For every held position, pick the single corrective order that moves it
//! toward the freshly computed buckets. A zero-quantity order is a no-op.
//!
//! | In bucket | Held  | Order                                  |
//! |-----------|-------|----------------------------------------|
//! | none      | long  | sell `q + short target` ("unwind long")|
//! | none      | short | buy `q` ("unwind short")               |
//! | short     | short | trim (buy) or add (sell) to target     |
//! | short     | long  | sell `q + short target` ("flip to short") |
//! | long      | short | buy `q + long target` ("flip to long") |
//! | long      | long  | trim (sell) or add (buy) to target     |
//!
//! An unknown bucket target counts as zero when unwinding or flipping, and
//! leaves an in-bucket position untouched.

use crate::bucket::{BucketKind, Buckets};
use crate::side::{PositionSide, Side};
use crate::types::Symbol;

/// A broker-held position, reduced to what the decision needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Holding {
    pub symbol: Symbol,
    pub side: PositionSide,
    /// Absolute share count.
    pub qty: i64,
}

/// A corrective order derived from one holding. Consumed immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PendingOrder {
    pub symbol: Symbol,
    pub side: Side,
    /// Shares to trade; `0` means nothing to do.
    pub qty: i64,
    pub description: &'static str,
}

impl PendingOrder {
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.qty <= 0
    }
}

/// Decide the corrective order for `holding` against `buckets`.
pub fn decide(holding: &Holding, buckets: &Buckets) -> PendingOrder {
    let q = holding.qty.abs();
    let long_target = buckets.long.qty;
    let short_target = buckets.short.qty;

    let (side, qty, description) = match (buckets.membership(&holding.symbol), holding.side) {
        (None, PositionSide::Long) => (Side::Sell, q + short_target.unwrap_or(0), "unwind long"),
        (None, PositionSide::Short) => (Side::Buy, q, "unwind short"),
        (Some(BucketKind::Short), PositionSide::Long) => {
            (Side::Sell, q + short_target.unwrap_or(0), "flip to short")
        }
        (Some(BucketKind::Long), PositionSide::Short) => {
            (Side::Buy, q + long_target.unwrap_or(0), "flip to long")
        }
        (Some(kind), _) => return adjust_toward(holding.symbol, kind, q, buckets.get(kind).qty),
    };

    PendingOrder {
        symbol: holding.symbol,
        side,
        qty,
        description,
    }
}

/// Same-direction position already in its bucket: trim or add to target.
fn adjust_toward(symbol: Symbol, kind: BucketKind, held: i64, target: Option<i64>) -> PendingOrder {
    let entry = kind.entry_side();
    let (side, qty, description) = match target {
        None => (entry, 0, "target unknown"),
        Some(t) if held == t => (entry, 0, "at target"),
        Some(t) if held > t => (entry.opposite(), held - t, "trim"),
        Some(t) => (entry, t - held, "add"),
    };
    PendingOrder {
        symbol,
        side,
        qty,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn buckets(long_qty: Option<i64>, short_qty: Option<i64>) -> Buckets {
        let mut b = Buckets::default();
        b.long.members = vec![sym("AAPL"), sym("MSFT")];
        b.long.qty = long_qty;
        b.short.members = vec![sym("SNAP"), sym("TLRY")];
        b.short.qty = short_qty;
        b
    }

    fn holding(s: &str, side: PositionSide, qty: i64) -> Holding {
        Holding {
            symbol: sym(s),
            side,
            qty,
        }
    }

    #[test]
    fn long_at_target_is_noop() {
        let o = decide(&holding("AAPL", PositionSide::Long, 65), &buckets(Some(65), Some(30)));
        assert_eq!(o.qty, 0);
        assert!(o.is_noop());
    }

    #[test]
    fn long_over_target_sells_excess() {
        let o = decide(&holding("AAPL", PositionSide::Long, 70), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Sell, 5));
        assert_eq!(o.description, "trim");
    }

    #[test]
    fn long_under_target_buys_shortfall() {
        let o = decide(&holding("MSFT", PositionSide::Long, 60), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Buy, 5));
    }

    #[test]
    fn unlisted_short_buys_back() {
        let o = decide(&holding("GM", PositionSide::Short, 12), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Buy, 12));
    }

    #[test]
    fn unlisted_long_sells_plus_short_target() {
        let o = decide(&holding("GM", PositionSide::Long, 12), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Sell, 42));
    }

    #[test]
    fn short_flipping_to_long() {
        let o = decide(&holding("AAPL", PositionSide::Short, 10), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Buy, 75));
        assert_eq!(o.description, "flip to long");
    }

    #[test]
    fn long_flipping_to_short() {
        let o = decide(&holding("SNAP", PositionSide::Long, 10), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Sell, 40));
    }

    #[test]
    fn short_over_target_buys_back() {
        let o = decide(&holding("SNAP", PositionSide::Short, 35), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Buy, 5));
    }

    #[test]
    fn short_under_target_sells_more() {
        let o = decide(&holding("TLRY", PositionSide::Short, 20), &buckets(Some(65), Some(30)));
        assert_eq!((o.side, o.qty), (Side::Sell, 10));
    }

    #[test]
    fn short_at_target_is_noop() {
        let o = decide(&holding("TLRY", PositionSide::Short, 30), &buckets(Some(65), Some(30)));
        assert!(o.is_noop());
    }

    #[test]
    fn unknown_target_leaves_bucket_member_alone() {
        let o = decide(&holding("AAPL", PositionSide::Long, 3), &buckets(None, None));
        assert!(o.is_noop());
        assert_eq!(o.description, "target unknown");
    }

    #[test]
    fn unknown_target_still_unwinds() {
        let o = decide(&holding("GM", PositionSide::Long, 7), &buckets(None, None));
        assert_eq!((o.side, o.qty), (Side::Sell, 7));
    }

    #[test]
    fn signed_quantity_is_normalised() {
        let o = decide(&holding("GM", PositionSide::Short, -12), &buckets(Some(1), Some(1)));
        assert_eq!(o.qty, 12);
    }
}
