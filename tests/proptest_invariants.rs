// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Property-based tests for ranking and bucketing invariants.

use longshort::bucket::{quarter_size, share_qty};
use longshort::decision::{Holding, decide};
use longshort::{Buckets, Instrument, PositionSide, Symbol, rank};
use proptest::prelude::*;

/// Universe of `n` distinct symbols with arbitrary (often tied) scores.
fn universe_strategy() -> impl Strategy<Value = Vec<Instrument>> {
    prop::collection::vec(-5i64..=5i64, 0..64).prop_map(|scores| {
        scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| Instrument {
                symbol: Symbol::new(&format!("S{i}")),
                score,
            })
            .collect()
    })
}

fn position_side_strategy() -> impl Strategy<Value = PositionSide> {
    prop_oneof![Just(PositionSide::Long), Just(PositionSide::Short)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // BUCKET PARTITION
    // ========================================================================

    /// Both buckets hold exactly floor(N/4) members and never overlap.
    #[test]
    fn buckets_are_quarter_sized_and_disjoint(universe in universe_strategy()) {
        let ranked = rank::rank(&universe);
        let buckets = Buckets::from_ranked(&ranked);
        let q = quarter_size(universe.len());

        prop_assert_eq!(buckets.long.members.len(), q);
        prop_assert_eq!(buckets.short.members.len(), q);
        for sym in &buckets.long.members {
            prop_assert!(!buckets.short.contains(sym), "{} in both buckets", sym);
        }
    }

    /// Every short member scores at most every long member.
    #[test]
    fn short_scores_never_exceed_long_scores(universe in universe_strategy()) {
        let ranked = rank::rank(&universe);
        let buckets = Buckets::from_ranked(&ranked);
        let score = |s: &Symbol| ranked.iter().find(|i| i.symbol == *s).map(|i| i.score);

        let max_short = buckets.short.members.iter().filter_map(score).max();
        let min_long = buckets.long.members.iter().filter_map(score).min();
        if let (Some(hi), Some(lo)) = (max_short, min_long) {
            prop_assert!(hi <= lo);
        }
    }

    // ========================================================================
    // RANKING
    // ========================================================================

    /// Ranking is a permutation, sorted ascending, stable on ties.
    #[test]
    fn ranking_is_stable(universe in universe_strategy()) {
        let ranked = rank::rank(&universe);
        prop_assert_eq!(ranked.len(), universe.len());

        let position = |s: Symbol| universe.iter().position(|i| i.symbol == s);
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score <= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(position(pair[0].symbol) < position(pair[1].symbol));
            }
        }
    }

    // ========================================================================
    // SIZING
    // ========================================================================

    /// Sizing never panics and is unknown exactly when the price is not positive.
    #[test]
    fn share_qty_is_total(equity in -1_000_000_00i64..1_000_000_00i64, total in -100_00i64..100_000_00i64) {
        let qty = share_qty(equity, total);
        prop_assert_eq!(qty.is_none(), total <= 0);
        if let Some(q) = qty {
            prop_assert!(q >= 0);
            prop_assert!(q * total <= equity.max(0));
        }
    }

    // ========================================================================
    // DECISIONS
    // ========================================================================

    /// A position already at its bucket target never trades.
    #[test]
    fn at_target_is_always_noop(target in 0i64..10_000, side in position_side_strategy()) {
        let mut buckets = Buckets::default();
        let sym = Symbol::new("HELD");
        match side {
            PositionSide::Long => {
                buckets.long.members.push(sym);
                buckets.long.qty = Some(target);
            }
            PositionSide::Short => {
                buckets.short.members.push(sym);
                buckets.short.qty = Some(target);
            }
        }
        let order = decide(&Holding { symbol: sym, side, qty: target }, &buckets);
        prop_assert!(order.is_noop());
    }
}
