//! Momentum scoring and ranking.
//!
//! The signal is the raw close-to-close change over the lookback window,
//! in cents: `close[last] - close[first]`. Ranking sorts ascending, so the
//! weakest instruments come first and the strongest last.

use crate::types::Symbol;

/// One member of the strategy universe with its latest momentum score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instrument {
    pub symbol: Symbol,
    /// Close change over the lookback window, in cents. Stale when the last
    /// fetch for this symbol failed.
    pub score: i64,
}

impl Instrument {
    /// A fresh instrument with a zero score.
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol, score: 0 }
    }
}

/// Build a universe (all scores zero) from symbols in configured order.
pub fn universe(symbols: &[Symbol]) -> Vec<Instrument> {
    symbols.iter().copied().map(Instrument::new).collect()
}

/// Close change over a window of closes (oldest first), in cents.
///
/// Returns `None` for an empty window. A single close scores zero.
pub fn momentum_score(closes: &[i64]) -> Option<i64> {
    let first = closes.first()?;
    let last = closes.last()?;
    Some(last - first)
}

/// Rank instruments ascending by score.
///
/// The sort is stable: equal scores keep their relative order from `universe`.
pub fn rank(universe: &[Instrument]) -> Vec<Instrument> {
    let mut ranked = universe.to_vec();
    ranked.sort_by_key(|i| i.score);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(s: &str, score: i64) -> Instrument {
        Instrument {
            symbol: Symbol::new(s),
            score,
        }
    }

    #[test]
    fn score_is_last_minus_first() {
        assert_eq!(momentum_score(&[100_00, 90_00, 130_50]), Some(30_50));
        assert_eq!(momentum_score(&[100_00, 80_00]), Some(-20_00));
    }

    #[test]
    fn score_single_and_empty() {
        assert_eq!(momentum_score(&[42_00]), Some(0));
        assert_eq!(momentum_score(&[]), None);
    }

    #[test]
    fn rank_ascending() {
        let ranked = rank(&[inst("A", 5), inst("B", -3), inst("C", 1)]);
        let syms: Vec<_> = ranked.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(syms, ["B", "C", "A"]);
    }

    #[test]
    fn rank_ties_keep_input_order() {
        let ranked = rank(&[inst("X", 0), inst("Y", -1), inst("Z", 0), inst("W", 0)]);
        let syms: Vec<_> = ranked.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(syms, ["Y", "X", "Z", "W"]);
    }

    #[test]
    fn rank_does_not_touch_input() {
        let input = vec![inst("A", 2), inst("B", 1)];
        let _ = rank(&input);
        assert_eq!(input[0].symbol.as_str(), "A");
    }

    #[test]
    fn universe_starts_at_zero() {
        let u = universe(&[Symbol::new("GM"), Symbol::new("BA")]);
        assert_eq!(u.len(), 2);
        assert!(u.iter().all(|i| i.score == 0));
        assert_eq!(u[1].symbol.as_str(), "BA");
    }
}
