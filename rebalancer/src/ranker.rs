//! Momentum ranker: refresh every instrument's score from recent daily bars
//! and produce the ascending ranking.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use longshort::{Instrument, Symbol, rank};
use longshort_broker::{BarRequest, BrokerError, Gateway};
use rayon::prelude::*;

use crate::error::{self, Result};

/// Result of one rerank.
#[derive(Debug, Clone)]
pub struct RankOutcome {
    /// Ascending by score; ties keep universe order.
    pub ranked: Vec<Instrument>,
    /// Symbols whose fetch failed and kept their previous score.
    pub stale: Vec<Symbol>,
}

/// Refetch `lookback` daily bars per instrument and rescore `universe` in place.
///
/// Bars are fetched in parallel on the current rayon pool. A per-symbol
/// failure leaves that score stale; a connectivity failure aborts the rerank
/// with no score changed.
pub fn rerank<G: Gateway + ?Sized>(
    gateway: &G,
    universe: &mut [Instrument],
    lookback: usize,
    now: DateTime<Utc>,
) -> Result<RankOutcome> {
    let request = BarRequest::daily(lookback, now);

    let fetched: Vec<std::result::Result<Option<i64>, BrokerError>> = universe
        .par_iter()
        .map(|inst| {
            let bars = gateway.recent_bars(inst.symbol, &request)?;
            let closes: Vec<i64> = bars.iter().map(|b| b.close_cents).collect();
            Ok(rank::momentum_score(&closes))
        })
        .collect();

    if let Some(err) = fetched.iter().find_map(|r| match r {
        Err(e) if e.is_connectivity() => Some(e.clone()),
        _ => None,
    }) {
        return Err(error::connection(err));
    }

    let mut stale = Vec::new();
    for (inst, result) in universe.iter_mut().zip(fetched) {
        match result {
            Ok(Some(score)) => {
                debug!("{}: score {}", inst.symbol, score);
                inst.score = score;
            }
            Ok(None) => {
                warn!("{}: no closes in lookback window, keeping score {}", inst.symbol, inst.score);
                stale.push(inst.symbol);
            }
            Err(e) => {
                warn!("{}: {e}, keeping score {}", inst.symbol, inst.score);
                stale.push(inst.symbol);
            }
        }
    }

    Ok(RankOutcome {
        ranked: rank::rank(universe),
        stale,
    })
}
