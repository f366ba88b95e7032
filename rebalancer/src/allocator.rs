//! Bucket allocator: split the ranking into quartile buckets, divide equity
//! between them and size each bucket's uniform share count.

use log::{info, warn};
use longshort::{Buckets, EquitySplit, Instrument, Symbol};
use longshort_broker::{BarRequest, Gateway};
use rayon::prelude::*;

use crate::config::{EquitySource, StrategyConfig};
use crate::error::{self, Result};

/// Build and size the buckets for `ranked` (ascending).
pub fn allocate<G: Gateway + ?Sized>(
    gateway: &G,
    ranked: &[Instrument],
    strategy: &StrategyConfig,
) -> Result<Buckets> {
    let mut buckets = Buckets::from_ranked(ranked);

    let Some(equity) = equity_cents(gateway, strategy.equity_source)? else {
        warn!("Equity unavailable, both buckets left unsized");
        return Ok(buckets);
    };
    let split = EquitySplit::compute(equity, strategy.short_fraction, strategy.long_leverage);
    split.apply(&mut buckets);
    info!(
        "Equity ${:.2}: long ${:.2}, short ${:.2}",
        equity as f64 / 100.0,
        split.long_cents as f64 / 100.0,
        split.short_cents as f64 / 100.0,
    );

    for bucket in [&mut buckets.long, &mut buckets.short] {
        let total = total_price(gateway, &bucket.members)?;
        bucket.size(total);
        match bucket.qty {
            Some(qty) => info!("{} bucket: {qty} shares each", bucket.kind),
            None => warn!(
                "{} bucket: total price unavailable ({:?}), sizing skipped",
                bucket.kind, total
            ),
        }
    }

    Ok(buckets)
}

/// Account equity in cents, per `source`.
///
/// `Positions` sums signed market value over open positions, so short
/// exposure counts negative. `Ok(None)` when the gateway answered with an
/// error other than a lost connection.
pub fn equity_cents<G: Gateway + ?Sized>(gateway: &G, source: EquitySource) -> Result<Option<i64>> {
    Ok(match source {
        EquitySource::Positions => error::recoverable(gateway.positions(), "positions")?
            .map(|positions| positions.iter().map(|p| p.market_value_cents).sum::<i64>()),
        EquitySource::Account => {
            error::recoverable(gateway.account(), "account")?.map(|a| a.equity_cents)
        }
    })
}

/// Sum of the latest one-minute close over `symbols`.
///
/// `Ok(None)` when any member's price is unavailable.
pub fn total_price<G: Gateway + ?Sized>(gateway: &G, symbols: &[Symbol]) -> Result<Option<i64>> {
    let request = BarRequest::latest();
    let prices: Vec<_> = symbols
        .par_iter()
        .map(|&symbol| (symbol, gateway.recent_bars(symbol, &request)))
        .collect();

    let mut total = 0;
    let mut complete = true;
    for (symbol, result) in prices {
        match result {
            Ok(bars) => match bars.last() {
                Some(bar) => total += bar.close_cents,
                None => complete = false,
            },
            Err(e) if e.is_connectivity() => return Err(error::connection(e)),
            Err(e) => {
                warn!("{symbol}: no latest price: {e}");
                complete = false;
            }
        }
    }

    Ok(complete.then_some(total))
}
