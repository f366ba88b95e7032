//! Long/short quartile buckets and uniform share sizing.
//!
//! After ranking, the bottom quarter of the universe becomes the Short bucket
//! and the top quarter the Long bucket; the middle is left out for the cycle.
//! Every member of a bucket gets the same integer share count:
//! `floor(bucket equity / sum of member prices)`.

use std::fmt;

use crate::rank::Instrument;
use crate::side::Side;
use crate::types::Symbol;

/// Which directional bet a bucket holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BucketKind {
    Long,
    Short,
}

impl BucketKind {
    /// The order side that builds exposure in this bucket.
    #[inline]
    pub fn entry_side(self) -> Side {
        match self {
            BucketKind::Long => Side::Buy,
            BucketKind::Short => Side::Sell,
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKind::Long => write!(f, "Long"),
            BucketKind::Short => write!(f, "Short"),
        }
    }
}

/// One side of the strategy for the current cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bucket {
    pub kind: BucketKind,
    pub members: Vec<Symbol>,
    /// Uniform per-member share target. `None` = unknown, sizing skipped.
    pub qty: Option<i64>,
    /// Share target recomputed after a partial batch failure.
    /// `None` = no adjustment computed.
    pub adjusted_qty: Option<i64>,
    /// Equity allotted to this bucket, in cents.
    pub equity_cents: i64,
}

impl Bucket {
    pub fn new(kind: BucketKind) -> Self {
        Self {
            kind,
            members: Vec::new(),
            qty: None,
            adjusted_qty: None,
            equity_cents: 0,
        }
    }

    #[inline]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.members.contains(symbol)
    }

    /// Set `qty` from the bucket's equity and the summed member price.
    ///
    /// An unavailable or non-positive total leaves the quantity unknown.
    pub fn size(&mut self, total_price_cents: Option<i64>) {
        self.qty = total_price_cents.and_then(|total| share_qty(self.equity_cents, total));
    }
}

/// The Long/Short bucket pair.
///
/// Long and Short are always disjoint: they are built from opposite ends of
/// the same ranking and each holds `quarter_size(n)` members.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Buckets {
    pub long: Bucket,
    pub short: Bucket,
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            long: Bucket::new(BucketKind::Long),
            short: Bucket::new(BucketKind::Short),
        }
    }
}

impl Buckets {
    /// Partition an ascending ranking into fresh buckets.
    ///
    /// The first `n / 4` entries go Short, the last `n / 4` go Long.
    pub fn from_ranked(ranked: &[Instrument]) -> Self {
        let n = ranked.len();
        let quarter = quarter_size(n);
        let mut buckets = Self::default();
        buckets.short.members = ranked[..quarter].iter().map(|i| i.symbol).collect();
        buckets.long.members = ranked[n - quarter..].iter().map(|i| i.symbol).collect();
        buckets
    }

    pub fn get(&self, kind: BucketKind) -> &Bucket {
        match kind {
            BucketKind::Long => &self.long,
            BucketKind::Short => &self.short,
        }
    }

    pub fn get_mut(&mut self, kind: BucketKind) -> &mut Bucket {
        match kind {
            BucketKind::Long => &mut self.long,
            BucketKind::Short => &mut self.short,
        }
    }

    /// Which bucket (if any) `symbol` belongs to. Long is checked first.
    pub fn membership(&self, symbol: &Symbol) -> Option<BucketKind> {
        if self.long.contains(symbol) {
            Some(BucketKind::Long)
        } else if self.short.contains(symbol) {
            Some(BucketKind::Short)
        } else {
            None
        }
    }
}

/// Bucket size for a universe of `n` instruments.
#[inline]
pub fn quarter_size(n: usize) -> usize {
    n / 4
}

/// Uniform share count: `floor(equity / total_price)`.
///
/// Returns `None` when `total_price_cents <= 0`. Negative equity sizes to zero.
pub fn share_qty(equity_cents: i64, total_price_cents: i64) -> Option<i64> {
    if total_price_cents <= 0 {
        return None;
    }
    Some(equity_cents.max(0) / total_price_cents)
}

/// How the long bucket's equity relates to the short bucket's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LongLeverage {
    /// Long equity = equity + short equity (130/30 style).
    #[default]
    ShortProceeds,
    /// Long equity = equity.
    None,
}

/// Equity allotted to each bucket, in cents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EquitySplit {
    pub long_cents: i64,
    pub short_cents: i64,
}

impl EquitySplit {
    /// Split account equity between the buckets.
    ///
    /// `short = round(equity * short_fraction)`, long per `leverage`.
    pub fn compute(equity_cents: i64, short_fraction: f64, leverage: LongLeverage) -> Self {
        let short_cents = (equity_cents as f64 * short_fraction).round() as i64;
        let long_cents = match leverage {
            LongLeverage::ShortProceeds => equity_cents + short_cents,
            LongLeverage::None => equity_cents,
        };
        Self {
            long_cents,
            short_cents,
        }
    }

    /// Write the split into the buckets' equity amounts.
    pub fn apply(&self, buckets: &mut Buckets) {
        buckets.long.equity_cents = self.long_cents;
        buckets.short.equity_cents = self.short_cents;
    }
}
