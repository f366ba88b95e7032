// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # longshort
//!
//! Strategy math for a long/short equity momentum portfolio. No I/O lives
//! here: the broker gateway and the rebalance loop are in the
//! `longshort-broker` and `longshort-rebalancer` crates.
//!
//! ## Pipeline
//!
//! 1. [`rank`]: score each instrument by its close change over a lookback
//!    window and sort ascending (stable).
//! 2. [`bucket`]: bottom quarter goes Short, top quarter goes Long; each
//!    bucket gets one uniform share count from its slice of equity.
//! 3. [`decision`]: compare every held position to the buckets and emit the
//!    single corrective order.
//!
//! ```
//! use longshort::{Buckets, EquitySplit, Instrument, LongLeverage, Symbol, rank};
//!
//! let scores = [5, 4, 3, 2, 1, 0, -1, -2];
//! let universe: Vec<Instrument> = scores
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &score)| Instrument { symbol: Symbol::new(&format!("S{i}")), score })
//!     .collect();
//!
//! let ranked = rank::rank(&universe);
//! let mut buckets = Buckets::from_ranked(&ranked);
//! assert_eq!(buckets.short.members, [Symbol::new("S7"), Symbol::new("S6")]);
//! assert_eq!(buckets.long.members, [Symbol::new("S1"), Symbol::new("S0")]);
//!
//! // $10,000 equity, 30% short
//! EquitySplit::compute(10_000_00, 0.30, LongLeverage::ShortProceeds).apply(&mut buckets);
//! buckets.short.size(Some(100_00));
//! buckets.long.size(Some(200_00));
//! assert_eq!(buckets.short.qty, Some(30));
//! assert_eq!(buckets.long.qty, Some(65));
//! ```

pub mod bucket;
pub mod decision;
pub mod rank;
pub mod side;
pub mod types;

pub use bucket::{Bucket, BucketKind, Buckets, EquitySplit, LongLeverage};
pub use decision::{Holding, PendingOrder};
pub use rank::Instrument;
pub use side::{PositionSide, Side};
pub use types::Symbol;
