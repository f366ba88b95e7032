//! longshort-rebalancer: long/short momentum rebalancing loop.
//!
//! Ranks a fixed universe by recent close change, sizes a long and a short
//! quartile bucket from account equity, reconciles held positions toward
//! them and fills the buckets with concurrent market orders, adjusting the
//! share count when part of a batch is rejected.

pub mod allocator;
pub mod audit;
pub mod batch;
pub mod config;
pub mod cycle;
pub mod error;
pub mod ranker;
pub mod reconcile;
pub mod schedule;
