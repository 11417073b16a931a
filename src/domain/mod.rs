//! Domain types used throughout the batch jobs.
//!
//! - record types (`LedgerRow`, `AssetRecord`, `BalanceRecord`, `TrajectoryRow`)
//! - the fixed taxonomies (`AssetCategory`, `BalanceType`, `EventKind`, `Bucket`)
//! - the gapless daily `Calendar`
//! - batch configuration (`BatchConfig`, `DataLayout`)

pub mod calendar;
pub mod config;
pub mod types;

pub use calendar::*;
pub use config::*;
pub use types::*;
