//! Input/output helpers.
//!
//! - shared date parsing and serde adapter (`dates`)
//! - CSV ingest (`ingest`) and master loading (`masters`)
//! - parallel raw statement extraction (`raw`)
//! - atomic table export (`export`) and downstream hand-off (`sink`)

pub mod dates;
pub mod export;
pub mod ingest;
pub mod masters;
pub mod raw;
pub mod sink;

pub use export::*;
pub use ingest::*;
pub use masters::*;
pub use raw::*;
pub use sink::*;
