//! `finance-batch` library crate.
//!
//! The binary (`fb`) is a thin wrapper around this library so that:
//!
//! - every job is testable without spawning processes
//! - stages, masters and the simulator are usable on their own
//! - code stays easy to navigate as the batch grows

pub mod app;
pub mod balance;
pub mod cli;
pub mod domain;
pub mod error;
pub mod finalize;
pub mod io;
pub mod profit;
pub mod reference;
pub mod report;
pub mod stage;
pub mod target;
pub mod text;
