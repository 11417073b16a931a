//! Command-line parsing for the finance batch.
//!
//! Every option can also come from the environment (`FB_*`), and `.env` is read
//! before parsing, so scheduled runs need no arguments at all.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_TAX_RATE, DEFAULT_WORKERS};
use crate::io::dates::parse_date;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fb", version, about = "Personal-finance batch aggregation and target simulation")]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Expand the plan into target balance rows and simulate the target asset path.
    Target,
    /// Extract new raw statements and merge them into the asset table.
    Asset,
    /// Compute unrealized/realized profit and total return on the asset table.
    Profit,
    /// Build the balance table from the ledger.
    Balance,
    /// Run target, asset, profit and balance in that order.
    Update,
    /// Append rows newer than the downstream's committed date.
    Export,
    /// Print the latest position against the plan, and monthly balance.
    Summary(SummaryArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Data directory (masters/, raw/, output/, downstream/).
    #[arg(long, env = "FB_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// First day of the balance/profit window.
    #[arg(long, env = "FB_START_DATE", default_value = "2024-10-01", value_parser = parse_date, global = true)]
    pub start_date: NaiveDate,

    /// Threads used to extract raw statements.
    #[arg(long, env = "FB_WORKERS", default_value_t = DEFAULT_WORKERS, global = true)]
    pub workers: usize,

    /// Balance category booked both as spend and as an internal transfer.
    #[arg(long, env = "FB_LIVING_COST_CATEGORY", default_value = "living_cost", global = true)]
    pub living_cost_category: String,

    /// Year-end tax rate on the special balance.
    #[arg(long, env = "FB_TAX_RATE", default_value_t = DEFAULT_TAX_RATE, global = true)]
    pub tax_rate: f64,

    /// Cash value of one loyalty point.
    #[arg(long, env = "FB_POINT_VALUE", default_value_t = 1.0, global = true)]
    pub point_value: f64,

    /// First day social-lending distributions count (defaults to --start-date).
    #[arg(long, env = "FB_LENDING_START", value_parser = parse_date, global = true)]
    pub lending_start: Option<NaiveDate>,

    /// Last day social-lending distributions count (defaults to the batch end).
    #[arg(long, env = "FB_LENDING_END", value_parser = parse_date, global = true)]
    pub lending_end: Option<NaiveDate>,

    /// Fail the asset job on days without statements instead of warning.
    #[arg(long, env = "FB_STRICT_CALENDAR", global = true)]
    pub strict_calendar: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    /// Emit JSON instead of tables.
    #[arg(long)]
    pub json: bool,

    /// Months of balance history to show.
    #[arg(long, default_value_t = 12)]
    pub months: usize,
}
