//! Batch configuration and on-disk data layout.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Japanese separate-taxation rate on investment income (income + resident + reconstruction).
pub const DEFAULT_TAX_RATE: f64 = 0.20315;

/// Bounded worker count for raw statement extraction.
pub const DEFAULT_WORKERS: usize = 8;

/// Resolved configuration for one batch invocation.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub layout: DataLayout,
    /// First day of the balance/profit aggregation window.
    pub start_date: NaiveDate,
    pub workers: usize,
    /// Balance category that is booked once as spend and once as a transfer.
    pub living_cost_category: String,
    pub tax_rate: f64,
    /// Cash value of one loyalty point.
    pub point_value: f64,
    /// Window for social-lending distributions. `None` means the batch window.
    pub lending_window: Option<(NaiveDate, NaiveDate)>,
    /// Fail the asset job on missing days instead of reporting them.
    pub strict_calendar: bool,
}

/// File locations under the data directory.
///
/// ```text
/// <data>/masters/*.csv        reference tables
/// <data>/raw/ledger/<year>.csv
/// <data>/raw/statements/*.csv  one file per statement, date in the filename
/// <data>/output/*.csv         aggregated tables
/// <data>/downstream/*.csv     committed tables of the consuming service
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn masters(&self, name: &str) -> PathBuf {
        self.root.join("masters").join(name)
    }

    fn output(&self, name: &str) -> PathBuf {
        self.root.join("output").join(name)
    }

    pub fn asset_taxonomy(&self) -> PathBuf {
        self.masters("asset_taxonomy.csv")
    }

    pub fn balance_taxonomy(&self) -> PathBuf {
        self.masters("balance_taxonomy.csv")
    }

    pub fn offset_unrealized(&self) -> PathBuf {
        self.masters("offset_unrealized.csv")
    }

    pub fn target_rate(&self) -> PathBuf {
        self.masters("target_rate.csv")
    }

    pub fn target_balance_parameter(&self) -> PathBuf {
        self.masters("target_balance_parameter.csv")
    }

    pub fn target_initial_value(&self) -> PathBuf {
        self.masters("target_initial_value.csv")
    }

    pub fn ledger_dir(&self) -> PathBuf {
        self.root.join("raw").join("ledger")
    }

    pub fn statements_dir(&self) -> PathBuf {
        self.root.join("raw").join("statements")
    }

    pub fn asset_detail(&self) -> PathBuf {
        self.output("asset_detail.csv")
    }

    pub fn asset_profit(&self) -> PathBuf {
        self.output("asset_profit.csv")
    }

    pub fn balance_detail(&self) -> PathBuf {
        self.output("balance_detail.csv")
    }

    pub fn target_balance(&self) -> PathBuf {
        self.output("target_balance.csv")
    }

    pub fn target_asset(&self) -> PathBuf {
        self.output("target_asset.csv")
    }

    pub fn downstream_asset(&self) -> PathBuf {
        self.root.join("downstream").join("asset.csv")
    }

    pub fn downstream_balance(&self) -> PathBuf {
        self.root.join("downstream").join("balance.csv")
    }
}
