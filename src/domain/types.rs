//! Shared record types.
//!
//! These are the rows that flow between the batch jobs. They are serializable so
//! the same structs are used for CSV ingest, in-memory derivation and output.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::io::dates;

/// Rows keyed by a calendar day.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// Fixed asset taxonomy.
///
/// The asset taxonomy master maps every asset-type name (an account, a fund,
/// a broker position) onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Deposit,
    TimeDeposit,
    StructuredDeposit,
    Mrf,
    ForeignCurrencyDeposit,
    GovernmentBond,
    CorporateBond,
    DomesticEquity,
    InvestmentTrust,
    DefinedBenefitPension,
    DefinedContributionPension,
    SecurityToken,
    SocialLending,
    Points,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 14] = [
        AssetCategory::Deposit,
        AssetCategory::TimeDeposit,
        AssetCategory::StructuredDeposit,
        AssetCategory::Mrf,
        AssetCategory::ForeignCurrencyDeposit,
        AssetCategory::GovernmentBond,
        AssetCategory::CorporateBond,
        AssetCategory::DomesticEquity,
        AssetCategory::InvestmentTrust,
        AssetCategory::DefinedBenefitPension,
        AssetCategory::DefinedContributionPension,
        AssetCategory::SecurityToken,
        AssetCategory::SocialLending,
        AssetCategory::Points,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Deposit => "deposit",
            AssetCategory::TimeDeposit => "time_deposit",
            AssetCategory::StructuredDeposit => "structured_deposit",
            AssetCategory::Mrf => "mrf",
            AssetCategory::ForeignCurrencyDeposit => "foreign_currency_deposit",
            AssetCategory::GovernmentBond => "government_bond",
            AssetCategory::CorporateBond => "corporate_bond",
            AssetCategory::DomesticEquity => "domestic_equity",
            AssetCategory::InvestmentTrust => "investment_trust",
            AssetCategory::DefinedBenefitPension => "defined_benefit_pension",
            AssetCategory::DefinedContributionPension => "defined_contribution_pension",
            AssetCategory::SecurityToken => "security_token",
            AssetCategory::SocialLending => "social_lending",
            AssetCategory::Points => "points",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }

    /// Categories whose profit is the mark-to-market value change.
    pub fn is_mark_to_market(self) -> bool {
        matches!(
            self,
            AssetCategory::DomesticEquity
                | AssetCategory::InvestmentTrust
                | AssetCategory::DefinedBenefitPension
                | AssetCategory::DefinedContributionPension
                | AssetCategory::SecurityToken
        )
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger event kinds that realize profit on an asset.
///
/// Matched against the normalized ledger `category`; the row's `sub_category`
/// names the asset-type the event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Interest,
    Maturity,
    Coupon,
    Dividend,
    CapitalGain,
    Distribution,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Interest => "interest",
            EventKind::Maturity => "maturity",
            EventKind::Coupon => "coupon",
            EventKind::Dividend => "dividend",
            EventKind::CapitalGain => "capital_gain",
            EventKind::Distribution => "distribution",
        }
    }

    pub fn matches(self, category: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(category.trim())
    }
}

/// Routine vs irregular cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceType {
    General,
    Special,
}

impl BalanceType {
    pub const ALL: [BalanceType; 2] = [BalanceType::General, BalanceType::Special];

    pub fn as_str(self) -> &'static str {
        match self {
            BalanceType::General => "general",
            BalanceType::Special => "special",
        }
    }
}

impl fmt::Display for BalanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allocation class used by the target simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Safe,
    Risky,
}

impl Bucket {
    /// Emission order within a day.
    pub const ORDER: [Bucket; 2] = [Bucket::Safe, Bucket::Risky];
}

/// A raw cash event as recorded in the household ledger.
///
/// Amounts are signed: income positive, expenditure negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(with = "dates")]
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    pub amount: f64,
    #[serde(default)]
    pub label: String,
}

/// One valuation line extracted from a raw statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAssetRow {
    #[serde(with = "dates")]
    pub date: NaiveDate,
    pub asset_type: String,
    pub value: f64,
}

/// Aggregated asset snapshot for one `(date, asset_type)`.
///
/// `unrealized`, `realized` and `total_return` are zero until the profit job
/// fills them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(with = "dates")]
    pub date: NaiveDate,
    pub asset_type: String,
    pub category: AssetCategory,
    pub value: f64,
    #[serde(default)]
    pub unrealized: f64,
    #[serde(default)]
    pub realized: f64,
    #[serde(default)]
    pub total_return: f64,
}

impl AssetRecord {
    pub fn new(date: NaiveDate, asset_type: impl Into<String>, category: AssetCategory, value: f64) -> Self {
        Self {
            date,
            asset_type: asset_type.into(),
            category,
            value,
            unrealized: 0.0,
            realized: 0.0,
            total_return: 0.0,
        }
    }

    pub fn clear_profit(&mut self) {
        self.unrealized = 0.0;
        self.realized = 0.0;
        self.total_return = 0.0;
    }
}

/// One balance line: actual `amount` and plan-derived `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    #[serde(with = "dates")]
    pub date: NaiveDate,
    pub balance_type: BalanceType,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub target: f64,
}

impl BalanceRecord {
    pub fn actual(date: NaiveDate, balance_type: BalanceType, category: impl Into<String>, amount: f64) -> Self {
        Self {
            date,
            balance_type,
            category: category.into(),
            amount,
            target: 0.0,
        }
    }

    pub fn planned(date: NaiveDate, balance_type: BalanceType, category: impl Into<String>, target: f64) -> Self {
        Self {
            date,
            balance_type,
            category: category.into(),
            amount: 0.0,
            target,
        }
    }
}

impl Dated for AssetRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for BalanceRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for TrajectoryRow {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// One simulated `(day, bucket)` row of the target trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    #[serde(with = "dates")]
    pub date: NaiveDate,
    pub bucket: Bucket,
    pub asset_value: f64,
    pub allocation_ratio: f64,
    pub total_return: f64,
    /// Annualized yield applied on this day.
    pub annual_yield: f64,
}
