//! Master table types.
//!
//! Each master is validated when constructed so downstream stages can rely on
//! its invariants without re-checking.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::balance::RESERVED_CATEGORIES;
use crate::domain::{AssetCategory, BalanceType};
use crate::error::PipelineError;
use crate::io::dates;
use crate::text::normalize_label;

/// Wildcard sub-category in the balance taxonomy.
pub const ANY_SUB_CATEGORY: &str = "*";

#[derive(Debug, Clone, Deserialize)]
pub struct AssetTaxonomyRow {
    pub asset_type: String,
    pub category: String,
}

/// `asset_type → AssetCategory`.
#[derive(Debug, Clone, Default)]
pub struct AssetTaxonomy {
    map: HashMap<String, AssetCategory>,
}

impl AssetTaxonomy {
    pub fn from_rows(rows: Vec<AssetTaxonomyRow>) -> Result<Self, PipelineError> {
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let asset_type = normalize_label(&row.asset_type);
            let category = AssetCategory::from_label(&row.category).ok_or_else(|| {
                PipelineError::data_load(format!(
                    "asset taxonomy: unknown category '{}' for '{asset_type}'",
                    row.category
                ))
            })?;
            if let Some(prev) = map.insert(asset_type.clone(), category) {
                if prev != category {
                    return Err(PipelineError::data_load(format!(
                        "asset taxonomy: '{asset_type}' mapped to both {prev} and {category}"
                    )));
                }
            }
        }
        Ok(Self { map })
    }

    pub fn category_of(&self, asset_type: &str) -> Option<AssetCategory> {
        self.map.get(asset_type).copied()
    }

    pub fn is_registered(&self, asset_type: &str) -> bool {
        self.map.contains_key(asset_type)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceTaxonomyRow {
    pub ledger_category: String,
    #[serde(default)]
    pub ledger_sub_category: String,
    pub balance_type: BalanceType,
    pub category: String,
}

/// Where a ledger row lands in the balance table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceClass {
    pub balance_type: BalanceType,
    pub category: String,
}

/// `(ledger category, ledger sub-category | "*") → BalanceClass`.
#[derive(Debug, Clone, Default)]
pub struct BalanceTaxonomy {
    entries: HashMap<(String, String), BalanceClass>,
}

impl BalanceTaxonomy {
    pub fn from_rows(rows: Vec<BalanceTaxonomyRow>) -> Result<Self, PipelineError> {
        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let category = normalize_label(&row.category);
            if RESERVED_CATEGORIES.contains(&category.as_str()) {
                return Err(PipelineError::data_load(format!(
                    "balance taxonomy: category '{category}' is reserved for derived rows"
                )));
            }
            let sub = normalize_label(&row.ledger_sub_category);
            let sub = if sub.is_empty() { ANY_SUB_CATEGORY.to_string() } else { sub };
            let key = (normalize_label(&row.ledger_category), sub);
            let class = BalanceClass {
                balance_type: row.balance_type,
                category,
            };
            if let Some(prev) = entries.insert(key.clone(), class.clone()) {
                if prev != class {
                    return Err(PipelineError::data_load(format!(
                        "balance taxonomy: '{}/{}' has conflicting entries",
                        key.0, key.1
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Exact sub-category match wins over the wildcard.
    pub fn classify(&self, category: &str, sub_category: &str) -> Option<&BalanceClass> {
        self.entries
            .get(&(category.to_string(), sub_category.to_string()))
            .or_else(|| {
                self.entries
                    .get(&(category.to_string(), ANY_SUB_CATEGORY.to_string()))
            })
    }

    pub fn is_registered(&self, category: &str, sub_category: &str) -> bool {
        self.classify(category, sub_category).is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OffsetRow {
    #[serde(with = "dates")]
    pub date: NaiveDate,
    pub asset_type: String,
    pub amount: f64,
}

/// Value changes that are not profit (contributions, transfers between accounts).
#[derive(Debug, Clone, Default)]
pub struct OffsetUnrealized {
    by_key: HashMap<(NaiveDate, String), f64>,
}

impl OffsetUnrealized {
    pub fn from_rows(rows: Vec<OffsetRow>) -> Self {
        let mut by_key = HashMap::new();
        for row in rows {
            *by_key
                .entry((row.date, normalize_label(&row.asset_type)))
                .or_insert(0.0) += row.amount;
        }
        Self { by_key }
    }

    pub fn offset(&self, date: NaiveDate, asset_type: &str) -> f64 {
        self.by_key
            .get(&(date, asset_type.to_string()))
            .copied()
            .unwrap_or(0.0)
    }
}

/// One key point of the target rate curve. Blank cells are independent per column.
#[derive(Debug, Clone, Deserialize)]
pub struct RatePoint {
    #[serde(with = "dates")]
    pub date: NaiveDate,
    pub risky_ratio: Option<f64>,
    pub safe_yield: Option<f64>,
    pub risky_yield: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateColumn {
    RiskyRatio,
    SafeYield,
    RiskyYield,
}

impl RateColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            RateColumn::RiskyRatio => "risky_ratio",
            RateColumn::SafeYield => "safe_yield",
            RateColumn::RiskyYield => "risky_yield",
        }
    }
}

/// Sparse allocation/yield control points.
#[derive(Debug, Clone)]
pub struct TargetRateCurve {
    points: Vec<RatePoint>,
}

impl TargetRateCurve {
    pub fn new(mut points: Vec<RatePoint>) -> Result<Self, PipelineError> {
        for p in &points {
            let values = [p.risky_ratio, p.safe_yield, p.risky_yield];
            if values.iter().flatten().any(|v| !v.is_finite()) {
                return Err(PipelineError::data_load(format!(
                    "target rate: non-finite value on {}",
                    p.date
                )));
            }
            if let Some(r) = p.risky_ratio {
                if !(0.0..=1.0).contains(&r) {
                    return Err(PipelineError::data_load(format!(
                        "target rate: risky_ratio {r} on {} is outside [0, 1]",
                        p.date
                    )));
                }
            }
        }
        points.sort_by_key(|p| p.date);
        let curve = Self { points };
        for column in [RateColumn::RiskyRatio, RateColumn::SafeYield, RateColumn::RiskyYield] {
            if curve.column(column).is_empty() {
                return Err(PipelineError::data_load(format!(
                    "target rate: column `{}` has no key points",
                    column.as_str()
                )));
            }
        }
        Ok(curve)
    }

    /// Key points of one column, ascending by date. A later row on the same date wins.
    pub fn column(&self, column: RateColumn) -> Vec<(NaiveDate, f64)> {
        let mut by_date = BTreeMap::new();
        for p in &self.points {
            let value = match column {
                RateColumn::RiskyRatio => p.risky_ratio,
                RateColumn::SafeYield => p.safe_yield,
                RateColumn::RiskyYield => p.risky_yield,
            };
            if let Some(v) = value {
                by_date.insert(p.date, v);
            }
        }
        by_date.into_iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Yearly,
    Once,
}

/// One recurring planned cash flow.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetBalanceParameter {
    pub balance_type: BalanceType,
    pub category: String,
    pub amount: f64,
    pub frequency: Frequency,
    /// First occurrence; also fixes the day-of-month (and month, for yearly).
    #[serde(with = "dates")]
    pub anchor: NaiveDate,
    #[serde(default, deserialize_with = "dates::deserialize_opt")]
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyValueRow {
    pub key: String,
    pub value: String,
}

/// Free-form `key,value` master (plan start/end/initial amount).
#[derive(Debug, Clone, Default)]
pub struct KeyValueMaster {
    values: HashMap<String, String>,
}

impl KeyValueMaster {
    pub fn from_rows(rows: Vec<KeyValueRow>) -> Self {
        Self {
            values: rows
                .into_iter()
                .map(|r| (r.key.trim().to_ascii_lowercase(), r.value.trim().to_string()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}
