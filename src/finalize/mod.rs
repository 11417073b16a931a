//! Finalizer.
//!
//! The checks every table passes before it is persisted:
//!
//! - registration: every category in a working table exists in its taxonomy.
//!   Runs on the inputs, before any derived stage.
//! - staleness: an earlier aggregate may not be newer than the raw data.
//! - reindex: rows are placed onto the full calendar and missing days are
//!   reported (or rejected), never zero-filled.
//! - ordering: date ascending as the very last step.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use log::{info, warn};

use crate::domain::{AssetRecord, BalanceRecord, BalanceType, Calendar, LedgerRow, RawAssetRow};
use crate::error::PipelineError;
use crate::reference::{AssetTaxonomy, BalanceTaxonomy};

/// What to do with days that have no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPolicy {
    Reject,
    Report,
}

/// Rows placed onto a calendar, plus the days that had none.
#[derive(Debug, Clone)]
pub struct Reindexed<T> {
    pub rows: Vec<T>,
    pub gaps: Vec<NaiveDate>,
}

fn unregistered(table: &'static str, mut missing: Vec<String>) -> Result<(), PipelineError> {
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort();
    missing.dedup();
    Err(PipelineError::UnregisteredCategory {
        table,
        categories: missing,
    })
}

/// Every asset-type in `rows` must be in the asset taxonomy.
pub fn ensure_registered_assets(rows: &[RawAssetRow], taxonomy: &AssetTaxonomy) -> Result<(), PipelineError> {
    let missing = rows
        .iter()
        .filter(|r| !taxonomy.is_registered(&r.asset_type))
        .map(|r| r.asset_type.clone())
        .collect();
    unregistered("asset", missing)
}

/// Every `(category, sub_category)` in the ledger must classify.
pub fn ensure_registered_ledger(rows: &[LedgerRow], taxonomy: &BalanceTaxonomy) -> Result<(), PipelineError> {
    let missing = rows
        .iter()
        .filter(|r| !taxonomy.is_registered(&r.category, &r.sub_category))
        .map(|r| {
            if r.sub_category.is_empty() {
                r.category.clone()
            } else {
                format!("{}/{}", r.category, r.sub_category)
            }
        })
        .collect();
    unregistered("ledger", missing)
}

/// The previously aggregated table may not reach past the newest raw data.
pub fn ensure_not_stale(aggregated: Option<NaiveDate>, raw: NaiveDate) -> Result<(), PipelineError> {
    match aggregated {
        Some(aggregated) if aggregated > raw => Err(PipelineError::StaleData { aggregated, raw }),
        _ => Ok(()),
    }
}

/// Place `rows` onto `calendar`.
///
/// Rows outside the calendar are dropped. Days with no row are collected in
/// `gaps`; under `GapPolicy::Reject` any gap is a `CalendarGap` error.
pub fn reindex<T, F>(
    table: &'static str,
    calendar: &Calendar,
    rows: Vec<T>,
    date_of: F,
    policy: GapPolicy,
) -> Result<Reindexed<T>, PipelineError>
where
    F: Fn(&T) -> NaiveDate,
{
    let mut by_day: Vec<Vec<T>> = (0..calendar.len()).map(|_| Vec::new()).collect();
    let mut dropped = 0usize;
    for row in rows {
        match calendar.index_of(date_of(&row)) {
            Some(i) => by_day[i].push(row),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("{table}: dropped {dropped} row(s) outside {}..={}", calendar.start(), calendar.end());
    }

    let gaps: Vec<NaiveDate> = calendar
        .days()
        .zip(&by_day)
        .filter(|(_, day)| day.is_empty())
        .map(|(date, _)| date)
        .collect();

    if !gaps.is_empty() {
        match policy {
            GapPolicy::Reject => {
                return Err(PipelineError::CalendarGap {
                    table,
                    start: calendar.start(),
                    end: calendar.end(),
                    missing: gaps,
                });
            }
            GapPolicy::Report => warn!(
                "{table}: {} day(s) without rows in {}..={}, first {}",
                gaps.len(),
                calendar.start(),
                calendar.end(),
                gaps[0]
            ),
        }
    }

    Ok(Reindexed {
        rows: by_day.into_iter().flatten().collect(),
        gaps,
    })
}

pub fn sort_assets(rows: &mut [AssetRecord]) {
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.asset_type.cmp(&b.asset_type)));
}

pub fn sort_balance(rows: &mut [BalanceRecord]) {
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.balance_type.cmp(&b.balance_type))
            .then_with(|| a.category.cmp(&b.category))
    });
}

/// Merge new snapshots into the previous aggregate. On `(date, asset_type)`
/// collisions the new row wins.
pub fn finalize_assets(new_rows: Vec<AssetRecord>, previous: Vec<AssetRecord>) -> Vec<AssetRecord> {
    let mut merged: HashMap<(NaiveDate, String), AssetRecord> = HashMap::with_capacity(previous.len() + new_rows.len());
    for row in previous.into_iter().chain(new_rows) {
        merged.insert((row.date, row.asset_type.clone()), row);
    }
    let mut rows: Vec<AssetRecord> = merged.into_values().collect();
    sort_assets(&mut rows);
    rows
}

/// Merge plan targets into the collected balance, reindex and order it.
///
/// Actual amounts and targets are summed per `(date, balance_type, category)`;
/// a target with no matching actual becomes a row with `amount = 0`. Missing
/// days are reported, not filled.
pub fn finalize_balance(
    calendar: &Calendar,
    table: Vec<BalanceRecord>,
    targets: &[BalanceRecord],
) -> Result<Reindexed<BalanceRecord>, PipelineError> {
    let mut merged: BTreeMap<(NaiveDate, BalanceType, String), (f64, f64)> = BTreeMap::new();
    for r in &table {
        merged.entry((r.date, r.balance_type, r.category.clone())).or_insert((0.0, 0.0)).0 += r.amount;
    }
    for t in targets.iter().filter(|t| calendar.contains(t.date)) {
        merged.entry((t.date, t.balance_type, t.category.clone())).or_insert((0.0, 0.0)).1 += t.target;
    }
    let rows: Vec<BalanceRecord> = merged
        .into_iter()
        .map(|((date, balance_type, category), (amount, target))| BalanceRecord {
            date,
            balance_type,
            category,
            amount,
            target,
        })
        .collect();

    let mut out = reindex("balance", calendar, rows, |r| r.date, GapPolicy::Report)?;
    sort_balance(&mut out.rows);
    info!("finalized balance: {} rows, {} gap day(s)", out.rows.len(), out.gaps.len());
    Ok(out)
}
