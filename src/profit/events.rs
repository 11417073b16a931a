//! Booking of ledger events onto asset snapshots.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;

use crate::domain::{AssetCategory, AssetRecord, EventKind, LedgerRow};

use super::series_by_asset_type;

/// Why an event could not be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbookedReason {
    /// The sub-category is blank.
    NoAssetType,
    /// The sub-category names no asset-type in the table.
    UnknownAssetType,
    /// The asset-type has no snapshot on or after the event date.
    NoLaterSnapshot,
}

impl fmt::Display for UnbookedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnbookedReason::NoAssetType => "no asset-type in sub-category",
            UnbookedReason::UnknownAssetType => "unknown asset-type",
            UnbookedReason::NoLaterSnapshot => "no snapshot on or after it",
        })
    }
}

/// A ledger event that was not added to any snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct UnbookedEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub asset_type: String,
    pub amount: f64,
    pub reason: UnbookedReason,
}

/// Add matching event amounts to `realized`.
///
/// An event belongs to the asset-type named by its ledger `sub_category` and is
/// booked on that asset-type's first snapshot dated on or after the event.
/// Only rows whose category is in `categories` are eligible; an event for an
/// asset-type of another category is left to the stage that owns it. Events
/// naming no known asset-type are returned as unbooked. `window` limits which
/// event dates count, inclusive on both ends.
pub fn book_events(
    table: &mut [AssetRecord],
    ledger: &[LedgerRow],
    categories: &[AssetCategory],
    kinds: &[EventKind],
    window: Option<(NaiveDate, NaiveDate)>,
) -> Vec<UnbookedEvent> {
    let series = series_by_asset_type(table, |r| categories.contains(&r.category));
    let known: HashSet<String> = table.iter().map(|r| r.asset_type.clone()).collect();
    let mut unbooked = Vec::new();

    for row in ledger {
        let Some(kind) = kinds.iter().copied().find(|k| k.matches(&row.category)) else {
            continue;
        };
        if let Some((start, end)) = window {
            if row.date < start || row.date > end {
                continue;
            }
        }
        let unbook = |reason| UnbookedEvent {
            date: row.date,
            kind,
            asset_type: row.sub_category.clone(),
            amount: row.amount,
            reason,
        };
        let Some(idx) = series.get(row.sub_category.as_str()) else {
            if row.sub_category.is_empty() {
                unbooked.push(unbook(UnbookedReason::NoAssetType));
            } else if !known.contains(row.sub_category.as_str()) {
                unbooked.push(unbook(UnbookedReason::UnknownAssetType));
            }
            continue;
        };
        let pos = idx.partition_point(|&i| table[i].date < row.date);
        match idx.get(pos) {
            Some(&i) => table[i].realized += row.amount,
            None => unbooked.push(unbook(UnbookedReason::NoLaterSnapshot)),
        }
    }
    unbooked
}
