//! Profit Calculator.
//!
//! Fills `unrealized`, `realized` and `total_return` on the aggregated asset
//! table. Stage order:
//!
//! 1. `set_unrealized_profit`              mark-to-market value deltas net of offsets
//! 2. `set_realized_deposit`               interest / maturity events
//! 3. `set_realized_mrf`                   MRF and foreign-currency cash deltas net of offsets
//! 4. `set_realized_interest`              bond coupons
//! 5. `set_realized_dividend_and_capital`  dividends and capital gains
//! 6. `set_realized_social_lending`        distributions inside a fixed window
//! 7. `set_total_returns`                  running sum per asset-type
//!
//! Each realized stage only touches rows of its own categories and adds to
//! `realized`, so a category served by two stages (security tokens) keeps both.
//! Ledger events a stage cannot book are logged and appended to the caller's
//! `unbooked` list.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::domain::{AssetCategory, AssetRecord, Calendar, EventKind, LedgerRow};
use crate::error::PipelineError;
use crate::reference::OffsetUnrealized;

mod events;

pub use events::{UnbookedEvent, UnbookedReason, book_events};

pub const DEPOSIT_CATEGORIES: &[AssetCategory] = &[
    AssetCategory::Deposit,
    AssetCategory::TimeDeposit,
    AssetCategory::StructuredDeposit,
];
pub const CASH_LIKE_CATEGORIES: &[AssetCategory] = &[AssetCategory::Mrf, AssetCategory::ForeignCurrencyDeposit];
pub const BOND_CATEGORIES: &[AssetCategory] = &[AssetCategory::GovernmentBond, AssetCategory::CorporateBond];
pub const EQUITY_CATEGORIES: &[AssetCategory] = &[AssetCategory::DomesticEquity, AssetCategory::SecurityToken];
pub const LENDING_CATEGORIES: &[AssetCategory] = &[AssetCategory::SocialLending, AssetCategory::SecurityToken];

/// Row indices per asset-type, each list ascending by date.
pub(crate) fn series_by_asset_type<F>(table: &[AssetRecord], mut keep: F) -> BTreeMap<String, Vec<usize>>
where
    F: FnMut(&AssetRecord) -> bool,
{
    let mut series: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, r) in table.iter().enumerate() {
        if keep(r) {
            series.entry(r.asset_type.clone()).or_default().push(i);
        }
    }
    for idx in series.values_mut() {
        idx.sort_by_key(|&i| table[i].date);
    }
    series
}

/// `value[t] - value[t-1] - offset(t)` along each series; the first snapshot gets 0.
fn net_deltas(table: &[AssetRecord], idx: &[usize], offsets: &OffsetUnrealized) -> Vec<(usize, f64)> {
    let mut out = Vec::with_capacity(idx.len());
    if let Some(&first) = idx.first() {
        out.push((first, 0.0));
    }
    for pair in idx.windows(2) {
        let (prev, cur) = (&table[pair[0]], &table[pair[1]]);
        let delta = cur.value - prev.value - offsets.offset(cur.date, &cur.asset_type);
        out.push((pair[1], delta));
    }
    out
}

pub fn set_unrealized_profit(
    mut table: Vec<AssetRecord>,
    offsets: &OffsetUnrealized,
) -> Result<Vec<AssetRecord>, PipelineError> {
    let series = series_by_asset_type(&table, |r| r.category.is_mark_to_market());
    let mut updates = Vec::new();
    for idx in series.values() {
        updates.extend(net_deltas(&table, idx, offsets));
    }
    debug!("unrealized profit: {} series, {} rows", series.len(), updates.len());
    for (i, delta) in updates {
        table[i].unrealized = delta;
    }
    Ok(table)
}

fn apply_events(
    mut table: Vec<AssetRecord>,
    ledger: &[LedgerRow],
    stage: &'static str,
    categories: &[AssetCategory],
    kinds: &[EventKind],
    window: Option<(NaiveDate, NaiveDate)>,
    unbooked: &mut Vec<UnbookedEvent>,
) -> Result<Vec<AssetRecord>, PipelineError> {
    let missed = book_events(&mut table, ledger, categories, kinds, window);
    for e in &missed {
        warn!(
            "{stage}: {} event of {:.0} for '{}' on {} not booked: {}",
            e.kind.as_str(),
            e.amount,
            e.asset_type,
            e.date,
            e.reason
        );
    }
    unbooked.extend(missed);
    Ok(table)
}

pub fn set_realized_deposit(
    table: Vec<AssetRecord>,
    ledger: &[LedgerRow],
    unbooked: &mut Vec<UnbookedEvent>,
) -> Result<Vec<AssetRecord>, PipelineError> {
    apply_events(
        table,
        ledger,
        "set_realized_deposit",
        DEPOSIT_CATEGORIES,
        &[EventKind::Interest, EventKind::Maturity],
        None,
        unbooked,
    )
}

/// MRF dividends are reinvested daily and foreign cash is revalued daily, so
/// the realized profit is the value change net of transfers.
pub fn set_realized_mrf(
    mut table: Vec<AssetRecord>,
    offsets: &OffsetUnrealized,
) -> Result<Vec<AssetRecord>, PipelineError> {
    let series = series_by_asset_type(&table, |r| CASH_LIKE_CATEGORIES.contains(&r.category));
    let mut updates = Vec::new();
    for idx in series.values() {
        updates.extend(net_deltas(&table, idx, offsets));
    }
    for (i, delta) in updates {
        table[i].realized += delta;
    }
    Ok(table)
}

pub fn set_realized_interest(
    table: Vec<AssetRecord>,
    ledger: &[LedgerRow],
    unbooked: &mut Vec<UnbookedEvent>,
) -> Result<Vec<AssetRecord>, PipelineError> {
    apply_events(
        table,
        ledger,
        "set_realized_interest",
        BOND_CATEGORIES,
        &[EventKind::Coupon],
        None,
        unbooked,
    )
}

pub fn set_realized_dividend_and_capital(
    table: Vec<AssetRecord>,
    ledger: &[LedgerRow],
    unbooked: &mut Vec<UnbookedEvent>,
) -> Result<Vec<AssetRecord>, PipelineError> {
    apply_events(
        table,
        ledger,
        "set_realized_dividend_and_capital",
        EQUITY_CATEGORIES,
        &[EventKind::Dividend, EventKind::CapitalGain],
        None,
        unbooked,
    )
}

pub fn set_realized_social_lending(
    table: Vec<AssetRecord>,
    ledger: &[LedgerRow],
    window: &Calendar,
    unbooked: &mut Vec<UnbookedEvent>,
) -> Result<Vec<AssetRecord>, PipelineError> {
    apply_events(
        table,
        ledger,
        "set_realized_social_lending",
        LENDING_CATEGORIES,
        &[EventKind::Distribution],
        Some((window.start(), window.end())),
        unbooked,
    )
}

/// Running cumulative `unrealized + realized` per asset-type. Never reset.
pub fn set_total_returns(mut table: Vec<AssetRecord>) -> Result<Vec<AssetRecord>, PipelineError> {
    let series = series_by_asset_type(&table, |_| true);
    for idx in series.values() {
        let mut running = 0.0;
        for &i in idx {
            running += table[i].unrealized + table[i].realized;
            table[i].total_return = running;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::OffsetRow;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn event(date: NaiveDate, kind: EventKind, asset_type: &str, amount: f64) -> LedgerRow {
        LedgerRow {
            date,
            category: kind.as_str().into(),
            sub_category: asset_type.into(),
            amount,
            label: String::new(),
        }
    }

    fn fund_series() -> Vec<AssetRecord> {
        vec![
            AssetRecord::new(d(2024, 10, 2), "world fund", AssetCategory::InvestmentTrust, 1_050.0),
            AssetRecord::new(d(2024, 10, 1), "world fund", AssetCategory::InvestmentTrust, 1_000.0),
            AssetRecord::new(d(2024, 10, 3), "world fund", AssetCategory::InvestmentTrust, 1_200.0),
            AssetRecord::new(d(2024, 10, 1), "bank", AssetCategory::Deposit, 5_000.0),
            AssetRecord::new(d(2024, 10, 3), "bank", AssetCategory::Deposit, 9_000.0),
        ]
    }

    #[test]
    fn unrealized_is_delta_net_of_offsets() {
        let offsets = OffsetUnrealized::from_rows(vec![OffsetRow {
            date: d(2024, 10, 3),
            asset_type: "world fund".into(),
            amount: 100.0,
        }]);
        let table = set_unrealized_profit(fund_series(), &offsets).unwrap();

        let by_date = |date| {
            table
                .iter()
                .find(|r| r.asset_type == "world fund" && r.date == date)
                .unwrap()
                .unrealized
        };
        assert_eq!(by_date(d(2024, 10, 1)), 0.0);
        assert_eq!(by_date(d(2024, 10, 2)), 50.0);
        assert_eq!(by_date(d(2024, 10, 3)), 50.0);
        // Deposits are not marked to market.
        assert!(table.iter().filter(|r| r.asset_type == "bank").all(|r| r.unrealized == 0.0));
    }

    #[test]
    fn deposit_interest_books_on_next_snapshot() {
        let ledger = vec![
            event(d(2024, 10, 2), EventKind::Interest, "bank", 12.0),
            event(d(2024, 10, 3), EventKind::Maturity, "bank", 300.0),
            event(d(2024, 10, 3), EventKind::Dividend, "bank", 999.0),
        ];
        let table = set_realized_deposit(fund_series(), &ledger, &mut Vec::new()).unwrap();
        let bank: Vec<_> = table.iter().filter(|r| r.asset_type == "bank").collect();
        assert_eq!(bank[0].realized, 0.0);
        assert_eq!(bank[1].realized, 312.0);
    }

    #[test]
    fn mrf_realized_is_net_value_change() {
        let table = vec![
            AssetRecord::new(d(2024, 10, 1), "mrf", AssetCategory::Mrf, 100_000.0),
            AssetRecord::new(d(2024, 10, 2), "mrf", AssetCategory::Mrf, 150_003.0),
        ];
        let offsets = OffsetUnrealized::from_rows(vec![OffsetRow {
            date: d(2024, 10, 2),
            asset_type: "mrf".into(),
            amount: 50_000.0,
        }]);
        let table = set_realized_mrf(table, &offsets).unwrap();
        assert_eq!(table[1].realized, 3.0);
    }

    #[test]
    fn security_token_collects_dividend_and_distribution() {
        let table = vec![AssetRecord::new(d(2024, 11, 30), "st", AssetCategory::SecurityToken, 100_000.0)];
        let ledger = vec![
            event(d(2024, 11, 30), EventKind::Dividend, "st", 700.0),
            event(d(2024, 11, 30), EventKind::Distribution, "st", 300.0),
        ];
        let window = Calendar::new(d(2024, 10, 1), d(2024, 12, 31)).unwrap();
        let table = set_realized_dividend_and_capital(table, &ledger, &mut Vec::new()).unwrap();
        let table = set_realized_social_lending(table, &ledger, &window, &mut Vec::new()).unwrap();
        assert_eq!(table[0].realized, 1_000.0);
    }

    #[test]
    fn lending_distributions_outside_window_are_ignored() {
        let table = vec![
            AssetRecord::new(d(2024, 9, 30), "crowd", AssetCategory::SocialLending, 10_000.0),
            AssetRecord::new(d(2024, 10, 31), "crowd", AssetCategory::SocialLending, 10_000.0),
        ];
        let ledger = vec![
            event(d(2024, 9, 30), EventKind::Distribution, "crowd", 50.0),
            event(d(2024, 10, 31), EventKind::Distribution, "crowd", 60.0),
        ];
        let window = Calendar::new(d(2024, 10, 1), d(2024, 12, 31)).unwrap();
        let table = set_realized_social_lending(table, &ledger, &window, &mut Vec::new()).unwrap();
        assert_eq!(table[0].realized, 0.0);
        assert_eq!(table[1].realized, 60.0);
    }

    #[test]
    fn deposit_events_without_asset_type_are_collected() {
        let ledger = vec![
            event(d(2024, 10, 2), EventKind::Interest, "", 10.0),
            event(d(2024, 10, 2), EventKind::Interest, "Bank Z", 20.0),
            // Owned by the unrealized stage's categories, not reported here.
            event(d(2024, 10, 2), EventKind::Interest, "world fund", 30.0),
        ];
        let mut unbooked = Vec::new();
        let table = set_realized_deposit(fund_series(), &ledger, &mut unbooked).unwrap();

        assert!(table.iter().all(|r| r.realized == 0.0));
        assert_eq!(unbooked.len(), 2);
        assert_eq!(unbooked[0].reason, UnbookedReason::NoAssetType);
        assert_eq!(unbooked[1].reason, UnbookedReason::UnknownAssetType);
    }

    #[test]
    fn total_return_accumulates_and_can_fall() {
        let mut table = vec![
            AssetRecord::new(d(2024, 10, 1), "fund", AssetCategory::InvestmentTrust, 0.0),
            AssetRecord::new(d(2024, 10, 2), "fund", AssetCategory::InvestmentTrust, 0.0),
            AssetRecord::new(d(2024, 10, 3), "fund", AssetCategory::InvestmentTrust, 0.0),
        ];
        table[1].unrealized = 100.0;
        table[1].realized = 5.0;
        table[2].unrealized = -30.0;
        let table = set_total_returns(table).unwrap();
        let totals: Vec<_> = table.iter().map(|r| r.total_return).collect();
        assert_eq!(totals, vec![0.0, 105.0, 75.0]);
    }
}
