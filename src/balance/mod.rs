//! Balance Collector.
//!
//! Builds the long-format balance table from ledger rows through additive
//! stages. Every stage computes its own contribution from the table it is handed
//! and appends it; no stage edits a row written before it.
//!
//! Order matters:
//! 1. `collect_balance`          ledger rows mapped through the balance taxonomy
//! 2. `collect_living_adjust`    cancels the double-counted living-cost transfer
//! 3. `collect_year_end_tax`     reads adjusted special totals, so runs after 2
//! 4. `collect_points`           reads the profit job's asset table, so runs last
//!
//! Each `*_rows` function is the pure contribution of one stage; the `collect_*`
//! wrappers append it to the table.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::{debug, info};

use crate::domain::{AssetCategory, AssetRecord, BalanceRecord, BalanceType, Calendar, LedgerRow};
use crate::error::PipelineError;
use crate::reference::BalanceTaxonomy;
use crate::text::normalize_label;

pub mod target;

pub use target::*;

pub const LIVING_ADJUSTMENT: &str = "living_adjustment";
pub const YEAR_END_TAX: &str = "year_end_tax";
pub const POINTS: &str = "points";

/// Categories only derived stages may write.
pub const RESERVED_CATEGORIES: [&str; 3] = [LIVING_ADJUSTMENT, YEAR_END_TAX, POINTS];

/// Keep ledger rows inside the window, normalize labels and drop zero amounts.
pub fn filter_and_clean_raw(calendar: &Calendar, rows: Vec<LedgerRow>) -> Vec<LedgerRow> {
    let before = rows.len();
    let out: Vec<LedgerRow> = rows
        .into_iter()
        .filter(|r| calendar.contains(r.date) && r.amount != 0.0 && r.amount.is_finite())
        .map(|r| LedgerRow {
            category: normalize_label(&r.category),
            sub_category: normalize_label(&r.sub_category),
            label: r.label.trim().to_string(),
            ..r
        })
        .collect();
    debug!(
        "ledger filter {}..={}: kept {} of {before} rows",
        calendar.start(),
        calendar.end(),
        out.len()
    );
    out
}

/// Base collection: one balance row per classified ledger row.
///
/// The ledger must already have passed `finalize::ensure_registered_ledger`;
/// an unclassifiable row here is an error, not a skip.
pub fn ledger_rows(ledger: &[LedgerRow], taxonomy: &BalanceTaxonomy) -> Result<Vec<BalanceRecord>, PipelineError> {
    ledger
        .iter()
        .map(|row| {
            let class = taxonomy
                .classify(&row.category, &row.sub_category)
                .ok_or_else(|| PipelineError::UnregisteredCategory {
                    table: "ledger",
                    categories: vec![format!("{}/{}", row.category, row.sub_category)],
                })?;
            Ok(BalanceRecord::actual(
                row.date,
                class.balance_type,
                class.category.clone(),
                row.amount,
            ))
        })
        .collect()
}

pub fn collect_balance(
    mut table: Vec<BalanceRecord>,
    ledger: &[LedgerRow],
    taxonomy: &BalanceTaxonomy,
) -> Result<Vec<BalanceRecord>, PipelineError> {
    let rows = ledger_rows(ledger, taxonomy)?;
    info!("collected {} ledger balance rows", rows.len());
    table.extend(rows);
    Ok(table)
}

/// Cancel the living-cost category per `(date, balance_type)`.
pub fn living_adjustment_rows(table: &[BalanceRecord], living_cost_category: &str) -> Vec<BalanceRecord> {
    let mut sums: BTreeMap<(NaiveDate, BalanceType), f64> = BTreeMap::new();
    for r in table.iter().filter(|r| r.category == living_cost_category) {
        *sums.entry((r.date, r.balance_type)).or_insert(0.0) += r.amount;
    }
    sums.into_iter()
        .filter(|(_, s)| *s != 0.0)
        .map(|((date, balance_type), s)| BalanceRecord::actual(date, balance_type, LIVING_ADJUSTMENT, -s))
        .collect()
}

pub fn collect_living_adjust(
    mut table: Vec<BalanceRecord>,
    living_cost_category: &str,
) -> Result<Vec<BalanceRecord>, PipelineError> {
    let rows = living_adjustment_rows(&table, living_cost_category);
    debug!("living-cost adjustment rows: {}", rows.len());
    table.extend(rows);
    Ok(table)
}

/// Year-end tax on the adjusted special balance of each calendar year.
///
/// Positive base yields a liability (negative amount), negative base a refund.
pub fn year_end_tax_rows(table: &[BalanceRecord], calendar: &Calendar, tax_rate: f64) -> Vec<BalanceRecord> {
    let mut base_by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for r in table
        .iter()
        .filter(|r| r.balance_type == BalanceType::Special && calendar.contains(r.date))
    {
        *base_by_year.entry(r.date.year()).or_insert(0.0) += r.amount;
    }

    calendar
        .year_ends()
        .into_iter()
        .filter_map(|year_end| {
            let base = base_by_year.get(&year_end.year()).copied().unwrap_or(0.0);
            (base != 0.0).then(|| {
                BalanceRecord::actual(year_end, BalanceType::Special, YEAR_END_TAX, -base * tax_rate)
            })
        })
        .collect()
}

pub fn collect_year_end_tax(
    mut table: Vec<BalanceRecord>,
    calendar: &Calendar,
    tax_rate: f64,
) -> Result<Vec<BalanceRecord>, PipelineError> {
    if !(tax_rate.is_finite() && (0.0..1.0).contains(&tax_rate)) {
        return Err(PipelineError::InvalidParameter {
            name: "tax_rate",
            value: tax_rate.to_string(),
        });
    }
    let rows = year_end_tax_rows(&table, calendar, tax_rate);
    for r in &rows {
        info!("year-end tax for {}: {:.0}", r.date.year(), r.amount);
    }
    table.extend(rows);
    Ok(table)
}

/// Day-over-day point accrual per points account, valued in cash.
pub fn point_rows(assets: &[AssetRecord], calendar: &Calendar, point_value: f64) -> Vec<BalanceRecord> {
    let mut series: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for a in assets.iter().filter(|a| a.category == AssetCategory::Points) {
        series.entry(a.asset_type.as_str()).or_default().push((a.date, a.value));
    }

    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for points in series.values_mut() {
        points.sort_by_key(|(d, _)| *d);
        for pair in points.windows(2) {
            let (date, value) = pair[1];
            let delta = value - pair[0].1;
            if calendar.contains(date) && delta != 0.0 {
                *by_date.entry(date).or_insert(0.0) += delta * point_value;
            }
        }
    }

    by_date
        .into_iter()
        .map(|(date, amount)| BalanceRecord::actual(date, BalanceType::General, POINTS, amount))
        .collect()
}

pub fn collect_points(
    mut table: Vec<BalanceRecord>,
    assets: &[AssetRecord],
    calendar: &Calendar,
    point_value: f64,
) -> Result<Vec<BalanceRecord>, PipelineError> {
    let rows = point_rows(assets, calendar, point_value);
    debug!("point balance rows: {}", rows.len());
    table.extend(rows);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::BalanceTaxonomyRow;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ledger(date: NaiveDate, category: &str, amount: f64) -> LedgerRow {
        LedgerRow {
            date,
            category: category.into(),
            sub_category: String::new(),
            amount,
            label: String::new(),
        }
    }

    fn taxonomy() -> BalanceTaxonomy {
        let row = |cat: &str, bt, bc: &str| BalanceTaxonomyRow {
            ledger_category: cat.into(),
            ledger_sub_category: String::new(),
            balance_type: bt,
            category: bc.into(),
        };
        BalanceTaxonomy::from_rows(vec![
            row("salary", BalanceType::General, "income"),
            row("food", BalanceType::General, "expense"),
            row("living cost", BalanceType::General, "living_cost"),
            row("stock sale", BalanceType::Special, "income"),
            row("furniture", BalanceType::Special, "expense"),
        ])
        .unwrap()
    }

    fn window() -> Calendar {
        Calendar::new(d(2024, 10, 1), d(2025, 1, 31)).unwrap()
    }

    #[test]
    fn filter_drops_out_of_window_and_zero_rows() {
        let rows = vec![
            ledger(d(2024, 9, 30), "food", -100.0),
            ledger(d(2024, 10, 1), " ｆｏｏｄ ", -200.0),
            ledger(d(2024, 10, 2), "food", 0.0),
        ];
        let out = filter_and_clean_raw(&window(), rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, "food");
    }

    #[test]
    fn living_adjustment_cancels_transfer() {
        let ledger_rows = vec![
            ledger(d(2024, 10, 25), "living cost", -150_000.0),
            ledger(d(2024, 10, 25), "food", -3_000.0),
        ];
        let table = collect_balance(Vec::new(), &ledger_rows, &taxonomy()).unwrap();
        let table = collect_living_adjust(table, "living_cost").unwrap();

        let adj: Vec<_> = table.iter().filter(|r| r.category == LIVING_ADJUSTMENT).collect();
        assert_eq!(adj.len(), 1);
        assert_eq!(adj[0].amount, 150_000.0);
        let net: f64 = table.iter().map(|r| r.amount).sum();
        assert_eq!(net, -3_000.0);
    }

    #[test]
    fn year_end_tax_uses_special_totals_of_the_year() {
        let ledger_rows = vec![
            ledger(d(2024, 11, 1), "stock sale", 100_000.0),
            ledger(d(2024, 12, 1), "furniture", -20_000.0),
            ledger(d(2024, 12, 2), "salary", 300_000.0),
            ledger(d(2025, 1, 10), "stock sale", 50_000.0),
        ];
        let table = collect_balance(Vec::new(), &ledger_rows, &taxonomy()).unwrap();
        let table = collect_year_end_tax(table, &window(), 0.2).unwrap();

        let tax: Vec<_> = table.iter().filter(|r| r.category == YEAR_END_TAX).collect();
        // 2025-12-31 lies outside the window.
        assert_eq!(tax.len(), 1);
        assert_eq!(tax[0].date, d(2024, 12, 31));
        assert_eq!(tax[0].balance_type, BalanceType::Special);
        assert!((tax[0].amount - (-16_000.0)).abs() < 1e-9);
    }

    #[test]
    fn net_loss_produces_refund() {
        let table = vec![BalanceRecord::actual(d(2024, 11, 1), BalanceType::Special, "expense", -10_000.0)];
        let rows = year_end_tax_rows(&table, &window(), 0.2);
        assert_eq!(rows.len(), 1);
        assert!((rows[0].amount - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_tax_rate_is_rejected() {
        let err = collect_year_end_tax(Vec::new(), &window(), 1.5).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn points_are_day_over_day_deltas() {
        let assets = vec![
            AssetRecord::new(d(2024, 10, 1), "card points", AssetCategory::Points, 1_000.0),
            AssetRecord::new(d(2024, 10, 2), "card points", AssetCategory::Points, 1_250.0),
            AssetRecord::new(d(2024, 10, 3), "card points", AssetCategory::Points, 1_250.0),
            AssetRecord::new(d(2024, 10, 4), "card points", AssetCategory::Points, 1_100.0),
            AssetRecord::new(d(2024, 10, 2), "bank", AssetCategory::Deposit, 9_999.0),
        ];
        let rows = point_rows(&assets, &window(), 1.0);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].date, rows[0].amount), (d(2024, 10, 2), 250.0));
        assert_eq!((rows[1].date, rows[1].amount), (d(2024, 10, 4), -150.0));
    }

    #[test]
    fn stages_never_edit_earlier_rows() {
        let ledger_rows = vec![
            ledger(d(2024, 10, 25), "living cost", -150_000.0),
            ledger(d(2024, 11, 1), "stock sale", 100_000.0),
        ];
        let base = collect_balance(Vec::new(), &ledger_rows, &taxonomy()).unwrap();
        let snapshot = base.clone();
        let table = collect_living_adjust(base, "living_cost").unwrap();
        let table = collect_year_end_tax(table, &window(), 0.2).unwrap();
        assert_eq!(&table[..snapshot.len()], &snapshot[..]);
    }
}
