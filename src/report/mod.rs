//! Reporting: run summary and monthly balance roll-ups.
//!
//! Computation only. Terminal formatting lives in `format`; `--json` output
//! serializes these structs directly.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::domain::{AssetRecord, BalanceRecord, BalanceType, TrajectoryRow};

pub mod format;

pub use format::*;

/// Actual position on the latest aggregated date, next to the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub latest_date: Option<NaiveDate>,
    pub total_asset: f64,
    pub total_return: f64,
    /// `None` when the plan horizon does not cover `latest_date`.
    pub target_asset: Option<f64>,
    pub target_return: Option<f64>,
}

pub fn summarize(assets: &[AssetRecord], trajectory: &[TrajectoryRow]) -> Summary {
    let latest_date = assets.iter().map(|a| a.date).max();
    let Some(latest) = latest_date else {
        return Summary {
            latest_date: None,
            total_asset: 0.0,
            total_return: 0.0,
            target_asset: None,
            target_return: None,
        };
    };

    let (total_asset, total_return) = assets
        .iter()
        .filter(|a| a.date == latest)
        .fold((0.0, 0.0), |(v, r), a| (v + a.value, r + a.total_return));

    let planned: Vec<&TrajectoryRow> = trajectory.iter().filter(|t| t.date == latest).collect();
    let (target_asset, target_return) = if planned.is_empty() {
        (None, None)
    } else {
        (
            Some(planned.iter().map(|t| t.asset_value).sum()),
            Some(planned.iter().map(|t| t.total_return).sum()),
        )
    };

    Summary {
        latest_date,
        total_asset,
        total_return,
        target_asset,
        target_return,
    }
}

/// Sums for one `(month, balance_type)`.
///
/// Income is the sum of positive amounts, expenditure of negative ones, so
/// `net = income + expenditure`. The cumulative nets are only carried for the
/// special balance, which is read as a running pot rather than a monthly flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBalance {
    /// Last day of the month.
    pub month_end: NaiveDate,
    pub balance_type: BalanceType,
    pub income: f64,
    pub expenditure: f64,
    pub net: f64,
    pub target_income: f64,
    pub target_expenditure: f64,
    pub target_net: f64,
    pub cumulative_net: Option<f64>,
    pub cumulative_target_net: Option<f64>,
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

fn split(v: f64) -> (f64, f64) {
    if v >= 0.0 { (v, 0.0) } else { (0.0, v) }
}

/// Roll the finalized balance table up to months, ordered by month then type.
pub fn monthly_balance(rows: &[BalanceRecord]) -> Vec<MonthlyBalance> {
    let mut sums: BTreeMap<(NaiveDate, BalanceType), [f64; 4]> = BTreeMap::new();
    for r in rows {
        let s = sums.entry((month_end(r.date), r.balance_type)).or_insert([0.0; 4]);
        let (inc, exp) = split(r.amount);
        let (t_inc, t_exp) = split(r.target);
        s[0] += inc;
        s[1] += exp;
        s[2] += t_inc;
        s[3] += t_exp;
    }

    let (mut running_net, mut running_target) = (0.0, 0.0);
    sums.into_iter()
        .map(|((month_end, balance_type), [income, expenditure, target_income, target_expenditure])| {
            let net = income + expenditure;
            let target_net = target_income + target_expenditure;
            let special = balance_type == BalanceType::Special;
            let cumulative_net = special.then(|| {
                running_net += net;
                running_net
            });
            let cumulative_target_net = special.then(|| {
                running_target += target_net;
                running_target
            });
            MonthlyBalance {
                month_end,
                balance_type,
                income,
                expenditure,
                net,
                target_income,
                target_expenditure,
                target_net,
                cumulative_net,
                cumulative_target_net,
            }
        })
        .collect()
}

/// Keep the rows of the last `months` distinct months. `rows` must be ordered by month.
pub fn last_months(mut rows: Vec<MonthlyBalance>, months: usize) -> Vec<MonthlyBalance> {
    let mut month_ends: Vec<NaiveDate> = rows.iter().map(|m| m.month_end).collect();
    month_ends.dedup();
    if month_ends.len() > months {
        match month_ends.get(month_ends.len() - months) {
            Some(&first_kept) => rows.retain(|m| m.month_end >= first_kept),
            None => rows.clear(),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetCategory, Bucket};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_ends() {
        assert_eq!(month_end(d(2024, 2, 3)), d(2024, 2, 29));
        assert_eq!(month_end(d(2024, 12, 31)), d(2024, 12, 31));
        assert_eq!(month_end(d(2023, 4, 1)), d(2023, 4, 30));
    }

    #[test]
    fn summary_uses_latest_date_only() {
        let mut latest = AssetRecord::new(d(2024, 3, 31), "fund", AssetCategory::InvestmentTrust, 1_200.0);
        latest.total_return = 200.0;
        let assets = vec![
            AssetRecord::new(d(2024, 3, 30), "fund", AssetCategory::InvestmentTrust, 1_100.0),
            latest,
            AssetRecord::new(d(2024, 3, 31), "bank", AssetCategory::Deposit, 500.0),
        ];
        let trajectory = vec![
            TrajectoryRow {
                date: d(2024, 3, 31),
                bucket: Bucket::Safe,
                asset_value: 600.0,
                allocation_ratio: 0.5,
                total_return: 1.0,
                annual_yield: 0.0,
            },
            TrajectoryRow {
                date: d(2024, 3, 31),
                bucket: Bucket::Risky,
                asset_value: 600.0,
                allocation_ratio: 0.5,
                total_return: 9.0,
                annual_yield: 0.05,
            },
        ];

        let s = summarize(&assets, &trajectory);
        assert_eq!(s.latest_date, Some(d(2024, 3, 31)));
        assert_eq!(s.total_asset, 1_700.0);
        assert_eq!(s.total_return, 200.0);
        assert_eq!(s.target_asset, Some(1_200.0));
        assert_eq!(s.target_return, Some(10.0));

        let empty = summarize(&[], &trajectory);
        assert_eq!(empty.latest_date, None);
        assert_eq!(empty.target_asset, None);
    }

    #[test]
    fn monthly_split_and_cumulative_special() {
        let rows = vec![
            BalanceRecord::actual(d(2024, 1, 25), BalanceType::General, "salary", 300_000.0),
            BalanceRecord::actual(d(2024, 1, 26), BalanceType::General, "food", -40_000.0),
            BalanceRecord::actual(d(2024, 1, 10), BalanceType::Special, "bonus", 100_000.0),
            BalanceRecord::actual(d(2024, 2, 10), BalanceType::Special, "travel", -30_000.0),
            BalanceRecord {
                date: d(2024, 2, 25),
                balance_type: BalanceType::General,
                category: "salary".into(),
                amount: 310_000.0,
                target: 300_000.0,
            },
        ];
        let months = monthly_balance(&rows);
        assert_eq!(months.len(), 4);

        let jan_general = &months[0];
        assert_eq!(jan_general.month_end, d(2024, 1, 31));
        assert_eq!(jan_general.income, 300_000.0);
        assert_eq!(jan_general.expenditure, -40_000.0);
        assert_eq!(jan_general.net, 260_000.0);
        assert_eq!(jan_general.cumulative_net, None);

        assert_eq!(months[1].cumulative_net, Some(100_000.0));
        assert_eq!(months[2].target_net, 300_000.0);
        assert_eq!(months[3].net, -30_000.0);
        assert_eq!(months[3].cumulative_net, Some(70_000.0));
    }

    #[test]
    fn last_months_counts_months_not_rows() {
        let rows = vec![
            BalanceRecord::actual(d(2024, 1, 5), BalanceType::General, "salary", 1.0),
            BalanceRecord::actual(d(2024, 1, 6), BalanceType::Special, "bonus", 1.0),
            // February has only a general row.
            BalanceRecord::actual(d(2024, 2, 5), BalanceType::General, "salary", 1.0),
            BalanceRecord::actual(d(2024, 3, 5), BalanceType::General, "salary", 1.0),
            BalanceRecord::actual(d(2024, 3, 6), BalanceType::Special, "bonus", 1.0),
        ];
        let kept = last_months(monthly_balance(&rows), 2);
        let ends: Vec<_> = kept.iter().map(|m| m.month_end).collect();
        assert_eq!(ends, vec![d(2024, 2, 29), d(2024, 3, 31), d(2024, 3, 31)]);

        assert_eq!(last_months(monthly_balance(&rows), 12).len(), 5);
        assert!(last_months(monthly_balance(&rows), 0).is_empty());
    }

    #[test]
    fn special_target_net_accumulates() {
        let planned = |date, balance_type, target| BalanceRecord::planned(date, balance_type, "plan", target);
        let rows = vec![
            planned(d(2024, 6, 10), BalanceType::Special, 500_000.0),
            planned(d(2024, 6, 25), BalanceType::General, 300_000.0),
            planned(d(2024, 8, 1), BalanceType::Special, -200_000.0),
        ];
        let months = monthly_balance(&rows);

        let special: Vec<_> = months
            .iter()
            .filter(|m| m.balance_type == BalanceType::Special)
            .map(|m| m.cumulative_target_net)
            .collect();
        assert_eq!(special, vec![Some(500_000.0), Some(300_000.0)]);
        assert!(
            months
                .iter()
                .filter(|m| m.balance_type == BalanceType::General)
                .all(|m| m.cumulative_target_net.is_none())
        );
    }
}
