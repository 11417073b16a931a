//! Plan-derived target balance and the simulator's daily cash flow.

use chrono::{Months, NaiveDate};

use crate::domain::{BalanceRecord, Calendar};
use crate::reference::{Frequency, TargetBalanceParameter};

/// Expand recurring plan parameters onto the calendar.
///
/// Rows carry `amount = 0` and `target = parameter amount`, ordered by date.
pub fn build_balance_target(params: &[TargetBalanceParameter], calendar: &Calendar) -> Vec<BalanceRecord> {
    let mut rows: Vec<BalanceRecord> = params
        .iter()
        .flat_map(|p| {
            occurrences(p, calendar)
                .into_iter()
                .map(|date| BalanceRecord::planned(date, p.balance_type, p.category.clone(), p.amount))
        })
        .collect();
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.balance_type.cmp(&b.balance_type))
            .then(a.category.cmp(&b.category))
    });
    rows
}

fn occurrences(p: &TargetBalanceParameter, calendar: &Calendar) -> Vec<NaiveDate> {
    let last = p.until.map_or(calendar.end(), |u| u.min(calendar.end()));
    let step = match p.frequency {
        Frequency::Once => {
            return if calendar.contains(p.anchor) && p.anchor <= last {
                vec![p.anchor]
            } else {
                Vec::new()
            };
        }
        Frequency::Monthly => 1,
        Frequency::Yearly => 12,
    };

    // Stepping from the anchor each time keeps the 31st on month ends
    // instead of drifting to the 28th after February.
    let mut out = Vec::new();
    for n in 0u32.. {
        let Some(date) = p.anchor.checked_add_months(Months::new(n * step)) else {
            break;
        };
        if date > last {
            break;
        }
        if date >= calendar.start() {
            out.push(date);
        }
    }
    out
}

/// Net planned cash flow per calendar day (sum of `target`).
pub fn daily_cash_flow(rows: &[BalanceRecord], calendar: &Calendar) -> Vec<f64> {
    let mut flow = vec![0.0; calendar.len()];
    for r in rows {
        if let Some(i) = calendar.index_of(r.date) {
            flow[i] += r.target;
        }
    }
    flow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BalanceType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn param(frequency: Frequency, anchor: NaiveDate, until: Option<NaiveDate>, amount: f64) -> TargetBalanceParameter {
        TargetBalanceParameter {
            balance_type: BalanceType::General,
            category: "income".into(),
            amount,
            frequency,
            anchor,
            until,
        }
    }

    #[test]
    fn monthly_clamps_to_month_end_without_drift() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 4, 30)).unwrap();
        let rows = build_balance_target(&[param(Frequency::Monthly, d(2024, 1, 31), None, 1.0)], &cal);
        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31), d(2024, 4, 30)]);
    }

    #[test]
    fn anchor_before_window_and_until_are_respected() {
        let cal = Calendar::new(d(2024, 3, 1), d(2024, 12, 31)).unwrap();
        let rows = build_balance_target(
            &[param(Frequency::Monthly, d(2023, 12, 25), Some(d(2024, 5, 24)), 1.0)],
            &cal,
        );
        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2024, 3, 25), d(2024, 4, 25)]);
    }

    #[test]
    fn yearly_and_once() {
        let cal = Calendar::new(d(2024, 1, 1), d(2026, 12, 31)).unwrap();
        let rows = build_balance_target(
            &[
                param(Frequency::Yearly, d(2024, 6, 30), None, 500_000.0),
                param(Frequency::Once, d(2025, 3, 1), None, -2_000_000.0),
                param(Frequency::Once, d(2030, 3, 1), None, -1.0),
            ],
            &cal,
        );
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.amount == 0.0));
        assert_eq!(rows[1].date, d(2025, 3, 1));
    }

    #[test]
    fn cash_flow_sums_targets_per_day() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 3)).unwrap();
        let rows = vec![
            BalanceRecord::planned(d(2024, 1, 2), BalanceType::General, "income", 300.0),
            BalanceRecord::planned(d(2024, 1, 2), BalanceType::General, "expense", -100.0),
            BalanceRecord::planned(d(2024, 1, 9), BalanceType::General, "expense", -999.0),
            BalanceRecord::actual(d(2024, 1, 3), BalanceType::General, "expense", -50.0),
        ];
        assert_eq!(daily_cash_flow(&rows, &cal), vec![0.0, 200.0, 0.0]);
    }
}
