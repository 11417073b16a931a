//! Recursive forward simulation of the target trajectory.
//!
//! Day 0 holds the initial asset split by the day-0 ratios and earns nothing.
//! For every later day `i`:
//!
//! ```text
//! prior      = asset[i-1] + cash_flow[i-1]
//! bucket[i]  = prior * ratio_bucket[i]
//! return[i]  = bucket[i] * annual_yield_bucket[i] / 365
//! asset[i]   = prior + return_safe[i] + return_risky[i]
//! ```
//!
//! The loop is strictly sequential. Cash flow lands before the bucket split and
//! returns accrue after it; swapping the two changes every later number.

use chrono::NaiveDate;
use log::debug;

use crate::domain::{Bucket, Calendar, TrajectoryRow};
use crate::error::PipelineError;
use crate::reference::{RateColumn, TargetRateCurve};

use super::interp::interpolate_on_calendar;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Allocation and annual yields for every calendar day.
#[derive(Debug, Clone)]
pub struct DailyRates {
    calendar: Calendar,
    risky_ratio: Vec<f64>,
    safe_yield: Vec<f64>,
    risky_yield: Vec<f64>,
}

impl DailyRates {
    pub fn new(
        calendar: Calendar,
        risky_ratio: Vec<f64>,
        safe_yield: Vec<f64>,
        risky_yield: Vec<f64>,
    ) -> Result<Self, PipelineError> {
        let n = calendar.len();
        for (name, column) in [
            ("risky_ratio", &risky_ratio),
            ("safe_yield", &safe_yield),
            ("risky_yield", &risky_yield),
        ] {
            if column.len() != n {
                return Err(PipelineError::InvalidParameter {
                    name,
                    value: format!("{} values for {n} days", column.len()),
                });
            }
        }
        Ok(Self {
            calendar,
            risky_ratio,
            safe_yield,
            risky_yield,
        })
    }

    /// Constant ratio and yields over the whole calendar.
    #[cfg(test)]
    pub(crate) fn constant(calendar: Calendar, risky_ratio: f64, safe_yield: f64, risky_yield: f64) -> Self {
        let n = calendar.len();
        Self {
            calendar,
            risky_ratio: vec![risky_ratio; n],
            safe_yield: vec![safe_yield; n],
            risky_yield: vec![risky_yield; n],
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn ratio(&self, bucket: Bucket, day: usize) -> f64 {
        match bucket {
            Bucket::Safe => 1.0 - self.risky_ratio[day],
            Bucket::Risky => self.risky_ratio[day],
        }
    }

    pub fn annual_yield(&self, bucket: Bucket, day: usize) -> f64 {
        match bucket {
            Bucket::Safe => self.safe_yield[day],
            Bucket::Risky => self.risky_yield[day],
        }
    }

    pub fn daily_rate(&self, bucket: Bucket, day: usize) -> f64 {
        self.annual_yield(bucket, day) / DAYS_PER_YEAR
    }
}

/// Interpolate every curve column onto the calendar.
pub fn build_daily_rates(curve: &TargetRateCurve, calendar: &Calendar) -> Result<DailyRates, PipelineError> {
    let column = |c: RateColumn| interpolate_on_calendar(&curve.column(c), calendar);
    DailyRates::new(
        *calendar,
        column(RateColumn::RiskyRatio),
        column(RateColumn::SafeYield),
        column(RateColumn::RiskyYield),
    )
}

/// Simulated path: per-day total asset plus the long-format bucket rows.
#[derive(Debug, Clone)]
pub struct TargetTrajectory {
    pub calendar: Calendar,
    /// `asset[i]`, after day `i`'s returns and before its cash flow.
    pub total_asset: Vec<f64>,
    /// Two rows per day, ordered safe then risky.
    pub rows: Vec<TrajectoryRow>,
}

impl TargetTrajectory {
    /// Cumulative return of both buckets on `date`.
    pub fn total_return_on(&self, date: NaiveDate) -> Option<f64> {
        let i = self.calendar.index_of(date)?;
        Some(self.rows[2 * i].total_return + self.rows[2 * i + 1].total_return)
    }

    pub fn total_asset_on(&self, date: NaiveDate) -> Option<f64> {
        self.calendar.index_of(date).map(|i| self.total_asset[i])
    }
}

pub fn simulate(rates: &DailyRates, cash_flow: &[f64], initial_asset: f64) -> Result<TargetTrajectory, PipelineError> {
    let calendar = *rates.calendar();
    let n = calendar.len();
    if cash_flow.len() != n {
        return Err(PipelineError::InvalidParameter {
            name: "cash_flow",
            value: format!("{} values for {n} days", cash_flow.len()),
        });
    }

    let mut total_asset = Vec::with_capacity(n);
    let mut rows = Vec::with_capacity(2 * n);
    let mut cumulative = [0.0_f64; 2];

    for (i, date) in calendar.days().enumerate() {
        let prior = if i == 0 {
            initial_asset
        } else {
            total_asset[i - 1] + cash_flow[i - 1]
        };

        let mut asset = prior;
        for (k, bucket) in Bucket::ORDER.into_iter().enumerate() {
            let ratio = rates.ratio(bucket, i);
            let value = prior * ratio;
            let earned = if i == 0 { 0.0 } else { value * rates.daily_rate(bucket, i) };
            asset += earned;
            cumulative[k] += earned;
            rows.push(TrajectoryRow {
                date,
                bucket,
                asset_value: value,
                allocation_ratio: ratio,
                total_return: cumulative[k],
                annual_yield: rates.annual_yield(bucket, i),
            });
        }
        total_asset.push(asset);
    }

    debug!(
        "simulated {n} days {}..={}, final asset {:.0}",
        calendar.start(),
        calendar.end(),
        total_asset.last().copied().unwrap_or(initial_asset)
    );
    Ok(TargetTrajectory {
        calendar,
        total_asset,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::{prop_assert, proptest};
    use proptest::collection::vec;

    use super::*;
    use crate::reference::RatePoint;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn five_days() -> Calendar {
        Calendar::new(d(2024, 1, 1), d(2024, 1, 5)).unwrap()
    }

    #[test]
    fn zero_activity_keeps_initial_asset() {
        let rates = DailyRates::constant(five_days(), 0.4, 0.0, 0.0);
        let out = simulate(&rates, &[0.0; 5], 1_000_000.0).unwrap();
        assert_eq!(out.total_asset, vec![1_000_000.0; 5]);
        assert_eq!(out.rows.len(), 10);
        assert_eq!(out.rows[0].bucket, Bucket::Safe);
        assert_eq!(out.rows[1].bucket, Bucket::Risky);
        assert!(out.rows.iter().all(|r| r.total_return == 0.0));
    }

    #[test]
    fn cash_flow_lands_the_day_after() {
        let rates = DailyRates::constant(five_days(), 0.4, 0.0, 0.0);
        let baseline = simulate(&rates, &[0.0; 5], 1_000_000.0).unwrap();
        let flow = [0.0, 0.0, 100_000.0, 0.0, 0.0];
        let out = simulate(&rates, &flow, 1_000_000.0).unwrap();

        for i in 0..=2 {
            assert_eq!(out.total_asset[i], baseline.total_asset[i]);
        }
        for i in 3..5 {
            assert_eq!(out.total_asset[i] - baseline.total_asset[i], 100_000.0);
        }
    }

    #[test]
    fn returns_use_prior_total_and_simple_daily_rate() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 2)).unwrap();
        let rates = DailyRates::constant(cal, 0.5, 0.0365, 0.073);
        let out = simulate(&rates, &[10_000.0, 0.0], 1_000_000.0).unwrap();

        // prior = 1,010,000; safe 505,000 * 0.0001, risky 505,000 * 0.0002
        let safe = 505_000.0 * (0.0365 / 365.0);
        let risky = 505_000.0 * (0.073 / 365.0);
        assert!((out.total_asset[1] - (1_010_000.0 + safe + risky)).abs() < 1e-9);
        assert!((out.rows[2].asset_value - 505_000.0).abs() < 1e-9);
        assert!((out.rows[3].total_return - risky).abs() < 1e-9);
        assert_eq!(out.rows[3].annual_yield, 0.073);
    }

    #[test]
    fn curve_key_points_are_hit_exactly_and_ratios_close() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        let curve = TargetRateCurve::new(vec![
            RatePoint { date: d(2024, 1, 1), risky_ratio: Some(0.3), safe_yield: Some(0.001), risky_yield: Some(0.05) },
            RatePoint { date: d(2024, 2, 10), risky_ratio: Some(0.45), safe_yield: None, risky_yield: Some(0.04) },
            RatePoint { date: d(2024, 3, 31), risky_ratio: Some(0.7), safe_yield: Some(0.002), risky_yield: Some(0.06) },
        ])
        .unwrap();
        let rates = build_daily_rates(&curve, &cal).unwrap();
        let feb10 = cal.index_of(d(2024, 2, 10)).unwrap();

        assert_eq!(rates.ratio(Bucket::Risky, 0), 0.3);
        assert_eq!(rates.ratio(Bucket::Risky, feb10), 0.45);
        assert_eq!(rates.annual_yield(Bucket::Risky, feb10), 0.04);
        assert_eq!(rates.annual_yield(Bucket::Safe, cal.len() - 1), 0.002);

        let out = simulate(&rates, &vec![0.0; cal.len()], 1_000_000.0).unwrap();
        for day in out.rows.chunks(2) {
            assert!((day[0].allocation_ratio + day[1].allocation_ratio - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn horizon_past_the_last_key_point_holds_its_values() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 10)).unwrap();
        let curve = TargetRateCurve::new(vec![
            RatePoint { date: d(2024, 1, 4), risky_ratio: Some(0.2), safe_yield: Some(0.01), risky_yield: Some(0.03) },
            RatePoint { date: d(2024, 1, 6), risky_ratio: Some(0.6), safe_yield: Some(0.02), risky_yield: Some(0.05) },
        ])
        .unwrap();
        let rates = build_daily_rates(&curve, &cal).unwrap();
        for day in 0..=3 {
            assert_eq!(rates.ratio(Bucket::Risky, day), 0.2);
        }
        for day in 5..10 {
            assert_eq!(rates.ratio(Bucket::Risky, day), 0.6);
            assert_eq!(rates.annual_yield(Bucket::Safe, day), 0.02);
        }
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let rates = DailyRates::constant(five_days(), 0.4, 0.0, 0.0);
        let err = simulate(&rates, &[0.0; 4], 1.0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { name: "cash_flow", .. }));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_cumulative_return_never_falls_without_withdrawals(
            ratio_bp in 0u32..=10_000,
            safe_bp in 0u32..500,
            risky_bp in 0u32..2_000,
            initial in 0u32..50_000_000,
            inflows in vec(0u32..1_000_000, 1..90)
        ) {
            let n = inflows.len() as u64;
            let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 1) + chrono::Days::new(n - 1)).unwrap();
            let rates = DailyRates::constant(
                cal,
                ratio_bp as f64 / 10_000.0,
                safe_bp as f64 / 10_000.0,
                risky_bp as f64 / 10_000.0,
            );
            let flow: Vec<f64> = inflows.iter().map(|v| *v as f64).collect();
            let out = simulate(&rates, &flow, initial as f64).unwrap();

            let mut prev = 0.0;
            for day in out.rows.chunks(2) {
                let total = day[0].total_return + day[1].total_return;
                prop_assert!(total >= prev);
                prev = total;
            }
            for pair in out.total_asset.windows(2) {
                prop_assert!(pair[1] >= pair[0]);
            }
        }
    }
}
