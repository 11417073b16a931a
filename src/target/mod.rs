//! Target Simulator.
//!
//! Turns the sparse rate curve and the plan's cash flows into the daily target
//! trajectory that actual results are compared against:
//!
//! - `interp`: day-offset linear interpolation with edge hold
//! - `plan`: validated plan horizon and initial asset
//! - `simulate`: the sequential day-by-day recursion

pub mod interp;
pub mod plan;
pub mod simulate;

pub use interp::{interp, interpolate_on_calendar};
pub use plan::TargetPlan;
pub use simulate::{DAYS_PER_YEAR, DailyRates, TargetTrajectory, build_daily_rates, simulate};

use log::info;

use crate::balance::daily_cash_flow;
use crate::domain::BalanceRecord;
use crate::error::PipelineError;
use crate::reference::TargetRateCurve;

/// Simulate the plan against its own target balance rows.
pub fn build_target_asset(
    plan: &TargetPlan,
    curve: &TargetRateCurve,
    balance_target: &[BalanceRecord],
) -> Result<TargetTrajectory, PipelineError> {
    let calendar = plan.calendar();
    let rates = build_daily_rates(curve, calendar)?;
    let flow = daily_cash_flow(balance_target, calendar);
    let trajectory = simulate(&rates, &flow, plan.initial_asset())?;
    info!(
        "target trajectory {}..={}: {} rows, net planned cash flow {:.0}",
        calendar.start(),
        calendar.end(),
        trajectory.rows.len(),
        flow.iter().sum::<f64>()
    );
    Ok(trajectory)
}
