//! The four batch jobs plus export, shared by the CLI and the integration tests.
//!
//! Every job follows the same shape:
//! load masters -> load inputs -> registration/staleness checks -> stages ->
//! finalize -> write. Output is written only after every stage succeeded, so a
//! failing job leaves the previous files as they were.

use std::cell::RefCell;

use log::{info, warn};

use crate::balance::{
    build_balance_target, collect_balance, collect_living_adjust, collect_points, collect_year_end_tax,
    filter_and_clean_raw,
};
use crate::domain::{AssetRecord, BalanceRecord, BatchConfig, Calendar, TrajectoryRow};
use crate::error::{AppError, PipelineError};
use crate::finalize::{
    GapPolicy, ensure_not_stale, ensure_registered_assets, ensure_registered_ledger, finalize_assets, finalize_balance,
    reindex, sort_assets,
};
use crate::io::{
    CsvDownstream, append_newer, extract_statements, latest_raw_date, list_statements, load_asset_table, load_ledger,
    load_reference, max_date, read_csv, read_csv_or_empty, write_table,
};
use crate::profit::{
    UnbookedEvent, set_realized_deposit, set_realized_dividend_and_capital, set_realized_interest, set_realized_mrf,
    set_realized_social_lending, set_total_returns, set_unrealized_profit,
};
use crate::reference::MasterName;
use crate::report::{MonthlyBalance, Summary, last_months, monthly_balance, summarize};
use crate::stage::StageRunner;
use crate::target::{TargetPlan, build_target_asset};

const TARGET_MASTERS: &[MasterName] = &[
    MasterName::TargetRate,
    MasterName::TargetBalanceParameter,
    MasterName::TargetInitialValue,
];
const ASSET_MASTERS: &[MasterName] = &[MasterName::AssetTaxonomy];
const PROFIT_MASTERS: &[MasterName] = &[MasterName::BalanceTaxonomy, MasterName::OffsetUnrealized];
const BALANCE_MASTERS: &[MasterName] = &[MasterName::BalanceTaxonomy, MasterName::BalanceTarget];

#[derive(Debug, Clone)]
pub struct TargetOutput {
    pub balance: Vec<BalanceRecord>,
    pub trajectory: Vec<TrajectoryRow>,
}

/// Expand the plan and simulate the target path.
pub fn run_target_job(config: &BatchConfig) -> Result<TargetOutput, AppError> {
    let layout = &config.layout;
    let refs = load_reference(layout, TARGET_MASTERS)?;

    let plan = TargetPlan::from_master(refs.target_initial_value()?)?;
    let balance = build_balance_target(refs.target_balance_parameter()?, plan.calendar());
    let trajectory = build_target_asset(&plan, refs.target_rate()?, &balance)?;

    write_table(&layout.target_balance(), &balance)?;
    write_table(&layout.target_asset(), &trajectory.rows)?;
    info!(
        "target job done: {} balance rows, {} trajectory rows",
        balance.len(),
        trajectory.rows.len()
    );
    Ok(TargetOutput {
        balance,
        trajectory: trajectory.rows,
    })
}

/// Extract statements newer than the aggregate and merge them in.
pub fn run_asset_job(config: &BatchConfig) -> Result<Vec<AssetRecord>, AppError> {
    let layout = &config.layout;
    let refs = load_reference(layout, ASSET_MASTERS)?;
    let taxonomy = refs.asset_taxonomy()?;

    let previous = load_asset_table(&layout.asset_detail())?;
    let statements = list_statements(&layout.statements_dir())?;
    let latest_raw = latest_raw_date(&statements).ok_or_else(|| {
        PipelineError::data_load(format!(
            "no dated statements in '{}'",
            layout.statements_dir().display()
        ))
    })?;
    let aggregated = max_date(&previous, |r| r.date);
    ensure_not_stale(aggregated, latest_raw)?;

    let pending: Vec<_> = statements
        .into_iter()
        .filter(|s| aggregated.is_none_or(|a| s.date > a))
        .collect();
    info!(
        "asset job: {} pending statement(s) after {}",
        pending.len(),
        aggregated.map_or_else(|| "the beginning".to_string(), |d| d.to_string())
    );

    let raw = extract_statements(&pending, config.workers)?;
    ensure_registered_assets(&raw, taxonomy)?;
    let new_rows: Vec<AssetRecord> = raw
        .into_iter()
        .filter_map(|r| {
            taxonomy
                .category_of(&r.asset_type)
                .map(|category| AssetRecord::new(r.date, r.asset_type, category, r.value))
        })
        .collect();

    let merged = finalize_assets(new_rows, previous);
    let span = merged.first().zip(merged.last()).map(|(f, l)| (f.date, l.date));
    let rows = match span {
        Some((first, last)) => {
            let calendar = Calendar::new(first, last)?;
            let policy = if config.strict_calendar {
                GapPolicy::Reject
            } else {
                GapPolicy::Report
            };
            reindex("asset", &calendar, merged, |r| r.date, policy)?.rows
        }
        None => merged,
    };

    write_table(&layout.asset_detail(), &rows)?;
    Ok(rows)
}

/// Window from the configured start to the latest aggregated asset date.
fn batch_window(config: &BatchConfig, assets: &[AssetRecord], source: &str) -> Result<Calendar, PipelineError> {
    let end = max_date(assets, |r| r.date)
        .ok_or_else(|| PipelineError::data_load(format!("{source} has no valid dates")))?;
    Calendar::new(config.start_date, end)
}

#[derive(Debug, Clone)]
pub struct ProfitOutput {
    pub rows: Vec<AssetRecord>,
    /// Ledger events no stage could book.
    pub unbooked: Vec<UnbookedEvent>,
}

/// Fill profit columns on the aggregated asset table.
pub fn run_profit_job(config: &BatchConfig) -> Result<ProfitOutput, AppError> {
    let layout = &config.layout;
    let refs = load_reference(layout, PROFIT_MASTERS)?;

    let mut assets: Vec<AssetRecord> = read_csv(&layout.asset_detail())?;
    let calendar = batch_window(config, &assets, "asset detail")?;
    let ledger = filter_and_clean_raw(&calendar, load_ledger(&layout.ledger_dir(), &calendar)?);
    ensure_registered_ledger(&ledger, refs.balance_taxonomy()?)?;

    let lending = match config.lending_window {
        Some((start, end)) => Calendar::new(start, end)?,
        None => calendar,
    };
    for a in &mut assets {
        a.clear_profit();
    }

    let ledger = &ledger;
    let unbooked = RefCell::new(Vec::<UnbookedEvent>::new());
    let log = &unbooked;
    let mut rows = StageRunner::<Vec<AssetRecord>>::new("profit")
        .stage("set_unrealized_profit", &[MasterName::OffsetUnrealized], |t, refs| {
            set_unrealized_profit(t, refs.offset_unrealized()?)
        })
        .stage("set_realized_deposit", &[], move |t, _| {
            set_realized_deposit(t, ledger, &mut log.borrow_mut())
        })
        .stage("set_realized_mrf", &[MasterName::OffsetUnrealized], |t, refs| {
            set_realized_mrf(t, refs.offset_unrealized()?)
        })
        .stage("set_realized_interest", &[], move |t, _| {
            set_realized_interest(t, ledger, &mut log.borrow_mut())
        })
        .stage("set_realized_dividend_and_capital", &[], move |t, _| {
            set_realized_dividend_and_capital(t, ledger, &mut log.borrow_mut())
        })
        .stage("set_realized_social_lending", &[], move |t, _| {
            set_realized_social_lending(t, ledger, &lending, &mut log.borrow_mut())
        })
        .stage("set_total_returns", &[], |t, _| set_total_returns(t))
        .run(&refs, assets)?;

    sort_assets(&mut rows);
    write_table(&layout.asset_profit(), &rows)?;
    let unbooked = unbooked.into_inner();
    if !unbooked.is_empty() {
        let amount: f64 = unbooked.iter().map(|e| e.amount).sum();
        warn!("profit job: {} ledger event(s) totalling {amount:.0} not booked", unbooked.len());
    }
    info!("profit job done: {} rows through {}", rows.len(), calendar.end());
    Ok(ProfitOutput { rows, unbooked })
}

/// Build, finalize and write the balance table.
pub fn run_balance_job(config: &BatchConfig) -> Result<Vec<BalanceRecord>, AppError> {
    let layout = &config.layout;
    let refs = load_reference(layout, BALANCE_MASTERS)?;

    let assets: Vec<AssetRecord> = read_csv(&layout.asset_profit())?;
    let calendar = batch_window(config, &assets, "asset profit")?;
    let ledger = filter_and_clean_raw(&calendar, load_ledger(&layout.ledger_dir(), &calendar)?);
    ensure_registered_ledger(&ledger, refs.balance_taxonomy()?)?;

    let ledger = &ledger;
    let assets = &assets;
    let living_cost = config.living_cost_category.as_str();
    let (tax_rate, point_value) = (config.tax_rate, config.point_value);
    let table = StageRunner::<Vec<BalanceRecord>>::new("balance")
        .stage("collect_balance", &[MasterName::BalanceTaxonomy], move |t, refs| {
            collect_balance(t, ledger, refs.balance_taxonomy()?)
        })
        .stage("collect_living_adjust", &[], move |t, _| collect_living_adjust(t, living_cost))
        .stage("collect_year_end_tax", &[], move |t, _| {
            collect_year_end_tax(t, &calendar, tax_rate)
        })
        .stage("collect_points", &[], move |t, _| {
            collect_points(t, assets, &calendar, point_value)
        })
        .run(&refs, Vec::new())?;

    let out = finalize_balance(&calendar, table, refs.balance_target()?)?;
    write_table(&layout.balance_detail(), &out.rows)?;
    Ok(out.rows)
}

/// Run every job in dependency order. The first failure stops the rest.
pub fn run_update(config: &BatchConfig) -> Result<(), AppError> {
    run_target_job(config)?;
    run_asset_job(config)?;
    run_profit_job(config)?;
    run_balance_job(config)?;
    info!("update finished");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOutcome {
    pub assets: usize,
    pub balance: usize,
}

/// Append rows newer than each downstream table's committed date.
pub fn run_export(config: &BatchConfig) -> Result<ExportOutcome, AppError> {
    let layout = &config.layout;
    let assets: Vec<AssetRecord> = read_csv(&layout.asset_profit())?;
    let balance: Vec<BalanceRecord> = read_csv(&layout.balance_detail())?;

    let mut asset_sink = CsvDownstream::<AssetRecord>::new(layout.downstream_asset());
    let oracle = asset_sink.clone();
    let assets = append_newer("asset", &assets, &oracle, &mut asset_sink)?;

    let mut balance_sink = CsvDownstream::<BalanceRecord>::new(layout.downstream_balance());
    let oracle = balance_sink.clone();
    let balance = append_newer("balance", &balance, &oracle, &mut balance_sink)?;

    Ok(ExportOutcome { assets, balance })
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Dashboard {
    pub summary: Summary,
    pub monthly: Vec<MonthlyBalance>,
}

/// Summary of the written outputs; missing outputs count as empty.
pub fn build_dashboard(config: &BatchConfig, months: usize) -> Result<Dashboard, AppError> {
    let layout = &config.layout;
    let assets: Vec<AssetRecord> = read_csv_or_empty(&layout.asset_profit())?;
    let trajectory: Vec<TrajectoryRow> = read_csv_or_empty(&layout.target_asset())?;
    let balance: Vec<BalanceRecord> = read_csv_or_empty(&layout.balance_detail())?;

    let monthly = last_months(monthly_balance(&balance), months);
    Ok(Dashboard {
        summary: summarize(&assets, &trajectory),
        monthly,
    })
}
