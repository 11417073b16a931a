//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - resolves a `BatchConfig`
//! - runs the requested job(s)
//! - prints summaries

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, CommonArgs, SummaryArgs};
use crate::domain::{BatchConfig, DataLayout};
use crate::error::{AppError, PipelineError};

pub mod pipeline;

/// Entry point for the `fb` binary.
pub fn run() -> Result<(), AppError> {
    // Environment fallbacks for every option may come from a local `.env`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = batch_config_from_args(&cli.common)?;

    match cli.command {
        Command::Target => {
            let out = pipeline::run_target_job(&config)?;
            info!("target: {} planned balance rows", out.balance.len());
        }
        Command::Asset => {
            let rows = pipeline::run_asset_job(&config)?;
            info!("asset: {} rows", rows.len());
        }
        Command::Profit => {
            let out = pipeline::run_profit_job(&config)?;
            info!("profit: {} rows, {} unbooked event(s)", out.rows.len(), out.unbooked.len());
        }
        Command::Balance => {
            let rows = pipeline::run_balance_job(&config)?;
            info!("balance: {} rows", rows.len());
        }
        Command::Update => pipeline::run_update(&config)?,
        Command::Export => {
            let out = pipeline::run_export(&config)?;
            println!("exported {} asset row(s), {} balance row(s)", out.assets, out.balance);
        }
        Command::Summary(args) => handle_summary(&config, &args)?,
    }
    Ok(())
}

fn handle_summary(config: &BatchConfig, args: &SummaryArgs) -> Result<(), AppError> {
    let dashboard = pipeline::build_dashboard(config, args.months)?;
    if args.json {
        let json = serde_json::to_string_pretty(&dashboard)
            .map_err(|e| AppError::new(2, format!("Failed to serialize summary: {e}")))?;
        println!("{json}");
    } else {
        println!("{}", crate::report::format_summary(&dashboard.summary));
        println!("{}", crate::report::format_monthly_balance(&dashboard.monthly));
    }
    Ok(())
}

pub fn batch_config_from_args(args: &CommonArgs) -> Result<BatchConfig, AppError> {
    if args.workers == 0 {
        return Err(PipelineError::InvalidParameter {
            name: "workers",
            value: "0".to_string(),
        }
        .into());
    }
    let lending_window = match (args.lending_start, args.lending_end) {
        (None, None) => None,
        (Some(start), Some(end)) => Some((start, end)),
        (Some(start), None) => Some((start, chrono::NaiveDate::MAX)),
        (None, Some(end)) => Some((args.start_date, end)),
    };
    Ok(BatchConfig {
        layout: DataLayout::new(&args.data_dir),
        start_date: args.start_date,
        workers: args.workers,
        living_cost_category: crate::text::normalize_label(&args.living_cost_category),
        tax_rate: args.tax_rate,
        point_value: args.point_value,
        lending_window,
        strict_calendar: args.strict_calendar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CommonArgs {
        Cli::try_parse_from(argv).unwrap().common
    }

    #[test]
    fn one_sided_lending_window_is_completed() {
        let config = batch_config_from_args(&parse(&["fb", "profit", "--lending-end", "2024-12-31"])).unwrap();
        let (start, end) = config.lending_window.unwrap();
        assert_eq!(start, config.start_date);
        assert_eq!(end, chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = batch_config_from_args(&parse(&["fb", "asset", "--workers", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
