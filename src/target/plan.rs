//! Typed plan parameters.

use chrono::NaiveDate;

use crate::domain::Calendar;
use crate::error::PipelineError;
use crate::io::dates::parse_date;
use crate::reference::KeyValueMaster;

/// Horizon and starting capital of the target plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPlan {
    calendar: Calendar,
    initial_asset: f64,
}

impl TargetPlan {
    pub fn new(start: NaiveDate, end: NaiveDate, initial_asset: f64) -> Result<Self, PipelineError> {
        if !initial_asset.is_finite() {
            return Err(PipelineError::InvalidParameter {
                name: "initial_asset",
                value: initial_asset.to_string(),
            });
        }
        Ok(Self {
            calendar: Calendar::new(start, end)?,
            initial_asset,
        })
    }

    /// Build from the `target_initial_value` master (`start_date`, `end_date`, `initial_asset`).
    pub fn from_master(master: &KeyValueMaster) -> Result<Self, PipelineError> {
        let start = date_param(master, "start_date")?;
        let end = date_param(master, "end_date")?;
        let raw = required(master, "initial_asset")?;
        let initial_asset = raw
            .replace(',', "")
            .parse::<f64>()
            .map_err(|_| PipelineError::InvalidParameter {
                name: "initial_asset",
                value: raw.to_string(),
            })?;
        Self::new(start, end, initial_asset)
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn initial_asset(&self) -> f64 {
        self.initial_asset
    }
}

fn required<'a>(master: &'a KeyValueMaster, name: &'static str) -> Result<&'a str, PipelineError> {
    master.get(name).ok_or(PipelineError::InvalidParameter {
        name,
        value: String::new(),
    })
}

fn date_param(master: &KeyValueMaster, name: &'static str) -> Result<NaiveDate, PipelineError> {
    let raw = required(master, name)?;
    parse_date(raw).map_err(|_| PipelineError::InvalidParameter {
        name,
        value: raw.to_string(),
    })
}
