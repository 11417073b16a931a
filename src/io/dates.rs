//! Date parsing shared by every loader, plus a serde adapter for `NaiveDate` fields.
//!
//! Output is always ISO (`YYYY-MM-DD`). Input accepts the handful of formats
//! that ledger apps and spreadsheet exports actually produce.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serializer};

const FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%Y.%m.%d"];

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    // Timestamps exported with a midnight time part are still day-granular.
    let s = s.split([' ', 'T']).next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, YYYYMMDD, YYYY.MM.DD."
    ))
}

pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format("%Y-%m-%d"))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_date(&s).map_err(serde::de::Error::custom)
}

/// Blank cells deserialize to `None`.
pub fn deserialize_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let s = Option::<String>::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some).map_err(serde::de::Error::custom),
    }
}
