//! Downstream hand-off.
//!
//! The consuming service owns its own copy of the asset and balance tables.
//! Two seams describe what the batch needs from it: the latest date it has
//! already committed, and an append that acknowledges success or failure.

use std::marker::PhantomData;
use std::path::PathBuf;

use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::Dated;
use crate::error::PipelineError;
use crate::io::export::write_table;
use crate::io::ingest::read_csv_or_empty;

/// Latest date already committed downstream. `None` means nothing yet.
pub trait CommittedDateOracle {
    fn latest_committed(&self) -> Result<Option<NaiveDate>, PipelineError>;
}

/// Accepts new rows; returns how many were stored.
pub trait AppendSink<T> {
    fn append(&mut self, rows: &[T]) -> Result<usize, PipelineError>;
}

/// A downstream table kept as a CSV file. Serves as both oracle and sink.
#[derive(Debug, Clone)]
pub struct CsvDownstream<T> {
    path: PathBuf,
    _rows: PhantomData<T>,
}

impl<T> CsvDownstream<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _rows: PhantomData,
        }
    }
}

impl<T: Dated + DeserializeOwned> CommittedDateOracle for CsvDownstream<T> {
    fn latest_committed(&self) -> Result<Option<NaiveDate>, PipelineError> {
        let rows: Vec<T> = read_csv_or_empty(&self.path)?;
        Ok(rows.iter().map(Dated::date).max())
    }
}

impl<T: Serialize + DeserializeOwned + Clone> AppendSink<T> for CsvDownstream<T> {
    fn append(&mut self, rows: &[T]) -> Result<usize, PipelineError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut table: Vec<T> = read_csv_or_empty(&self.path)?;
        table.extend_from_slice(rows);
        write_table(&self.path, &table)?;
        Ok(rows.len())
    }
}

/// Append the rows of `rows` dated strictly after the committed date.
pub fn append_newer<T, O, S>(table: &'static str, rows: &[T], oracle: &O, sink: &mut S) -> Result<usize, PipelineError>
where
    T: Dated + Clone,
    O: CommittedDateOracle + ?Sized,
    S: AppendSink<T> + ?Sized,
{
    let committed = oracle.latest_committed()?;
    let newer: Vec<T> = rows
        .iter()
        .filter(|r| committed.is_none_or(|c| r.date() > c))
        .cloned()
        .collect();
    let appended = sink.append(&newer)?;
    match committed {
        Some(c) => info!("{table}: appended {appended} row(s) after {c}"),
        None => info!("{table}: appended {appended} row(s) to an empty downstream table"),
    }
    Ok(appended)
}
