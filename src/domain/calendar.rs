//! Gapless daily calendar.

use chrono::{Datelike, NaiveDate};

use crate::error::PipelineError;

/// Every day from `start` to `end`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    start: NaiveDate,
    end: NaiveDate,
}

impl Calendar {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PipelineError> {
        if end < start {
            return Err(PipelineError::InvalidParameter {
                name: "end_date",
                value: format!("{end} is before start {start}"),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Integer day offset from the first day. Negative before `start`.
    pub fn offset(&self, date: NaiveDate) -> i64 {
        (date - self.start).num_days()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.contains(date).then(|| self.offset(date) as usize)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.start.iter_days().take(self.len())
    }

    /// Calendar years whose December 31st lies inside the calendar.
    pub fn year_ends(&self) -> Vec<NaiveDate> {
        (self.start.year()..=self.end.year())
            .filter_map(|y| NaiveDate::from_ymd_opt(y, 12, 31))
            .filter(|d| self.contains(*d))
            .collect()
    }
}
