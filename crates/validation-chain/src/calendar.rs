//! Academic calendar: two fixed half-year terms per year with July as a gap.
//!
//! Term A runs January 1 to June 30, term B August 1 to December 31. A course
//! may only be authored for a term that has not started yet.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use coursegate_core_types::PeriodIssue;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    A,
    B,
}

impl Term {
    pub fn label(&self) -> &'static str {
        match self {
            Term::A => "January-June",
            Term::B => "August-December",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Term::A => "A",
            Term::B => "B",
        }
    }

    fn first_month(&self) -> u32 {
        match self {
            Term::A => 1,
            Term::B => 8,
        }
    }

    fn last_month(&self) -> u32 {
        match self {
            Term::A => 6,
            Term::B => 12,
        }
    }

    fn from_label(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match compact.as_str() {
            "january-june" | "enero-junio" => Some(Term::A),
            "august-december" | "agosto-diciembre" => Some(Term::B),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodParseError {
    #[error("unrecognized term label '{0}' (expected January-June or August-December)")]
    UnknownLabel(String),
    #[error("period is missing its year")]
    MissingYear,
    #[error("invalid year '{0}' (expected four digits)")]
    InvalidYear(String),
}

/// A term of a given year. Ordering is chronological.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AcademicPeriod {
    pub year: i32,
    pub term: Term,
}

impl AcademicPeriod {
    pub fn new(year: i32, term: Term) -> Self {
        Self { year, term }
    }

    /// Parse `"<label> <year>"`, e.g. `"January-June 2026"`.
    pub fn parse(raw: &str) -> Result<Self, PeriodParseError> {
        let trimmed = raw.trim();
        let (label, year) = match trimmed.rsplit_once(char::is_whitespace) {
            Some((label, year)) if year.chars().all(|c| c.is_ascii_digit()) => {
                (label, Some(year))
            }
            Some((_, year)) if year.chars().any(|c| c.is_ascii_digit()) => {
                return Err(PeriodParseError::InvalidYear(year.to_string()))
            }
            _ => (trimmed, None),
        };

        let term =
            Term::from_label(label).ok_or_else(|| PeriodParseError::UnknownLabel(label.to_string()))?;
        let year = year.ok_or(PeriodParseError::MissingYear)?;
        if year.len() != 4 {
            return Err(PeriodParseError::InvalidYear(year.to_string()));
        }
        let year = year
            .parse::<i32>()
            .map_err(|_| PeriodParseError::InvalidYear(year.to_string()))?;
        Ok(Self { year, term })
    }

    pub fn label(&self) -> String {
        self.to_string()
    }

    pub fn next(&self) -> Self {
        match self.term {
            Term::A => Self::new(self.year, Term::B),
            Term::B => Self::new(self.year + 1, Term::A),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year
            && (self.term.first_month()..=self.term.last_month()).contains(&date.month())
    }

    pub fn has_ended(&self, date: NaiveDate) -> bool {
        date.year() > self.year
            || (date.year() == self.year && date.month() > self.term.last_month())
    }
}

impl fmt::Display for AcademicPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.term.label(), self.year)
    }
}

/// Terms that have not started yet as of `today`, earliest first.
pub fn open_periods(today: NaiveDate) -> Vec<AcademicPeriod> {
    let year = today.year();
    if today.month() <= 7 {
        vec![
            AcademicPeriod::new(year, Term::B),
            AcademicPeriod::new(year + 1, Term::A),
            AcademicPeriod::new(year + 1, Term::B),
        ]
    } else {
        vec![
            AcademicPeriod::new(year + 1, Term::A),
            AcademicPeriod::new(year + 1, Term::B),
        ]
    }
}

/// Decide whether `requested` may be authored as of `today`.
pub fn assess(requested: AcademicPeriod, today: NaiveDate) -> Result<(), PeriodIssue> {
    let open = open_periods(today);
    if open.contains(&requested) {
        return Ok(());
    }
    if requested.contains(today) {
        return Err(PeriodIssue::InProgress);
    }
    match open.first() {
        Some(earliest) if requested < *earliest => Err(PeriodIssue::AlreadyPassed),
        _ => Err(PeriodIssue::NotYetOpen),
    }
}

/// Source of "today" for calendar checks.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
