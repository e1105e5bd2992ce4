use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Incorporation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Incorporation {
    Incorporated,
    Pending,
}

impl Incorporation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incorporated => "INCORPORATED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for Incorporation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Incorporation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCORPORATED" => Ok(Self::Incorporated),
            "PENDING" => Ok(Self::Pending),
            other => Err(format!("unknown incorporation state: {other}")),
        }
    }
}

/// One cell of the client × product matrix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StateRow {
    pub client_id: String,
    pub product_code: String,
    pub state: Incorporation,
}

// ---------------------------------------------------------------------------
// Year-week key
// ---------------------------------------------------------------------------

/// ISO week-based year and week number, rendered as `2025-W07`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearWeek {
    pub year: i32,
    pub week: u32,
}

impl YearWeek {
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Week of the local wall-clock date at `at`.
    pub fn at(at: DateTime<Utc>) -> Self {
        Self::from_date(at.with_timezone(&chrono::Local).date_naive())
    }
}

impl fmt::Display for YearWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for YearWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, week) = s
            .split_once("-W")
            .ok_or_else(|| format!("invalid year-week: {s}"))?;
        let year = year.parse().map_err(|_| format!("invalid year in {s}"))?;
        let week: u32 = week.parse().map_err(|_| format!("invalid week in {s}"))?;
        if !(1..=53).contains(&week) {
            return Err(format!("week out of range in {s}"));
        }
        Ok(Self { year, week })
    }
}

impl Serialize for YearWeek {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Import batches
// ---------------------------------------------------------------------------

/// Batch metadata written once per import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBatch {
    pub imported_at: DateTime<Utc>,
    pub filename: String,
    pub sheet_count: usize,
    pub product_count: usize,
    pub client_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportBatch {
    pub id: String,
    pub imported_at: DateTime<Utc>,
    pub filename: String,
    pub sheet_count: usize,
    pub product_count: usize,
    pub client_count: usize,
}

impl ImportBatch {
    pub fn from_new(id: String, batch: &NewBatch) -> Self {
        Self {
            id,
            imported_at: batch.imported_at,
            filename: batch.filename.clone(),
            sheet_count: batch.sheet_count,
            product_count: batch.product_count,
            client_count: batch.client_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Import summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub filename: String,
    pub imported_at: DateTime<Utc>,
    pub year_week: YearWeek,
    pub sheet_count: usize,
    pub vendor_sheets: usize,
    pub single_product_sheets: usize,
    pub skipped_sheets: usize,
    pub client_count: usize,
    pub product_count: usize,
    pub new_clients: usize,
    pub new_products: usize,
    pub pair_count: usize,
    pub incorporated: usize,
    pub pending: usize,
}

// ---------------------------------------------------------------------------
// Reporting rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerTally {
    pub seller: String,
    pub incorporated: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductTally {
    pub code: String,
    pub name: String,
    pub incorporated: usize,
    pub pending: usize,
}
