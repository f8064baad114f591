//! Time units for customer-lifetime-value horizons.
//!
//! - [`TimeUnit`] declares the unit in which recency and age were measured
//!   and how many such periods make up a month.
//!
//! Notes
//! -----
//! - `TimeUnit` is metadata only; it never rescales stored data.
use crate::btyd::errors::{BtydError, BtydResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Unit of the time columns a purchase model was fitted on.
///
/// Parsing accepts the single-letter codes `W`, `M`, `D`, `H`
/// (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Weeks; 4.345 per month.
    Weeks,
    /// Months.
    Months,
    /// Days; 30 per month.
    #[default]
    Days,
    /// Hours; 720 per month.
    Hours,
}

impl TimeUnit {
    /// Number of model time units in one month.
    pub fn periods_per_month(self) -> f64 {
        match self {
            TimeUnit::Weeks => 4.345,
            TimeUnit::Months => 1.0,
            TimeUnit::Days => 30.0,
            TimeUnit::Hours => 720.0,
        }
    }

    /// Single-letter code used by [`FromStr`] and [`fmt::Display`].
    pub fn code(self) -> &'static str {
        match self {
            TimeUnit::Weeks => "W",
            TimeUnit::Months => "M",
            TimeUnit::Days => "D",
            TimeUnit::Hours => "H",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = BtydError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "W" => Ok(TimeUnit::Weeks),
            "M" => Ok(TimeUnit::Months),
            "D" => Ok(TimeUnit::Days),
            "H" => Ok(TimeUnit::Hours),
            _ => Err(BtydError::InvalidTimeUnit { name: s.to_string() }),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parse a unit code; convenience wrapper over [`FromStr`].
pub fn parse_time_unit(code: &str) -> BtydResult<TimeUnit> {
    code.parse()
}
