//! Tenure: how long a resident stayed before moving out.
//!
//! Elapsed time is truncated to whole units. A resident without a move-out
//! date is [`Tenure::Active`], which orders above every finite elapsed value,
//! so threshold checks count active residents as retained.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum TenureUnit {
    Months,
    Days,
}

impl std::fmt::Display for TenureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenureUnit::Months => write!(f, "months"),
            TenureUnit::Days => write!(f, "days"),
        }
    }
}

/// Variant order matters: the derived `Ord` puts `Active` above any `Churned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "elapsed", rename_all = "lowercase")]
pub enum Tenure {
    Churned(i64),
    Active,
}

impl Tenure {
    /// Still present at `threshold` units (`elapsed >= threshold`, or active).
    pub fn reaches(&self, threshold: i64) -> bool {
        match self {
            Tenure::Active => true,
            Tenure::Churned(elapsed) => *elapsed >= threshold,
        }
    }

    /// Stayed strictly longer than `threshold` units (`elapsed > threshold`, or active).
    pub fn exceeds(&self, threshold: i64) -> bool {
        match self {
            Tenure::Active => true,
            Tenure::Churned(elapsed) => *elapsed > threshold,
        }
    }
}

/// Elapsed time from `lease_start` to `move_out`, or `Active` if there is no move-out.
///
/// Does not check that `move_out >= lease_start`; an inverted pair yields a
/// negative elapsed value rather than an error.
pub fn tenure(lease_start: NaiveDate, move_out: Option<NaiveDate>, unit: TenureUnit) -> Tenure {
    match move_out {
        None => Tenure::Active,
        Some(end) => Tenure::Churned(match unit {
            TenureUnit::Days => (end - lease_start).num_days(),
            TenureUnit::Months => whole_months(lease_start, end),
        }),
    }
}

/// Whole calendar months between two dates, truncated toward zero.
///
/// The final month only counts once its day-of-month is reached: Jan 15 to
/// Feb 14 is 0 months, Jan 15 to Feb 15 is 1.
pub fn whole_months(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut months = i64::from(end.year() - start.year()) * 12 + i64::from(end.month())
        - i64::from(start.month());

    if months > 0 && end.day() < start.day() {
        months -= 1;
    } else if months < 0 && end.day() > start.day() {
        months += 1;
    }
    months
}

// ============================================================================
// Tests
// ============================================================================
