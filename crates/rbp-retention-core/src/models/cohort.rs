use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tenure::{tenure, Tenure, TenureUnit};

/// The calendar month a lease started in (the date truncated to the first of the month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CohortMonth {
    year: i32,
    month: u32,
}

impl CohortMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self::of)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // year/month always come from a valid date
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Whole units elapsed between the first day of this month and `as_of`.
    ///
    /// Negative when the month starts after `as_of`.
    pub fn runway(&self, as_of: NaiveDate, unit: TenureUnit) -> i64 {
        match tenure(self.first_day(), Some(as_of), unit) {
            Tenure::Churned(elapsed) => elapsed,
            Tenure::Active => i64::MAX,
        }
    }

    /// Parse `YYYY-MM` (a full `YYYY-MM-DD` date is also accepted).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return Some(Self::of(date));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Self::of)
    }
}

impl std::fmt::Display for CohortMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for CohortMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CohortMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CohortMonth::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid cohort month: {}", s)))
    }
}
