//! Validated milestone lists: retention checkpoints and survival offsets.
//!
//! Both must be non-empty, non-negative and strictly ascending. A bad list
//! is a caller bug, so construction fails with `InvalidArgument` instead of
//! producing a misleading report.

use serde::Serialize;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::tenure::TenureUnit;

pub const DEFAULT_CHECKPOINT_MONTHS: [i64; 5] = [1, 3, 6, 9, 12];

/// Survival offsets default to every 30 days up to this value
pub const DEFAULT_MAX_OFFSET_DAYS: i64 = 360;
pub const DEFAULT_OFFSET_STEP_DAYS: i64 = 30;

fn validate_ascending(what: &str, values: &[i64]) -> AnalyticsResult<()> {
    if values.is_empty() {
        return Err(AnalyticsError::invalid(format!("{} must not be empty", what)));
    }
    if let Some(negative) = values.iter().find(|v| **v < 0) {
        return Err(AnalyticsError::invalid(format!(
            "{} must not be negative, got {}",
            what, negative
        )));
    }
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(AnalyticsError::not_ascending(what, values));
    }
    Ok(())
}

/// Elapsed-duration milestones at which retention is measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoints {
    values: Vec<i64>,
    unit: TenureUnit,
}

impl Checkpoints {
    pub fn new(values: Vec<i64>, unit: TenureUnit) -> AnalyticsResult<Self> {
        validate_ascending("checkpoints", &values)?;
        Ok(Self { values, unit })
    }

    pub fn months(values: &[i64]) -> AnalyticsResult<Self> {
        Self::new(values.to_vec(), TenureUnit::Months)
    }

    pub fn days(values: &[i64]) -> AnalyticsResult<Self> {
        Self::new(values.to_vec(), TenureUnit::Days)
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn unit(&self) -> TenureUnit {
        self.unit
    }

    pub fn contains(&self, checkpoint: i64) -> bool {
        self.values.binary_search(&checkpoint).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.values.iter().copied()
    }
}

impl Default for Checkpoints {
    fn default() -> Self {
        Self {
            values: DEFAULT_CHECKPOINT_MONTHS.to_vec(),
            unit: TenureUnit::Months,
        }
    }
}

/// Day offsets sampled by the survival curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayOffsets {
    values: Vec<i64>,
}

impl DayOffsets {
    pub fn new(values: Vec<i64>) -> AnalyticsResult<Self> {
        validate_ascending("day offsets", &values)?;
        Ok(Self { values })
    }

    /// `0, step, 2*step, ...` up to and including `max` when it falls on a step.
    pub fn every(step: i64, max: i64) -> AnalyticsResult<Self> {
        if step <= 0 {
            return Err(AnalyticsError::invalid(format!(
                "offset step must be positive, got {}",
                step
            )));
        }
        if max < 0 {
            return Err(AnalyticsError::invalid(format!(
                "maximum offset must not be negative, got {}",
                max
            )));
        }
        let values = (0..=max / step).map(|i| i * step).collect();
        Self::new(values)
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn max(&self) -> i64 {
        // non-empty by construction
        self.values.last().copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.values.iter().copied()
    }
}

impl Default for DayOffsets {
    fn default() -> Self {
        Self {
            values: (0..=DEFAULT_MAX_OFFSET_DAYS / DEFAULT_OFFSET_STEP_DAYS)
                .map(|i| i * DEFAULT_OFFSET_STEP_DAYS)
                .collect(),
        }
    }
}
