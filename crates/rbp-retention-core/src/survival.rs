//! Portfolio-wide survival curve.
//!
//! Only residents whose lease started at least `min_age_days` before the
//! analysis date are sampled, so recent move-ins that have not had time to
//! churn do not inflate the curve. The eligible set is fixed once per call,
//! which keeps the curve non-increasing.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checkpoints::DayOffsets;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::Percent;
use crate::snapshot::{SkippedRecord, Snapshot};
use crate::tenure::{Tenure, TenureUnit};

/// Residents must have started their lease at least this long ago to be sampled
pub const DEFAULT_MIN_AGE_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SurvivalPoint {
    pub day_offset: i64,
    pub eligible_count: usize,
    pub still_active_count: usize,
    /// `None` when nobody is eligible
    #[cfg_attr(feature = "ts", ts(type = "number | null"))]
    pub retention_pct: Option<Percent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SurvivalCurve {
    pub as_of: NaiveDate,
    pub min_age_days: i64,
    pub eligible_count: usize,
    pub points: Vec<SurvivalPoint>,
    pub skipped: Vec<SkippedRecord>,
}

impl SurvivalCurve {
    pub fn at(&self, day_offset: i64) -> Option<&SurvivalPoint> {
        self.points.iter().find(|p| p.day_offset == day_offset)
    }
}

/// Sample the share of eligible residents still resident after each offset.
///
/// `still_active` at offset `d` counts residents whose tenure in days is
/// strictly greater than `d`; active residents always count. Points come
/// back in the order of `offsets`.
pub fn survival_curve(
    snapshot: &Snapshot,
    offsets: &DayOffsets,
    as_of: NaiveDate,
    min_age_days: i64,
) -> AnalyticsResult<SurvivalCurve> {
    if min_age_days < 0 {
        return Err(AnalyticsError::invalid(format!(
            "min_age_days must not be negative, got {}",
            min_age_days
        )));
    }
    let cutoff = Duration::try_days(min_age_days)
        .and_then(|age| as_of.checked_sub_signed(age))
        .ok_or_else(|| {
            AnalyticsError::invalid(format!(
                "min_age_days {} reaches before the earliest representable date",
                min_age_days
            ))
        })?;

    let tenures: Vec<Tenure> = snapshot
        .residents()
        .iter()
        .filter(|r| r.lease_start_date <= cutoff)
        .map(|r| r.tenure(TenureUnit::Days))
        .collect();
    let eligible_count = tenures.len();

    let points = offsets
        .iter()
        .map(|day_offset| {
            let still_active_count = tenures.iter().filter(|t| t.exceeds(day_offset)).count();
            SurvivalPoint {
                day_offset,
                eligible_count,
                still_active_count,
                retention_pct: Percent::from_ratio(still_active_count, eligible_count),
            }
        })
        .collect::<Vec<_>>();

    debug!(
        eligible = eligible_count,
        cutoff = %cutoff,
        offsets = points.len(),
        "Sampled survival curve"
    );

    Ok(SurvivalCurve {
        as_of,
        min_age_days,
        eligible_count,
        points,
        skipped: snapshot.skipped().to_vec(),
    })
}

// ============================================================================
// Tests
// ============================================================================
