//! Retention by alternate grouping dimensions.
//!
//! Every view here feeds `(key, resident)` pairs into
//! [`retention_by`](crate::cohorts::retention_by), the same primitive used
//! for monthly cohorts, and applies the same rule that residents whose lease
//! started in or after the `as_of` month are not scored.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checkpoints::Checkpoints;
use crate::cohorts::{retention_by, CheckpointRetention, GroupRetention};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{BenefitEnrollment, PropertyDirectory, Resident};
use crate::snapshot::{SkippedRecord, Snapshot};
use crate::tenure::TenureUnit;

/// First enrollment within this many days of lease start counts as early
pub const DEFAULT_EARLY_ACTIVATION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum Dimension {
    City,
    LeaseYear,
    Activation,
    BenefitDepth,
    BenefitType,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::City => write!(f, "city"),
            Dimension::LeaseYear => write!(f, "lease_year"),
            Dimension::Activation => write!(f, "activation"),
            Dimension::BenefitDepth => write!(f, "benefit_depth"),
            Dimension::BenefitType => write!(f, "benefit_type"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationSegment {
    Early,
    Late,
    Never,
}

impl std::fmt::Display for ActivationSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivationSegment::Early => write!(f, "Early"),
            ActivationSegment::Late => write!(f, "Late"),
            ActivationSegment::Never => write!(f, "Never"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthTier {
    pub label: String,
    pub min_benefits: usize,
}

impl DepthTier {
    pub fn new(label: &str, min_benefits: usize) -> Self {
        Self {
            label: label.to_string(),
            min_benefits,
        }
    }
}

/// Benefit-depth tiers, ascending by `min_benefits`.
///
/// A resident falls in the highest tier whose minimum they meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthTiers {
    tiers: Vec<DepthTier>,
}

impl DepthTiers {
    pub fn new(tiers: Vec<DepthTier>) -> AnalyticsResult<Self> {
        if tiers.is_empty() {
            return Err(AnalyticsError::invalid("depth tiers must not be empty"));
        }
        if tiers.windows(2).any(|w| w[0].min_benefits >= w[1].min_benefits) {
            let mins: Vec<i64> = tiers.iter().map(|t| t.min_benefits as i64).collect();
            return Err(AnalyticsError::not_ascending("depth tier minimums", &mins));
        }
        let mut labels = HashSet::new();
        if let Some(dup) = tiers.iter().find(|t| !labels.insert(t.label.as_str())) {
            return Err(AnalyticsError::invalid(format!(
                "depth tier label `{}` is used more than once",
                dup.label
            )));
        }
        Ok(Self { tiers })
    }

    /// Index and tier for a resident holding `benefit_count` distinct benefits
    pub fn tier_for(&self, benefit_count: usize) -> Option<(usize, &DepthTier)> {
        self.tiers
            .iter()
            .enumerate()
            .rev()
            .find(|(_, tier)| benefit_count >= tier.min_benefits)
    }

    pub fn tiers(&self) -> &[DepthTier] {
        &self.tiers
    }
}

impl Default for DepthTiers {
    fn default() -> Self {
        Self {
            tiers: vec![
                DepthTier::new("No benefits", 0),
                DepthTier::new("1-2 benefits", 1),
                DepthTier::new("3+ benefits", 3),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SegmentRow {
    pub segment: String,
    pub group_size: usize,
    pub retention_at: Vec<CheckpointRetention>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SegmentReport {
    pub dimension: Dimension,
    pub as_of: NaiveDate,
    pub unit: TenureUnit,
    pub checkpoints: Vec<i64>,
    pub segments: Vec<SegmentRow>,
    /// Scored residents that could not be placed in any segment
    pub unmatched: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
}

impl SegmentReport {
    pub fn segment(&self, name: &str) -> Option<&SegmentRow> {
        self.segments.iter().find(|s| s.segment == name)
    }
}

fn build_report<K, F>(
    dimension: Dimension,
    snapshot: &Snapshot,
    checkpoints: &Checkpoints,
    as_of: NaiveDate,
    groups: Vec<GroupRetention<K>>,
    label: F,
    unmatched: Vec<String>,
) -> SegmentReport
where
    F: Fn(&K) -> String,
{
    let segments: Vec<SegmentRow> = groups
        .into_iter()
        .map(|group| SegmentRow {
            segment: label(&group.key),
            group_size: group.group_size,
            retention_at: group.retention,
        })
        .collect();

    if !unmatched.is_empty() {
        warn!(
            dimension = %dimension,
            count = unmatched.len(),
            "Residents not placed in any segment"
        );
    }
    debug!(dimension = %dimension, segments = segments.len(), "Aggregated segment retention");

    SegmentReport {
        dimension,
        as_of,
        unit: checkpoints.unit(),
        checkpoints: checkpoints.values().to_vec(),
        segments,
        unmatched,
        skipped: snapshot.skipped().to_vec(),
    }
}

/// Retention by the city of each resident's property.
pub fn by_city<D>(
    snapshot: &Snapshot,
    directory: &D,
    checkpoints: &Checkpoints,
    as_of: NaiveDate,
) -> AnalyticsResult<SegmentReport>
where
    D: PropertyDirectory + ?Sized,
{
    let mut members: Vec<(String, &Resident)> = Vec::new();
    let mut unmatched = Vec::new();
    for resident in snapshot.completed_cohorts(as_of) {
        match directory.city_of(&resident.property_id) {
            Some(city) => members.push((city.to_string(), resident)),
            None => unmatched.push(resident.resident_id.clone()),
        }
    }

    let groups = retention_by(members, checkpoints)?;
    Ok(build_report(
        Dimension::City,
        snapshot,
        checkpoints,
        as_of,
        groups,
        |k| k.clone(),
        unmatched,
    ))
}

/// Retention by the calendar year the lease started in.
pub fn by_lease_year(
    snapshot: &Snapshot,
    checkpoints: &Checkpoints,
    as_of: NaiveDate,
) -> AnalyticsResult<SegmentReport> {
    let members = snapshot
        .completed_cohorts(as_of)
        .map(|r| (r.cohort().year(), r));
    let groups = retention_by(members, checkpoints)?;
    Ok(build_report(
        Dimension::LeaseYear,
        snapshot,
        checkpoints,
        as_of,
        groups,
        |y| y.to_string(),
        Vec::new(),
    ))
}

/// Retention by how soon after lease start a resident first enrolled in a benefit.
///
/// Residents whose enrollments are all undated are reported as unmatched.
pub fn by_activation(
    snapshot: &Snapshot,
    enrollments: &[BenefitEnrollment],
    threshold_days: i64,
    checkpoints: &Checkpoints,
    as_of: NaiveDate,
) -> AnalyticsResult<SegmentReport> {
    if threshold_days < 0 {
        return Err(AnalyticsError::invalid(format!(
            "activation threshold must not be negative, got {}",
            threshold_days
        )));
    }

    let mut first_dated: HashMap<&str, NaiveDate> = HashMap::new();
    let mut enrolled: HashSet<&str> = HashSet::new();
    for enrollment in enrollments {
        enrolled.insert(enrollment.resident_id.as_str());
        if let Some(date) = enrollment.enrolled_on() {
            first_dated
                .entry(enrollment.resident_id.as_str())
                .and_modify(|d| *d = (*d).min(date))
                .or_insert(date);
        }
    }

    let mut members: Vec<(ActivationSegment, &Resident)> = Vec::new();
    let mut unmatched = Vec::new();
    for resident in snapshot.completed_cohorts(as_of) {
        let id = resident.resident_id.as_str();
        match first_dated.get(id) {
            Some(first) => {
                let lag = (*first - resident.lease_start_date).num_days();
                let segment = if lag <= threshold_days {
                    ActivationSegment::Early
                } else {
                    ActivationSegment::Late
                };
                members.push((segment, resident));
            }
            None if enrolled.contains(id) => unmatched.push(resident.resident_id.clone()),
            None => members.push((ActivationSegment::Never, resident)),
        }
    }

    let groups = retention_by(members, checkpoints)?;
    Ok(build_report(
        Dimension::Activation,
        snapshot,
        checkpoints,
        as_of,
        groups,
        |s| s.to_string(),
        unmatched,
    ))
}

/// Retention by the number of distinct benefit types a resident holds.
pub fn by_benefit_depth(
    snapshot: &Snapshot,
    enrollments: &[BenefitEnrollment],
    tiers: &DepthTiers,
    checkpoints: &Checkpoints,
    as_of: NaiveDate,
) -> AnalyticsResult<SegmentReport> {
    let types_by_resident = benefit_types_by_resident(snapshot, enrollments);

    let mut members: Vec<((usize, String), &Resident)> = Vec::new();
    let mut unmatched = Vec::new();
    for resident in snapshot.completed_cohorts(as_of) {
        let count = types_by_resident
            .get(resident.resident_id.as_str())
            .map(|types| types.len())
            .unwrap_or(0);
        match tiers.tier_for(count) {
            Some((index, tier)) => members.push(((index, tier.label.clone()), resident)),
            None => unmatched.push(resident.resident_id.clone()),
        }
    }

    let groups = retention_by(members, checkpoints)?;
    Ok(build_report(
        Dimension::BenefitDepth,
        snapshot,
        checkpoints,
        as_of,
        groups,
        |(_, label)| label.clone(),
        unmatched,
    ))
}

/// Retention per benefit type. A resident is counted once in every type they hold.
pub fn by_benefit_type(
    snapshot: &Snapshot,
    enrollments: &[BenefitEnrollment],
    checkpoints: &Checkpoints,
    as_of: NaiveDate,
) -> AnalyticsResult<SegmentReport> {
    let types_by_resident = benefit_types_by_resident(snapshot, enrollments);

    let mut members: Vec<(String, &Resident)> = Vec::new();
    for resident in snapshot.completed_cohorts(as_of) {
        if let Some(types) = types_by_resident.get(resident.resident_id.as_str()) {
            members.extend(types.iter().map(|t| (t.to_string(), resident)));
        }
    }

    let groups = retention_by(members, checkpoints)?;
    Ok(build_report(
        Dimension::BenefitType,
        snapshot,
        checkpoints,
        as_of,
        groups,
        |k| k.clone(),
        Vec::new(),
    ))
}

/// Distinct benefit types per resident, ignoring enrollments for unknown residents.
fn benefit_types_by_resident<'a>(
    snapshot: &Snapshot,
    enrollments: &'a [BenefitEnrollment],
) -> HashMap<&'a str, BTreeSet<&'a str>> {
    let mut types: HashMap<&'a str, BTreeSet<&'a str>> = HashMap::new();
    let mut orphaned = 0usize;
    for enrollment in enrollments {
        if snapshot.get(&enrollment.resident_id).is_none() {
            orphaned += 1;
            continue;
        }
        types
            .entry(enrollment.resident_id.as_str())
            .or_default()
            .insert(enrollment.benefit_type.trim());
    }
    if orphaned > 0 {
        debug!(count = orphaned, "Ignored enrollments for residents not in the snapshot");
    }
    types
}

// ============================================================================
// Tests
// ============================================================================
