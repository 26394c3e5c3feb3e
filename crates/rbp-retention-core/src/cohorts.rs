//! Cohort retention.
//!
//! Residents are grouped by the month their lease started. For each group
//! and checkpoint `c`, retention is the share of members that were still
//! resident `c` units after their lease start (active residents always
//! count). The same primitive, [`retention_by`], drives the segment reports
//! with other grouping keys.

use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkpoints::Checkpoints;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{CohortMonth, Percent, Resident};
use crate::snapshot::{SkippedRecord, Snapshot};
use crate::tenure::{Tenure, TenureUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CheckpointRetention {
    pub checkpoint: i64,
    pub retained_count: usize,
    #[cfg_attr(feature = "ts", ts(type = "number"))]
    pub retention_pct: Percent,
}

impl CheckpointRetention {
    pub fn churn_pct(&self) -> Percent {
        self.retention_pct.complement()
    }
}

/// Retention of one group at every checkpoint, ascending by checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRetention<K> {
    pub key: K,
    pub group_size: usize,
    pub retention: Vec<CheckpointRetention>,
}

impl<K> GroupRetention<K> {
    pub fn retention_at(&self, checkpoint: i64) -> Option<Percent> {
        self.retention
            .iter()
            .find(|r| r.checkpoint == checkpoint)
            .map(|r| r.retention_pct)
    }

    pub fn churn_at(&self, checkpoint: i64) -> Option<Percent> {
        self.retention_at(checkpoint).map(|p| p.complement())
    }
}

/// Group `(key, resident)` pairs and score each group at every checkpoint.
///
/// Groups come back ascending by key. A resident may appear under several
/// keys. Fails with `EmptyGroup` if a group somehow has no members rather
/// than dividing by zero.
pub fn retention_by<'a, K, I>(
    members: I,
    checkpoints: &Checkpoints,
) -> AnalyticsResult<Vec<GroupRetention<K>>>
where
    K: Ord + Debug,
    I: IntoIterator<Item = (K, &'a Resident)>,
{
    let unit = checkpoints.unit();
    let mut groups: BTreeMap<K, Vec<Tenure>> = BTreeMap::new();
    for (key, resident) in members {
        groups.entry(key).or_default().push(resident.tenure(unit));
    }

    groups
        .into_iter()
        .map(|(key, tenures)| {
            let retention = checkpoints
                .iter()
                .map(|checkpoint| {
                    let retained_count = tenures.iter().filter(|t| t.reaches(checkpoint)).count();
                    let retention_pct = Percent::from_ratio(retained_count, tenures.len())
                        .ok_or_else(|| AnalyticsError::EmptyGroup(format!("{:?}", key)))?;
                    Ok(CheckpointRetention {
                        checkpoint,
                        retained_count,
                        retention_pct,
                    })
                })
                .collect::<AnalyticsResult<Vec<_>>>()?;

            Ok(GroupRetention {
                group_size: tenures.len(),
                key,
                retention,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CohortSummary {
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub cohort_month: CohortMonth,
    pub cohort_size: usize,
    pub retention_at: Vec<CheckpointRetention>,
}

impl CohortSummary {
    pub fn retention_at(&self, checkpoint: i64) -> Option<Percent> {
        self.retention_at
            .iter()
            .find(|r| r.checkpoint == checkpoint)
            .map(|r| r.retention_pct)
    }

    pub fn churn_at(&self, checkpoint: i64) -> Option<Percent> {
        self.retention_at(checkpoint).map(|p| p.complement())
    }
}

impl From<GroupRetention<CohortMonth>> for CohortSummary {
    fn from(group: GroupRetention<CohortMonth>) -> Self {
        Self {
            cohort_month: group.key,
            cohort_size: group.group_size,
            retention_at: group.retention,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CohortReport {
    pub as_of: NaiveDate,
    pub unit: TenureUnit,
    pub checkpoints: Vec<i64>,
    pub min_runway: Option<i64>,
    pub cohorts: Vec<CohortSummary>,
    pub skipped: Vec<SkippedRecord>,
}

/// Monthly cohort retention as of `as_of`.
///
/// The cohort containing `as_of` is never reported, nor are later ones.
/// With `min_runway_checkpoint = Some(k)`, a cohort is only reported once
/// at least `k` units have passed between its first day and `as_of`.
/// Output is ascending by cohort month.
pub fn aggregate_cohorts(
    snapshot: &Snapshot,
    checkpoints: &Checkpoints,
    as_of: NaiveDate,
    min_runway_checkpoint: Option<i64>,
) -> AnalyticsResult<CohortReport> {
    if let Some(runway) = min_runway_checkpoint {
        if runway < 0 {
            return Err(AnalyticsError::invalid(format!(
                "runway checkpoint must not be negative, got {}",
                runway
            )));
        }
    }

    let unit = checkpoints.unit();
    let members = snapshot
        .completed_cohorts(as_of)
        .map(|r| (r.cohort(), r))
        .filter(|(cohort, _)| match min_runway_checkpoint {
            Some(runway) => cohort.runway(as_of, unit) >= runway,
            None => true,
        });

    let cohorts: Vec<CohortSummary> = retention_by(members, checkpoints)?
        .into_iter()
        .map(CohortSummary::from)
        .collect();

    debug!(
        cohorts = cohorts.len(),
        as_of = %as_of,
        runway = ?min_runway_checkpoint,
        "Aggregated cohort retention"
    );

    Ok(CohortReport {
        as_of,
        unit,
        checkpoints: checkpoints.values().to_vec(),
        min_runway: min_runway_checkpoint,
        cohorts,
        skipped: snapshot.skipped().to_vec(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CohortChurn {
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub cohort_month: CohortMonth,
    pub cohort_size: usize,
    pub churned_count: usize,
    #[cfg_attr(feature = "ts", ts(type = "number"))]
    pub churn_pct: Percent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ChurnReport {
    pub as_of: NaiveDate,
    pub unit: TenureUnit,
    pub checkpoint: i64,
    pub cohorts: Vec<CohortChurn>,
    /// Completed cohorts left out because they have not had `checkpoint` units of runway
    #[cfg_attr(feature = "ts", ts(type = "Array<string>"))]
    pub insufficient_runway: Vec<CohortMonth>,
    pub skipped: Vec<SkippedRecord>,
}

/// Churn by `checkpoint` units, per cohort, for cohorts old enough to be scored.
pub fn churn_at_checkpoint(
    snapshot: &Snapshot,
    checkpoint: i64,
    unit: TenureUnit,
    as_of: NaiveDate,
) -> AnalyticsResult<ChurnReport> {
    let checkpoints = Checkpoints::new(vec![checkpoint], unit)?;
    let report = aggregate_cohorts(snapshot, &checkpoints, as_of, Some(checkpoint))?;

    let mut insufficient_runway: Vec<CohortMonth> = snapshot
        .completed_cohorts(as_of)
        .map(|r| r.cohort())
        .filter(|cohort| cohort.runway(as_of, unit) < checkpoint)
        .collect();
    insufficient_runway.sort();
    insufficient_runway.dedup();

    let cohorts = report
        .cohorts
        .into_iter()
        .filter_map(|summary| {
            summary.retention_at.first().map(|r| CohortChurn {
                cohort_month: summary.cohort_month,
                cohort_size: summary.cohort_size,
                churned_count: summary.cohort_size - r.retained_count,
                churn_pct: r.churn_pct(),
            })
        })
        .collect::<Vec<_>>();

    info!(
        checkpoint,
        unit = %unit,
        scored = cohorts.len(),
        insufficient_runway = insufficient_runway.len(),
        "Computed checkpoint churn"
    );

    Ok(ChurnReport {
        as_of,
        unit,
        checkpoint,
        cohorts,
        insufficient_runway,
        skipped: report.skipped,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResidentRecord;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cohort(y: i32, m: u32) -> CohortMonth {
        CohortMonth::new(y, m).unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot::from_records(&vec![
            ResidentRecord::new("R1", "P1", Some("2023-01-10"), None),
            ResidentRecord::new("R2", "P1", Some("2023-01-15"), Some("2023-02-20")),
        ])
    }

    // -------------------------------------------------------------------------
    // Monthly cohorts
    // -------------------------------------------------------------------------

    #[test]
    fn test_two_resident_scenario() {
        let snapshot = sample_snapshot();
        let checkpoints = Checkpoints::months(&[1, 3]).unwrap();
        let report = aggregate_cohorts(&snapshot, &checkpoints, date(2023, 6, 30), None).unwrap();

        assert_eq!(report.cohorts.len(), 1);
        let january = &report.cohorts[0];
        assert_eq!(january.cohort_month.to_string(), "2023-01");
        assert_eq!(january.cohort_size, 2);
        assert_eq!(january.retention_at(1).map(|p| p.to_string()), Some("100.0".to_string()));
        assert_eq!(january.retention_at(3).map(|p| p.to_string()), Some("50.0".to_string()));
        assert_eq!(january.churn_at(3).map(|p| p.to_string()), Some("50.0".to_string()));
    }

    #[test]
    fn test_cohorts_ascending() {
        let snapshot = Snapshot::from_residents(vec![
            Resident::new("R1", "P1", date(2023, 3, 2)),
            Resident::new("R2", "P1", date(2022, 11, 20)),
            Resident::new("R3", "P1", date(2023, 1, 9)),
        ]);
        let report =
            aggregate_cohorts(&snapshot, &Checkpoints::default(), date(2024, 1, 1), None).unwrap();
        let months: Vec<CohortMonth> = report.cohorts.iter().map(|c| c.cohort_month).collect();
        assert_eq!(months, vec![cohort(2022, 11), cohort(2023, 1), cohort(2023, 3)]);
    }

    #[test]
    fn test_partial_month_is_excluded() {
        let snapshot = Snapshot::from_residents(vec![
            Resident::new("R1", "P1", date(2023, 5, 20)),
            Resident::new("R2", "P1", date(2023, 6, 1)),
            Resident::new("R3", "P1", date(2023, 6, 14)),
        ]);
        let report =
            aggregate_cohorts(&snapshot, &Checkpoints::default(), date(2023, 6, 15), None).unwrap();
        assert_eq!(report.cohorts.len(), 1);
        assert_eq!(report.cohorts[0].cohort_month, cohort(2023, 5));
    }

    #[test]
    fn test_active_counts_at_any_checkpoint() {
        let snapshot = Snapshot::from_residents(vec![Resident::new("R1", "P1", date(2020, 1, 1))]);
        let checkpoints = Checkpoints::months(&[1, 120, 100_000]).unwrap();
        let report = aggregate_cohorts(&snapshot, &checkpoints, date(2020, 2, 1), None).unwrap();
        for r in &report.cohorts[0].retention_at {
            assert_eq!(r.retention_pct, Percent::HUNDRED);
        }
    }

    #[test]
    fn test_empty_snapshot_yields_empty_report() {
        let snapshot = Snapshot::from_residents(Vec::new());
        let report =
            aggregate_cohorts(&snapshot, &Checkpoints::default(), date(2023, 6, 15), None).unwrap();
        assert!(report.cohorts.is_empty());
    }

    #[test]
    fn test_skipped_records_are_reported() {
        let snapshot = Snapshot::from_records(&vec![
            ResidentRecord::new("R1", "P1", Some("2023-01-10"), None),
            ResidentRecord::new("BAD", "P1", Some("2023-01-10"), Some("2022-12-01")),
        ]);
        let report =
            aggregate_cohorts(&snapshot, &Checkpoints::default(), date(2023, 6, 15), None).unwrap();
        assert_eq!(report.cohorts[0].cohort_size, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].resident_id, "BAD");
    }

    #[test]
    fn test_negative_runway_is_invalid() {
        let result = aggregate_cohorts(
            &sample_snapshot(),
            &Checkpoints::default(),
            date(2023, 6, 15),
            Some(-1),
        );
        assert!(matches!(result, Err(AnalyticsError::InvalidArgument(_))));
    }

    #[test]
    fn test_day_checkpoints() {
        let snapshot = Snapshot::from_residents(vec![
            Resident::new("R1", "P1", date(2023, 1, 1)).with_move_out(date(2023, 1, 21)),
            Resident::new("R2", "P1", date(2023, 1, 5)).with_move_out(date(2023, 3, 1)),
        ]);
        let checkpoints = Checkpoints::days(&[0, 30]).unwrap();
        let report = aggregate_cohorts(&snapshot, &checkpoints, date(2023, 6, 1), None).unwrap();
        assert_eq!(report.unit, TenureUnit::Days);
        assert_eq!(report.cohorts[0].retention_at(0), Some(Percent::HUNDRED));
        assert_eq!(report.cohorts[0].retention_at(30).map(|p| p.tenths()), Some(500));
    }

    #[test]
    fn test_idempotent_output() {
        let snapshot = sample_snapshot();
        let checkpoints = Checkpoints::default();
        let as_of = date(2024, 3, 1);
        let first = aggregate_cohorts(&snapshot, &checkpoints, as_of, None).unwrap();
        let second = aggregate_cohorts(&snapshot, &checkpoints, as_of, None).unwrap();
        let first = serde_json::to_string(&first).unwrap();
        let second = serde_json::to_string(&second).unwrap();
        assert_eq!(first, second);
    }

    // -------------------------------------------------------------------------
    // Runway / churn
    // -------------------------------------------------------------------------

    #[test]
    fn test_churn_runway_filter() {
        let snapshot = Snapshot::from_residents(vec![
            Resident::new("R1", "P1", date(2022, 5, 3)).with_move_out(date(2022, 9, 1)),
            Resident::new("R2", "P1", date(2022, 5, 20)),
            Resident::new("R3", "P1", date(2022, 6, 11)),
            Resident::new("R4", "P1", date(2023, 2, 11)).with_move_out(date(2023, 3, 1)),
        ]);
        let report =
            churn_at_checkpoint(&snapshot, 12, TenureUnit::Months, date(2023, 5, 15)).unwrap();

        assert_eq!(report.cohorts.len(), 1);
        assert_eq!(report.cohorts[0].cohort_month, cohort(2022, 5));
        assert_eq!(report.cohorts[0].churned_count, 1);
        assert_eq!(report.cohorts[0].churn_pct.to_string(), "50.0");
        assert_eq!(report.insufficient_runway, vec![cohort(2022, 6), cohort(2023, 2)]);
    }

    #[test]
    fn test_runway_boundary_is_inclusive() {
        let snapshot = Snapshot::from_residents(vec![Resident::new("R1", "P1", date(2022, 6, 11))]);
        let report =
            churn_at_checkpoint(&snapshot, 12, TenureUnit::Months, date(2023, 6, 1)).unwrap();
        assert_eq!(report.cohorts.len(), 1);
        assert_eq!(report.cohorts[0].churn_pct, Percent::ZERO);
    }

    // -------------------------------------------------------------------------
    // Generic grouping
    // -------------------------------------------------------------------------

    #[test]
    fn test_retention_by_custom_key() {
        let residents = vec![
            Resident::new("R1", "P1", date(2022, 1, 1)).with_move_out(date(2022, 2, 15)),
            Resident::new("R2", "P2", date(2022, 1, 1)),
            Resident::new("R3", "P2", date(2022, 1, 1)).with_move_out(date(2022, 12, 1)),
        ];
        let groups = retention_by(
            residents.iter().map(|r| (r.property_id.as_str(), r)),
            &Checkpoints::months(&[1, 6]).unwrap(),
        )
        .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "P1");
        assert_eq!(groups[0].retention_at(6), Some(Percent::ZERO));
        assert_eq!(groups[1].key, "P2");
        assert_eq!(groups[1].group_size, 2);
        assert_eq!(groups[1].retention_at(6), Some(Percent::HUNDRED));
        assert_eq!(groups[1].churn_at(6), Some(Percent::ZERO));
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    fn arb_residents() -> impl Strategy<Value = Vec<Resident>> {
        prop::collection::vec((0i64..1500, prop::option::of(0i64..900)), 0..60).prop_map(|rows| {
            let base = date(2021, 1, 1);
            rows.into_iter()
                .enumerate()
                .map(|(i, (start, stay))| {
                    let lease_start = base + chrono::Duration::days(start);
                    let resident = Resident::new(&format!("R{}", i), "P1", lease_start);
                    match stay {
                        Some(days) => {
                            resident.with_move_out(lease_start + chrono::Duration::days(days))
                        }
                        None => resident,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_retention_non_increasing(residents in arb_residents(), as_of_days in 0i64..1800) {
            let as_of = date(2021, 1, 1) + chrono::Duration::days(as_of_days);
            let snapshot = Snapshot::from_residents(residents);
            let report =
                aggregate_cohorts(&snapshot, &Checkpoints::default(), as_of, None).unwrap();
            for summary in &report.cohorts {
                for pair in summary.retention_at.windows(2) {
                    prop_assert!(pair[0].retention_pct >= pair[1].retention_pct);
                }
            }
        }

        #[test]
        fn prop_current_month_never_reported(
            residents in arb_residents(),
            as_of_days in 0i64..1800,
        ) {
            let as_of = date(2021, 1, 1) + chrono::Duration::days(as_of_days);
            let snapshot = Snapshot::from_residents(residents);
            let report =
                aggregate_cohorts(&snapshot, &Checkpoints::default(), as_of, None).unwrap();
            let current = CohortMonth::of(as_of);
            prop_assert!(report.cohorts.iter().all(|c| c.cohort_month < current));
            prop_assert!(report.cohorts.windows(2).all(|w| w[0].cohort_month < w[1].cohort_month));
        }

        #[test]
        fn prop_churn_respects_runway(residents in arb_residents(), as_of_days in 0i64..1800) {
            let as_of = date(2021, 1, 1) + chrono::Duration::days(as_of_days);
            let snapshot = Snapshot::from_residents(residents);
            let report = churn_at_checkpoint(&snapshot, 12, TenureUnit::Months, as_of).unwrap();
            for churn in &report.cohorts {
                prop_assert!(churn.cohort_month.runway(as_of, TenureUnit::Months) >= 12);
            }
        }
    }
}
