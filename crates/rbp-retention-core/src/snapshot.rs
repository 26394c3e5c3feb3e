//! Validated, immutable view of the residents table.
//!
//! Every report is computed from a [`Snapshot`]. Rows that cannot be used
//! are kept out of all computations and listed in [`Snapshot::skipped`], so
//! one bad row never blocks the rest of the portfolio.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{CohortMonth, Resident, ResidentRecord};
use crate::utils::parse_iso_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum DateField {
    LeaseStartDate,
    MoveOutDate,
}

impl std::fmt::Display for DateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateField::LeaseStartDate => write!(f, "lease_start_date"),
            DateField::MoveOutDate => write!(f, "move_out_date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum SkipReason {
    /// The row in the exported table could not be read as a resident
    UnreadableRow {
        row: usize,
        error: String,
    },
    MissingResidentId,
    MissingLeaseStart,
    InvalidDate {
        field: DateField,
        value: String,
    },
    MoveOutBeforeLeaseStart {
        lease_start: NaiveDate,
        move_out: NaiveDate,
    },
    DuplicateId,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnreadableRow { row, error } => {
                write!(f, "unreadable row {}: {}", row, error)
            }
            SkipReason::MissingResidentId => write!(f, "missing resident id"),
            SkipReason::MissingLeaseStart => write!(f, "missing lease start date"),
            SkipReason::InvalidDate { field, value } => write!(f, "invalid {}: {:?}", field, value),
            SkipReason::MoveOutBeforeLeaseStart { lease_start, move_out } => {
                write!(f, "move-out {} is before lease start {}", move_out, lease_start)
            }
            SkipReason::DuplicateId => write!(f, "duplicate resident id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SkippedRecord {
    pub resident_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    residents: Vec<Resident>,
    skipped: Vec<SkippedRecord>,
    by_id: HashMap<String, usize>,
}

impl Snapshot {
    /// Parse and validate exported rows.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ResidentRecord>,
    {
        let mut snapshot = Snapshot::default();
        for record in records {
            match validate_record(record) {
                Ok(resident) => snapshot.push(resident),
                Err(reason) => snapshot.skip(&record.resident_id, reason),
            }
        }
        snapshot.log_summary();
        snapshot
    }

    /// Validate already-typed residents (move-out ordering and duplicate ids).
    pub fn from_residents<I>(residents: I) -> Self
    where
        I: IntoIterator<Item = Resident>,
    {
        let mut snapshot = Snapshot::default();
        for resident in residents {
            match check_dates(resident.lease_start_date, resident.move_out_date) {
                Ok(()) => snapshot.push(resident),
                Err(reason) => snapshot.skip(&resident.resident_id, reason),
            }
        }
        snapshot.log_summary();
        snapshot
    }

    /// Record rows the loader could not read, ahead of the validated rows.
    pub fn with_unreadable<I>(mut self, unreadable: I) -> Self
    where
        I: IntoIterator<Item = SkippedRecord>,
    {
        let mut skipped: Vec<SkippedRecord> = unreadable.into_iter().collect();
        if skipped.is_empty() {
            return self;
        }
        skipped.append(&mut self.skipped);
        self.skipped = skipped;
        self.log_summary();
        self
    }

    fn push(&mut self, resident: Resident) {
        if self.by_id.contains_key(&resident.resident_id) {
            self.skip(&resident.resident_id, SkipReason::DuplicateId);
            return;
        }
        self.by_id
            .insert(resident.resident_id.clone(), self.residents.len());
        self.residents.push(resident);
    }

    fn skip(&mut self, resident_id: &str, reason: SkipReason) {
        debug!(resident_id = %resident_id, reason = %reason, "Skipping resident record");
        self.skipped.push(SkippedRecord {
            resident_id: resident_id.to_string(),
            reason,
        });
    }

    fn log_summary(&self) {
        if !self.skipped.is_empty() {
            warn!(
                skipped = self.skipped.len(),
                kept = self.residents.len(),
                "Excluded malformed resident records"
            );
        }
        debug!(residents = self.residents.len(), "Built resident snapshot");
    }

    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn get(&self, resident_id: &str) -> Option<&Resident> {
        self.by_id.get(resident_id).map(|&i| &self.residents[i])
    }

    pub fn len(&self) -> usize {
        self.residents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residents.is_empty()
    }

    /// Residents whose lease-start month is complete as of `as_of`.
    ///
    /// The month containing `as_of` (and anything later) has not had a full
    /// observation window and is never scored.
    pub fn completed_cohorts(&self, as_of: NaiveDate) -> impl Iterator<Item = &Resident> {
        let current = CohortMonth::of(as_of);
        self.residents.iter().filter(move |r| r.cohort() < current)
    }
}

fn validate_record(record: &ResidentRecord) -> Result<Resident, SkipReason> {
    if record.resident_id.is_empty() {
        return Err(SkipReason::MissingResidentId);
    }

    let lease_start_raw = record
        .lease_start_date
        .as_deref()
        .ok_or(SkipReason::MissingLeaseStart)?;
    let lease_start = parse_iso_date(lease_start_raw).ok_or_else(|| SkipReason::InvalidDate {
        field: DateField::LeaseStartDate,
        value: lease_start_raw.to_string(),
    })?;

    let move_out = match record.move_out_date.as_deref() {
        None => None,
        Some(raw) => Some(parse_iso_date(raw).ok_or_else(|| SkipReason::InvalidDate {
            field: DateField::MoveOutDate,
            value: raw.to_string(),
        })?),
    };

    check_dates(lease_start, move_out)?;

    Ok(Resident {
        resident_id: record.resident_id.clone(),
        property_id: record.property_id.clone(),
        lease_start_date: lease_start,
        move_out_date: move_out,
    })
}

fn check_dates(lease_start: NaiveDate, move_out: Option<NaiveDate>) -> Result<(), SkipReason> {
    match move_out {
        Some(move_out) if move_out < lease_start => {
            Err(SkipReason::MoveOutBeforeLeaseStart { lease_start, move_out })
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_records_are_kept() {
        let records = vec![
            ResidentRecord::new("R1", "P1", Some("2023-01-10"), None),
            ResidentRecord::new("R2", "P1", Some("2023-01-15"), Some("2023-02-20")),
        ];
        let snapshot = Snapshot::from_records(&records);

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.skipped().is_empty());
        assert_eq!(snapshot.get("R2").and_then(|r| r.move_out_date), Some(date(2023, 2, 20)));
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let records = vec![
            ResidentRecord::new("R1", "P1", None, None),
            ResidentRecord::new("R2", "P1", Some("not a date"), None),
            ResidentRecord::new("R3", "P1", Some("2023-01-15"), Some("2023-13-01")),
            ResidentRecord::new("R4", "P1", Some("2023-03-15"), Some("2023-03-01")),
            ResidentRecord::new("R5", "P1", Some("2023-03-15"), None),
        ];
        let snapshot = Snapshot::from_records(&records);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.residents()[0].resident_id, "R5");

        let reasons: Vec<&SkipReason> = snapshot.skipped().iter().map(|s| &s.reason).collect();
        assert_eq!(reasons[0], &SkipReason::MissingLeaseStart);
        assert_eq!(
            reasons[1],
            &SkipReason::InvalidDate {
                field: DateField::LeaseStartDate,
                value: "not a date".to_string()
            }
        );
        assert!(matches!(
            reasons[2],
            SkipReason::InvalidDate { field: DateField::MoveOutDate, .. }
        ));
        assert_eq!(
            reasons[3],
            &SkipReason::MoveOutBeforeLeaseStart {
                lease_start: date(2023, 3, 15),
                move_out: date(2023, 3, 1)
            }
        );
    }

    #[test]
    fn test_dates_with_trailing_garbage_are_skipped() {
        let records = vec![
            ResidentRecord::new("R1", "P1", Some("2023-01-105"), None),
            ResidentRecord::new("R2", "P1", Some("2023-01-10"), Some("2023-02-2899")),
            ResidentRecord::new("R3", "P1", Some("2023-01-10T08:30:00Z"), None),
        ];
        let snapshot = Snapshot::from_records(&records);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.residents()[0].resident_id, "R3");
        assert_eq!(
            snapshot.skipped()[0].reason,
            SkipReason::InvalidDate {
                field: DateField::LeaseStartDate,
                value: "2023-01-105".to_string()
            }
        );
        assert_eq!(
            snapshot.skipped()[1].reason,
            SkipReason::InvalidDate {
                field: DateField::MoveOutDate,
                value: "2023-02-2899".to_string()
            }
        );
    }

    #[test]
    fn test_blank_resident_id_is_skipped() {
        let records = vec![ResidentRecord::new("", "P1", Some("2023-01-10"), None)];
        let snapshot = Snapshot::from_records(&records);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.skipped()[0].reason, SkipReason::MissingResidentId);
    }

    #[test]
    fn test_unreadable_rows_are_listed_first() {
        let records = vec![ResidentRecord::new("R1", "P1", None, None)];
        let unreadable = SkippedRecord {
            resident_id: "row 2".to_string(),
            reason: SkipReason::UnreadableRow {
                row: 2,
                error: "invalid type: integer `42`, expected struct ResidentRecord".to_string(),
            },
        };
        let snapshot = Snapshot::from_records(&records).with_unreadable(vec![unreadable.clone()]);

        assert_eq!(snapshot.skipped().len(), 2);
        assert_eq!(snapshot.skipped()[0], unreadable);
        assert_eq!(snapshot.skipped()[1].reason, SkipReason::MissingLeaseStart);
    }

    #[test]
    fn test_same_day_move_out_is_valid() {
        let records = vec![ResidentRecord::new("R1", "P1", Some("2023-03-15"), Some("2023-03-15"))];
        let snapshot = Snapshot::from_records(&records);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let snapshot = Snapshot::from_residents(vec![
            Resident::new("R1", "P1", date(2023, 1, 1)),
            Resident::new("R1", "P2", date(2023, 2, 1)),
        ]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("R1").map(|r| r.property_id.as_str()), Some("P1"));
        assert_eq!(snapshot.skipped()[0].reason, SkipReason::DuplicateId);
    }

    #[test]
    fn test_from_residents_rejects_inverted_dates() {
        let snapshot = Snapshot::from_residents(vec![
            Resident::new("R1", "P1", date(2023, 5, 1)).with_move_out(date(2023, 4, 1)),
        ]);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.skipped().len(), 1);
    }

    #[test]
    fn test_completed_cohorts_excludes_current_and_future_months() {
        let snapshot = Snapshot::from_residents(vec![
            Resident::new("R1", "P1", date(2023, 5, 31)),
            Resident::new("R2", "P1", date(2023, 6, 1)),
            Resident::new("R3", "P1", date(2023, 7, 4)),
        ]);
        let ids: Vec<&str> = snapshot
            .completed_cohorts(date(2023, 6, 15))
            .map(|r| r.resident_id.as_str())
            .collect();
        assert_eq!(ids, vec!["R1"]);
    }

    #[test]
    fn test_skip_reason_serialization() {
        let skipped = SkippedRecord {
            resident_id: "R9".to_string(),
            reason: SkipReason::MissingLeaseStart,
        };
        assert_eq!(
            serde_json::to_string(&skipped).unwrap(),
            r#"{"resident_id":"R9","reason":{"kind":"missing_lease_start"}}"#
        );
    }
}
