//! JSON files in and out.
//!
//! `DatasetStore` reads the exported tables from a data directory:
//! - `residents.json` (required)
//! - `properties.json`, `enrollments.json` (optional, missing means empty)
//!
//! Each table is read row by row: a row that cannot be read is left out and
//! reported rather than failing the file.
//!
//! `ReportStore` writes each report as a pretty-printed envelope carrying
//! the `as_of` date it was computed for.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{BenefitEnrollment, Property, ResidentRecord};
use crate::snapshot::{SkipReason, SkippedRecord, Snapshot};

const RESIDENTS_FILE: &str = "residents";
const PROPERTIES_FILE: &str = "properties";
const ENROLLMENTS_FILE: &str = "enrollments";

/// The three exported tables.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub residents: Vec<ResidentRecord>,
    /// Resident rows that could not be read at all
    pub unreadable_residents: Vec<SkippedRecord>,
    pub properties: Vec<Property>,
    pub enrollments: Vec<BenefitEnrollment>,
}

impl Dataset {
    /// Validate the resident rows, listing unreadable rows with the skipped ones.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_records(&self.residents)
            .with_unreadable(self.unreadable_residents.iter().cloned())
    }
}

/// Rows read from one table file.
struct Table<T> {
    rows: Vec<T>,
    unreadable: Vec<SkippedRecord>,
}

/// Best label for a row that failed to parse: its id cell, else its position.
fn row_label(value: &Value, id_field: &str, row: usize) -> String {
    match value.get(id_field) {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("row {}", row),
    }
}

pub struct DatasetStore {
    data_dir: PathBuf,
}

impl DatasetStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    /// Read a table file as a JSON array, parsing each row on its own.
    ///
    /// Rows are numbered from 1 in the returned unreadable list.
    fn load_table<T: DeserializeOwned>(
        &self,
        name: &str,
        id_field: &str,
    ) -> Result<Option<Table<T>>> {
        let path = self.table_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read table file: {}", path.display()))?;

        let values: Vec<Value> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse table file: {}", path.display()))?;

        let mut table = Table {
            rows: Vec::with_capacity(values.len()),
            unreadable: Vec::new(),
        };
        for (index, value) in values.into_iter().enumerate() {
            let row = index + 1;
            let label = row_label(&value, id_field, row);
            match serde_json::from_value(value) {
                Ok(parsed) => table.rows.push(parsed),
                Err(e) => table.unreadable.push(SkippedRecord {
                    resident_id: label,
                    reason: SkipReason::UnreadableRow {
                        row,
                        error: e.to_string(),
                    },
                }),
            }
        }

        if !table.unreadable.is_empty() {
            warn!(
                table = name,
                unreadable = table.unreadable.len(),
                "Skipped unreadable rows"
            );
        }
        debug!(table = name, rows = table.rows.len(), "Loaded table");
        Ok(Some(table))
    }

    /// Resident rows plus the rows that could not be read.
    pub fn load_residents(&self) -> Result<(Vec<ResidentRecord>, Vec<SkippedRecord>)> {
        let table = self.load_table(RESIDENTS_FILE, "resident_id")?.ok_or_else(|| {
            anyhow::anyhow!(
                "Residents table not found: {}",
                self.table_path(RESIDENTS_FILE).display()
            )
        })?;
        Ok((table.rows, table.unreadable))
    }

    pub fn load_properties(&self) -> Result<Vec<Property>> {
        Ok(self
            .load_table(PROPERTIES_FILE, "property_id")?
            .map(|table| table.rows)
            .unwrap_or_default())
    }

    pub fn load_enrollments(&self) -> Result<Vec<BenefitEnrollment>> {
        Ok(self
            .load_table(ENROLLMENTS_FILE, "enrollment_id")?
            .map(|table| table.rows)
            .unwrap_or_default())
    }

    pub fn load(&self) -> Result<Dataset> {
        let (residents, unreadable_residents) = self.load_residents()?;
        let dataset = Dataset {
            residents,
            unreadable_residents,
            properties: self.load_properties()?,
            enrollments: self.load_enrollments()?,
        };
        info!(
            data_dir = %self.data_dir.display(),
            residents = dataset.residents.len(),
            unreadable = dataset.unreadable_residents.len(),
            properties = dataset.properties.len(),
            enrollments = dataset.enrollments.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEnvelope<T> {
    pub as_of: NaiveDate,
    pub data: T,
}

impl<T> ReportEnvelope<T> {
    pub fn new(as_of: NaiveDate, data: T) -> Self {
        Self { as_of, data }
    }
}

pub struct ReportStore {
    out_dir: PathBuf,
}

impl ReportStore {
    pub fn new(out_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create report directory: {}", out_dir.display()))?;
        Ok(Self { out_dir })
    }

    pub fn report_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.json", name))
    }

    pub fn save<T: Serialize>(&self, name: &str, as_of: NaiveDate, data: &T) -> Result<PathBuf> {
        let envelope = ReportEnvelope::new(as_of, data);
        let path = self.report_path(name);
        let contents = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write report file: {}", path.display()))?;
        debug!(path = %path.display(), "Wrote report");
        Ok(path)
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<ReportEnvelope<T>>> {
        let path = self.report_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read report file: {}", path.display()))?;
        let envelope = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse report file: {}", path.display()))?;
        Ok(Some(envelope))
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

// ============================================================================
// Tests
// ============================================================================
