use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cohort::CohortMonth;
use super::serde_helpers::{deserialize_id, deserialize_optional_text};
use crate::tenure::{tenure, Tenure, TenureUnit};

/// A resident row as exported from the residents table.
///
/// Dates are kept as text until the record is validated into a [`Resident`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentRecord {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub resident_id: String,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub property_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub lease_start_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub move_out_date: Option<String>,
}

impl ResidentRecord {
    pub fn new(
        resident_id: &str,
        property_id: &str,
        lease_start: Option<&str>,
        move_out: Option<&str>,
    ) -> Self {
        Self {
            resident_id: resident_id.to_string(),
            property_id: property_id.to_string(),
            lease_start_date: lease_start.map(str::to_string),
            move_out_date: move_out.map(str::to_string),
        }
    }
}

/// A validated resident: lease start present, move-out (if any) not before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub resident_id: String,
    pub property_id: String,
    pub lease_start_date: NaiveDate,
    pub move_out_date: Option<NaiveDate>,
}

impl Resident {
    pub fn new(resident_id: &str, property_id: &str, lease_start_date: NaiveDate) -> Self {
        Self {
            resident_id: resident_id.to_string(),
            property_id: property_id.to_string(),
            lease_start_date,
            move_out_date: None,
        }
    }

    pub fn with_move_out(mut self, move_out_date: NaiveDate) -> Self {
        self.move_out_date = Some(move_out_date);
        self
    }

    pub fn tenure(&self, unit: TenureUnit) -> Tenure {
        tenure(self.lease_start_date, self.move_out_date, unit)
    }

    pub fn cohort(&self) -> CohortMonth {
        CohortMonth::of(self.lease_start_date)
    }
}
