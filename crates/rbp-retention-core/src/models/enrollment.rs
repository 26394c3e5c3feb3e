use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::serde_helpers::{deserialize_id, deserialize_optional_text};
use crate::utils::parse_iso_date;

// Benefit enrollment row (one per resident per benefit sign-up)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitEnrollment {
    #[serde(deserialize_with = "deserialize_id")]
    pub enrollment_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub resident_id: String,
    pub benefit_type: String,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub enrollment_date: Option<String>,
}

impl BenefitEnrollment {
    pub fn new(
        enrollment_id: &str,
        resident_id: &str,
        benefit_type: &str,
        enrollment_date: Option<&str>,
    ) -> Self {
        Self {
            enrollment_id: enrollment_id.to_string(),
            resident_id: resident_id.to_string(),
            benefit_type: benefit_type.to_string(),
            enrollment_date: enrollment_date.map(str::to_string),
        }
    }

    /// Parsed enrollment date; `None` when missing or unparseable.
    pub fn enrolled_on(&self) -> Option<NaiveDate> {
        self.enrollment_date.as_deref().and_then(parse_iso_date)
    }
}
