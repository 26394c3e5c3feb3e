//! Data models for the retention analysis.
//!
//! - `ResidentRecord`, `Resident`: raw and validated resident rows
//! - `Property`, `PropertyDirectory`, `PropertyIndex`: property table and city lookup
//! - `BenefitEnrollment`: benefit sign-ups
//! - `CohortMonth`: lease-start month used as the cohort key
//! - `Percent`: one-decimal percentage

pub mod cohort;
pub mod enrollment;
pub mod percent;
pub mod property;
pub mod resident;
mod serde_helpers;

pub use cohort::CohortMonth;
pub use enrollment::BenefitEnrollment;
pub use percent::Percent;
pub use property::{Property, PropertyDirectory, PropertyIndex};
pub use resident::{Resident, ResidentRecord};
