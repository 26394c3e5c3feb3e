//! Core library for RBP retention analytics.
//!
//! Computes resident retention from an immutable snapshot of the residents
//! table and an explicit `as_of` date:
//!
//! - `tenure`: elapsed months/days until move-out, or active
//! - `cohorts`: monthly cohort retention at fixed checkpoints, plus the churn view
//! - `survival`: portfolio-wide survival curve over day offsets
//! - `segments`: the same retention primitive grouped by city, lease year,
//!   activation speed, benefit depth or benefit type
//!
//! Loading the exported tables and writing report files lives in `store`.

pub mod checkpoints;
pub mod cohorts;
pub mod config;
pub mod error;
pub mod models;
pub mod segments;
pub mod snapshot;
pub mod store;
pub mod survival;
pub mod tenure;
pub mod utils;

pub use checkpoints::{Checkpoints, DayOffsets};
pub use cohorts::{
    aggregate_cohorts, churn_at_checkpoint, retention_by, CheckpointRetention, ChurnReport,
    CohortChurn, CohortReport, CohortSummary, GroupRetention,
};
pub use config::AnalysisConfig;
pub use error::{AnalyticsError, AnalyticsResult};
pub use models::{
    BenefitEnrollment, CohortMonth, Percent, Property, PropertyDirectory, PropertyIndex, Resident,
    ResidentRecord,
};
pub use segments::{
    by_activation, by_benefit_depth, by_benefit_type, by_city, by_lease_year, ActivationSegment,
    DepthTier, DepthTiers, Dimension, SegmentReport, SegmentRow,
};
pub use snapshot::{DateField, SkipReason, SkippedRecord, Snapshot};
pub use store::{Dataset, DatasetStore, ReportEnvelope, ReportStore};
pub use survival::{survival_curve, SurvivalCurve, SurvivalPoint, DEFAULT_MIN_AGE_DAYS};
pub use tenure::{tenure, Tenure, TenureUnit};
