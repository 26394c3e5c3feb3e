use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: group `{0}` has no members")]
    EmptyGroup(String),
}

/// Maximum number of offending values echoed back in an error message
const MAX_ECHOED_VALUES: usize = 8;

impl AnalyticsError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AnalyticsError::InvalidArgument(message.into())
    }

    /// Build an `InvalidArgument` for a list of integers that must be strictly ascending.
    pub fn not_ascending(what: &str, values: &[i64]) -> Self {
        let shown: Vec<String> = values
            .iter()
            .take(MAX_ECHOED_VALUES)
            .map(|v| v.to_string())
            .collect();
        let suffix = if values.len() > MAX_ECHOED_VALUES { ", ..." } else { "" };
        AnalyticsError::InvalidArgument(format!(
            "{} must be strictly ascending, got [{}{}]",
            what,
            shown.join(", "),
            suffix
        ))
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
