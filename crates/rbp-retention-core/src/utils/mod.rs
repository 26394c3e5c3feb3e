//! Utility functions for date parsing and report formatting.

pub mod format;

pub use format::{format_percent, parse_iso_date, truncate_string};
