//! Plain-text tables for terminal output.

use rbp_retention_core::utils::{format_percent, truncate_string};
use rbp_retention_core::{
    CheckpointRetention, ChurnReport, CohortReport, SegmentReport, SkippedRecord, SurvivalCurve,
    TenureUnit,
};

/// Width of the leading label column
const LABEL_WIDTH: usize = 22;

/// Width of each numeric column
const CELL_WIDTH: usize = 9;

/// Maximum skipped records listed before summarizing the rest
const MAX_SKIPPED_SHOWN: usize = 10;

fn unit_prefix(unit: TenureUnit) -> &'static str {
    match unit {
        TenureUnit::Months => "M",
        TenureUnit::Days => "D",
    }
}

fn label_cell(label: &str) -> String {
    format!("{:<LABEL_WIDTH$}", truncate_string(label, LABEL_WIDTH - 1))
}

fn cell(value: impl std::fmt::Display) -> String {
    format!("{:>CELL_WIDTH$}", value.to_string())
}

fn retention_header(out: &mut String, label: &str, unit: TenureUnit, checkpoints: &[i64]) {
    out.push_str(&label_cell(label));
    out.push_str(&cell("Size"));
    for checkpoint in checkpoints {
        out.push_str(&cell(format!("{}{}", unit_prefix(unit), checkpoint)));
    }
    out.push('\n');
}

fn retention_row(out: &mut String, label: &str, size: usize, retention: &[CheckpointRetention]) {
    out.push_str(&label_cell(label));
    out.push_str(&cell(size));
    for r in retention {
        out.push_str(&cell(format_percent(Some(r.retention_pct))));
    }
    out.push('\n');
}

fn skipped_footer(out: &mut String, skipped: &[SkippedRecord]) {
    if skipped.is_empty() {
        return;
    }
    out.push_str(&format!("\nSkipped {} malformed record(s):\n", skipped.len()));
    for record in skipped.iter().take(MAX_SKIPPED_SHOWN) {
        out.push_str(&format!("  {}: {}\n", record.resident_id, record.reason));
    }
    if skipped.len() > MAX_SKIPPED_SHOWN {
        out.push_str(&format!("  ... and {} more\n", skipped.len() - MAX_SKIPPED_SHOWN));
    }
}

pub fn render_cohorts(report: &CohortReport) -> String {
    let mut out = format!("Cohort retention as of {}\n", report.as_of);
    if let Some(runway) = report.min_runway {
        out.push_str(&format!("(cohorts with at least {} {} of runway)\n", runway, report.unit));
    }
    out.push('\n');

    if report.cohorts.is_empty() {
        out.push_str("No completed cohorts.\n");
    } else {
        retention_header(&mut out, "Cohort", report.unit, &report.checkpoints);
        for cohort in &report.cohorts {
            let label = cohort.cohort_month.to_string();
            retention_row(&mut out, &label, cohort.cohort_size, &cohort.retention_at);
        }
    }
    skipped_footer(&mut out, &report.skipped);
    out
}

pub fn render_churn(report: &ChurnReport) -> String {
    let mut out = format!(
        "Churn by {}{} as of {}\n\n",
        unit_prefix(report.unit),
        report.checkpoint,
        report.as_of
    );

    if report.cohorts.is_empty() {
        out.push_str("No cohort has enough runway yet.\n");
    } else {
        out.push_str(&label_cell("Cohort"));
        out.push_str(&cell("Size"));
        out.push_str(&cell("Churned"));
        out.push_str(&cell("Churn"));
        out.push('\n');
        for cohort in &report.cohorts {
            out.push_str(&label_cell(&cohort.cohort_month.to_string()));
            out.push_str(&cell(cohort.cohort_size));
            out.push_str(&cell(cohort.churned_count));
            out.push_str(&cell(format_percent(Some(cohort.churn_pct))));
            out.push('\n');
        }
    }

    if !report.insufficient_runway.is_empty() {
        let months: Vec<String> =
            report.insufficient_runway.iter().map(|m| m.to_string()).collect();
        out.push_str(&format!(
            "\nNot yet scored (runway < {}): {}\n",
            report.checkpoint,
            months.join(", ")
        ));
    }
    skipped_footer(&mut out, &report.skipped);
    out
}

pub fn render_survival(curve: &SurvivalCurve) -> String {
    let mut out = format!(
        "Survival curve as of {} ({} eligible residents, lease age >= {} days)\n\n",
        curve.as_of, curve.eligible_count, curve.min_age_days
    );
    out.push_str(&label_cell("Day"));
    out.push_str(&cell("Active"));
    out.push_str(&cell("Retained"));
    out.push('\n');
    for point in &curve.points {
        out.push_str(&label_cell(&point.day_offset.to_string()));
        out.push_str(&cell(point.still_active_count));
        out.push_str(&cell(format_percent(point.retention_pct)));
        out.push('\n');
    }
    skipped_footer(&mut out, &curve.skipped);
    out
}

pub fn render_segments(report: &SegmentReport) -> String {
    let mut out = format!("Retention by {} as of {}\n\n", report.dimension, report.as_of);

    if report.segments.is_empty() {
        out.push_str("No segments.\n");
    } else {
        retention_header(&mut out, "Segment", report.unit, &report.checkpoints);
        for segment in &report.segments {
            retention_row(&mut out, &segment.segment, segment.group_size, &segment.retention_at);
        }
    }

    if !report.unmatched.is_empty() {
        out.push_str(&format!(
            "\n{} resident(s) not placed in any segment\n",
            report.unmatched.len()
        ));
    }
    skipped_footer(&mut out, &report.skipped);
    out
}
