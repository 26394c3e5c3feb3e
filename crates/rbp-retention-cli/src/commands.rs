use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use rbp_retention_core::{
    aggregate_cohorts, by_activation, by_benefit_depth, by_benefit_type, by_city, by_lease_year,
    churn_at_checkpoint, survival_curve, AnalysisConfig, Dataset, DatasetStore, PropertyIndex,
    ReportStore, SegmentReport, Snapshot, TenureUnit,
};

use crate::cli::{Cli, Command, DataArgs, SegmentBy};
use crate::render;

/// Everything a report needs: validated config, loaded tables and the resident snapshot.
struct Workspace {
    config: AnalysisConfig,
    dataset: Dataset,
    snapshot: Snapshot,
}

impl Workspace {
    fn open(config_path: Option<&Path>, data_dir: &Path) -> Result<Self> {
        let config = match config_path {
            Some(path) => AnalysisConfig::load_from(path)?,
            None => AnalysisConfig::load()?,
        };
        let dataset = DatasetStore::new(data_dir).load()?;
        let snapshot = dataset.snapshot();
        Ok(Self {
            config,
            dataset,
            snapshot,
        })
    }

    fn segments(&self, by: SegmentBy, as_of: NaiveDate) -> Result<SegmentReport> {
        let checkpoints = self.config.checkpoints()?;
        let report = match by {
            SegmentBy::City => {
                let index = PropertyIndex::new(&self.dataset.properties);
                by_city(&self.snapshot, &index, &checkpoints, as_of)?
            }
            SegmentBy::Year => by_lease_year(&self.snapshot, &checkpoints, as_of)?,
            SegmentBy::Activation => by_activation(
                &self.snapshot,
                &self.dataset.enrollments,
                self.config.early_activation_days,
                &checkpoints,
                as_of,
            )?,
            SegmentBy::Depth => by_benefit_depth(
                &self.snapshot,
                &self.dataset.enrollments,
                &self.config.depth_tiers()?,
                &checkpoints,
                as_of,
            )?,
            SegmentBy::Benefit => by_benefit_type(
                &self.snapshot,
                &self.dataset.enrollments,
                &checkpoints,
                as_of,
            )?,
        };
        Ok(report)
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Cohorts { data, min_runway } => {
            let ws = open(config_path, &data)?;
            let checkpoints = ws.config.checkpoints()?;
            let report = aggregate_cohorts(&ws.snapshot, &checkpoints, data.as_of, min_runway)?;
            emit(data.json, &report, render::render_cohorts)
        }
        Command::Churn { data, checkpoint } => {
            let ws = open(config_path, &data)?;
            let report =
                churn_at_checkpoint(&ws.snapshot, checkpoint, TenureUnit::Months, data.as_of)?;
            emit(data.json, &report, render::render_churn)
        }
        Command::Survival { data, min_age_days } => {
            let ws = open(config_path, &data)?;
            let min_age = min_age_days.unwrap_or(ws.config.min_age_days);
            let curve = survival_curve(&ws.snapshot, &ws.config.offsets()?, data.as_of, min_age)?;
            emit(data.json, &curve, render::render_survival)
        }
        Command::Segments { data, by } => {
            let ws = open(config_path, &data)?;
            let report = ws.segments(by, data.as_of)?;
            emit(data.json, &report, render::render_segments)
        }
        Command::Report { data, out } => {
            let ws = open(config_path, &data)?;
            write_reports(&ws, data.as_of, &out)
        }
    }
}

fn open(config_path: Option<&Path>, data: &DataArgs) -> Result<Workspace> {
    Workspace::open(config_path, &data.data)
        .with_context(|| format!("Failed to open dataset at {}", data.data.display()))
}

/// Write every report into `out` and list the files on stdout.
fn write_reports(ws: &Workspace, as_of: NaiveDate, out: &Path) -> Result<()> {
    let store = ReportStore::new(out.to_path_buf())?;
    let checkpoints = ws.config.checkpoints()?;
    let mut written = Vec::new();

    let cohorts = aggregate_cohorts(&ws.snapshot, &checkpoints, as_of, None)?;
    written.push(store.save("cohorts", as_of, &cohorts)?);

    for checkpoint in checkpoints.iter() {
        let churn = churn_at_checkpoint(&ws.snapshot, checkpoint, checkpoints.unit(), as_of)?;
        written.push(store.save(&format!("churn_m{}", checkpoint), as_of, &churn)?);
    }

    let curve = survival_curve(&ws.snapshot, &ws.config.offsets()?, as_of, ws.config.min_age_days)?;
    written.push(store.save("survival", as_of, &curve)?);

    for by in SegmentBy::ALL {
        let report = ws.segments(by, as_of)?;
        written.push(store.save(&format!("segments_{}", by.dimension()), as_of, &report)?);
    }

    info!(count = written.len(), out_dir = %store.out_dir().display(), "Wrote reports");
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path) {
        std::fs::write(
            dir.join("residents.json"),
            r#"[
                {"resident_id": 1, "property_id": 10, "lease_start_date": "2023-01-10", "move_out_date": null},
                {"resident_id": 2, "property_id": 10, "lease_start_date": "2023-01-15", "move_out_date": "2023-02-20"},
                {"resident_id": 3, "property_id": 11, "lease_start_date": "2022-04-02", "move_out_date": "2023-05-01"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("properties.json"),
            r#"[{"property_id": 10, "city": "Austin"}, {"property_id": 11, "city": "Denver"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("enrollments.json"),
            r#"[{"enrollment_id": 1, "resident_id": 1, "benefit_type": "Renters Insurance", "enrollment_date": "2023-01-11"}]"#,
        )
        .unwrap();
    }

    #[test]
    fn test_write_reports() {
        let data = tempfile::tempdir().unwrap();
        write_fixture(data.path());
        let out = tempfile::tempdir().unwrap();

        let config = data.path().join("config.json");
        AnalysisConfig::default().save_to(&config).unwrap();

        let ws = Workspace::open(Some(&config), data.path()).unwrap();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        write_reports(&ws, as_of, out.path()).unwrap();

        for name in [
            "cohorts",
            "churn_m1",
            "churn_m12",
            "survival",
            "segments_city",
            "segments_lease_year",
            "segments_activation",
            "segments_benefit_depth",
            "segments_benefit_type",
        ] {
            assert!(out.path().join(format!("{}.json", name)).exists(), "missing {}", name);
        }

        let contents = std::fs::read_to_string(out.path().join("cohorts.json")).unwrap();
        let cohorts: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(cohorts["as_of"], "2024-06-30");
        assert_eq!(cohorts["data"]["cohorts"][0]["cohort_month"], "2022-04");
    }

    #[test]
    fn test_unreadable_resident_row_is_reported_not_fatal() {
        let data = tempfile::tempdir().unwrap();
        write_fixture(data.path());
        std::fs::write(
            data.path().join("residents.json"),
            r#"[
                {"resident_id": 1, "property_id": 10, "lease_start_date": "2023-01-10"},
                {"resident_id": 2, "property_id": 10, "lease_start_date": 44936.0},
                null
            ]"#,
        )
        .unwrap();
        let config = data.path().join("config.json");
        AnalysisConfig::default().save_to(&config).unwrap();

        let ws = Workspace::open(Some(&config), data.path()).unwrap();
        assert_eq!(ws.snapshot.len(), 1);
        assert_eq!(ws.snapshot.skipped().len(), 2);

        let out = tempfile::tempdir().unwrap();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        write_reports(&ws, as_of, out.path()).unwrap();

        let contents = std::fs::read_to_string(out.path().join("survival.json")).unwrap();
        let survival: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let kinds: Vec<&str> = survival["data"]["skipped"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["reason"]["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["unreadable_row", "invalid_date"]);
    }

    #[test]
    fn test_report_files_are_reproducible() {
        let data = tempfile::tempdir().unwrap();
        write_fixture(data.path());
        let config = data.path().join("config.json");
        AnalysisConfig::default().save_to(&config).unwrap();
        let ws = Workspace::open(Some(&config), data.path()).unwrap();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_reports(&ws, as_of, first.path()).unwrap();
        write_reports(&ws, as_of, second.path()).unwrap();

        let a = std::fs::read(first.path().join("survival.json")).unwrap();
        let b = std::fs::read(second.path().join("survival.json")).unwrap();
        assert_eq!(a, b);
    }
}
