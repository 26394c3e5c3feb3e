use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use rbp_retention_core::utils::parse_iso_date;
use rbp_retention_core::Dimension;

#[derive(Debug, Parser)]
#[command(
    name = "rbp-retention",
    version,
    about = "Resident retention reports for the Resident Benefits Package"
)]
pub struct Cli {
    /// Analysis config file (defaults to ~/.config/rbp-retention/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct DataArgs {
    /// Directory holding residents.json, properties.json and enrollments.json
    #[arg(long, default_value = "data")]
    pub data: PathBuf,

    /// Reference date for the analysis (YYYY-MM-DD)
    #[arg(long, env = "RBP_AS_OF", value_parser = parse_as_of)]
    pub as_of: NaiveDate,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Monthly cohort retention at each checkpoint
    Cohorts {
        #[command(flatten)]
        data: DataArgs,

        /// Only report cohorts with at least this many months of runway
        #[arg(long)]
        min_runway: Option<i64>,
    },
    /// Churn by a checkpoint, for cohorts old enough to be scored
    Churn {
        #[command(flatten)]
        data: DataArgs,

        /// Checkpoint in months
        #[arg(long, default_value_t = 12)]
        checkpoint: i64,
    },
    /// Portfolio-wide survival curve
    Survival {
        #[command(flatten)]
        data: DataArgs,

        /// Minimum lease age in days to be sampled (overrides config)
        #[arg(long)]
        min_age_days: Option<i64>,
    },
    /// Retention grouped by another dimension
    Segments {
        #[command(flatten)]
        data: DataArgs,

        #[arg(long, value_enum)]
        by: SegmentBy,
    },
    /// Write every report as JSON into a directory
    Report {
        #[command(flatten)]
        data: DataArgs,

        #[arg(long, default_value = "reports")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SegmentBy {
    City,
    Year,
    Activation,
    Depth,
    Benefit,
}

impl SegmentBy {
    pub const ALL: [SegmentBy; 5] = [
        SegmentBy::City,
        SegmentBy::Year,
        SegmentBy::Activation,
        SegmentBy::Depth,
        SegmentBy::Benefit,
    ];

    pub fn dimension(self) -> Dimension {
        match self {
            SegmentBy::City => Dimension::City,
            SegmentBy::Year => Dimension::LeaseYear,
            SegmentBy::Activation => Dimension::Activation,
            SegmentBy::Depth => Dimension::BenefitDepth,
            SegmentBy::Benefit => Dimension::BenefitType,
        }
    }
}

fn parse_as_of(value: &str) -> Result<NaiveDate, String> {
    parse_iso_date(value).ok_or_else(|| format!("expected a YYYY-MM-DD date, got `{}`", value))
}
