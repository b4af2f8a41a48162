//! CLI entry point for the OSHA illumination analysis.
//!
//! Provides subcommands for each batch stage (classify, aggregate, plot),
//! a `run` command chaining all three, and `rules` to print the effective
//! rule tables.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use osha_lux::aggregate::sector::UnknownSector;
use osha_lux::classifier::RuleSet;
use osha_lux::output::{FILTERED_RECORDS, SUMMARY_BY_YEAR, print_json};
use osha_lux::pipeline::{
    self, AggregateOptions, ClassifyOptions, PlotOptions, RunOptions,
};
use osha_lux::plot::YearWindow;
use osha_lux::records::{InspectionColumnNames, ViolationColumnNames};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "osha_lux")]
#[command(about = "Estimate illumination-related OSHA violations, penalties and sectors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter raw violation CSVs down to illumination-related citations
    Classify {
        #[command(flatten)]
        classify: ClassifyArgs,
    },
    /// Summarize filtered records by year, category and sector
    Aggregate {
        /// Filtered records CSV [default: <OUTPUT_DIR>/filtered_records.csv]
        #[arg(long)]
        filtered: Option<PathBuf>,

        #[command(flatten)]
        sectors: SectorArgs,

        /// Directory to write summaries to
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,
    },
    /// Render violations and penalties per year as PNG charts
    Plot {
        /// Year summary CSV [default: <OUTPUT_DIR>/summary_by_year.csv]
        #[arg(long)]
        summary: Option<PathBuf>,

        #[command(flatten)]
        window: WindowArgs,

        /// Directory to write charts to
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,
    },
    /// Classify, aggregate and plot in one go
    Run {
        #[command(flatten)]
        classify: ClassifyArgs,

        #[command(flatten)]
        sectors: SectorArgs,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Print the effective rule tables as JSON
    Rules {
        /// JSON rules file overriding the built-in tables
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ClassifyArgs {
    /// Violation CSV paths or glob patterns
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<String>,

    /// Skip input files matching these glob patterns
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,

    /// Directory to write outputs to
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// Comma-separated narrative columns [default: auto-detect]
    #[arg(long, value_delimiter = ',')]
    text_cols: Option<Vec<String>>,

    /// Column holding the cited standard
    #[arg(long, default_value = "standard")]
    cfr_col: String,

    /// Column holding the citation date
    #[arg(long, default_value = "issuance_date")]
    date_col: String,

    /// Column holding the penalty amount
    #[arg(long, default_value = "initial_penalty")]
    penalty_col: String,

    /// Column holding the inspection id
    #[arg(long, default_value = "activity_nr")]
    id_col: String,

    /// JSON rules file overriding the built-in tables
    #[arg(long)]
    rules: Option<PathBuf>,
}

impl ClassifyArgs {
    fn into_options(self) -> Result<ClassifyOptions> {
        Ok(ClassifyOptions {
            inputs: self.input,
            excludes: self.exclude,
            columns: ViolationColumnNames {
                id: self.id_col,
                standard: self.cfr_col,
                date: self.date_col,
                penalty: self.penalty_col,
                text: self.text_cols,
            },
            rules: RuleSet::load_or_default(self.rules.as_deref())?,
            output_dir: self.output_dir,
        })
    }
}

#[derive(Args)]
struct SectorArgs {
    /// Inspection CSV paths or glob patterns (enables sector summaries)
    #[arg(long, num_args = 1..)]
    inspections: Vec<String>,

    /// Inspection column holding the NAICS code
    #[arg(long, default_value = "naics_code")]
    naics_col: String,

    /// Inspection column holding the inspection id
    #[arg(long, default_value = "activity_nr")]
    inspection_id_col: String,

    /// Drop records without a NAICS sector instead of reporting them as unknown
    #[arg(long, default_value_t = false)]
    drop_unknown_sector: bool,
}

impl SectorArgs {
    fn columns(&self) -> InspectionColumnNames {
        InspectionColumnNames {
            id: self.inspection_id_col.clone(),
            naics: self.naics_col.clone(),
        }
    }

    fn policy(&self) -> UnknownSector {
        if self.drop_unknown_sector {
            UnknownSector::Drop
        } else {
            UnknownSector::Bucket
        }
    }
}

#[derive(Args)]
struct WindowArgs {
    /// First year to plot
    #[arg(long)]
    year_min: Option<i32>,

    /// Last year to plot
    #[arg(long)]
    year_max: Option<i32>,
}

impl From<WindowArgs> for YearWindow {
    fn from(w: WindowArgs) -> Self {
        YearWindow {
            min: w.year_min,
            max: w.year_max,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/osha_lux.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("osha_lux.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { classify } => {
            pipeline::classify(&classify.into_options()?)?;
        }
        Commands::Aggregate {
            filtered,
            sectors,
            output_dir,
        } => {
            pipeline::aggregate(&AggregateOptions {
                filtered: filtered.unwrap_or_else(|| output_dir.join(FILTERED_RECORDS)),
                inspections: sectors.inspections.clone(),
                inspection_columns: sectors.columns(),
                unknown_sector: sectors.policy(),
                output_dir,
            })?;
        }
        Commands::Plot {
            summary,
            window,
            output_dir,
        } => {
            pipeline::plot(&PlotOptions {
                summary: summary.unwrap_or_else(|| output_dir.join(SUMMARY_BY_YEAR)),
                window: window.into(),
                output_dir,
            })?;
        }
        Commands::Run {
            classify,
            sectors,
            window,
        } => {
            pipeline::run(&RunOptions {
                classify: classify.into_options()?,
                inspections: sectors.inspections.clone(),
                inspection_columns: sectors.columns(),
                unknown_sector: sectors.policy(),
                window: window.into(),
            })?;
        }
        Commands::Rules { rules } => {
            print_json(&RuleSet::load_or_default(rules.as_deref())?)?;
        }
    }

    Ok(())
}
