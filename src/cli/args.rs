use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::constants::{DEFAULT_BUFFER_DEGREES, DEFAULT_ROW_GROUP_SIZE, INDEX_MALARIA_RISK};

#[derive(Parser)]
#[command(name = "malaria-risk-processor")]
#[command(about = "Derive malaria climate-suitability layers from ERA5 grids")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

/// Options shared by every command that runs the pipeline.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(long, help = "TOML/JSON/YAML file overriding risk thresholds")]
    pub thresholds: Option<PathBuf>,

    #[arg(long, help = "Fail when thresholds are not in ascending order")]
    pub strict_thresholds: bool,

    #[arg(long, help = "Aggregate before combining: daily or monthly")]
    pub aggregate: Option<String>,

    #[arg(long, help = "Composite weight of temperature suitability")]
    pub temp_weight: Option<f64>,

    #[arg(long, help = "Composite weight of precipitation risk")]
    pub precip_weight: Option<f64>,

    #[arg(long, help = "Composite weight of humidity risk")]
    pub humidity_weight: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute risk layers for one grid file
    Process {
        #[arg(short, long, help = "Input Parquet grid")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/<stem>-risk.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, default_value_t = DEFAULT_ROW_GROUP_SIZE, help = "Rows per Parquet row group")]
        row_group_size: usize,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Compute risk layers for every grid file in a directory
    ProcessDirectory {
        #[arg(short, long, help = "Directory containing Parquet grids")]
        input_dir: PathBuf,

        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, default_value_t = DEFAULT_ROW_GROUP_SIZE, help = "Rows per Parquet row group")]
        row_group_size: usize,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Extract a buffered time series around one location
    Extract {
        #[arg(short, long, help = "Input Parquet grid")]
        input: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[arg(long, default_value_t = DEFAULT_BUFFER_DEGREES, help = "Buffer in degrees")]
        buffer: f64,

        #[arg(
            long,
            value_delimiter = ',',
            default_value = INDEX_MALARIA_RISK,
            help = "Comma-separated variables to extract"
        )]
        variables: Vec<String>,

        #[arg(short, long, help = "Output CSV path [default: output/risk-<lat>_<lon>-{YYMMDD}.csv]")]
        output_file: Option<PathBuf>,

        #[arg(long, help = "Print the series as JSON instead of writing CSV")]
        json: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Check a grid for missing, non-finite and implausible values
    Validate {
        #[arg(short, long, help = "Input Parquet grid")]
        input: PathBuf,
    },

    /// Display information about a Parquet grid
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, help = "Show per-variable statistics")]
        detailed: bool,
    },
}
