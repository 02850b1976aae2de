use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::analyzers::GridAnalyzer;
use crate::cli::args::{Cli, Commands, PipelineArgs};
use crate::models::{LocationQuery, LocationTimeseries, ProcessingResult, RiskThresholds};
use crate::processors::{BatchProcessor, IntegrityChecker, RiskPipeline, RiskWeights, TimeResolution};
use crate::readers::GridReader;
use crate::utils::filename::{generate_default_location_filename, risk_output_filename};
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, GridSink, ParquetWriter};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Process {
            input,
            output_file,
            compression,
            row_group_size,
            pipeline,
        } => {
            let output_file = output_file.unwrap_or_else(|| default_output_for(&input));
            println!("Computing risk layers...");
            println!("Input file: {}", input.display());
            println!("Output file: {}", output_file.display());

            let pipeline = build_pipeline(&pipeline)?;
            let writer = ParquetWriter::new()
                .with_compression(&compression)?
                .with_row_group_size(row_group_size);
            let progress = ProgressReporter::new_spinner("Processing grid...", false);

            let (result, writer, output_file) = tokio::task::spawn_blocking(move || {
                let result = pipeline.process_file(
                    &GridReader::new(),
                    &input,
                    Some((&writer as &dyn GridSink, output_file.as_path())),
                );
                (result, writer, output_file)
            })
            .await
            .context("pipeline task panicked")?;

            progress.finish_and_clear();
            println!("\n{}", result.summary());
            if !result.success() {
                bail!("processing failed");
            }

            let file_info = writer.get_file_info(&output_file)?;
            println!("\n{}", file_info.summary());
            println!("Processing complete!");
        }

        Commands::ProcessDirectory {
            input_dir,
            output_dir,
            compression,
            row_group_size,
            max_workers,
            pipeline,
        } => {
            println!("Computing risk layers for directory...");
            println!("Input directory: {}", input_dir.display());
            println!("Output directory: {}", output_dir.display());
            println!("Workers: {}", max_workers);

            let inputs = BatchProcessor::collect_inputs(&input_dir)
                .with_context(|| format!("listing {}", input_dir.display()))?;
            if inputs.is_empty() {
                println!("No Parquet files found");
                return Ok(());
            }

            let processor = BatchProcessor::new(max_workers, build_pipeline(&pipeline)?)
                .with_writer(
                    ParquetWriter::new()
                        .with_compression(&compression)?
                        .with_row_group_size(row_group_size),
                );

            let results = tokio::task::spawn_blocking(move || {
                let progress =
                    ProgressReporter::new(inputs.len() as u64, "Processing files...", false);
                processor.process_files(&inputs, &output_dir, Some(&progress))
            })
            .await
            .context("batch task panicked")??;

            for result in &results {
                println!("\n{}", result.summary());
            }

            let failed = results.iter().filter(|r| !r.success()).count();
            if failed > 0 {
                bail!("{} of {} files failed", failed, results.len());
            }
            println!("\nProcessed {} files", results.len());
        }

        Commands::Extract {
            input,
            lat,
            lon,
            buffer,
            variables,
            output_file,
            json,
            pipeline,
        } => {
            let query = LocationQuery::new(lat, lon, buffer);
            let pipeline = build_pipeline(&pipeline)?;
            let progress = ProgressReporter::new_spinner("Extracting location...", json);

            let (result, series) = extract_series(pipeline, input, query, variables).await?;
            progress.finish_and_clear();

            let Some(series) = series else {
                eprintln!("{}", result.summary());
                bail!("extraction failed");
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
                return Ok(());
            }

            let output_file =
                output_file.unwrap_or_else(|| generate_default_location_filename(lat, lon));
            CsvWriter::new()
                .write_timeseries(&series, &output_file)
                .with_context(|| format!("writing {}", output_file.display()))?;

            println!("{}", result.summary());
            println!(
                "Wrote {} rows averaged over {} cells to {}",
                series.len(),
                series.cells_selected,
                output_file.display()
            );
        }

        Commands::Validate { input } => {
            println!("Validating grid: {}", input.display());

            let dataset = GridReader::new()
                .read_grid(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            let checker = IntegrityChecker::new();
            let report = checker.check_integrity(&dataset);
            println!("\n{}", checker.generate_summary(&report));

            if report.violations.is_empty() {
                println!("✅ All data passed validation checks");
            } else {
                println!("⚠️  Found {} validation issues", report.violations.len());
            }
        }

        Commands::Info { file, detailed } => {
            println!("Analyzing Parquet file: {}", file.display());

            let file_info = ParquetWriter::new().get_file_info(&file)?;
            let stats = GridAnalyzer::new().analyze_parquet(&file)?;

            if detailed {
                println!("\n{}", stats.detailed_summary());
            } else {
                println!("\n{}", stats.summary());
            }

            println!("\nFile Details:");
            println!("{}", file_info.summary());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}

fn build_pipeline(args: &PipelineArgs) -> anyhow::Result<RiskPipeline> {
    let thresholds = match &args.thresholds {
        Some(path) => RiskThresholds::from_file(path)
            .with_context(|| format!("loading thresholds from {}", path.display()))?,
        None => RiskThresholds::default(),
    };
    if args.strict_thresholds {
        thresholds.validate_ordering()?;
    }

    let aggregation = args
        .aggregate
        .as_deref()
        .map(str::parse::<TimeResolution>)
        .transpose()?;

    let defaults = RiskWeights::default();
    let weights = RiskWeights::new(
        args.temp_weight.unwrap_or(defaults.temperature),
        args.precip_weight.unwrap_or(defaults.precipitation),
        args.humidity_weight.unwrap_or(defaults.humidity),
    );
    weights.normalized()?;

    Ok(RiskPipeline::new(thresholds)
        .with_aggregation(aggregation)
        .with_weights(weights))
}

/// Run location extraction off the async runtime.
async fn extract_series(
    pipeline: RiskPipeline,
    input: PathBuf,
    query: LocationQuery,
    variables: Vec<String>,
) -> anyhow::Result<(ProcessingResult, Option<LocationTimeseries>)> {
    tokio::task::spawn_blocking(move || {
        let names: Vec<&str> = variables.iter().map(String::as_str).collect();
        pipeline.process_location(&GridReader::new(), &input, &query, &names)
    })
    .await
    .context("extraction task panicked")
}

/// Output path used by `process` when none is given.
pub fn default_output_for(input: &Path) -> PathBuf {
    risk_output_filename(input, Path::new("output"))
}
