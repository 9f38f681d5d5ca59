use crate::cache::{FsStationCache, StationMapCache};
use crate::cli::args::{Cli, Commands, ProcessArgs};
use crate::config::ProcessorConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{inverse, StationScan};
use crate::processors::{
    load_or_build_station_map, ParallelProcessor, SanityChecker, SanityReport,
};
use crate::readers::StationReader;
use crate::utils::{file_name_of, list_input_files};
use crate::utils::progress::ProgressReporter;
use crate::writers::BatchWriter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `--verbose`. With a log file, output
/// goes there without ANSI colours instead of stderr.
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("swob_qa_processor={}", log_level)));

    let result = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| ProcessingError::Config(format!("Failed to initialise logging: {}", e)))
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = ProcessorConfig::load(cli.config.as_deref())?;
    debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Process(args) => run_process(config, args).await,

        Commands::Check {
            input_dir,
            max_workers,
            sequential,
        } => {
            let mut config = config;
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            if sequential {
                config = config.sequential();
            }
            config.ensure_valid()?;
            run_check(config, input_dir).await
        }

        Commands::Stations {
            input_dir,
            max_workers,
            refresh,
        } => {
            let mut config = config;
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            config.ensure_valid()?;
            run_stations(config, input_dir, refresh).await
        }

        Commands::Info { file, sample } => run_info(&file, sample),
    }
}

/// Pipeline configured from the resolved settings
pub fn build_processor(config: &ProcessorConfig, output_dir: Option<PathBuf>) -> ParallelProcessor {
    ParallelProcessor::new(config.max_workers)
        .with_chunk_by(config.chunk_by)
        .with_chunk_size(config.chunk_size)
        .with_parallel(config.parallel)
        .with_fail_fast(config.fail_fast)
        .with_verify_counts(config.verify_counts)
        .with_min_filename_len(config.min_filename_len)
        .with_path_segments(config.raw_segment.clone(), config.output_segment.clone())
        .with_output_dir(output_dir)
        .with_flatten_options(config.flatten_options())
        .with_cache(Arc::new(FsStationCache::with_file_name(
            config.station_cache_file.clone(),
        )))
}

async fn run_process(mut config: ProcessorConfig, args: ProcessArgs) -> Result<()> {
    args.apply_overrides(&mut config);
    config.ensure_valid()?;

    println!("Processing observation files...");
    println!("Input directory: {}", args.input_dir.display());
    println!(
        "Chunking by {}, workers: {}, parallel: {}",
        config.chunk_by, config.max_workers, config.parallel
    );

    let processor = build_processor(&config, args.output_dir.clone());
    let input_dir = args.input_dir.clone();

    let report = tokio::task::spawn_blocking(move || {
        let progress = ProgressReporter::new_spinner("Processing chunks...", false);
        processor.run(&input_dir, Some(&progress))
    })
    .await??;

    println!("\n{}", report.summary());

    let failed_chunks = report.failed_chunks().count();
    let failed_files = report.file_failures().count();
    if failed_chunks > 0 || failed_files > 0 {
        return Err(ProcessingError::Incomplete(format!(
            "{} chunk(s) failed, {} file(s) skipped",
            failed_chunks, failed_files
        )));
    }

    println!("Processing complete!");
    Ok(())
}

async fn run_check(config: ProcessorConfig, input_dir: PathBuf) -> Result<()> {
    println!("Checking QA counts in {}", input_dir.display());

    let processor = build_processor(&config, None);
    let report = tokio::task::spawn_blocking(move || -> Result<SanityReport> {
        let total = list_input_files(&input_dir, config.min_filename_len)?.len();
        let progress = ProgressReporter::new(total as u64, "Checking files...", false);
        processor.check_counts(&input_dir, Some(&progress))
    })
    .await??;

    println!("\n{}", SanityChecker::new().generate_summary(&report));

    if report.is_clean() {
        println!("All files with summary statistics passed the count check");
        Ok(())
    } else {
        Err(ProcessingError::Incomplete(format!(
            "{} mismatched, {} failed to extract",
            report.mismatches.len(),
            report.failures.len()
        )))
    }
}

async fn run_stations(config: ProcessorConfig, input_dir: PathBuf, refresh: bool) -> Result<()> {
    println!("Mapping files to stations in {}", input_dir.display());

    let scan = tokio::task::spawn_blocking(move || -> Result<StationScan> {
        let files = list_input_files(&input_dir, config.min_filename_len)?;
        let cache = FsStationCache::with_file_name(config.station_cache_file.clone());
        let reader = StationReader::new(config.max_workers).with_parallel(config.parallel);

        if refresh {
            info!(folder = %input_dir.display(), "Rebuilding station mapping");
            let names = files
                .iter()
                .map(|path| file_name_of(path))
                .collect::<Result<Vec<_>>>()?;
            let scan = reader.build_file_to_station_map(&input_dir, &names)?;
            cache.put(&input_dir, &scan.mapping)?;
            Ok(scan)
        } else {
            load_or_build_station_map(&input_dir, &files, &cache, &reader)
        }
    })
    .await??;

    let stations = inverse(&scan.mapping);
    println!("\n{} files across {} stations:", scan.mapping.len(), stations.len());
    for (station, files) in &stations {
        println!("  {:<32} {:>6}", station, files.len());
    }

    if scan.unmapped.is_empty() {
        return Ok(());
    }

    println!("\nFiles without a station ({}):", scan.unmapped.len());
    for failure in scan.unmapped.iter().take(10) {
        println!("  {}: {}", failure.path.display(), failure.error);
    }
    Err(ProcessingError::Incomplete(format!(
        "{} file(s) could not be mapped to a station",
        scan.unmapped.len()
    )))
}

fn run_info(file: &Path, sample: usize) -> Result<()> {
    println!("Analyzing batch file: {}", file.display());

    let writer = BatchWriter::new();
    let info = writer.get_file_info(file)?;
    println!("\n{}", info.summary());

    if sample > 0 {
        let batch = writer.read_batch(file)?;
        println!("\nSample Records (showing {} records):", sample.min(batch.len()));
        for (i, (id, record)) in batch.iter().take(sample).enumerate() {
            println!("  {}. {} ({} keys)", i + 1, id, record.len());
            for (key, value) in record {
                println!("       {} = {}", key, value.as_deref().unwrap_or("null"));
            }
        }
    }

    Ok(())
}
