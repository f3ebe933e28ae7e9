mod cli;
mod decode;
mod error;
mod metrics;
mod pipeline;
mod report;

use crate::cli::CliArgs;
use crate::decode::FrameSource;
use crate::error::Result; // Use our custom Result
use chrono::Local;
use log::{LevelFilter, error, info};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    // Record start time early
    let start_time = Instant::now();

    // Parse arguments first to potentially setup logging based on them
    let args = cli::parse_args();

    // Setup logging (console and optional file)
    if let Err(e) = setup_logging(&args) {
        eprintln!("Error setting up logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting vidcmp comparison...");
    info!("Arguments: {:?}", args);

    // Run the main application logic
    match run(args) {
        Ok(()) => {
            let duration = start_time.elapsed();
            info!("Comparison completed successfully in {:.2?}", duration);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let duration = start_time.elapsed();
            error!("Comparison failed after {:.2?}: {}", duration, e);
            eprintln!("Error: {}", e); // Also print to stderr for visibility
            ExitCode::FAILURE
        }
    }
}

/// Sets up logging to console (stderr) and optionally to a file. Stdout is
/// reserved for the final report.
fn setup_logging(args: &CliArgs) -> std::result::Result<(), fern::InitError> {
    let base_config = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn) // Default level
        .level_for("vidcmp", LevelFilter::Info); // More detailed logs for our crate

    let console_config = fern::Dispatch::new().chain(std::io::stderr());

    let mut logger = base_config.chain(console_config);

    if args.log {
        let log_filename = format!("vidcmp_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        let file_config = fern::Dispatch::new().chain(fern::log_file(&log_filename)?);
        logger = logger.chain(file_config);
        info!("Logging to file: {}", log_filename);
    }

    logger.apply()?;
    Ok(())
}

/// Main application logic
fn run(args: CliArgs) -> Result<()> {
    info!("Original: {}", args.original.display());
    info!("Processed: {}", args.processed.display());

    ffmpeg_next::init()?;

    // Both sources own their decoder handles exclusively; dropping them at
    // the end of this function (on any exit path) releases the files.
    let mut original = FrameSource::open(&args.original)?;
    let mut processed = FrameSource::open(&args.processed)?;

    let (result, records) = pipeline::run_comparison(&mut original, &mut processed, args.max_frames)?;

    if let Some(json_path) = &args.json {
        report::write_json(json_path, &records, &result)?;
        info!("Wrote JSON results: {}", json_path.display());
    }

    print!("{}", report::render_summary(&result));
    Ok(())
}
