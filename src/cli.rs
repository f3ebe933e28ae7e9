// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Original/reference video file
    #[arg(required = true)]
    pub original: PathBuf,

    /// Encoded/processed video file to compare
    #[arg(required = true)]
    pub processed: PathBuf,

    /// Stop after comparing this many frame pairs (default: until either stream ends)
    #[arg(required = false, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_frames: Option<u64>,

    /// Write per-frame metrics and the summary to a JSON file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Enable logging to file (e.g., vidcmp_YYYYMMDD_HHMMSS.log)
    #[arg(long)]
    pub log: bool,
}

pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
