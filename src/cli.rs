//! Command-line interface definitions for Courtside News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be provided via command-line flags or environment variables.

use clap::Parser;

/// Command-line arguments for the Courtside News pipeline.
///
/// # Examples
///
/// ```sh
/// # Extract, write the artifact, and sync to the store
/// courtside_news -j ./json
///
/// # Extract with an explicit config file, skip the store sync
/// courtside_news -j ./json -c ./config.yaml --skip-sync
///
/// # Re-sync a previously written artifact without calling the model
/// courtside_news -j ./json --from-json ./json/2025-08-06/morning.json
/// ```
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Output directory for the JSON story artifact
    #[arg(short = 'j', long)]
    pub json_output_dir: String,

    /// Optional path to a pipeline config YAML file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Replay a previously written artifact instead of calling the extraction service
    #[arg(long)]
    pub from_json: Option<String>,

    /// Extract and write the artifact without syncing to the store
    #[arg(long)]
    pub skip_sync: bool,

    /// API key for the extraction service
    #[arg(long, env = "COURTSIDE_API_KEY")]
    pub api_key: Option<String>,

    /// Service key for the persistent store
    #[arg(long, env = "SUPABASE_KEY")]
    pub store_key: Option<String>,
}
