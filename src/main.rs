//! # Courtside News
//!
//! A pipeline that turns one capture of the NBA news homepage into a
//! deduplicated batch of structured story records and merges them into a
//! hosted store for later browsing.
//!
//! ## Architecture
//!
//! Each run is sequential, start to finish:
//! 1. **Fetch**: one GET of the news homepage
//! 2. **Scan**: extract the page's visible text and index story link candidates
//! 3. **Prompt**: build the schema-constrained rule set and extraction task
//! 4. **Extract**: one chat completion request against an OpenAI-compatible API
//! 5. **Validate**: parse the completion as a JSON story array
//! 6. **Normalize**: resolve missing source URLs, coerce lists and
//!    timestamps, derive missing ids, dedupe by id
//! 7. **Output**: write the batch as a pretty-printed JSON artifact
//! 8. **Sync**: one batch upsert into the store, keyed on `id`
//!
//! Field-level problems degrade to fallbacks; failures of the homepage
//! fetch, the completion request, top-level validation, or the store merge
//! abort the run.
//!
//! ## Usage
//!
//! ```sh
//! courtside_news -j ./json -c ./config.yaml
//! ```

use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod models;
mod normalize;
mod outputs;
mod prompt;
mod resolve;
mod scrapers;
mod store;
mod utils;
mod validate;

use api::ChatCompletionsClient;
use cli::Cli;
use config::PipelineConfig;
use models::StoryRecord;
use normalize::normalize_stories;
use outputs::json;
use prompt::build_prompt;
use scrapers::nba;
use store::StoreClient;
use utils::{ensure_writable_dir, time_of_day, truncate_for_log};
use validate::parse_story_array;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("courtside_news starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.config, ?args.from_json, "Parsed CLI arguments");

    // Load config (file or environment), then let CLI/env secrets win
    let mut config = PipelineConfig::load(args.config.as_deref()).await?;
    config.apply_cli(&args);
    info!(model = %config.model, table = %config.store_table, "Pipeline configuration loaded");

    // Early check: ensure the artifact dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let http = reqwest::Client::new();

    // The run's capture instant, threaded explicitly through the prompt
    // builder and the normalizer so every record in this run carries it.
    let captured_at = Utc::now().to_rfc3339();

    let records = if let Some(ref artifact) = args.from_json {
        info!(path = %artifact, "Replaying a previous artifact; skipping extraction");
        json::read_records(artifact).await?
    } else {
        run_extraction(&http, &config, &captured_at, &args.json_output_dir).await?
    };
    info!(count = records.len(), "Record batch ready");

    if args.skip_sync {
        info!("Store sync skipped (--skip-sync)");
    } else {
        let store = StoreClient::from_config(&config, http.clone())?;
        let affected = store.upsert_records(&records).await?;
        info!(affected, "Inserted/updated rows");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// One full extraction: fetch, scan, prompt, extract, validate, normalize,
/// and write the artifact. Returns the normalized, deduplicated batch.
#[instrument(level = "info", skip_all)]
async fn run_extraction(
    http: &reqwest::Client,
    config: &PipelineConfig,
    captured_at: &str,
    json_output_dir: &str,
) -> Result<Vec<StoryRecord>, Box<dyn Error>> {
    // ---- Fetch and scan the homepage ----
    let html = nba::fetch_homepage(http).await?;
    let scan = nba::scan_homepage(&html);
    info!(
        links = scan.links.len(),
        text_bytes = scan.text.len(),
        "Indexed homepage link candidates"
    );

    // ---- Ask the model for the story array ----
    let prompt = build_prompt(&scan.text, captured_at);
    let client = ChatCompletionsClient::new(
        http.clone(),
        config.api_base_url()?,
        config.api_key()?,
        config.model.as_str(),
        config.temperature,
    );
    let raw = client.ask(&prompt).await?;

    // ---- Validate ----
    let values = match parse_story_array(&raw) {
        Ok(values) => values,
        Err(e) => {
            error!(
                response_preview = %truncate_for_log(e.raw(), 300),
                "Model returned a non-conforming payload"
            );
            return Err(e.into());
        }
    };
    info!(count = values.len(), "Validated story array");

    // ---- Resolve, normalize, dedupe ----
    let records = normalize_stories(&values, &scan.links, captured_at);
    info!(count = records.len(), "Normalized story records");

    // ---- Write the artifact ----
    let local_date = Local::now().date_naive().to_string();
    let path = json::write_records(&records, json_output_dir, &local_date, &time_of_day()).await?;
    info!(path = %path, "Artifact written");

    Ok(records)
}
