//! Pipeline configuration: extraction endpoint, model settings, and store
//! coordinates.
//!
//! Configuration is loaded from a YAML file when `--config` is given,
//! otherwise assembled from environment variables. Secrets (the extraction
//! API key and the store service key) normally arrive through the CLI's
//! env-backed flags and are merged in with [`PipelineConfig::apply_cli`].
//!
//! ```yaml
//! api_base_url: "https://llm-proxy.example.com"
//! model: "gpt-4o"
//! temperature: 0.2
//! store_url: "https://abcdefgh.supabase.co"
//! store_table: "nba_news_data"
//! ```

use crate::cli::Cli;
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, info, instrument};

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_table() -> String {
    "nba_news_data".to_string()
}

/// Runtime configuration for one pipeline run.
///
/// The extraction and store coordinates are each checked only when that leg
/// of the pipeline actually runs, so a `--from-json` replay needs no
/// extraction endpoint and a `--skip-sync` run needs no store.
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the OpenAI-compatible completion service.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Model identifier sent with each completion request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature. Low, favoring determinism over creativity.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// API key for the completion service. Usually supplied via CLI/env.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the persistent store's REST endpoint.
    #[serde(default)]
    pub store_url: Option<String>,
    /// Service key for the store. Usually supplied via CLI/env.
    #[serde(default)]
    pub store_key: Option<String>,
    /// Table the sync writer merges records into.
    #[serde(default = "default_table")]
    pub store_table: String,
}

impl PipelineConfig {
    /// Load configuration from a YAML file, or from the environment when no
    /// path is given.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(p) => {
                let raw = tokio::fs::read_to_string(p).await?;
                let config: PipelineConfig = serde_yaml::from_str(&raw)?;
                info!(path = %p, model = %config.model, "Loaded config file");
                Ok(config)
            }
            None => {
                debug!("No config file given; reading environment");
                Self::from_env()
            }
        }
    }

    fn from_env() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            api_base_url: std::env::var("COURTSIDE_API_BASE_URL").ok(),
            model: std::env::var("COURTSIDE_MODEL").unwrap_or_else(|_| default_model()),
            temperature: default_temperature(),
            api_key: None,
            store_url: std::env::var("SUPABASE_URL").ok(),
            store_key: None,
            store_table: std::env::var("STORE_TABLE").unwrap_or_else(|_| default_table()),
        })
    }

    /// Merge in the CLI's env-backed secret flags. CLI values win over the
    /// config file.
    pub fn apply_cli(&mut self, args: &Cli) {
        if args.api_key.is_some() {
            self.api_key = args.api_key.clone();
        }
        if args.store_key.is_some() {
            self.store_key = args.store_key.clone();
        }
    }

    /// The completion service base URL, required before any extraction.
    pub fn api_base_url(&self) -> Result<&str, Box<dyn Error>> {
        self.api_base_url.as_deref().ok_or_else(|| {
            "extraction endpoint is not set (set api_base_url in the config file or COURTSIDE_API_BASE_URL)"
                .into()
        })
    }

    /// The extraction API key, required before any completion request.
    pub fn api_key(&self) -> Result<&str, Box<dyn Error>> {
        self.api_key
            .as_deref()
            .ok_or_else(|| "extraction API key is not set (pass --api-key or set COURTSIDE_API_KEY)".into())
    }
}
