//! Data models for homepage link candidates and extracted story records.
//!
//! Three shapes move through the pipeline:
//! - [`LinkCandidate`]: an anchor scraped from the homepage, kept only for the
//!   duration of one run to backfill missing source URLs
//! - [`RawStory`]: the untyped decode of one element of the model's JSON
//!   array, with every field optional so per-field problems surface as
//!   fallbacks instead of failing the whole batch
//! - [`StoryRecord`]: the normalized record that is written to the JSON
//!   artifact and merged into the store

use serde::{Deserialize, Serialize};

/// An anchor element scraped from the homepage.
///
/// Candidates are built once per run by the link indexer and discarded after
/// source-URL resolution completes. They are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// The visible anchor text, whitespace-normalized.
    pub display_text: String,
    /// The href resolved to an absolute URL against the site origin.
    pub absolute_url: String,
}

/// One story as returned by the model, before validation.
///
/// Every field is optional and the list-shaped fields are left as raw JSON
/// values: the model sometimes returns `players`/`teams` as native arrays,
/// sometimes as JSON-encoded or comma-joined strings. The normalizer decides
/// what each field becomes.
#[derive(Debug, Default, Deserialize)]
pub struct RawStory {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub players: Option<serde_json::Value>,
    #[serde(default)]
    pub teams: Option<serde_json::Value>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// A fully normalized story record.
///
/// After normalization every required field is present and non-null, the
/// list fields are real sequences, and `extracted_at` carries the run's
/// capture instant. `id` is the natural key the store merges on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRecord {
    /// Lowercase hyphenated slug of the title, with a `-YYYY-MM-DD` suffix
    /// when a date was discoverable.
    pub id: String,
    /// The story headline. Required and non-empty.
    pub title: String,
    /// Absolute article URL, or `None` when no link candidate matched.
    #[serde(default)]
    pub source_url: Option<String>,
    /// One of the fixed topic vocabulary; `"feature"` when indeterminate.
    pub topic: String,
    /// Player proper names, in source order. Empty when none were found.
    pub players: Vec<String>,
    /// Full franchise names (city + nickname). Empty when none were found.
    pub teams: Vec<String>,
    /// At most two sentences, grounded in the homepage text.
    pub summary: String,
    /// ISO-8601 UTC capture instant, identical for every record in a run.
    pub extracted_at: String,
    /// ISO-8601 UTC publication time when one was discoverable; the original
    /// string when it resisted parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}
