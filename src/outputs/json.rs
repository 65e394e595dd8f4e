//! JSON artifact writing and replay reading.
//!
//! The artifact is the pretty-printed array of normalized records exactly as
//! the sync writer sees them. `--from-json` feeds one back into the sync
//! writer without touching the network for extraction.

use crate::models::StoryRecord;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a record batch to `{json_output_dir}/{date}/{edition}.json`.
///
/// Creates the date directory if needed and returns the written path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, %local_date, %edition))]
pub async fn write_records(
    records: &[StoryRecord],
    json_output_dir: &str,
    local_date: &str,
    edition: &str,
) -> Result<String, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;

    let full_json_dir = format!("{}/{}", json_output_dir.trim_end_matches('/'), local_date);
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let output_path = format!("{}/{}.json", full_json_dir, edition);
    fs::write(&output_path, json).await?;
    info!(path = %output_path, count = records.len(), "Wrote story artifact");

    Ok(output_path)
}

/// Read a previously written artifact back for replay.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn read_records(path: &str) -> Result<Vec<StoryRecord>, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let records: Vec<StoryRecord> = serde_json::from_str(&raw)?;
    info!(count = records.len(), "Read story artifact");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StoryRecord {
        StoryRecord {
            id: "celtics-rally-past-bulls".to_string(),
            title: "Celtics rally past Bulls".to_string(),
            source_url: Some("https://www.nba.com/news/celtics-bulls".to_string()),
            topic: "recap".to_string(),
            players: vec!["Jayson Tatum".to_string()],
            teams: vec!["Boston Celtics".to_string()],
            summary: "Boston erased a late deficit.".to_string(),
            extracted_at: "2025-08-06T12:00:00Z".to_string(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = std::env::temp_dir().join(format!("courtside_json_{}", std::process::id()));
        let dir = dir.to_str().unwrap().to_string();

        let records = vec![record()];
        let path = write_records(&records, &dir, "2025-08-06", "morning")
            .await
            .unwrap();
        assert!(path.ends_with("2025-08-06/morning.json"));

        let back = read_records(&path).await.unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id, "celtics-rally-past-bulls");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_artifact_is_pretty_printed() {
        let dir = std::env::temp_dir().join(format!("courtside_json_pp_{}", std::process::id()));
        let dir = dir.to_str().unwrap().to_string();

        let path = write_records(&[record()], &dir, "2025-08-06", "evening")
            .await
            .unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.starts_with("[\n"));
        assert!(raw.contains("  \"id\""));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
