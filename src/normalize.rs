//! Per-record normalization of validated model output.
//!
//! Each element of the validated story array passes through here on its way
//! to becoming a [`StoryRecord`]. Field-level problems never abort the run:
//! list fields are coerced from whatever representation the model (or a
//! store read-back) produced, timestamps are canonicalized to UTC ISO-8601
//! with unparseable values retained and flagged, the topic is forced into
//! the fixed vocabulary, and a missing id is re-derived from the title. The
//! single per-record rejection is a missing or empty title, which leaves
//! nothing to key or display.

use crate::models::{LinkCandidate, RawStory, StoryRecord};
use crate::resolve::resolve_source_url;
use crate::utils::slugify_title;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// The fixed topic vocabulary.
pub const TOPICS: [&str; 11] = [
    "recap",
    "injury",
    "trade",
    "award",
    "analysis",
    "rumor",
    "signing",
    "staff",
    "preseason preview",
    "feature",
    "other",
];

const DEFAULT_TOPIC: &str = "feature";
const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// Datetime formats tried in order, assumed UTC when no offset is present.
const NAIVE_DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const NAIVE_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

// US timezone abbreviations the source text actually uses, with their fixed
// UTC offsets in hours.
const TZ_ABBREVIATIONS: [(&str, i32); 8] = [
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

static DATE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

/// Outcome of timestamp coercion.
///
/// `Unparsed` carries the original string untouched: a value that did not go
/// through normalization is never presented as if it had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercedTimestamp {
    /// Canonical `%Y-%m-%dT%H:%M:%SZ` form.
    Utc(String),
    /// The input could not be parsed; the original string is retained.
    Unparsed(String),
}

impl CoercedTimestamp {
    pub fn is_normalized(&self) -> bool {
        matches!(self, CoercedTimestamp::Utc(_))
    }

    pub fn into_inner(self) -> String {
        match self {
            CoercedTimestamp::Utc(s) | CoercedTimestamp::Unparsed(s) => s,
        }
    }
}

/// Coerce a list-shaped field into a sequence of non-empty strings.
///
/// Accepts, in order of preference: a native array (elements stringified,
/// empties dropped), null/absent (empty sequence), a string that trims to
/// `[...]` (parsed as a JSON array, falling back to comma splitting when the
/// parse fails), any other string (split on commas and trimmed), and any
/// other scalar (wrapped as a one-element sequence).
pub fn coerce_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(s)) => coerce_list_str(s),
        Some(other) => scalar_to_string(other).into_iter().collect(),
    }
}

fn coerce_list_str(s: &str) -> Vec<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
            return items.iter().filter_map(scalar_to_string).collect();
        }
        // bracketed but not valid JSON; fall through to comma splitting
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

/// Coerce any recognizable date/time representation to UTC ISO-8601.
///
/// Never fails: an unrecognized input comes back as
/// [`CoercedTimestamp::Unparsed`] with the original string intact.
pub fn coerce_timestamp(raw: &str) -> CoercedTimestamp {
    match parse_utc(raw) {
        Some(dt) => CoercedTimestamp::Utc(dt.format(ISO_UTC_FORMAT).to_string()),
        None => CoercedTimestamp::Unparsed(raw.to_string()),
    }
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some((prefix, offset)) = split_tz_abbreviation(s) {
        if let Some(naive) = parse_naive(prefix) {
            if let Some(local) = offset.from_local_datetime(&naive).single() {
                return Some(local.with_timezone(&Utc));
            }
        }
    }
    parse_naive(s).map(|naive| naive.and_utc())
}

fn split_tz_abbreviation(s: &str) -> Option<(&str, FixedOffset)> {
    let (prefix, last) = s.rsplit_once(' ')?;
    let abbreviation = last.to_ascii_uppercase();
    let hours = TZ_ABBREVIATIONS
        .iter()
        .find(|(name, _)| *name == abbreviation)
        .map(|(_, hours)| *hours)?;
    Some((prefix.trim_end(), FixedOffset::east_opt(hours * 3600).unwrap()))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn coerce_topic(raw: Option<&str>) -> String {
    let candidate = raw.unwrap_or("").trim().to_lowercase();
    if TOPICS.contains(&candidate.as_str()) {
        candidate
    } else {
        DEFAULT_TOPIC.to_string()
    }
}

// The model is told to use null for unknowns but occasionally emits a
// placeholder string instead.
fn clean_optional(raw: Option<String>) -> Option<String> {
    let value = raw?.trim().to_string();
    if value.is_empty() || value.eq_ignore_ascii_case("n/a") || value.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(value)
    }
}

fn derive_id(title: &str, context: &str, index: usize) -> String {
    let slug = slugify_title(title);
    if slug.is_empty() {
        return format!("story-{}", index + 1);
    }
    if let Some(token) = DATE_TOKEN_RE.find(context) {
        if !slug.contains(token.as_str()) {
            return format!("{slug}-{}", token.as_str());
        }
    }
    slug
}

/// Normalize one validated story value into a [`StoryRecord`].
///
/// `captured_at` is the run's capture instant and overrides whatever the
/// model echoed into `extracted_at`. Returns `None` for a story with no
/// usable title.
pub fn normalize_story(
    value: &Value,
    links: &[LinkCandidate],
    captured_at: &str,
    index: usize,
) -> Option<StoryRecord> {
    let raw: RawStory = match serde_json::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(index, error = %e, "Story element is not a usable object; skipping");
            return None;
        }
    };

    let title = raw.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        warn!(index, "Story has no usable title; skipping");
        return None;
    }

    let mut source_url = clean_optional(raw.source_url);
    if source_url.is_none() {
        source_url = resolve_source_url(&title, links).map(str::to_string);
        match &source_url {
            Some(url) => debug!(index, %title, %url, "Resolved source URL from link candidates"),
            None => debug!(index, %title, "No link candidate matched; source_url stays null"),
        }
    }

    let players = coerce_list(raw.players.as_ref());
    let teams = coerce_list(raw.teams.as_ref());
    let topic = coerce_topic(raw.topic.as_deref());
    let summary = clean_optional(raw.summary).unwrap_or_else(|| {
        warn!(index, %title, "Story has no summary");
        String::new()
    });

    let extracted_at = coerce_timestamp(captured_at).into_inner();

    let published_at = clean_optional(raw.published_at).map(|p| match coerce_timestamp(&p) {
        CoercedTimestamp::Utc(ts) => ts,
        CoercedTimestamp::Unparsed(original) => {
            warn!(index, %title, value = %original, "published_at did not normalize to UTC; keeping the original string");
            original
        }
    });

    let id = match clean_optional(raw.id) {
        Some(id) => id,
        None => {
            let context = format!("{} {}", summary, published_at.as_deref().unwrap_or(""));
            let fallback = derive_id(&title, &context, index);
            debug!(index, %fallback, "Story id missing; derived from title");
            fallback
        }
    };

    Some(StoryRecord {
        id,
        title,
        source_url,
        topic,
        players,
        teams,
        summary,
        extracted_at,
        published_at,
    })
}

/// Normalize the whole validated array and dedupe by id.
///
/// Within a run the first record with a given id wins; across runs the
/// store's upsert makes the last write win.
#[instrument(level = "info", skip_all, fields(stories = values.len()))]
pub fn normalize_stories(
    values: &[Value],
    links: &[LinkCandidate],
    captured_at: &str,
) -> Vec<StoryRecord> {
    let records: Vec<StoryRecord> = values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| normalize_story(value, links, captured_at, index))
        .collect();

    let before = records.len();
    let records: Vec<StoryRecord> = records
        .into_iter()
        .unique_by(|record| record.id.clone())
        .collect();
    if records.len() < before {
        warn!(
            dropped = before - records.len(),
            "Dropped records sharing an id within this run"
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CAPTURED_AT: &str = "2025-08-06T12:00:00+00:00";

    fn link(text: &str, url: &str) -> LinkCandidate {
        LinkCandidate {
            display_text: text.to_string(),
            absolute_url: url.to_string(),
        }
    }

    // -- list coercion ------------------------------------------------------

    #[test]
    fn test_coerce_list_native_array() {
        let value = json!(["Jayson Tatum", "Derrick White"]);
        assert_eq!(coerce_list(Some(&value)), vec!["Jayson Tatum", "Derrick White"]);
    }

    #[test]
    fn test_coerce_list_null_and_absent() {
        assert!(coerce_list(Some(&Value::Null)).is_empty());
        assert!(coerce_list(None).is_empty());
    }

    #[test]
    fn test_coerce_list_json_encoded_string() {
        let value = json!(r#"["Boston Celtics","Los Angeles Lakers"]"#);
        assert_eq!(
            coerce_list(Some(&value)),
            vec!["Boston Celtics", "Los Angeles Lakers"]
        );
    }

    #[test]
    fn test_coerce_list_comma_delimited_string() {
        let value = json!("Boston Celtics, Los Angeles Lakers , ");
        assert_eq!(
            coerce_list(Some(&value)),
            vec!["Boston Celtics", "Los Angeles Lakers"]
        );
    }

    #[test]
    fn test_coerce_list_bare_scalar() {
        assert_eq!(coerce_list(Some(&json!(23))), vec!["23"]);
        assert_eq!(coerce_list(Some(&json!("LeBron James"))), vec!["LeBron James"]);
    }

    #[test]
    fn test_coerce_list_bracketed_garbage_falls_back_to_splitting() {
        let value = json!("[Boston Celtics, Chicago Bulls]");
        let coerced = coerce_list(Some(&value));
        assert_eq!(coerced.len(), 2);
        assert!(coerced[0].contains("Boston Celtics"));
    }

    #[test]
    fn test_coerce_list_drops_empty_and_nested_elements() {
        let value = json!(["Jayson Tatum", "", null, ["nested"]]);
        assert_eq!(coerce_list(Some(&value)), vec!["Jayson Tatum"]);
    }

    // -- timestamp coercion -------------------------------------------------

    #[test]
    fn test_timestamp_with_us_tz_abbreviation() {
        assert_eq!(
            coerce_timestamp("2024-03-01 10:00 AM EST"),
            CoercedTimestamp::Utc("2024-03-01T15:00:00Z".to_string())
        );
    }

    #[test]
    fn test_timestamp_rfc3339_offset_is_converted() {
        assert_eq!(
            coerce_timestamp("2024-03-01T10:00:00-05:00"),
            CoercedTimestamp::Utc("2024-03-01T15:00:00Z".to_string())
        );
    }

    #[test]
    fn test_timestamp_naive_is_assumed_utc() {
        assert_eq!(
            coerce_timestamp("2024-03-01 10:00:00"),
            CoercedTimestamp::Utc("2024-03-01T10:00:00Z".to_string())
        );
    }

    #[test]
    fn test_timestamp_date_only() {
        assert_eq!(
            coerce_timestamp("March 1, 2024"),
            CoercedTimestamp::Utc("2024-03-01T00:00:00Z".to_string())
        );
    }

    #[test]
    fn test_timestamp_unparseable_is_retained_and_flagged() {
        let coerced = coerce_timestamp("sometime last week");
        assert!(!coerced.is_normalized());
        assert_eq!(coerced.into_inner(), "sometime last week");
    }

    // -- topic --------------------------------------------------------------

    #[test]
    fn test_topic_vocabulary_is_enforced() {
        assert_eq!(coerce_topic(Some("Trade")), "trade");
        assert_eq!(coerce_topic(Some("preseason preview")), "preseason preview");
        assert_eq!(coerce_topic(Some("hot take")), "feature");
        assert_eq!(coerce_topic(Some("N/A")), "feature");
        assert_eq!(coerce_topic(None), "feature");
    }

    // -- full-record normalization ------------------------------------------

    #[test]
    fn test_normalize_story_fills_source_url_from_candidates() {
        let links = vec![
            link("Celtics", "https://www.nba.com/news/short"),
            link("Celtics rally past Bulls", "https://www.nba.com/news/celtics-bulls"),
        ];
        let value = json!({
            "id": "celtics-rally-past-bulls",
            "title": "Celtics rally past Bulls in OT",
            "topic": "recap",
            "players": ["Jayson Tatum"],
            "teams": ["Boston Celtics", "Chicago Bulls"],
            "summary": "Boston erased a late deficit."
        });
        let record = normalize_story(&value, &links, CAPTURED_AT, 0).unwrap();
        assert_eq!(
            record.source_url.as_deref(),
            Some("https://www.nba.com/news/celtics-bulls")
        );
    }

    #[test]
    fn test_normalize_story_unmatched_title_keeps_null_source_url() {
        let links = vec![link("Trade tracker", "https://www.nba.com/news/trades")];
        let value = json!({"id": "x", "title": "Suns hire new head coach", "summary": "s"});
        let record = normalize_story(&value, &links, CAPTURED_AT, 0).unwrap();
        assert_eq!(record.source_url, None);
    }

    #[test]
    fn test_normalize_story_rejects_missing_title() {
        assert!(normalize_story(&json!({"id": "x", "summary": "s"}), &[], CAPTURED_AT, 0).is_none());
        assert!(normalize_story(&json!({"title": "   "}), &[], CAPTURED_AT, 0).is_none());
        assert!(normalize_story(&json!("not an object"), &[], CAPTURED_AT, 0).is_none());
    }

    #[test]
    fn test_normalize_story_stamps_the_run_capture_instant() {
        let value = json!({
            "title": "Trade talk heats up",
            "summary": "s",
            "extracted_at": "1999-01-01T00:00:00Z"
        });
        let record = normalize_story(&value, &[], CAPTURED_AT, 0).unwrap();
        assert_eq!(record.extracted_at, "2025-08-06T12:00:00Z");
    }

    #[test]
    fn test_normalize_story_derives_missing_id_with_date_token() {
        let value = json!({
            "title": "Celtics rally past Bulls",
            "summary": "Boston won the opener on 2024-03-01."
        });
        let record = normalize_story(&value, &[], CAPTURED_AT, 0).unwrap();
        assert_eq!(record.id, "celtics-rally-past-bulls-2024-03-01");
    }

    #[test]
    fn test_normalize_story_placeholder_id_for_symbol_titles() {
        let value = json!({"title": "???", "summary": "s"});
        let record = normalize_story(&value, &[], CAPTURED_AT, 4).unwrap();
        assert_eq!(record.id, "story-5");
    }

    #[test]
    fn test_normalize_story_coerces_string_lists() {
        let value = json!({
            "title": "Around the league",
            "summary": "s",
            "players": "LeBron James, Luka Doncic",
            "teams": r#"["Los Angeles Lakers"]"#
        });
        let record = normalize_story(&value, &[], CAPTURED_AT, 0).unwrap();
        assert_eq!(record.players, vec!["LeBron James", "Luka Doncic"]);
        assert_eq!(record.teams, vec!["Los Angeles Lakers"]);
    }

    #[test]
    fn test_normalize_story_keeps_unparseable_published_at() {
        let value = json!({
            "title": "Sources: extension near",
            "summary": "s",
            "published_at": "sometime last week"
        });
        let record = normalize_story(&value, &[], CAPTURED_AT, 0).unwrap();
        assert_eq!(record.published_at.as_deref(), Some("sometime last week"));
    }

    #[test]
    fn test_normalize_story_normalizes_published_at() {
        let value = json!({
            "title": "Sources: extension near",
            "summary": "s",
            "published_at": "2024-03-01 10:00 AM EST"
        });
        let record = normalize_story(&value, &[], CAPTURED_AT, 0).unwrap();
        assert_eq!(record.published_at.as_deref(), Some("2024-03-01T15:00:00Z"));
    }

    #[test]
    fn test_normalize_stories_dedupes_by_id() {
        let values = vec![
            json!({"id": "same-story", "title": "Same story", "summary": "first"}),
            json!({"id": "same-story", "title": "Same story", "summary": "second"}),
            json!({"id": "other-story", "title": "Other story", "summary": "s"}),
        ];
        let records = normalize_stories(&values, &[], CAPTURED_AT);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].summary, "first");
    }

    #[test]
    fn test_normalize_stories_skips_bad_members_keeps_good() {
        let values = vec![
            json!({"title": "Good story", "summary": "s"}),
            json!({"summary": "no title"}),
            json!(42),
        ];
        let records = normalize_stories(&values, &[], CAPTURED_AT);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Good story");
    }
}
