//! Schema and instruction assembly for the extraction request.
//!
//! Builds the two role-tagged messages sent to the completion service: a
//! developer rule set carrying the hard constraints (JSON-only output, no
//! invented facts, the topic vocabulary, the two-sentence summary cap, the
//! fixed `extracted_at` value, the id derivation rule) and a user task that
//! requests a fixed number of distinct stories and embeds the schema plus a
//! capped slice of the homepage text.
//!
//! The grounding contract lives here and only here: downstream validation
//! checks structure, not truthfulness.

use serde_json::{Value, json};

/// How many distinct stories each run asks for.
pub const STORY_COUNT: usize = 12;

/// Maximum number of characters of homepage text embedded in the task,
/// bounding request size and cost.
pub const MAX_BLOB_CHARS: usize = 120_000;

/// The two message bodies of one extraction request.
#[derive(Debug)]
pub struct PromptParts {
    /// Hard constraints, sent with the developer role.
    pub rules: String,
    /// The extraction task, sent with the user role.
    pub task: String,
}

/// The structural contract the model's output must follow: a top-level array
/// of story objects.
pub fn story_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "title": {"type": "string"},
                "source_url": {"type": ["string", "null"]},
                "topic": {
                    "type": "string",
                    "description": "recap | injury | trade | award | analysis | rumor | signing | staff | preseason preview | feature | other"
                },
                "players": {"type": "array", "items": {"type": "string"}},
                "teams": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Full NBA franchise names (city + team name)"
                },
                "summary": {"type": "string", "description": "<= 2 sentences"},
                "extracted_at": {"type": "string"},
                "published_at": {"type": ["string", "null"]}
            },
            "required": ["id", "title", "summary", "topic", "players", "teams", "extracted_at"]
        }
    })
}

/// Assemble the rules and task for one run.
///
/// `captured_at` is the run's capture instant; the model is told to stamp it
/// verbatim on every story. The blob is truncated to [`MAX_BLOB_CHARS`]
/// characters on a char boundary.
pub fn build_prompt(blob: &str, captured_at: &str) -> PromptParts {
    let rules = format!(
        concat!(
            "You are a strict JSON API. ",
            "Return ONLY valid JSON with no prose or code fences. ",
            "Output MUST be a top-level JSON array following the provided schema. ",
            "Use ONLY information present in HOMEPAGE_BLOB. ",
            "Do NOT invent titles, players, teams, dates, or URLs. ",
            "If a field is unknown, set it to null (or [] for arrays). ",
            "If a topic is not easily found, set the topic to 'feature'. ",
            "Teams must be their full franchise name with the city + team name ",
            "(e.g. Boston Celtics, Cleveland Cavaliers). ",
            "Summaries must be at most 2 sentences. ",
            "For each item, set extracted_at to '{captured_at}'. ",
            "For id, use a lowercase-kebab-case slug of the title ",
            "(append '-YYYY-MM-DD' if a date appears)."
        ),
        captured_at = captured_at
    );

    let schema = story_schema().to_string();
    let task = format!(
        "From this NBA news HOMEPAGE blob, extract the TOP {STORY_COUNT} distinct stories/headlines.\n\
         \n\
         For each story, include:\n\
         - topic (recap, injury, trade, award, analysis, rumor, signing, staff, preseason preview, feature, other)\n\
         - players (proper names that appear in the blob)\n\
         - teams (full franchise names, ONLY if the matching team clearly appears; else [])\n\
         - <=2 sentence summary strictly grounded in the blob\n\
         - published_at and source_url ONLY if they appear in the blob\n\
         \n\
         Schema:\n\
         {schema}\n\
         \n\
         Return ONLY a JSON array.\n\
         \n\
         HOMEPAGE_BLOB:\n\
         {blob}",
        blob = cap_chars(blob, MAX_BLOB_CHARS)
    );

    PromptParts { rules, task }
}

fn cap_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
