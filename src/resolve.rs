//! Source-URL resolution against the run's link candidates.
//!
//! Titles returned by the model may be paraphrased, truncated, or
//! reformatted relative to the original anchor text, so resolution is a
//! containment heuristic rather than an exact match. This is a pure function
//! over (title, candidate list) so it can be exercised against literal
//! candidate lists.

use crate::models::LinkCandidate;

/// Find the best candidate URL for a record lacking one.
///
/// A candidate matches when, case-insensitively, its display text contains
/// the title or the title contains the display text. Among matches the
/// longest display text wins; a short candidate like a bare team name is
/// more likely to be a coincidental substring. Ties keep the earliest
/// candidate. Returns `None` when nothing matches.
pub fn resolve_source_url<'a>(title: &str, candidates: &'a [LinkCandidate]) -> Option<&'a str> {
    let needle = title.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<&LinkCandidate> = None;
    for candidate in candidates {
        let hay = candidate.display_text.trim().to_lowercase();
        if hay.is_empty() {
            continue;
        }
        if !hay.contains(&needle) && !needle.contains(&hay) {
            continue;
        }
        match best {
            Some(current) if candidate.display_text.len() <= current.display_text.len() => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|candidate| candidate.absolute_url.as_str())
}
