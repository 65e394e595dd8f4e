//! NBA.com news homepage scraper.
//!
//! Fetches the [NBA news homepage](https://www.nba.com/news) and scans it in
//! a single parse for (a) the page's visible text and (b) every anchor whose
//! resolved URL points at a story page.
//!
//! # URL Pattern
//!
//! Story links carry a `/news/` path segment and are usually relative
//! (`/news/celtics-rally-past-bulls`); they are resolved to absolute URLs
//! against the site origin. The bare `/news` index page itself does not
//! match and is excluded.

use crate::models::LinkCandidate;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::error::Error;
use tracing::{debug, info, instrument};
use url::Url;

/// The single page each run captures.
pub const HOMEPAGE_URL: &str = "https://www.nba.com/news";

const STORY_PATH_SEGMENT: &str = "/news/";

// The origin rejects the default reqwest UA with a 403.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.6 Safari/605.1.15";

static SITE_ORIGIN: Lazy<Url> = Lazy::new(|| Url::parse("https://www.nba.com").unwrap());
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// The two views of one homepage capture.
pub struct HomepageScan {
    /// Visible page text, one line per text node, script/style noise removed.
    pub text: String,
    /// Ordered story link candidates.
    pub links: Vec<LinkCandidate>,
}

/// Fetch the homepage HTML.
///
/// This is the run's first network round-trip; any HTTP or network failure
/// here is fatal to the run.
#[instrument(level = "info", skip_all)]
pub async fn fetch_homepage(client: &Client) -> Result<String, Box<dyn Error>> {
    let response = client
        .get(HOMEPAGE_URL)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await?
        .error_for_status()?;
    let html = response.text().await?;
    info!(bytes = html.len(), url = HOMEPAGE_URL, "Fetched homepage");
    Ok(html)
}

/// Scan a homepage capture for its visible text and story link candidates.
///
/// Anchors with empty text or empty href are skipped, as are anchors whose
/// resolved URL lacks the story path segment. No matches is a valid result:
/// the URL resolver then returns `None` for every record.
pub fn scan_homepage(html: &str) -> HomepageScan {
    let document = Html::parse_document(html);

    let mut text = String::new();
    for node in document.tree.nodes() {
        let scraper::node::Node::Text(chunk) = node.value() else {
            continue;
        };
        if let Some(parent) = node.parent() {
            if let Some(element) = parent.value().as_element() {
                let name = element.name();
                if name == "script" || name == "style" || name == "noscript" {
                    continue;
                }
            }
        }
        let trimmed = chunk.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        text.push_str(trimmed);
        text.push('\n');
    }

    let mut links = Vec::new();
    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.trim().is_empty() {
            continue;
        }
        let display_text = element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if display_text.is_empty() {
            continue;
        }
        let Ok(resolved) = SITE_ORIGIN.join(href.trim()) else {
            continue;
        };
        if !resolved.path().contains(STORY_PATH_SEGMENT) {
            continue;
        }
        links.push(LinkCandidate {
            display_text,
            absolute_url: resolved.to_string(),
        });
    }

    debug!(
        links = links.len(),
        text_bytes = text.len(),
        "Scanned homepage"
    );
    HomepageScan { text, links }
}
