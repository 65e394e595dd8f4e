//! Homepage fetching and scanning.
//!
//! The pipeline reads exactly one page per run: the league news homepage.
//! [`nba`] exposes the two-phase pattern the rest of the pipeline builds on:
//!
//! 1. **Fetching**: one GET of the homepage, returning raw HTML
//! 2. **Scanning**: one parse yielding the page's visible text (the blob
//!    handed to the prompt builder) and the ordered list of story link
//!    candidates (handed to the URL resolver)

pub mod nba;
