pub mod bing;
pub mod google;

#[cfg(test)]
mod tests;

use crate::error::DriverError;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Results per search engine page, used to translate page indices into offsets
pub const RESULTS_PER_PAGE: usize = 10;

/// Search engines a session can query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Google,
    Bing,
}

/// A link pulled out of a results page, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub source_engine: Engine,
}

impl Candidate {
    /// Create a candidate with no metadata
    pub fn new(url: impl Into<String>, source_engine: Engine) -> Self {
        Self {
            url: url.into(),
            title: None,
            description: None,
            source_engine,
        }
    }
}

impl Engine {
    /// Default engine order for a session
    pub const DEFAULT_ORDER: [Engine; 2] = [Engine::Google, Engine::Bing];

    pub fn name(&self) -> &'static str {
        match self {
            Engine::Google => "google",
            Engine::Bing => "bing",
        }
    }

    /// Builds the results-page URL for a query and zero-based page index
    pub fn search_url(&self, query: &str, page_index: usize) -> Result<Url, url::ParseError> {
        match self {
            Engine::Google => google::search_url(query, page_index),
            Engine::Bing => bing::search_url(query, page_index),
        }
    }

    /// Extracts result links from a results page
    pub fn parse_results(&self, html: &str) -> Result<Vec<Candidate>, DriverError> {
        match self {
            Engine::Google => google::parse(html),
            Engine::Bing => bing::parse(html),
        }
    }

    /// True if the page is a verification challenge instead of results
    pub fn is_challenge(&self, current_url: &str, html: &str) -> bool {
        let (url_markers, page_markers) = match self {
            Engine::Google => (google::CHALLENGE_URL_MARKERS, google::CHALLENGE_PAGE_MARKERS),
            Engine::Bing => (bing::CHALLENGE_URL_MARKERS, bing::CHALLENGE_PAGE_MARKERS),
        };

        let url = current_url.to_lowercase();
        if url_markers.iter().any(|m| url.contains(m)) {
            return true;
        }
        let page = html.to_lowercase();
        page_markers.iter().any(|m| page.contains(m))
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compiles a CSS selector, reporting failures as parse errors
pub(crate) fn selector(css: &str) -> Result<Selector, DriverError> {
    Selector::parse(css).map_err(|e| DriverError::Parse(format!("invalid selector {css:?}: {e:?}")))
}

/// Whitespace-collapsed text of an element, or None if it is empty
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() { None } else { Some(text) }
}
