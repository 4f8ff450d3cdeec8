use crate::category::{self, Category};
use crate::engines::{Candidate, Engine};
use crate::filter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// An accepted link with its category and search metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedLink {
    /// The link exactly as the search engine returned it
    pub url: String,

    pub category: Category,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub source_engine: Engine,

    pub discovered_at: DateTime<Utc>,
}

impl CategorizedLink {
    /// Create a link record stamped with the current time
    pub fn new(url: impl Into<String>, category: Category, source_engine: Engine) -> Self {
        Self {
            url: url.into(),
            category,
            title: None,
            description: None,
            source_engine,
            discovered_at: Utc::now(),
        }
    }

    /// Classifies a candidate and turns it into a link record.
    /// Validation is the caller's job.
    pub fn from_candidate(candidate: Candidate) -> Self {
        let category = category::classify(&candidate.url);
        Self {
            url: candidate.url,
            category,
            title: candidate.title,
            description: candidate.description,
            source_engine: candidate.source_engine,
            discovered_at: Utc::now(),
        }
    }

    /// Key used to detect the same link found twice
    pub fn dedup_key(&self) -> String {
        filter::normalize_url(&self.url)
    }
}

/// Categorized, deduplicated links of one session.
///
/// Serializes as an object from category label to the ordered list of
/// links in that category. Every category is present, empty or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    links: BTreeMap<Category, Vec<CategorizedLink>>,
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSet {
    /// Create an empty result set listing every category
    pub fn new() -> Self {
        Self {
            links: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    /// Links of one category, in insertion order
    pub fn get(&self, category: Category) -> &[CategorizedLink] {
        self.links.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories with their links, in priority order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[CategorizedLink])> {
        self.links.iter().map(|(c, links)| (*c, links.as_slice()))
    }

    /// Total number of links across all categories
    pub fn len(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Link count per category, every category included
    pub fn counts(&self) -> BTreeMap<Category, usize> {
        self.iter().map(|(c, links)| (c, links.len())).collect()
    }

    fn push(&mut self, link: CategorizedLink) {
        self.links.entry(link.category).or_default().push(link);
    }
}

/// Accumulates accepted links into a [`ResultSet`], keeping the first
/// occurrence of every URL
#[derive(Debug, Default)]
pub struct ResultAggregator {
    seen: HashSet<String>,
    results: ResultSet,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a link. Returns false, changing nothing, if its URL is already
    /// present in any category.
    pub fn insert(&mut self, link: CategorizedLink) -> bool {
        if !self.seen.insert(link.dedup_key()) {
            ::log::trace!("Skipping duplicate link: {}", link.url);
            return false;
        }
        ::log::debug!("Stored {} link: {}", link.category, link.url);
        self.results.push(link);
        true
    }

    /// True if a link with this URL has been stored
    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(&filter::normalize_url(url))
    }

    /// Owned copy of the current results; later inserts do not affect it
    pub fn snapshot(&self) -> ResultSet {
        self.results.clone()
    }

    /// Consumes the aggregator and returns its results
    pub fn into_results(self) -> ResultSet {
        self.results
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
