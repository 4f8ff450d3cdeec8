use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;
use url::Url;

use crate::category::Category;

/// Path substrings that mark authentication flows
pub const AUTH_FLOW_WORDS: &[&str] = &["login", "signup", "register", "account", "profile"];

/// Hosts that serve files without a telling extension in the URL
pub const FILE_HOSTING_DOMAINS: &[&str] = &[
    "drive.google.com",
    "dropbox.com",
    "mediafire.com",
    "mega.nz",
    "rapidshare.com",
    "4shared.com",
    "scribd.com",
    "slideshare.net",
    "academia.edu",
    "researchgate.net",
    "archive.org",
    "github.com",
    "sourceforge.net",
    "bitbucket.org",
];

static DEFAULT_FILTER: LazyLock<LinkFilter> = LazyLock::new(LinkFilter::default);

/// Why a candidate link was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("not a well-formed URL")]
    Malformed,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("path looks like an authentication flow ({0})")]
    AuthFlow(String),

    #[error("no known file extension or file-hosting domain")]
    NotAFileLink,
}

/// Configuration for the link filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkFilterConfig {
    /// Case-insensitive path substrings that reject a link
    #[serde(default = "default_blocked_path_words")]
    pub blocked_path_words: Vec<String>,

    /// Hosts (and their subdomains) accepted without a file extension
    #[serde(default = "default_hosting_domains")]
    pub hosting_domains: Vec<String>,
}

fn default_blocked_path_words() -> Vec<String> {
    AUTH_FLOW_WORDS.iter().map(|w| w.to_string()).collect()
}

fn default_hosting_domains() -> Vec<String> {
    FILE_HOSTING_DOMAINS.iter().map(|d| d.to_string()).collect()
}

impl Default for LinkFilterConfig {
    fn default() -> Self {
        Self {
            blocked_path_words: default_blocked_path_words(),
            hosting_domains: default_hosting_domains(),
        }
    }
}

/// Decides which discovered links are worth keeping
#[derive(Debug)]
pub struct LinkFilter {
    config: LinkFilterConfig,
    scheme_regex: Regex,
    blocked_regex: Option<Regex>,
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::new(LinkFilterConfig::default()).expect("Default filter patterns should be valid")
    }
}

impl LinkFilter {
    /// Create a new link filter from configuration
    pub fn new(config: LinkFilterConfig) -> Result<Self, regex::Error> {
        let scheme_regex = Regex::new(r"(?i)^https?://")?;

        let words: Vec<String> = config
            .blocked_path_words
            .iter()
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(w))
            .collect();
        let blocked_regex = if words.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?i)({})", words.join("|")))?)
        };

        Ok(Self {
            config,
            scheme_regex,
            blocked_regex,
        })
    }

    /// True if the link should be kept
    pub fn is_valid(&self, url: &str) -> bool {
        self.check(url).is_ok()
    }

    /// Runs every rule against the link and reports the first one that rejects it
    pub fn check(&self, url: &str) -> Result<(), Rejection> {
        let normalized = normalize_for_matching(url);

        if !self.scheme_regex.is_match(&normalized) {
            return Err(match normalized.split_once("://") {
                Some((scheme, _)) if looks_like_scheme(scheme) => {
                    Rejection::UnsupportedScheme(scheme.to_lowercase())
                }
                _ => Rejection::Malformed,
            });
        }

        let parsed = Url::parse(&normalized).map_err(|_| Rejection::Malformed)?;
        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => return Err(Rejection::MissingHost),
        };

        let path = parsed.path().to_lowercase();
        if let Some(regex) = &self.blocked_regex {
            if let Some(hit) = regex.find(&path) {
                return Err(Rejection::AuthFlow(hit.as_str().to_lowercase()));
            }
        }

        if Category::from_path(&path).is_some() || self.is_hosting_domain(&host) {
            Ok(())
        } else {
            Err(Rejection::NotAFileLink)
        }
    }

    /// Check if a host is a configured file-hosting domain or a subdomain of one
    pub fn is_hosting_domain(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        self.config.hosting_domains.iter().any(|domain| {
            let domain = domain.to_lowercase();
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn looks_like_scheme(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_alphabetic())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Checks a link against the default filter
pub fn is_valid(url: &str) -> bool {
    DEFAULT_FILTER.is_valid(url)
}

/// Checks a link against the default filter and returns the rejection reason
pub fn check(url: &str) -> Result<(), Rejection> {
    DEFAULT_FILTER.check(url)
}

/// Produces the form of a URL used for rule matching: percent-decoded and
/// cut at the first `&` or `#`. Never stored.
pub fn normalize_for_matching(url: &str) -> String {
    let trimmed = url.trim();
    let decoded = urlencoding::decode(trimmed).unwrap_or(Cow::Borrowed(trimmed));
    let cut = decoded.find(['&', '#']).unwrap_or(decoded.len());
    decoded[..cut].to_string()
}

/// Lowercased path of the matching form of a URL, if it parses
pub fn matching_path(url: &str) -> Option<String> {
    Url::parse(&normalize_for_matching(url))
        .ok()
        .map(|parsed| parsed.path().to_lowercase())
}

/// Deduplication key for a URL: scheme, host, path and query with the
/// fragment removed. Unparseable input is returned unchanged.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
