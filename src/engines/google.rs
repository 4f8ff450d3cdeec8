use super::{Candidate, Engine, RESULTS_PER_PAGE, element_text, selector};
use crate::error::DriverError;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

const SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Hosts that only ever serve Google's own navigation, never results
const INTERNAL_HOSTS: &[&str] = &[
    "www.google.com",
    "google.com",
    "accounts.google.com",
    "maps.google.com",
    "policies.google.com",
    "support.google.com",
    "translate.google.com",
    "webcache.googleusercontent.com",
];

pub(crate) const CHALLENGE_URL_MARKERS: &[&str] = &["/sorry/"];

pub(crate) const CHALLENGE_PAGE_MARKERS: &[&str] = &[
    "id=\"captcha-form\"",
    "g-recaptcha",
    "unusual traffic from your computer network",
];

pub(crate) fn search_url(query: &str, page_index: usize) -> Result<Url, url::ParseError> {
    let start = (page_index * RESULTS_PER_PAGE).to_string();
    Url::parse_with_params(SEARCH_ENDPOINT, &[("q", query), ("start", start.as_str())])
}

/// Parses a Google results page.
///
/// Every `div[data-hveid]` block contributes its first link. Redirect
/// links of the form `/url?q=...` are unwrapped and Google's own
/// navigation is skipped. Nested blocks share links, so hrefs are
/// collapsed within the page.
pub fn parse(html: &str) -> Result<Vec<Candidate>, DriverError> {
    let doc = Html::parse_document(html);

    let container_selector = selector("div[data-hveid]")?;
    let link_selector = selector("a[href]")?;
    let title_selector = selector("h3")?;
    let snippet_selector = selector("div.VwiC3b, div[data-sncf]")?;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for container in doc.select(&container_selector) {
        let Some(href) = container
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let Some(url) = resolve_href(href) else {
            ::log::trace!("Skipping Google link: {}", href);
            continue;
        };

        if !seen.insert(url.clone()) {
            continue;
        }

        candidates.push(Candidate {
            url,
            title: container.select(&title_selector).next().and_then(element_text),
            description: container
                .select(&snippet_selector)
                .next()
                .and_then(element_text),
            source_engine: Engine::Google,
        });
    }

    ::log::debug!("Google parser found {} links", candidates.len());
    Ok(candidates)
}

/// Turns a result href into an absolute external URL, or None for
/// Google-internal links. Redirects through `/url`, relative or absolute,
/// are unwrapped to their target.
fn resolve_href(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = Url::parse(href).is_ok();
    let parsed = Url::parse(SEARCH_ENDPOINT).ok()?.join(href).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    if !INTERNAL_HOSTS.contains(&host.as_str()) {
        return Some(if absolute { href.to_string() } else { parsed.into() });
    }
    if parsed.path() != "/url" {
        return None;
    }

    let target = parsed
        .query_pairs()
        .find(|(key, _)| key == "q" || key == "url")
        .map(|(_, value)| value.into_owned())?;
    resolve_href(&target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("/url?q=https://example.com/a.pdf&sa=U&ved=xyz"),
            Some("https://example.com/a.pdf".to_string())
        );
        assert_eq!(resolve_href("/search?q=next"), None);
        assert_eq!(resolve_href("https://www.google.com/preferences"), None);
        assert_eq!(
            resolve_href("https://drive.google.com/file/d/abc"),
            Some("https://drive.google.com/file/d/abc".to_string())
        );
        assert_eq!(resolve_href("#"), None);
    }

    #[test]
    fn test_absolute_redirect_is_unwrapped() {
        assert_eq!(
            resolve_href("https://www.google.com/url?sa=t&url=https%3A%2F%2Fexample.com%2Fb.docx&ved=2ah"),
            Some("https://example.com/b.docx".to_string())
        );
        assert_eq!(
            resolve_href("https://www.google.com/url?q=https://example.com/c.zip&sa=U"),
            Some("https://example.com/c.zip".to_string())
        );
        // a redirect back into Google is still internal
        assert_eq!(resolve_href("https://www.google.com/url?q=/search%3Fq%3Dx"), None);
        assert_eq!(resolve_href("https://www.google.com/url?sa=t"), None);
    }

    #[test]
    fn test_search_url_offsets() {
        let url = search_url("rust pdf", 2).unwrap();
        assert_eq!(url.host_str(), Some("www.google.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "rust pdf".to_string()),
                ("start".to_string(), "20".to_string()),
            ]
        );
    }
}
