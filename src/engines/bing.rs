use super::{Candidate, Engine, RESULTS_PER_PAGE, element_text, selector};
use crate::error::DriverError;
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use scraper::Html;
use std::collections::HashSet;
use url::Url;

const SEARCH_ENDPOINT: &str = "https://www.bing.com/search";

pub(crate) const CHALLENGE_URL_MARKERS: &[&str] = &["/challenge", "turing/captcha"];

pub(crate) const CHALLENGE_PAGE_MARKERS: &[&str] = &[
    "id=\"b_captcha\"",
    "cf-turnstile",
    "solve the challenge below",
];

/// Bing's `first` parameter is one-based
pub(crate) fn search_url(query: &str, page_index: usize) -> Result<Url, url::ParseError> {
    let first = (page_index * RESULTS_PER_PAGE + 1).to_string();
    Url::parse_with_params(SEARCH_ENDPOINT, &[("q", query), ("first", first.as_str())])
}

/// Parses a Bing results page: one link per `li.b_algo`, taken from `h2 a`.
/// Click-tracking redirects are unwrapped to the result they point at.
pub fn parse(html: &str) -> Result<Vec<Candidate>, DriverError> {
    let doc = Html::parse_document(html);

    let result_selector = selector("li.b_algo")?;
    let link_selector = selector("h2 a[href]")?;
    let snippet_selector = selector(".b_caption p, .b_lineclamp2")?;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for result in doc.select(&result_selector) {
        let Some(anchor) = result.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_href(href) else {
            ::log::trace!("Skipping Bing link: {}", href);
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        candidates.push(Candidate {
            url,
            title: element_text(anchor),
            description: result.select(&snippet_selector).next().and_then(element_text),
            source_engine: Engine::Bing,
        });
    }

    ::log::debug!("Bing parser found {} links", candidates.len());
    Ok(candidates)
}

/// Absolute target of a result href. Relative hrefs point back into Bing
/// and yield None, as do redirects whose target cannot be decoded.
fn resolve_href(href: &str) -> Option<String> {
    let href = href.trim();
    let parsed = Url::parse(href).ok()?;
    if !is_click_redirect(&parsed) {
        return Some(href.to_string());
    }

    let encoded = parsed
        .query_pairs()
        .find(|(key, _)| key == "u")
        .map(|(_, value)| value.into_owned())?;
    decode_redirect_target(&encoded)
}

/// `https://www.bing.com/ck/a?...&u=a1<base64>` click-tracking links
fn is_click_redirect(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    (host == "bing.com" || host.ends_with(".bing.com")) && url.path().starts_with("/ck/a")
}

/// Decodes the `u` parameter of a click redirect: an `a1` marker followed
/// by the target URL in unpadded base64
fn decode_redirect_target(encoded: &str) -> Option<String> {
    let payload = encoded.strip_prefix("a1").unwrap_or(encoded).trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let target = String::from_utf8(bytes).ok()?;

    // Only absolute web URLs are results
    let url = Url::parse(&target).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_is_one_based() {
        let first_page = search_url("annual report", 0).unwrap();
        assert!(first_page.as_str().ends_with("first=1"));

        let third_page = search_url("annual report", 2).unwrap();
        assert!(third_page.as_str().ends_with("first=21"));
        assert!(third_page.as_str().contains("q=annual+report"));
    }

    #[test]
    fn test_click_redirect_is_decoded() {
        let href = "https://www.bing.com/ck/a?!&&p=4f1c2e&ptn=3&ver=2\
                    &u=a1aHR0cHM6Ly9maWxlcy5leGFtcGxlLm9yZy9yZXBvcnRzL2FubnVhbC0yMDIzLnBkZg&ntb=1";
        assert_eq!(
            resolve_href(href),
            Some("https://files.example.org/reports/annual-2023.pdf".to_string())
        );
    }

    #[test]
    fn test_redirect_target_keeps_its_query() {
        assert_eq!(
            decode_redirect_target("a1aHR0cHM6Ly9leGFtcGxlLm5ldC9kYXRhL3NhbGVzP2lkPTcmZm10PXhsc3g"),
            Some("https://example.net/data/sales?id=7&fmt=xlsx".to_string())
        );
    }

    #[test]
    fn test_undecodable_redirect_is_skipped() {
        assert_eq!(resolve_href("https://www.bing.com/ck/a?!&&p=abc&u=a1%%%"), None);
        assert_eq!(resolve_href("https://www.bing.com/ck/a?!&&p=abc"), None);
        // "a1" + base64("ftp://x")
        assert_eq!(decode_redirect_target("a1ZnRwOi8veA"), None);
    }

    #[test]
    fn test_plain_and_relative_hrefs() {
        assert_eq!(
            resolve_href(" https://example.com/a.zip "),
            Some("https://example.com/a.zip".to_string())
        );
        assert_eq!(resolve_href("/images/search?q=x"), None);
    }
}
