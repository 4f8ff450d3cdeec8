use crate::engines::{Candidate, Engine};

const GOOGLE_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<div id="search">
  <div data-hveid="CAEQAA">
    <a href="/url?q=https://example.com/reports/annual-2023.pdf&amp;sa=U&amp;ved=2ahUKE"><h3>Annual Report 2023</h3></a>
    <div class="VwiC3b">The full   annual
      report as a PDF.</div>
  </div>
  <div data-hveid="CAIQAA">
    <a href="https://drive.google.com/file/d/abc123/view"><h3>Shared folder</h3></a>
  </div>
  <div data-hveid="CAMQAA">
    <a href="https://www.google.com/search?q=related"><h3>Related searches</h3></a>
  </div>
  <div data-hveid="CAQQAA">
    <a href="/search?q=people+also+ask">People also ask</a>
  </div>
  <div data-hveid="CAUQAA">
    <div data-hveid="CAUQAQ">
      <a href="https://example.org/data.xlsx"><h3>Data</h3></a>
    </div>
  </div>
  <div data-hveid="CAYQAA">
    <a href="https://www.google.com/url?sa=t&amp;source=web&amp;url=https%3A%2F%2Fexample.net%2Fmanual.docx&amp;ved=2ah"><h3>Manual</h3></a>
  </div>
</div>
</body></html>"#;

const BING_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<ol id="b_results">
  <li class="b_algo">
    <h2><a href="https://example.com/slides/intro.pptx" h="ID=SERP">Intro   slides</a></h2>
    <div class="b_caption"><p>Lecture one slides.</p></div>
  </li>
  <li class="b_algo">
    <h2><a href="https://www.mediafire.com/file/xyz/tool" h="ID=SERP">Tool download</a></h2>
  </li>
  <li class="b_algo">
    <h2><a href="/images/search?q=x">Images</a></h2>
  </li>
  <li class="b_algo">
    <div class="b_caption"><p>No title link here.</p></div>
  </li>
  <li class="b_algo">
    <h2><a href="https://example.com/slides/intro.pptx">Duplicate</a></h2>
  </li>
  <li class="b_algo">
    <h2><a href="https://www.bing.com/ck/a?!&amp;&amp;p=9a2b7c&amp;ptn=3&amp;ver=2&amp;hsh=4&amp;u=a1aHR0cHM6Ly9maWxlcy5leGFtcGxlLm9yZy9yZXBvcnRzL2FubnVhbC0yMDIzLnBkZg&amp;ntb=1">Annual report</a></h2>
    <div class="b_caption"><p>Annual report 2023 (PDF).</p></div>
  </li>
</ol>
</body></html>"#;

#[test]
fn test_google_results_are_extracted() {
    let results = Engine::Google.parse_results(GOOGLE_PAGE).unwrap();

    let urls: Vec<&str> = results.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/reports/annual-2023.pdf",
            "https://drive.google.com/file/d/abc123/view",
            "https://example.org/data.xlsx",
            "https://example.net/manual.docx",
        ]
    );

    assert_eq!(results[0].title.as_deref(), Some("Annual Report 2023"));
    assert_eq!(
        results[0].description.as_deref(),
        Some("The full annual report as a PDF.")
    );
    assert_eq!(results[1].description, None);
    assert!(results.iter().all(|c| c.source_engine == Engine::Google));
}

#[test]
fn test_bing_results_are_extracted() {
    let results = Engine::Bing.parse_results(BING_PAGE).unwrap();

    assert_eq!(
        results,
        vec![
            Candidate {
                url: "https://example.com/slides/intro.pptx".to_string(),
                title: Some("Intro slides".to_string()),
                description: Some("Lecture one slides.".to_string()),
                source_engine: Engine::Bing,
            },
            Candidate {
                url: "https://www.mediafire.com/file/xyz/tool".to_string(),
                title: Some("Tool download".to_string()),
                description: None,
                source_engine: Engine::Bing,
            },
            Candidate {
                url: "https://files.example.org/reports/annual-2023.pdf".to_string(),
                title: Some("Annual report".to_string()),
                description: Some("Annual report 2023 (PDF).".to_string()),
                source_engine: Engine::Bing,
            },
        ]
    );
}

#[test]
fn test_empty_pages_yield_no_candidates() {
    let empty = "<html><body><p>No results</p></body></html>";
    assert!(Engine::Google.parse_results(empty).unwrap().is_empty());
    assert!(Engine::Bing.parse_results(empty).unwrap().is_empty());
    assert!(Engine::Google.parse_results("").unwrap().is_empty());
}

#[test]
fn test_engine_labels() {
    assert_eq!(Engine::Google.to_string(), "google");
    assert_eq!(serde_json::to_string(&Engine::Bing).unwrap(), "\"bing\"");
    assert_eq!(Engine::DEFAULT_ORDER, [Engine::Google, Engine::Bing]);
}
