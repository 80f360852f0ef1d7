use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::registry::canonical::github_key;
use crate::registry::CandidateRecord;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Collect GitHub repository links from a registry listing page.
///
/// Relative hrefs are resolved against `page_url`. Only the first anchor per
/// repository is kept.
pub fn extract(html: &str, page_url: &str, source_id: &str) -> Vec<CandidateRecord> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = resolve(base.as_ref(), href.trim());
        if !href.to_lowercase().contains("github.com") {
            continue;
        }
        let Ok(key) = github_key(&href) else {
            continue;
        };
        if !seen.insert(key.clone()) {
            continue;
        }

        let text = collapse_whitespace(&anchor.text().collect::<String>());
        let name = if text.is_empty() {
            key.as_str().rsplit('/').next().unwrap_or_default().to_string()
        } else {
            text
        };

        records.push(CandidateRecord::new(href, name, source_id));
    }

    records
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    match (base, Url::parse(href)) {
        (_, Ok(absolute)) => absolute.to_string(),
        (Some(base), Err(_)) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        (None, Err(_)) => href.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_anchors_only() {
        let html = r#"
            <html><body>
              <a href="https://github.com/acme/weather-mcp">Weather   MCP</a>
              <a href="https://example.com/about">About</a>
              <a href="https://github.com/acme">Org page</a>
            </body></html>"#;
        let records = extract(html, "https://registry.example/servers", "pulsemcp");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Weather MCP");
        assert_eq!(records[0].source_id, "pulsemcp");
    }

    #[test]
    fn first_anchor_per_repo_wins() {
        let html = r#"
            <a href="https://github.com/acme/tool">Tool</a>
            <a href="https://github.com/Acme/Tool/tree/main">Tool (source)</a>"#;
        let records = extract(html, "https://registry.example/", "glama");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Tool");
    }

    #[test]
    fn empty_text_falls_back_to_repo_name() {
        let html = r#"<a href="https://github.com/acme/silent-server"><img src="x.png"></a>"#;
        let records = extract(html, "https://registry.example/", "smithery");
        assert_eq!(records[0].name, "silent-server");
    }

    #[test]
    fn relative_hrefs_resolved() {
        let html = r#"<a href="/servers/tool">Tool</a><a href="/out?to=github.com">Out</a>"#;
        let records = extract(html, "https://github.com/acme/list", "gh");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_url, "https://github.com/servers/tool");
    }

    #[test]
    fn fixture_page() {
        let html = std::fs::read_to_string("tests/fixtures/registry.html").unwrap();
        let records = extract(&html, "https://www.pulsemcp.com/servers", "pulsemcp");
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| github_key(&r.raw_url).is_ok()));
    }
}
