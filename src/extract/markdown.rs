use std::sync::LazyLock;

use regex::Regex;

use crate::registry::CandidateRecord;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,3}\s+(.+)$").unwrap());
static GITHUB_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[([^\]]+)\]\((https://github\.com/[^)]+)\)(?:\s*[-–—:]\s*(.+?))?(?:\n|$)")
        .unwrap()
});

/// Extract `[name](https://github.com/...) - description` entries from an
/// awesome-list README. The nearest `#`..`###` heading is the category.
pub fn extract(markdown: &str, source_id: &str) -> Vec<CandidateRecord> {
    let mut records = Vec::new();
    let mut category: Option<String> = None;

    for line in markdown.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            category = Some(caps[1].trim().to_string());
            continue;
        }

        for caps in GITHUB_LINK_RE.captures_iter(line) {
            let name = caps[1].trim().to_string();
            let url = caps[2].trim().to_string();

            // cross-links to other awesome lists
            if url.to_lowercase().contains("awesome") && !name.to_lowercase().contains("mcp") {
                continue;
            }

            records.push(CandidateRecord {
                raw_url: url,
                name,
                description: caps.get(3).map(|d| d.as_str().trim().to_string()).unwrap_or_default(),
                category: category.clone(),
                source_id: source_id.to_string(),
                popularity: None,
            });
        }
    }

    records
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_with_heading_category() {
        let md = "\
# Awesome MCP

Intro text.

## Databases

- [Postgres MCP](https://github.com/acme/postgres-mcp) - Query Postgres from agents
- [SQLite](https://github.com/acme/sqlite-mcp/tree/main): Local SQLite access

### Search
- [Finder](https://github.com/other/finder) — Search everything
";
        let records = extract(md, "awesome-one");
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].name, "Postgres MCP");
        assert_eq!(records[0].raw_url, "https://github.com/acme/postgres-mcp");
        assert_eq!(records[0].description, "Query Postgres from agents");
        assert_eq!(records[0].category.as_deref(), Some("Databases"));
        assert_eq!(records[0].source_id, "awesome-one");

        assert_eq!(records[1].raw_url, "https://github.com/acme/sqlite-mcp/tree/main");
        assert_eq!(records[1].description, "Local SQLite access");

        assert_eq!(records[2].category.as_deref(), Some("Search"));
        assert_eq!(records[2].description, "Search everything");
    }

    #[test]
    fn link_without_description() {
        let records = extract("- [Bare](https://github.com/a/bare)", "s");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "");
        assert_eq!(records[0].category, None);
    }

    #[test]
    fn trailing_text_without_separator_is_not_an_entry() {
        assert!(extract("See [Tool](https://github.com/a/tool) for details", "s").is_empty());
    }

    #[test]
    fn skips_awesome_cross_links() {
        let md = "\
- [Awesome Lists](https://github.com/someone/awesome-lists) - Other lists
- [Awesome MCP Clients](https://github.com/someone/awesome-mcp-clients) - Clients
";
        let records = extract(md, "s");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Awesome MCP Clients");
    }

    #[test]
    fn ignores_non_github_links() {
        let records = extract("- [Site](https://example.com/server) - A site", "s");
        assert!(records.is_empty());
    }

    #[test]
    fn fixture_readme() {
        let md = std::fs::read_to_string("tests/fixtures/awesome-mcp.md").unwrap();
        let records = extract(&md, "awesome-mcp");
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.raw_url.starts_with("https://github.com/")));
        assert!(records
            .iter()
            .any(|r| r.category.as_deref().is_some_and(|c| c.ends_with(" Databases"))));
    }
}
