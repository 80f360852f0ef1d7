use anyhow::{Context, Result};
use serde::Deserialize;

use crate::registry::canonical::github_key;
use crate::registry::CandidateRecord;

pub const SOURCE_ID: &str = "mcpdir";

/// One entry of mcpdir's `data/pulsemcp-slugs.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PulseEntry {
    github_url: Option<String>,
    provider_url: Option<String>,
    name: Option<String>,
    slug: Option<String>,
    description: Option<String>,
    classification: Option<String>,
    stars_count: Option<serde_json::Value>,
    provider: Option<String>,
}

/// An export entry as a candidate, plus the fields only the mcpdir index shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpdirServer {
    pub record: CandidateRecord,
    pub provider: String,
}

fn category_for(classification: &str) -> &'static str {
    match classification.trim().to_lowercase().as_str() {
        "official" => "Official Servers",
        "reference" => "Reference Implementations",
        _ => "Community Servers",
    }
}

/// Only a non-negative integer counts as a popularity figure.
fn stars(value: Option<&serde_json::Value>) -> Option<u64> {
    value.and_then(serde_json::Value::as_u64)
}

pub fn extract(json: &str, source_id: &str) -> Result<Vec<CandidateRecord>> {
    Ok(servers(json, source_id)?
        .into_iter()
        .map(|s| s.record)
        .collect())
}

pub fn servers(json: &str, source_id: &str) -> Result<Vec<McpdirServer>> {
    let entries: Vec<PulseEntry> =
        serde_json::from_str(json).context("Failed to parse mcpdir JSON export")?;

    let servers = entries
        .into_iter()
        .filter_map(|entry| {
            let github = entry.github_url.unwrap_or_default();
            let raw_url = if github_key(&github).is_ok() {
                github
            } else {
                entry.provider_url.unwrap_or_default()
            };
            if raw_url.trim().is_empty() {
                return None;
            }

            let name = entry
                .name
                .filter(|n| !n.trim().is_empty())
                .or(entry.slug)
                .unwrap_or_default();

            let record = CandidateRecord {
                raw_url,
                name,
                description: entry.description.unwrap_or_default(),
                category: Some(category_for(entry.classification.as_deref().unwrap_or("")).to_string()),
                source_id: source_id.to_string(),
                popularity: stars(entry.stars_count.as_ref()),
            };
            Some(McpdirServer {
                record,
                provider: entry.provider.unwrap_or_default().trim().to_string(),
            })
        })
        .collect();

    Ok(servers)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_maps_to_category() {
        assert_eq!(category_for("official"), "Official Servers");
        assert_eq!(category_for("Reference"), "Reference Implementations");
        assert_eq!(category_for("community"), "Community Servers");
        assert_eq!(category_for(""), "Community Servers");
    }

    #[test]
    fn github_url_preferred_over_provider() {
        let json = r#"[
            {"githubUrl": "https://github.com/acme/weather", "providerUrl": "https://acme.dev",
             "name": "Weather", "classification": "official", "starsCount": 42}
        ]"#;
        let records = extract(json, SOURCE_ID).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_url, "https://github.com/acme/weather");
        assert_eq!(records[0].category.as_deref(), Some("Official Servers"));
        assert_eq!(records[0].popularity, Some(42));
        assert_eq!(records[0].source_id, "mcpdir");
    }

    #[test]
    fn falls_back_to_provider_and_slug() {
        let json = r#"[
            {"githubUrl": "https://gitlab.com/x/y", "providerUrl": "https://x.example",
             "slug": "x-server", "starsCount": null}
        ]"#;
        let records = extract(json, SOURCE_ID).unwrap();
        assert_eq!(records[0].raw_url, "https://x.example");
        assert_eq!(records[0].name, "x-server");
        assert_eq!(records[0].popularity, None);
    }

    #[test]
    fn entries_without_url_skipped() {
        let json = r#"[{"name": "Nowhere"}, {"githubUrl": "", "providerUrl": ""}]"#;
        assert!(extract(json, SOURCE_ID).unwrap().is_empty());
    }

    #[test]
    fn invalid_stars_treated_as_absent() {
        let json = r#"[
            {"githubUrl": "https://github.com/a/b", "starsCount": -5},
            {"githubUrl": "https://github.com/a/c", "starsCount": "many"}
        ]"#;
        let records = extract(json, SOURCE_ID).unwrap();
        assert!(records.iter().all(|r| r.popularity.is_none()));
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(extract("{not json", SOURCE_ID).is_err());
    }

    #[test]
    fn provider_carried_alongside_record() {
        let json = r#"[
            {"githubUrl": "https://github.com/a/b", "provider": " Acme ", "name": "B"},
            {"githubUrl": "https://github.com/a/c", "name": "C"}
        ]"#;
        let parsed = servers(json, SOURCE_ID).unwrap();
        assert_eq!(parsed[0].provider, "Acme");
        assert_eq!(parsed[0].record.name, "B");
        assert_eq!(parsed[1].provider, "");
    }

    #[test]
    fn fixture_export() {
        let json = std::fs::read_to_string("tests/fixtures/pulsemcp-slugs.json").unwrap();
        let records = extract(&json, SOURCE_ID).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().any(|r| r.popularity == Some(1200)));
    }
}
