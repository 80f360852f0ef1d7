use anyhow::{Context, Result};
use serde::Deserialize;

use crate::registry::CandidateRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchPage {
    results: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResult {
    repo_name: String,
    short_description: Option<String>,
    star_count: Option<u64>,
}

/// Extract MCP-related images from a Docker Hub repository search response.
pub fn extract(json: &str, source_id: &str) -> Result<Vec<CandidateRecord>> {
    let page: SearchPage =
        serde_json::from_str(json).context("Failed to parse Docker Hub search response")?;

    let records = page
        .results
        .into_iter()
        .filter(|r| !r.repo_name.trim().is_empty())
        .filter(|r| {
            r.repo_name.to_lowercase().contains("mcp")
                || r.short_description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains("mcp"))
        })
        .map(|r| CandidateRecord {
            raw_url: format!("https://hub.docker.com/r/{}", r.repo_name),
            name: r.repo_name,
            description: r.short_description.unwrap_or_default(),
            category: None,
            source_id: source_id.to_string(),
            popularity: r.star_count,
        })
        .collect();

    Ok(records)
}

// ── Tests ──
