use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extract::mcpdir::McpdirServer;
use crate::registry::{CandidateRecord, Registry, UnifiedRecord};

pub const INDEX_FILE: &str = "REGISTRY_INDEX.md";
pub const JSON_FILE: &str = "registry.json";
pub const MCPDIR_INDEX_FILE: &str = "MCPDIR_INDEX.md";
pub const SCRAPED_URLS_FILE: &str = "scraped_urls.txt";

const MCPDIR_SECTIONS: &[&str] = &[
    "Official Servers",
    "Reference Implementations",
    "Community Servers",
];

const UNCATEGORIZED: &str = "Uncategorized";
const DESCRIPTION_WIDTH: usize = 80;
const MAX_SOURCES: usize = 3;
const TOP_BY_POPULARITY: usize = 50;

fn category_of(record: &UnifiedRecord) -> &str {
    record.primary_category().unwrap_or(UNCATEGORIZED)
}

fn anchor(category: &str) -> String {
    category.to_lowercase().replace([' ', '/'], "-")
}

/// Truncate to `max` chars and make safe for a table cell.
fn cell(text: &str, max: usize) -> String {
    let shortened = if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    };
    shortened.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn display_name(record: &UnifiedRecord) -> &str {
    if record.name.is_empty() {
        record.url.rsplit('/').next().unwrap_or(&record.url)
    } else {
        &record.name
    }
}

fn link(record: &UnifiedRecord) -> String {
    let name = cell(display_name(record), usize::MAX);
    if record.url.starts_with("https://") {
        format!("[{}]({})", name, record.url)
    } else {
        name
    }
}

/// Markdown index grouped by each record's first category.
pub fn render_index(registry: &Registry) -> String {
    let mut by_category: BTreeMap<&str, Vec<&UnifiedRecord>> = BTreeMap::new();
    for record in registry.values() {
        by_category.entry(category_of(record)).or_default().push(record);
    }

    let mut lines = vec![
        "# Unified MCP Server Registry Index".to_string(),
        String::new(),
        format!("**Total Servers**: {}", registry.len()),
        format!("**Categories**: {}", by_category.len()),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Categories\n".to_string(),
    ];

    for (category, records) in &by_category {
        lines.push(format!("- [{}](#{}) ({})", category, anchor(category), records.len()));
    }
    lines.push(String::new());

    let mut ranked: Vec<&UnifiedRecord> = registry
        .values()
        .filter(|r| r.popularity.is_some())
        .collect();
    ranked.sort_by(|a, b| b.popularity.cmp(&a.popularity).then_with(|| a.url.cmp(&b.url)));
    if !ranked.is_empty() {
        lines.push("## Top Servers by Popularity\n".to_string());
        lines.push("| Server | Stars | Description |".to_string());
        lines.push("|--------|-------|-------------|".to_string());
        for record in ranked.iter().take(TOP_BY_POPULARITY) {
            lines.push(format!(
                "| {} | {} | {} |",
                link(record),
                record.popularity.unwrap_or_default(),
                cell(&record.description, DESCRIPTION_WIDTH),
            ));
        }
        lines.push(String::new());
    }

    for (category, records) in by_category.iter_mut() {
        records.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.url.cmp(&b.url))
        });

        lines.push(format!("\n## {}\n", category));
        lines.push("| Server | Description | Sources |".to_string());
        lines.push("|--------|-------------|---------|".to_string());
        for record in records.iter() {
            let sources: Vec<&str> = record
                .sources
                .iter()
                .take(MAX_SOURCES)
                .map(String::as_str)
                .collect();
            lines.push(format!(
                "| {} | {} | {} |",
                link(record),
                cell(&record.description, DESCRIPTION_WIDTH),
                sources.join(", "),
            ));
        }
    }

    lines.join("\n")
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: String,
    count: usize,
    servers: BTreeMap<&'a str, JsonServer<'a>>,
}

#[derive(Serialize)]
struct JsonServer<'a> {
    name: &'a str,
    description: &'a str,
    categories: Vec<&'a str>,
    sources: Vec<&'a str>,
    popularity: Option<u64>,
}

pub fn render_json(registry: &Registry, generated_at: DateTime<Utc>) -> Result<String> {
    let servers = registry
        .iter()
        .map(|(key, r)| {
            (
                key.as_str(),
                JsonServer {
                    name: &r.name,
                    description: &r.description,
                    categories: r.categories.iter().map(String::as_str).collect(),
                    sources: r.sources.iter().map(String::as_str).collect(),
                    popularity: r.popularity,
                },
            )
        })
        .collect();

    let export = JsonExport {
        generated_at: generated_at.to_rfc3339(),
        count: registry.len(),
        servers,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Write the markdown index and JSON export into `dir`.
pub fn write_outputs(registry: &Registry, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let index_path = dir.join(INDEX_FILE);
    std::fs::write(&index_path, render_index(registry))
        .with_context(|| format!("Failed to write {}", index_path.display()))?;

    let json_path = dir.join(JSON_FILE);
    std::fs::write(&json_path, render_json(registry, Utc::now())?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    Ok((index_path, json_path))
}

// ── Per-source outputs ──

fn with_commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn server_link(record: &CandidateRecord) -> String {
    if record.raw_url.starts_with("https://") {
        format!("[{}]({})", record.name, record.raw_url)
    } else {
        record.name.clone()
    }
}

/// Markdown index of the mcpdir export, grouped by classification.
pub fn render_mcpdir_index(servers: &[McpdirServer]) -> String {
    let mut by_section: BTreeMap<&str, Vec<&McpdirServer>> = BTreeMap::new();
    for server in servers {
        let section = server.record.category.as_deref().unwrap_or("Community Servers");
        by_section.entry(section).or_default().push(server);
    }

    let mut lines = vec![
        "# mcpdir Server Index".to_string(),
        String::new(),
        "**Source**: [mcpdir.dev](https://mcpdir.dev) ([GitHub](https://github.com/eL1fe/mcpdir))"
            .to_string(),
        format!("**Total Servers**: {}", servers.len()),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Statistics\n".to_string(),
    ];
    for (section, items) in &by_section {
        lines.push(format!("- **{}**: {}", section, items.len()));
    }
    lines.push(String::new());

    let mut starred: Vec<&McpdirServer> = servers
        .iter()
        .filter(|s| s.record.popularity.is_some_and(|p| p > 0))
        .collect();
    starred.sort_by(|a, b| b.record.popularity.cmp(&a.record.popularity));
    if !starred.is_empty() {
        lines.push("## Top Servers by Stars\n".to_string());
        lines.push("| Server | Stars | Description |".to_string());
        lines.push("|--------|-------|-------------|".to_string());
        for server in starred.iter().take(TOP_BY_POPULARITY) {
            lines.push(format!(
                "| {} | {} | {} |",
                server_link(&server.record),
                with_commas(server.record.popularity.unwrap_or_default()),
                cell(&server.record.description, 60),
            ));
        }
        lines.push(String::new());
    }

    for section in MCPDIR_SECTIONS {
        let Some(items) = by_section.get_mut(section) else {
            continue;
        };
        items.sort_by(|a, b| {
            b.record
                .popularity
                .unwrap_or_default()
                .cmp(&a.record.popularity.unwrap_or_default())
                .then_with(|| a.record.name.to_lowercase().cmp(&b.record.name.to_lowercase()))
        });

        lines.push(format!("\n## {}\n", section));
        lines.push("| Server | Stars | Provider | Description |".to_string());
        lines.push("|--------|-------|----------|-------------|".to_string());
        for server in items.iter() {
            let stars = match server.record.popularity {
                Some(p) if p > 0 => p.to_string(),
                _ => "-".to_string(),
            };
            let provider = if server.provider.is_empty() {
                "-".to_string()
            } else {
                cell(&server.provider, usize::MAX)
            };
            lines.push(format!(
                "| {} | {} | {} | {} |",
                server_link(&server.record),
                stars,
                provider,
                cell(&server.record.description, 50),
            ));
        }
    }

    lines.join("\n")
}

pub fn write_mcpdir_index(servers: &[McpdirServer], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(MCPDIR_INDEX_FILE);
    std::fs::write(&path, render_mcpdir_index(servers))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Sorted, de-duplicated raw URLs, one per line.
pub fn render_url_list<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a CandidateRecord>,
{
    let urls: BTreeSet<&str> = records.into_iter().map(|r| r.raw_url.as_str()).collect();
    urls.into_iter().collect::<Vec<_>>().join("\n")
}

pub fn write_url_list<'a, I>(records: I, dir: &Path) -> Result<PathBuf>
where
    I: IntoIterator<Item = &'a CandidateRecord>,
{
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(SCRAPED_URLS_FILE);
    std::fs::write(&path, render_url_list(records))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

// ── Tests ──
