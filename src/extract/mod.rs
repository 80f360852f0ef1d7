pub mod docker_hub;
pub mod html;
pub mod markdown;
pub mod mcpdir;

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::registry::CandidateRecord;

/// Shape of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Awesome-list README with `[name](url) - description` lines.
    Markdown,
    /// mcpdir `pulsemcp-slugs.json` export.
    Mcpdir,
    /// Registry listing page.
    Html,
    /// Docker Hub repository search API response.
    DockerHub,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Markdown => "markdown",
            SourceKind::Mcpdir => "mcpdir",
            SourceKind::Html => "html",
            SourceKind::DockerHub => "docker_hub",
        };
        f.write_str(s)
    }
}

/// A fetched or read document awaiting extraction.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source_id: String,
    pub kind: SourceKind,
    /// Where the document came from; the base for relative links.
    pub location: String,
    pub body: String,
}

/// Turn one source document into candidate records.
pub fn extract(doc: &SourceDocument) -> Result<Vec<CandidateRecord>> {
    match doc.kind {
        SourceKind::Markdown => Ok(markdown::extract(&doc.body, &doc.source_id)),
        SourceKind::Mcpdir => mcpdir::extract(&doc.body, &doc.source_id),
        SourceKind::Html => Ok(html::extract(&doc.body, &doc.location, &doc.source_id)),
        SourceKind::DockerHub => docker_hub::extract(&doc.body, &doc.source_id),
    }
}

// ── Tests ──
