use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::extract::{self, mcpdir, SourceDocument, SourceKind};
use crate::registry::CandidateRecord;

const README_NAMES: &[&str] = &["README.md", "readme.md"];
const SKIP_DIRS: &[&str] = &["scripts"];

/// Candidates extracted from one source.
pub struct Extracted {
    pub source_id: String,
    pub records: Vec<CandidateRecord>,
}

/// Read the README of every awesome-list checkout under `root`.
///
/// Each subdirectory is one source named after the directory. Unreadable
/// files are logged and skipped.
pub fn scan_directories(root: &Path) -> Result<Vec<SourceDocument>> {
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to list {}", root.display()))?;

    let mut dirs: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !SKIP_DIRS.contains(&n))
        })
        .collect();
    dirs.sort();

    let mut documents = Vec::new();
    for dir in dirs {
        let Some(readme) = README_NAMES.iter().map(|n| dir.join(n)).find(|p| p.is_file()) else {
            continue;
        };
        let source_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&readme) {
            Ok(body) => documents.push(SourceDocument {
                source_id,
                kind: SourceKind::Markdown,
                location: readme.display().to_string(),
                body,
            }),
            Err(e) => warn!("Could not read {}: {}", readme.display(), e),
        }
    }

    info!("Found {} awesome-list READMEs under {}", documents.len(), root.display());
    Ok(documents)
}

/// Load mcpdir's JSON export, if the checkout is present.
pub fn read_mcpdir(export: &Path) -> Option<SourceDocument> {
    match std::fs::read_to_string(export) {
        Ok(body) => Some(SourceDocument {
            source_id: mcpdir::SOURCE_ID.to_string(),
            kind: SourceKind::Mcpdir,
            location: export.display().to_string(),
            body,
        }),
        Err(e) => {
            warn!("mcpdir export not readable at {}: {}", export.display(), e);
            None
        }
    }
}

/// Extract every document in parallel. A document that fails to parse is
/// logged and contributes nothing.
pub fn extract_documents(documents: &[SourceDocument]) -> Vec<Extracted> {
    let pb = ProgressBar::new(documents.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let extracted: Vec<Extracted> = documents
        .par_iter()
        .filter_map(|doc| {
            let result = extract::extract(doc);
            pb.inc(1);
            match result {
                Ok(records) => {
                    info!("{} ({}): {} entries", doc.source_id, doc.kind, records.len());
                    Some(Extracted {
                        source_id: doc.source_id.clone(),
                        records,
                    })
                }
                Err(e) => {
                    warn!("{} ({}): extraction failed, skipping: {:#}", doc.source_id, doc.kind, e);
                    None
                }
            }
        })
        .collect();

    pb.finish_and_clear();
    extracted
}

// ── Tests ──
