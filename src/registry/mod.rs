pub mod aggregate;
pub mod canonical;
pub mod merge;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use aggregate::{aggregate, KeyPolicy};

/// One observation of a server from one source, as extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub raw_url: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub source_id: String,
    pub popularity: Option<u64>,
}

impl CandidateRecord {
    pub fn new(raw_url: impl Into<String>, name: impl Into<String>, source_id: impl Into<String>) -> Self {
        CandidateRecord {
            raw_url: raw_url.into(),
            name: name.into(),
            source_id: source_id.into(),
            ..Default::default()
        }
    }
}

/// Normalized URL identifying a project for dedup purposes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub(crate) fn new(key: String) -> Self {
        CanonicalKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_github(&self) -> bool {
        canonical::is_github_key(&self.0)
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Merged view of every candidate sharing one [`CanonicalKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub url: String,
    pub name: String,
    pub description: String,
    pub categories: BTreeSet<String>,
    pub sources: BTreeSet<String>,
    pub popularity: Option<u64>,
}

impl UnifiedRecord {
    /// Seed a record from the first candidate seen for `key`.
    pub fn seed(key: &CanonicalKey, candidate: &CandidateRecord) -> Self {
        UnifiedRecord {
            url: key.to_string(),
            name: candidate.name.clone(),
            description: candidate.description.clone(),
            categories: candidate
                .category
                .iter()
                .filter(|c| !c.trim().is_empty())
                .cloned()
                .collect(),
            sources: BTreeSet::from([candidate.source_id.clone()]),
            popularity: candidate.popularity,
        }
    }

    /// First category in sorted order, used for grouping in the index.
    pub fn primary_category(&self) -> Option<&str> {
        self.categories.iter().next().map(String::as_str)
    }
}

/// Deduplicated registry, iterated in key order.
pub type Registry = BTreeMap<CanonicalKey, UnifiedRecord>;
