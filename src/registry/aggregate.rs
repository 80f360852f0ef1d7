use std::collections::btree_map::Entry;

use tracing::debug;

use super::canonical::{canonicalize, github_key};
use super::{CandidateRecord, CanonicalKey, Registry, UnifiedRecord};

/// Which URLs qualify as dedup keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyPolicy {
    /// GitHub URLs reduce to `org/repo`; other URLs group by their normalized form.
    #[default]
    Lenient,
    /// Only GitHub repository URLs are keyed; everything else is dropped.
    StrictGitHub,
}

impl KeyPolicy {
    pub fn key_for(self, raw_url: &str) -> Option<CanonicalKey> {
        match self {
            KeyPolicy::Lenient => canonicalize(raw_url),
            KeyPolicy::StrictGitHub => match github_key(raw_url) {
                Ok(key) => Some(key),
                Err(e) => {
                    debug!("{}", e);
                    None
                }
            },
        }
    }
}

/// Counts from one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    pub candidates: usize,
    pub dropped: usize,
    pub unique: usize,
}

/// Content order used to feed the fold. Name and description ties keep the
/// existing value, so the winner must not depend on arrival order.
fn fold_order(c: &CandidateRecord) -> (&str, &str, &str, &str, Option<&str>, Option<u64>) {
    (
        &c.source_id,
        &c.raw_url,
        &c.name,
        &c.description,
        c.category.as_deref(),
        c.popularity,
    )
}

/// Group candidates by canonical key and merge each group, in one pass.
///
/// Candidates without a key contribute nothing. The result depends only on
/// the candidate set, not on the order it is supplied in.
pub fn aggregate<'a, I>(candidates: I, policy: KeyPolicy) -> (Registry, AggregateSummary)
where
    I: IntoIterator<Item = &'a CandidateRecord>,
{
    let mut summary = AggregateSummary::default();

    let mut ordered: Vec<&CandidateRecord> = candidates.into_iter().collect();
    ordered.sort_by(|a, b| fold_order(a).cmp(&fold_order(b)));

    let registry = ordered
        .into_iter()
        .fold(Registry::new(), |mut registry, candidate| {
            summary.candidates += 1;
            let Some(key) = policy.key_for(&candidate.raw_url) else {
                summary.dropped += 1;
                return registry;
            };
            let incoming = UnifiedRecord::seed(&key, candidate);
            match registry.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                }
                Entry::Occupied(mut slot) => {
                    let current = std::mem::take(slot.get_mut());
                    *slot.get_mut() = current.merge(incoming);
                }
            }
            registry
        });

    summary.unique = registry.len();
    (registry, summary)
}

// ── Tests ──
