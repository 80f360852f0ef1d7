//! Field-level precedence for combining records that share a key.

use super::UnifiedRecord;

impl UnifiedRecord {
    /// Fold `incoming` into `self` and return the result.
    ///
    /// - name: existing wins when non-empty
    /// - description: longer by character count; ties keep existing
    /// - categories, sources: union
    /// - popularity: max, a present value beats an absent one
    pub fn merge(mut self, incoming: UnifiedRecord) -> UnifiedRecord {
        self.name = pick_name(self.name, incoming.name);
        self.description = pick_description(self.description, incoming.description);
        self.categories.extend(incoming.categories);
        self.sources.extend(incoming.sources);
        self.popularity = self.popularity.max(incoming.popularity);
        self
    }
}

fn pick_name(existing: String, incoming: String) -> String {
    if existing.is_empty() {
        incoming
    } else {
        existing
    }
}

fn pick_description(existing: String, incoming: String) -> String {
    if incoming.chars().count() > existing.chars().count() {
        incoming
    } else {
        existing
    }
}

// ── Tests ──
