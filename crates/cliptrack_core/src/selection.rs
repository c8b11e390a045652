use crate::types::ClipId;
use std::collections::HashSet;

/// Clip ids highlighted in the UI. Carries no ordering or overlap rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<ClipId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with a single clip.
    pub fn select_only(&mut self, id: ClipId) {
        self.ids.clear();
        self.ids.insert(id);
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = ClipId>) {
        self.ids.extend(ids);
    }

    /// Add the clip if absent, remove it if present.
    pub fn toggle(&mut self, id: ClipId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn remove(&mut self, id: ClipId) -> bool {
        self.ids.remove(&id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: ClipId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = ClipId> + '_ {
        self.ids.iter().copied()
    }

    /// Drop ids that no longer name a clip.
    pub fn retain_existing(&mut self, exists: impl Fn(ClipId) -> bool) {
        self.ids.retain(|id| exists(*id));
    }
}
