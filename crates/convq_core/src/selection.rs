use std::collections::HashSet;

use crate::JobId;

/// Ordered set of job ids picked by the user.
///
/// Order is the order the presentation layer reported; duplicates are
/// dropped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    ids: Vec<JobId>,
}

impl Selection {
    pub fn new(ids: impl IntoIterator<Item = JobId>) -> Self {
        let mut seen = HashSet::new();
        let ids = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        Self { ids }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[JobId] {
        &self.ids
    }

    pub fn first(&self) -> Option<JobId> {
        self.ids.first().copied()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<JobId> for Selection {
    fn from_iter<T: IntoIterator<Item = JobId>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Source of the current selection. Selection UI lives outside the queue;
/// the queue only asks for the ids.
pub trait SelectionProvider {
    fn selection(&self) -> Selection;
}

impl SelectionProvider for Selection {
    fn selection(&self) -> Selection {
        self.clone()
    }
}
