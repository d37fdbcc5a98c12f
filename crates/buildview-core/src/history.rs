use serde::Deserialize;
use serde::Serialize;

use super::state::Build;
use super::state::BuildId;

/// Cursor for the next page of a job's build history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub until: BuildId,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub builds: Vec<Build>,
    #[serde(default)]
    pub next: Option<Page>,
}

/// Builds of the current job, most recent first, in server order.
///
/// Entries are only ever appended or replaced in place by id; the order is
/// never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct History {
    builds: Vec<Build>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builds(&self) -> &[Build] {
        &self.builds
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    pub fn clear(&mut self) {
        self.builds.clear();
    }

    pub fn append(&mut self, builds: impl IntoIterator<Item = Build>) {
        self.builds.extend(builds);
    }

    pub fn prepend(&mut self, build: Build) {
        self.builds.insert(0, build);
    }

    /// Replaces the entry with the same id. Returns false when no entry
    /// matched, in which case the history is untouched.
    pub fn replace(&mut self, build: &Build) -> bool {
        match self.builds.iter_mut().find(|entry| entry.id == build.id) {
            Some(entry) => {
                *entry = build.clone();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: BuildId) -> Option<&Build> {
        self.builds.iter().find(|entry| entry.id == id)
    }

    pub fn position(&self, id: BuildId) -> Option<usize> {
        self.builds.iter().position(|entry| entry.id == id)
    }

    /// The neighbour listed before `id`, i.e. the next more recent build.
    pub fn previous_of(&self, id: BuildId) -> Option<&Build> {
        let idx = self.position(id)?;
        idx.checked_sub(1).and_then(|prev| self.builds.get(prev))
    }

    /// The neighbour listed after `id`, i.e. the next older build.
    pub fn next_of(&self, id: BuildId) -> Option<&Build> {
        let idx = self.position(id)?;
        self.builds.get(idx + 1)
    }

    pub fn is_latest(&self, id: BuildId) -> bool {
        self.builds.first().is_some_and(|entry| entry.id == id)
    }
}
