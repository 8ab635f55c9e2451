//! Knowledge store: pre-embedded question/answer pairs
//!
//! The store is loaded from a JSON array of
//! `{"question": .., "answer": .., "embedding": [..]}` objects. The loaded
//! set is immutable; `reload` swaps the whole set atomically.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// A stored question with its answer and precomputed embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

/// Read entries from `path`
pub fn load_entries(path: &Path) -> Result<Vec<KnowledgeEntry>> {
    let raw = std::fs::read_to_string(path).map_err(|e| AppError::KnowledgeStore {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let entries: Vec<KnowledgeEntry> =
        serde_json::from_str(&raw).map_err(|e| AppError::KnowledgeStore {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;

    let total = entries.len();
    let entries: Vec<KnowledgeEntry> = entries
        .into_iter()
        .filter(|entry| !entry.embedding.is_empty())
        .collect();

    if entries.len() < total {
        warn!(
            skipped = total - entries.len(),
            "Skipped knowledge entries without embeddings"
        );
    }

    Ok(entries)
}

/// Process-wide knowledge base with atomic reload
pub struct KnowledgeBase {
    path: PathBuf,
    entries: RwLock<Arc<Vec<KnowledgeEntry>>>,
}

impl KnowledgeBase {
    /// Load the store at `path`; an absent or unreadable store yields an empty base
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load_or_empty(&path);
        Self {
            path,
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    /// Build a base from entries already in memory
    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            path: PathBuf::new(),
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    fn load_or_empty(path: &Path) -> Vec<KnowledgeEntry> {
        match load_entries(path) {
            Ok(entries) => {
                info!(path = %path.display(), entries = entries.len(), "Knowledge store loaded");
                entries
            }
            Err(e) => {
                warn!(error = %e, "Knowledge store unavailable, starting empty");
                Vec::new()
            }
        }
    }

    /// Snapshot of the current entry set
    pub fn snapshot(&self) -> Arc<Vec<KnowledgeEntry>> {
        match self.entries.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-read the backing file and replace the entry set
    ///
    /// On failure the current set is kept and the error returned.
    pub fn reload(&self) -> Result<usize> {
        let entries = load_entries(&self.path)?;
        let count = entries.len();
        let fresh = Arc::new(entries);

        match self.entries.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }

        info!(path = %self.path.display(), entries = count, "Knowledge store reloaded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_store(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_store_is_empty() {
        let base = KnowledgeBase::open("/nonexistent/answerforge/embeddings.json");
        assert!(base.is_empty());
    }

    #[test]
    fn test_malformed_store_is_empty() {
        let file = write_store("{not json");
        let base = KnowledgeBase::open(file.path());
        assert!(base.is_empty());
    }

    #[test]
    fn test_load_skips_entries_without_embedding() {
        let file = write_store(
            r#"[
                {"question": "school fees", "answer": "Fees are 100.", "embedding": [0.1, 0.2]},
                {"question": "broken", "answer": "none", "embedding": []}
            ]"#,
        );
        let base = KnowledgeBase::open(file.path());
        let entries = base.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].question, "school fees");
    }

    #[test]
    fn test_reload_swaps_whole_set() {
        let file = write_store(r#"[{"question": "a", "answer": "A", "embedding": [1.0]}]"#);
        let base = KnowledgeBase::open(file.path());
        let before = base.snapshot();

        std::fs::write(
            file.path(),
            r#"[{"question": "b", "answer": "B", "embedding": [1.0]},
                {"question": "c", "answer": "C", "embedding": [0.5]}]"#,
        )
        .unwrap();

        assert_eq!(base.reload().unwrap(), 2);
        // Snapshots taken earlier are unaffected.
        assert_eq!(before.len(), 1);
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_failed_reload_keeps_current_set() {
        let file = write_store(r#"[{"question": "a", "answer": "A", "embedding": [1.0]}]"#);
        let base = KnowledgeBase::open(file.path());
        std::fs::write(file.path(), "garbage").unwrap();

        assert!(base.reload().is_err());
        assert_eq!(base.len(), 1);
    }
}
