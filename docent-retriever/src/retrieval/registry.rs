//! Change registry: the single gate that prevents redundant re-indexing.
//!
//! The registry maps each source path to the fingerprint of the content it
//! was last *fully* indexed from. The pipeline consults it before doing any
//! work and commits to it only after every chunk of a file is stored, so a
//! partially indexed file is never recorded as done.
//!
//! The in-memory implementation is sufficient at this design's scale; the
//! trait exists so a persistent registry can be swapped in without touching
//! the pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// BLAKE3 hash of a file's bytes (32 bytes).
pub type Fingerprint = [u8; 32];

/// Fingerprint the given file content.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    *blake3::hash(bytes).as_bytes()
}

/// Per-path record of the last fully indexed content fingerprint.
///
/// Implementations must be safe for concurrent read/upsert from the
/// indexing worker pool.
pub trait ChangeRegistry: Send + Sync {
    /// The fingerprint last committed for `path`, if any.
    fn last_indexed(&self, path: &Path) -> Option<Fingerprint>;

    /// Record that `path` was fully indexed at `fingerprint`.
    fn commit(&self, path: &Path, fingerprint: Fingerprint);

    /// Whether `path` was last indexed at exactly this fingerprint.
    fn is_current(&self, path: &Path, fingerprint: &Fingerprint) -> bool {
        self.last_indexed(path).as_ref() == Some(fingerprint)
    }

    /// Drop the record for `path`, forcing a re-index on next sight.
    fn forget(&self, path: &Path);

    /// Number of paths currently tracked.
    fn len(&self) -> usize;

    /// Whether no paths are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutex-guarded in-memory registry, alive for the watcher's lifetime.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: Mutex<HashMap<PathBuf, Fingerprint>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Fingerprint>> {
        // A poisoned lock means a panic mid-insert; the map itself is
        // still a valid snapshot, so keep serving it.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ChangeRegistry for InMemoryRegistry {
    fn last_indexed(&self, path: &Path) -> Option<Fingerprint> {
        self.entries().get(path).copied()
    }

    fn commit(&self, path: &Path, fingerprint: Fingerprint) {
        self.entries().insert(path.to_path_buf(), fingerprint);
    }

    fn forget(&self, path: &Path) {
        self.entries().remove(path);
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_path_has_no_fingerprint() {
        let registry = InMemoryRegistry::new();
        assert_eq!(registry.last_indexed(Path::new("a.txt")), None);
        assert!(!registry.is_current(Path::new("a.txt"), &fingerprint(b"content")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_commit_then_is_current() {
        let registry = InMemoryRegistry::new();
        let fp = fingerprint(b"original content");
        registry.commit(Path::new("a.txt"), fp);

        assert!(registry.is_current(Path::new("a.txt"), &fp));
        assert!(!registry.is_current(Path::new("a.txt"), &fingerprint(b"changed content")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_recommit_updates_fingerprint() {
        let registry = InMemoryRegistry::new();
        let old = fingerprint(b"v1");
        let new = fingerprint(b"v2");
        registry.commit(Path::new("a.txt"), old);
        registry.commit(Path::new("a.txt"), new);

        assert!(registry.is_current(Path::new("a.txt"), &new));
        assert!(!registry.is_current(Path::new("a.txt"), &old));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_forget_forces_reindex() {
        let registry = InMemoryRegistry::new();
        let fp = fingerprint(b"content");
        registry.commit(Path::new("a.txt"), fp);
        registry.forget(Path::new("a.txt"));
        assert!(!registry.is_current(Path::new("a.txt"), &fp));
    }

    #[test]
    fn test_fingerprint_is_content_addressed() {
        assert_eq!(fingerprint(b"same"), fingerprint(b"same"));
        assert_ne!(fingerprint(b"same"), fingerprint(b"different"));
    }
}
