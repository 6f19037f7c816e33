//! Persisted shadow store: the client-local fallback copy of corpus and
//! document state, served when the remote path fails.
//!
//! The store owns its snapshot independently of the remote service. The
//! two are reconciled only opportunistically (successful remote writes
//! update the shadow too) and never merged on conflict. Construct one
//! per process and pass it to the resolvers explicitly.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Corpus, Document};
use crate::storage::Storage;

pub const CORPORA_ENTRY: &str = "corpora";
pub const DOCUMENTS_ENTRY: &str = "documents-by-key";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    corpora: Vec<Corpus>,
    documents: HashMap<String, Vec<Document>>,
}

pub struct ShadowStore {
    storage: Storage,
    state: RwLock<Snapshot>,
}

impl ShadowStore {
    /// Open the store, loading any persisted snapshot. An unreadable or
    /// corrupt snapshot degrades to empty collections.
    pub fn open(storage: Storage) -> Self {
        let state = RwLock::new(load_snapshot(&storage));
        Self { storage, state }
    }

    /// Re-read the persisted snapshot, discarding in-memory state.
    ///
    /// Fallback reads call this first so a listing served offline reflects
    /// everything earlier fallback writes persisted.
    pub fn reload(&self) {
        let snapshot = load_snapshot(&self.storage);
        *self.state.write().unwrap() = snapshot;
    }

    /// Corpora visible to `owner`. Records without an owner are visible to
    /// everyone, so legacy entries are never hidden by the filter.
    pub fn corpora_for_owner(&self, owner: Option<&str>) -> Vec<Corpus> {
        let state = self.state.read().unwrap();
        match owner {
            None => state.corpora.clone(),
            Some(owner) => state
                .corpora
                .iter()
                .filter(|c| c.owner_id.is_none() || c.owner_id.as_deref() == Some(owner))
                .cloned()
                .collect(),
        }
    }

    pub fn documents(&self, corpus_key: &str) -> Vec<Document> {
        let state = self.state.read().unwrap();
        state.documents.get(corpus_key).cloned().unwrap_or_default()
    }

    /// Upsert a corpus by key and ensure it has a document list, then
    /// persist the snapshot. Re-inserting the same key replaces the
    /// record rather than duplicating it.
    pub fn insert_corpus(&self, corpus: Corpus) {
        let mut state = self.state.write().unwrap();
        state.corpora.retain(|c| c.key != corpus.key);
        state.documents.entry(corpus.key.clone()).or_default();
        state.corpora.push(corpus);
        persist(&self.storage, &state);
    }

}

fn load_snapshot(storage: &Storage) -> Snapshot {
    let corpora = storage
        .read(CORPORA_ENTRY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    let documents = storage
        .read(DOCUMENTS_ENTRY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    Snapshot { corpora, documents }
}

/// Persistence is best-effort: a full disk must not fail the operation
/// that triggered the write, so failures are only logged.
fn persist(storage: &Storage, snapshot: &Snapshot) {
    match serde_json::to_string(&snapshot.corpora) {
        Ok(json) => {
            if let Err(err) = storage.write(CORPORA_ENTRY, &json) {
                warn!(error = %err, "failed to persist shadow corpora");
            }
        }
        Err(err) => warn!(error = %err, "failed to encode shadow corpora"),
    }
    match serde_json::to_string(&snapshot.documents) {
        Ok(json) => {
            if let Err(err) = storage.write(DOCUMENTS_ENTRY, &json) {
                warn!(error = %err, "failed to persist shadow documents");
            }
        }
        Err(err) => warn!(error = %err, "failed to encode shadow documents"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn make_corpus(key: &str, owner: Option<&str>) -> Corpus {
        Corpus {
            key: key.to_string(),
            name: key.to_string(),
            description: String::new(),
            document_count: 0,
            created_at: Utc::now(),
            owner_id: owner.map(str::to_string),
        }
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::open(tmp.path()).unwrap();

        let store = ShadowStore::open(storage.clone());
        store.insert_corpus(make_corpus("general", Some("u-1")));

        let reopened = ShadowStore::open(storage);
        let corpora = reopened.corpora_for_owner(None);
        assert_eq!(corpora.len(), 1);
        assert_eq!(corpora[0].key, "general");
        assert!(reopened.documents("general").is_empty());
    }

    #[test]
    fn test_insert_same_key_does_not_duplicate() {
        let tmp = TempDir::new().unwrap();
        let store = ShadowStore::open(Storage::open(tmp.path()).unwrap());

        store.insert_corpus(make_corpus("general", None));
        store.insert_corpus(make_corpus("general", None));
        assert_eq!(store.corpora_for_owner(None).len(), 1);
    }

    #[test]
    fn test_owner_filter_keeps_unowned_records() {
        let tmp = TempDir::new().unwrap();
        let store = ShadowStore::open(Storage::open(tmp.path()).unwrap());

        store.insert_corpus(make_corpus("mine", Some("u-1")));
        store.insert_corpus(make_corpus("theirs", Some("u-2")));
        store.insert_corpus(make_corpus("legacy", None));

        let visible = store.corpora_for_owner(Some("u-1"));
        let keys: Vec<&str> = visible.iter().map(|c| c.key.as_str()).collect();
        assert!(keys.contains(&"mine"));
        assert!(keys.contains(&"legacy"));
        assert!(!keys.contains(&"theirs"));
    }

    #[test]
    fn test_corrupt_snapshot_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::open(tmp.path()).unwrap();
        storage.write(CORPORA_ENTRY, "{{not json").unwrap();

        let store = ShadowStore::open(storage);
        assert!(store.corpora_for_owner(None).is_empty());
    }
}
