//! Corpus resolver: listing and creation with remote-first, shadow-fallback
//! semantics.
//!
//! Every call attempts the remote path exactly once, without retries, and
//! degrades to the shadow store on transport or shape failure. Successful
//! writes update both stores so a later offline listing still sees them.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{field_datetime, field_str, Corpus};
use crate::shadow::ShadowStore;
use crate::transport::{where_clause, Transport};

/// Owner recorded when the caller provides none, matching the backend's
/// own default.
pub const DEFAULT_OWNER: &str = "default-user";

/// Derive the stable corpus key from a display name: each whitespace run
/// becomes a single hyphen, case is preserved.
pub fn derive_corpus_key(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}

pub struct CorpusResolver<'a> {
    transport: &'a dyn Transport,
    shadow: &'a ShadowStore,
}

impl<'a> CorpusResolver<'a> {
    pub fn new(transport: &'a dyn Transport, shadow: &'a ShadowStore) -> Self {
        Self { transport, shadow }
    }

    /// List corpora visible to `owner_id`, with per-corpus document counts.
    ///
    /// Any remote failure falls back atomically to the shadow snapshot,
    /// refreshed from disk first so earlier fallback writes are visible.
    /// Read failures never surface to the caller.
    pub async fn list_corpora(&self, owner_id: Option<&str>) -> Vec<Corpus> {
        match self.list_remote(owner_id).await {
            Ok(corpora) => corpora,
            Err(err) => {
                warn!(error = %err, "corpus listing failed, serving shadow snapshot");
                self.shadow.reload();
                self.shadow.corpora_for_owner(owner_id)
            }
        }
    }

    async fn list_remote(&self, owner_id: Option<&str>) -> Result<Vec<Corpus>> {
        let filter = match owner_id {
            Some(owner) => where_clause("userId", owner),
            None => "{}".to_string(),
        };
        let resp = self.transport.get("/corpuses", &[("where", filter)]).await?;
        if !resp.is_success() {
            return Err(Error::Remote {
                status: resp.status,
                message: resp.error_message("error"),
            });
        }

        let payload = resp.json()?;
        let results = payload
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Shape("corpus listing missing results array".to_string()))?;

        let mut corpora = Vec::with_capacity(results.len());
        for raw in results {
            // The document count lives behind a second call keyed by the
            // backend's internal corpus id. A rejected count response means
            // count 0; a transport failure aborts to the shadow fallback.
            let count = match field_str(raw, &["corpusId"]) {
                Some(corpus_id) => self.count_documents(&corpus_id).await?,
                None => 0,
            };
            corpora.push(corpus_from_listing(raw, count));
        }
        debug!(count = corpora.len(), "remote corpus listing succeeded");
        Ok(corpora)
    }

    async fn count_documents(&self, corpus_id: &str) -> Result<u64> {
        let resp = self
            .transport
            .get("/documents", &[("where", where_clause("corpusId", corpus_id))])
            .await?;
        if !resp.is_success() {
            return Ok(0);
        }
        let count = resp
            .json()
            .ok()
            .and_then(|payload| {
                payload
                    .get("results")
                    .and_then(Value::as_array)
                    .map(|results| results.len() as u64)
            })
            .unwrap_or(0);
        Ok(count)
    }

    /// Create a corpus, deriving its key from `name`.
    ///
    /// On remote failure the corpus is synthesized locally and recorded in
    /// the shadow store with an empty document list; the return shape is
    /// identical either way, so callers cannot tell a shadow corpus from a
    /// remote-backed one without a later remote listing.
    pub async fn create_corpus(
        &self,
        name: &str,
        owner_id: Option<&str>,
        description: Option<&str>,
    ) -> Corpus {
        let key = derive_corpus_key(name);
        match self.create_remote(name, &key, owner_id, description).await {
            Ok(corpus) => {
                self.shadow.insert_corpus(corpus.clone());
                corpus
            }
            Err(err) => {
                warn!(error = %err, corpus = %key, "remote corpus create failed, recording shadow corpus");
                let corpus = Corpus {
                    key,
                    name: name.to_string(),
                    description: description.unwrap_or_default().to_string(),
                    document_count: 0,
                    created_at: Utc::now(),
                    owner_id: Some(owner_id.unwrap_or(DEFAULT_OWNER).to_string()),
                };
                self.shadow.insert_corpus(corpus.clone());
                corpus
            }
        }
    }

    async fn create_remote(
        &self,
        name: &str,
        key: &str,
        owner_id: Option<&str>,
        description: Option<&str>,
    ) -> Result<Corpus> {
        let body = json!({
            "userId": owner_id.unwrap_or(DEFAULT_OWNER),
            "corpusKey": key,
            "corpusName": name,
            "description": description.unwrap_or_default(),
        });
        let resp = self.transport.post_json("/corpus", &body).await?;
        if !resp.is_success() {
            return Err(Error::Remote {
                status: resp.status,
                message: resp.error_message("error"),
            });
        }

        let payload = resp.json()?;
        let results = payload
            .get("results")
            .ok_or_else(|| Error::Shape("corpus create response missing results".to_string()))?;

        Ok(Corpus {
            key: field_str(results, &["corpusKey", "corpusId"]).unwrap_or_else(|| key.to_string()),
            name: field_str(results, &["corpusName"]).unwrap_or_else(|| name.to_string()),
            description: field_str(results, &["description"])
                .unwrap_or_else(|| description.unwrap_or_default().to_string()),
            document_count: 0,
            created_at: field_datetime(results, "createdAt").unwrap_or_else(Utc::now),
            owner_id: field_str(results, &["userId"]),
        })
    }
}

/// Map one listing element to the client contract, tolerating the
/// backend's alternate field names.
fn corpus_from_listing(raw: &Value, document_count: u64) -> Corpus {
    let key = field_str(raw, &["corpusKey", "corpusId"]).unwrap_or_default();
    Corpus {
        name: field_str(raw, &["corpusName", "corpusKey"])
            .unwrap_or_else(|| "Unnamed Corpus".to_string()),
        description: field_str(raw, &["description"]).unwrap_or_default(),
        document_count,
        created_at: field_datetime(raw, "createdAt").unwrap_or_else(Utc::now),
        owner_id: field_str(raw, &["userId"]),
        key,
    }
}
