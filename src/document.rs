//! Document resolver: listing via an ordered strategy chain and the
//! three-phase delete protocol.
//!
//! The backend names its corpus identity field inconsistently across
//! endpoints, so the read path never assumes which one is authoritative:
//! it walks [`LOOKUP_ORDER`] until a strategy yields a non-empty result
//! set. Exhausting the chain means the corpus has no documents, a valid
//! outcome rather than a failure, so there is no shadow fallback here.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{field_datetime, field_str, field_u64, Document};
use crate::transport::{where_clause, Transport};

/// One way of asking the backend which documents belong to a corpus.
///
/// Strategies are pure descriptions of a request; the resolver evaluates
/// them lazily, in order, and each one swallows its own failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Filter on the backend's internal corpus identifier.
    ByCorpusId,
    /// Filter on the user-facing corpus key field.
    ByCorpusKey,
    /// Fetch everything and filter client-side on either field.
    Unfiltered,
}

/// Strict evaluation order; the first non-empty result set wins.
pub const LOOKUP_ORDER: [LookupStrategy; 3] = [
    LookupStrategy::ByCorpusId,
    LookupStrategy::ByCorpusKey,
    LookupStrategy::Unfiltered,
];

impl LookupStrategy {
    fn query(&self, corpus_key: &str) -> Vec<(&'static str, String)> {
        match self {
            LookupStrategy::ByCorpusId => vec![("where", where_clause("corpusId", corpus_key))],
            LookupStrategy::ByCorpusKey => vec![("where", where_clause("corpusKey", corpus_key))],
            LookupStrategy::Unfiltered => Vec::new(),
        }
    }

    /// Whether the server narrowed the result set for us. Unfiltered
    /// listings must be filtered client-side.
    fn server_filtered(&self) -> bool {
        !matches!(self, LookupStrategy::Unfiltered)
    }
}

pub struct DocumentResolver<'a> {
    transport: &'a dyn Transport,
}

impl<'a> DocumentResolver<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// List the documents of a corpus.
    ///
    /// Walks the strategy chain; a strategy that errors or comes back
    /// empty yields to the next one. Returns an empty list when every
    /// strategy exhausts.
    pub async fn list_documents(&self, corpus_key: &str) -> Vec<Document> {
        for strategy in LOOKUP_ORDER {
            match self.try_strategy(strategy, corpus_key).await {
                Ok(documents) if !documents.is_empty() => {
                    debug!(?strategy, count = documents.len(), "document lookup matched");
                    return documents;
                }
                Ok(_) => debug!(?strategy, "document lookup strategy returned nothing"),
                Err(err) => warn!(?strategy, error = %err, "document lookup strategy failed"),
            }
        }
        Vec::new()
    }

    async fn try_strategy(
        &self,
        strategy: LookupStrategy,
        corpus_key: &str,
    ) -> Result<Vec<Document>> {
        let resp = self
            .transport
            .get("/documents", &strategy.query(corpus_key))
            .await?;
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
            .ok_or_else(|| Error::Shape("document listing missing results array".to_string()))?;

        let documents = results
            .iter()
            .filter(|raw| strategy.server_filtered() || matches_corpus(raw, corpus_key))
            .map(|raw| document_from_listing(raw, corpus_key))
            .collect();
        Ok(documents)
    }

    /// Delete a document and its dependent evidence chunks.
    ///
    /// Three phases, in mandatory order: (1) best-effort chunk sweep,
    /// never fatal; (2) resolve the backend's identifier for the record;
    /// (3) delete by the resolved identifier, or directly by
    /// `document_id` when resolution came up empty. Only a rejected
    /// phase-3 delete fails the operation.
    pub async fn delete_document(&self, document_id: &str, corpus_key: &str) -> Result<()> {
        self.sweep_chunks(document_id).await;

        let resolved = self.resolve_remote_id(document_id).await;
        let target = resolved.as_deref().unwrap_or(document_id);
        if resolved.is_none() {
            debug!(%document_id, "no backend identifier resolved, attempting direct delete");
        }

        let resp = self
            .transport
            .delete(&format!("/document/{}", target))
            .await?;
        if !resp.is_success() {
            return Err(Error::Remote {
                status: resp.status,
                message: resp.error_message("error"),
            });
        }
        debug!(%document_id, corpus = %corpus_key, "document deleted");
        Ok(())
    }

    /// Phase 1: delete every chunk referencing the document. Failures are
    /// logged and swallowed — stale chunks must not block the removal of
    /// the document record itself.
    async fn sweep_chunks(&self, document_id: &str) {
        let resp = match self
            .transport
            .get("/chunks", &[("where", where_clause("documentId", document_id))])
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(%document_id, error = %err, "chunk listing failed, skipping sweep");
                return;
            }
        };
        if !resp.is_success() {
            warn!(%document_id, status = resp.status, "chunk listing rejected, skipping sweep");
            return;
        }
        let payload = match resp.json() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%document_id, error = %err, "chunk listing unreadable, skipping sweep");
                return;
            }
        };
        let chunks = match payload.get("results").and_then(Value::as_array) {
            Some(chunks) => chunks,
            None => return,
        };

        for chunk in chunks {
            let chunk_id = match field_str(chunk, &["chunkId"]) {
                Some(id) => id,
                None => continue,
            };
            match self.transport.delete(&format!("/chunk/{}", chunk_id)).await {
                Ok(resp) if resp.is_success() => debug!(%chunk_id, "deleted chunk"),
                Ok(resp) => warn!(%chunk_id, status = resp.status, "chunk delete rejected"),
                Err(err) => warn!(%chunk_id, error = %err, "chunk delete failed"),
            }
        }
    }

    /// Phase 2: find the backend's own identifier for the record. Any
    /// failure resolves to `None`, which phase 3 handles with a direct
    /// delete.
    async fn resolve_remote_id(&self, document_id: &str) -> Option<String> {
        let resp = self
            .transport
            .get("/documents", &[("where", where_clause("documentId", document_id))])
            .await
            .ok()?;
        if !resp.is_success() {
            return None;
        }
        let payload = resp.json().ok()?;
        payload
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|record| field_str(record, &["docId"]))
    }
}

fn matches_corpus(raw: &Value, corpus_key: &str) -> bool {
    field_str(raw, &["corpusId"]).as_deref() == Some(corpus_key)
        || field_str(raw, &["corpusKey"]).as_deref() == Some(corpus_key)
}

/// Map one listing element to the client contract, tolerating the
/// backend's alternate field names.
fn document_from_listing(raw: &Value, corpus_key: &str) -> Document {
    Document {
        id: field_str(raw, &["documentId", "docId"]).unwrap_or_default(),
        file_name: field_str(raw, &["docName", "fileName"])
            .unwrap_or_else(|| "Unknown Document".to_string()),
        file_type: field_str(raw, &["docType"]).unwrap_or_else(|| "unknown".to_string()),
        corpus_key: field_str(raw, &["corpusId"]).unwrap_or_else(|| corpus_key.to_string()),
        size: field_u64(raw, "size").unwrap_or(0),
        upload_date: field_datetime(raw, "createdAt").unwrap_or_else(Utc::now),
        remote_id: field_str(raw, &["docId"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strategy_queries() {
        assert_eq!(
            LookupStrategy::ByCorpusId.query("general"),
            vec![("where", r#"{"corpusId":"general"}"#.to_string())]
        );
        assert_eq!(
            LookupStrategy::ByCorpusKey.query("general"),
            vec![("where", r#"{"corpusKey":"general"}"#.to_string())]
        );
        assert!(LookupStrategy::Unfiltered.query("general").is_empty());
    }

    #[test]
    fn test_matches_corpus_on_either_field() {
        assert!(matches_corpus(&json!({"corpusId": "general"}), "general"));
        assert!(matches_corpus(&json!({"corpusKey": "general"}), "general"));
        assert!(!matches_corpus(&json!({"corpusId": "other"}), "general"));
        assert!(!matches_corpus(&json!({}), "general"));
    }

    #[test]
    fn test_listing_element_field_tolerance() {
        let raw = json!({
            "docId": "db-7",
            "docName": "report.pdf",
            "docType": "pdf",
            "corpusId": "general",
            "size": 2048,
        });
        let doc = document_from_listing(&raw, "general");
        assert_eq!(doc.id, "db-7");
        assert_eq!(doc.file_name, "report.pdf");
        assert_eq!(doc.file_type, "pdf");
        assert_eq!(doc.size, 2048);
        assert_eq!(doc.remote_id.as_deref(), Some("db-7"));

        let sparse = document_from_listing(&json!({"documentId": "d-1"}), "general");
        assert_eq!(sparse.id, "d-1");
        assert_eq!(sparse.file_name, "Unknown Document");
        assert_eq!(sparse.file_type, "unknown");
        assert_eq!(sparse.corpus_key, "general");
        assert_eq!(sparse.size, 0);
        assert!(sparse.remote_id.is_none());
    }
}
