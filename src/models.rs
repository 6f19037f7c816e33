//! Core data models used throughout the retrieval client.
//!
//! These types are the stable client-side contract: whatever shape the
//! backend returns, the resolvers and the search normalizer map it into
//! these structs before anything else sees it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, user-owned collection of documents forming one retrieval scope.
///
/// `key` is derived from `name` at creation (whitespace runs collapse to a
/// single hyphen) and never changes afterwards. Uniqueness is enforced by
/// the remote store, not the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corpus {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub document_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// A document belonging to exactly one corpus for its lifetime.
///
/// `remote_id` holds the backend's own identifier when it differs from
/// `id`; deletion prefers it (see the document resolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    pub corpus_key: String,
    pub size: u64,
    pub upload_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

/// A raw retrieval unit: `(index, text, similarity)` as a JSON tuple on
/// the wire. Similarity is in `[0, 1]`.
///
/// Distinct from [`SearchResult`]: chunks are the engine's ranked evidence
/// units; results are the transformed subset shown as source documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk(pub i64, pub String, pub f64);

impl Chunk {
    pub fn index(&self) -> i64 {
        self.0
    }

    pub fn text(&self) -> &str {
        &self.1
    }

    pub fn similarity(&self) -> f64 {
        self.2
    }
}

/// An evidence excerpt as displayed, with confidence in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub confidence: f64,
}

/// The normalized search contract.
///
/// `answer` is never empty — the normalizer synthesizes a fallback when the
/// backend omits one. `chunks: None` means the backend does not support
/// chunk-level evidence at all, which is distinct from `Some(vec![])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub answer: String,
    pub results: Vec<SearchResult>,
    pub source_documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,
}

/// The authenticated identity persisted by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
}

/// Read the first present string field out of a loosely shaped payload.
///
/// The backend names the same field differently across endpoints
/// (`docId`/`documentId`, `docName`/`fileName`), so every mapping site
/// probes a preference-ordered list.
pub(crate) fn field_str(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(name).and_then(Value::as_str))
        .map(str::to_string)
}

pub(crate) fn field_u64(value: &Value, name: &str) -> Option<u64> {
    value.get(name).and_then(Value::as_u64)
}

/// Parse an RFC 3339 timestamp field; callers substitute `Utc::now()` when
/// the backend omits it or uses a format we do not recognize.
pub(crate) fn field_datetime(value: &Value, name: &str) -> Option<DateTime<Utc>> {
    value
        .get(name)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
