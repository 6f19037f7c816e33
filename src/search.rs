//! Search client and response normalizer.
//!
//! The backend's search payloads are wildly inconsistent: `answer` may be
//! a string or absent, `results` may hold strings or objects, `sources`
//! may be missing, and `chunks` only exist on some deployments. The
//! normalizer maps every observed shape into one [`SearchResponse`] so
//! the rest of the application never touches raw payloads.

use serde_json::{json, Value};
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::models::{Chunk, SearchResponse, SearchResult};
use crate::transport::Transport;

/// Source label for results the backend returned without provenance.
const GENERATED_SOURCE: &str = "Generated Answer";

/// Placeholder source list when the backend omits `sources` entirely.
const PLACEHOLDER_SOURCES: &str = "Generated Response";

/// Answer synthesized when the payload carries nothing usable.
const FALLBACK_ANSWER: &str = "No answer available";

/// Known backend "no answer" sentinels; never surfaced verbatim.
const SENTINEL_ANSWERS: [&str; 3] = [
    "No answer available. Please try again later.",
    "No answer available. The service encountered an error.",
    "No answer available",
];

/// Client-side replacement for any sentinel answer.
const SENTINEL_REPLACEMENT: &str =
    "No answer could be generated for this query. Try rephrasing it or ask again later.";

pub struct SearchClient<'a> {
    transport: &'a dyn Transport,
    retrieval: &'a RetrievalConfig,
}

impl<'a> SearchClient<'a> {
    pub fn new(transport: &'a dyn Transport, retrieval: &'a RetrievalConfig) -> Self {
        Self { transport, retrieval }
    }

    /// Issue a query against one corpus.
    ///
    /// `top_k` bounds how many ranked chunks the backend may return;
    /// `threshold` is passed along as a similarity hint only — the chunk
    /// ranker enforces relevance independently because the backend is not
    /// trusted to honor it.
    pub async fn search(
        &self,
        corpus_key: &str,
        query: &str,
        top_k: u32,
        threshold: f64,
    ) -> Result<SearchResponse> {
        if top_k == 0 {
            return Err(Error::Invalid("top_k must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Invalid("threshold must be in [0.0, 1.0]".to_string()));
        }

        let body = json!({
            "question": query,
            "top_k": top_k,
            "model": self.retrieval.model,
            "threshold": threshold,
            "corpusKey": corpus_key,
        });
        debug!(corpus = %corpus_key, top_k, threshold, "issuing search");

        let resp = self.transport.post_json("/search", &body).await?;
        if !resp.is_success() {
            return Err(Error::Remote {
                status: resp.status,
                message: resp.error_message("detail"),
            });
        }

        let payload = resp.json()?;
        Ok(normalize_response(&payload, self.retrieval.default_confidence))
    }
}

/// Map a raw search payload into the fixed client contract.
pub fn normalize_response(payload: &Value, confidence: f64) -> SearchResponse {
    SearchResponse {
        answer: normalize_answer(payload),
        results: normalize_results(payload, confidence),
        source_documents: normalize_sources(payload),
        chunks: normalize_chunks(payload),
    }
}

/// Resolution order: string `answer` verbatim, then the first element of
/// `results` (a string as-is, an object's `content` then `text`), then a
/// synthesized fallback. Sentinel answers are replaced last, whatever
/// branch produced them.
fn normalize_answer(payload: &Value) -> String {
    let raw = if let Some(answer) = payload.get("answer").and_then(Value::as_str) {
        answer.to_string()
    } else {
        match payload
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
        {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(map)) => map
                .get("content")
                .or_else(|| map.get("text"))
                .and_then(Value::as_str)
                .unwrap_or(FALLBACK_ANSWER)
                .to_string(),
            _ => FALLBACK_ANSWER.to_string(),
        }
    };

    if SENTINEL_ANSWERS.contains(&raw.as_str()) {
        SENTINEL_REPLACEMENT.to_string()
    } else {
        raw
    }
}

/// Rebuild `results` regardless of element shape. The backend carries no
/// per-result confidence distinct from chunk similarity, so every element
/// gets the configured default.
fn normalize_results(payload: &Value, confidence: f64) -> Vec<SearchResult> {
    let results = match payload.get("results").and_then(Value::as_array) {
        Some(results) => results,
        None => return Vec::new(),
    };

    results
        .iter()
        .map(|raw| match raw {
            Value::String(content) => SearchResult {
                content: content.clone(),
                source: GENERATED_SOURCE.to_string(),
                page: None,
                confidence,
            },
            Value::Object(map) => SearchResult {
                content: map
                    .get("content")
                    .or_else(|| map.get("text"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| raw.to_string()),
                source: map
                    .get("metadata")
                    .and_then(|meta| meta.get("source"))
                    .and_then(Value::as_str)
                    .unwrap_or(GENERATED_SOURCE)
                    .to_string(),
                page: map
                    .get("metadata")
                    .and_then(|meta| meta.get("page"))
                    .and_then(Value::as_u64)
                    .map(|page| page as u32),
                confidence,
            },
            other => SearchResult {
                content: other.to_string(),
                source: GENERATED_SOURCE.to_string(),
                page: None,
                confidence,
            },
        })
        .collect()
}

/// `sources` verbatim when it is an array (even an empty one), else the
/// single-element placeholder.
fn normalize_sources(payload: &Value) -> Vec<String> {
    match payload.get("sources").and_then(Value::as_array) {
        Some(sources) => sources
            .iter()
            .filter_map(|s| s.as_str().map(str::to_string))
            .collect(),
        None => vec![PLACEHOLDER_SOURCES.to_string()],
    }
}

/// Chunks pass through when present and an array; anything else means the
/// backend does not support chunk evidence, signalled by `None`.
fn normalize_chunks(payload: &Value) -> Option<Vec<Chunk>> {
    payload.get("chunks").and_then(Value::as_array).map(|raw| {
        raw.iter()
            .filter_map(|chunk| serde_json::from_value(chunk.clone()).ok())
            .collect()
    })
}
