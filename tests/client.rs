//! Integration tests for the resolvers, upload pipeline, search
//! normalizer, and session store, driven through a scripted mock
//! transport so every backend shape and failure mode is reproducible.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use ragify_client::config::RetrievalConfig;
use ragify_client::corpus::CorpusResolver;
use ragify_client::document::DocumentResolver;
use ragify_client::error::{Error, Result};
use ragify_client::search::SearchClient;
use ragify_client::session::{SessionStore, USER_ENTRY, USER_ID_ENTRY};
use ragify_client::shadow::ShadowStore;
use ragify_client::storage::Storage;
use ragify_client::transport::{where_clause, FormPart, RawResponse, Transport};
use ragify_client::upload::{UploadPipeline, UploadSource};

// ============ Mock transport ============

/// Scripted transport: responses are keyed by a request signature, calls
/// are recorded for count assertions, and `offline` simulates a dead
/// network. Unrouted requests come back as 404.
struct MockTransport {
    routes: HashMap<String, RawResponse>,
    calls: Mutex<Vec<String>>,
    offline: bool,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            routes: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            offline: false,
        }
    }

    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::new()
        }
    }

    fn route(mut self, key: &str, status: u16, body: Value) -> Self {
        self.routes.insert(
            key.to_string(),
            RawResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    fn respond(&self, key: String) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(key.clone());
        if self.offline {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(self
            .routes
            .get(&key)
            .cloned()
            .unwrap_or(RawResponse {
                status: 404,
                body: String::new(),
            }))
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

fn get_key(path: &str, query: &[(&str, String)]) -> String {
    let mut key = format!("GET {}", path);
    for (name, value) in query {
        key.push_str(&format!("?{}={}", name, value));
    }
    key
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<RawResponse> {
        self.respond(get_key(path, query))
    }

    async fn post_json(&self, path: &str, _body: &Value) -> Result<RawResponse> {
        self.respond(format!("POST {}", path))
    }

    async fn post_form(&self, path: &str, parts: Vec<(String, FormPart)>) -> Result<RawResponse> {
        let names: Vec<&str> = parts.iter().map(|(name, _)| name.as_str()).collect();
        self.respond(format!("POST {} [{}]", path, names.join(",")))
    }

    async fn delete(&self, path: &str) -> Result<RawResponse> {
        self.respond(format!("DELETE {}", path))
    }
}

fn docs_where(field: &str, value: &str) -> String {
    format!("GET /documents?where={}", where_clause(field, value))
}

fn shadow_store() -> (TempDir, ShadowStore) {
    let tmp = TempDir::new().unwrap();
    let storage = Storage::open(tmp.path()).unwrap();
    (tmp, ShadowStore::open(storage))
}

// ============ Document listing strategies ============

#[tokio::test]
async fn test_first_strategy_short_circuits() {
    let transport = MockTransport::new().route(
        &docs_where("corpusId", "general"),
        200,
        json!({"results": [
            {"docId": "db-1", "docName": "alpha.pdf", "docType": "pdf", "corpusId": "general"}
        ]}),
    );

    let resolver = DocumentResolver::new(&transport);
    let documents = resolver.list_documents("general").await;

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].file_name, "alpha.pdf");
    // Strategies 2 and 3 were never invoked.
    assert_eq!(transport.call_count("GET /documents"), 1);
}

#[tokio::test]
async fn test_strategies_fall_through_to_unfiltered() {
    let transport = MockTransport::new()
        // Strategy 1 succeeds but matches nothing.
        .route(&docs_where("corpusId", "general"), 200, json!({"results": []}))
        // Strategy 2 is rejected outright.
        .route(&docs_where("corpusKey", "general"), 500, json!({"error": "boom"}))
        // Strategy 3 returns everything; the client must filter.
        .route(
            "GET /documents",
            200,
            json!({"results": [
                {"documentId": "d-1", "docName": "mine.txt", "corpusKey": "general"},
                {"documentId": "d-2", "docName": "other.txt", "corpusKey": "research"}
            ]}),
        );

    let resolver = DocumentResolver::new(&transport);
    let documents = resolver.list_documents("general").await;

    assert_eq!(transport.call_count("GET /documents"), 3);
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, "d-1");
}

#[tokio::test]
async fn test_exhausted_strategies_yield_empty_not_error() {
    // Nothing routed: every strategy sees a 404 and is swallowed.
    let transport = MockTransport::new();

    let resolver = DocumentResolver::new(&transport);
    let documents = resolver.list_documents("general").await;

    assert!(documents.is_empty());
    assert_eq!(transport.call_count("GET /documents"), 3);
}

// ============ Document deletion ============

#[tokio::test]
async fn test_delete_survives_failed_chunk_sweep() {
    let transport = MockTransport::new()
        // Phase 1 fails entirely.
        .route(
            &format!("GET /chunks?where={}", where_clause("documentId", "d-1")),
            500,
            json!({"error": "chunk index offline"}),
        )
        // Phase 2 resolves the backend id.
        .route(&docs_where("documentId", "d-1"), 200, json!({"results": [{"docId": "db-9"}]}))
        // Phase 3 deletes by the resolved id.
        .route("DELETE /document/db-9", 200, json!({}));

    let resolver = DocumentResolver::new(&transport);
    assert!(resolver.delete_document("d-1", "general").await.is_ok());
}

#[tokio::test]
async fn test_delete_sweeps_chunks_and_tolerates_rejections() {
    let transport = MockTransport::new()
        .route(
            &format!("GET /chunks?where={}", where_clause("documentId", "d-1")),
            200,
            json!({"results": [{"chunkId": "c-1"}, {"chunkId": "c-2"}]}),
        )
        // c-1 rejected; c-2 unrouted (404). Neither blocks the delete.
        .route("DELETE /chunk/c-1", 500, json!({"error": "stuck"}))
        .route(&docs_where("documentId", "d-1"), 200, json!({"results": []}))
        // Resolution came up empty, so the delete goes direct.
        .route("DELETE /document/d-1", 200, json!({}));

    let resolver = DocumentResolver::new(&transport);
    assert!(resolver.delete_document("d-1", "general").await.is_ok());
    assert_eq!(transport.call_count("DELETE /chunk/"), 2);
    assert_eq!(transport.call_count("DELETE /document/d-1"), 1);
}

#[tokio::test]
async fn test_rejected_delete_surfaces_message() {
    let transport = MockTransport::new()
        .route("DELETE /document/d-1", 403, json!({"error": "not your document"}));

    let resolver = DocumentResolver::new(&transport);
    let err = resolver.delete_document("d-1", "general").await.unwrap_err();
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "not your document");
        }
        other => panic!("expected Remote error, got {:?}", other),
    }
}

// ============ Corpus resolver ============

#[tokio::test]
async fn test_list_corpora_with_document_counts() {
    let (_tmp, shadow) = shadow_store();
    let transport = MockTransport::new()
        .route(
            "GET /corpuses?where={}",
            200,
            json!({"results": [
                {"corpusId": "c-1", "corpusKey": "general", "corpusName": "General", "userId": "u-1"},
                {"corpusId": "c-2", "corpusKey": "research"}
            ]}),
        )
        .route(
            &docs_where("corpusId", "c-1"),
            200,
            json!({"results": [{"docId": "a"}, {"docId": "b"}]}),
        );
    // The count lookup for c-2 is unrouted: a rejected count means 0.

    let resolver = CorpusResolver::new(&transport, &shadow);
    let corpora = resolver.list_corpora(None).await;

    assert_eq!(corpora.len(), 2);
    assert_eq!(corpora[0].key, "general");
    assert_eq!(corpora[0].document_count, 2);
    assert_eq!(corpora[1].key, "research");
    assert_eq!(corpora[1].name, "research");
    assert_eq!(corpora[1].document_count, 0);
}

#[tokio::test]
async fn test_list_corpora_falls_back_to_shadow_with_owner_filter() {
    let (_tmp, shadow) = shadow_store();

    // Seed the shadow through an earlier offline session.
    {
        let seed_transport = MockTransport::offline();
        let seeder = CorpusResolver::new(&seed_transport, &shadow);
        seeder.create_corpus("Mine", Some("u-1"), None).await;
        seeder.create_corpus("Theirs", Some("u-2"), None).await;
    }

    let transport = MockTransport::offline();
    let resolver = CorpusResolver::new(&transport, &shadow);
    let corpora = resolver.list_corpora(Some("u-1")).await;

    let keys: Vec<&str> = corpora.iter().map(|c| c.key.as_str()).collect();
    assert!(keys.contains(&"Mine"));
    assert!(!keys.contains(&"Theirs"));
}

#[tokio::test]
async fn test_offline_create_then_list_includes_corpus_exactly_once() {
    let (_tmp, shadow) = shadow_store();
    let transport = MockTransport::offline();
    let resolver = CorpusResolver::new(&transport, &shadow);

    let created = resolver.create_corpus("Field Notes", Some("u-1"), None).await;
    assert_eq!(created.key, "Field-Notes");
    assert_eq!(created.document_count, 0);

    let corpora = resolver.list_corpora(Some("u-1")).await;
    let matches = corpora.iter().filter(|c| c.key == "Field-Notes").count();
    assert_eq!(matches, 1);
}

#[tokio::test]
async fn test_create_corpus_remote_success_maps_response() {
    let (_tmp, shadow) = shadow_store();
    let transport = MockTransport::new().route(
        "POST /corpus",
        200,
        json!({"results": {
            "corpusKey": "Field-Notes",
            "corpusName": "Field Notes",
            "userId": "u-1",
            "createdAt": "2024-03-01T12:00:00Z"
        }}),
    );

    let resolver = CorpusResolver::new(&transport, &shadow);
    let corpus = resolver.create_corpus("Field Notes", Some("u-1"), None).await;

    assert_eq!(corpus.key, "Field-Notes");
    assert_eq!(corpus.name, "Field Notes");
    assert_eq!(corpus.owner_id.as_deref(), Some("u-1"));

    // Successful writes update the shadow too.
    let offline = MockTransport::offline();
    let fallback = CorpusResolver::new(&offline, &shadow);
    let corpora = fallback.list_corpora(Some("u-1")).await;
    assert!(corpora.iter().any(|c| c.key == "Field-Notes"));
}

// ============ Upload pipeline ============

#[tokio::test]
async fn test_upload_without_owner_is_an_identity_error() {
    let transport = MockTransport::new();
    let pipeline = UploadPipeline::new(&transport);

    let err = pipeline
        .upload_document("general", UploadSource::Url("https://example.com".to_string()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Identity(_)));
    // Rejected before any request went out.
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_url_upload_uses_backend_fields() {
    let transport = MockTransport::new().route(
        "POST /process/document [corpus_key,userId,url]",
        200,
        json!({"docId": "db-3", "fileName": "Example Page"}),
    );

    let pipeline = UploadPipeline::new(&transport);
    let document = pipeline
        .upload_document(
            "general",
            UploadSource::Url("https://example.com/page".to_string()),
            Some("u-1"),
        )
        .await
        .unwrap();

    assert_eq!(document.id, "db-3");
    assert_eq!(document.file_name, "Example Page");
    assert_eq!(document.file_type, "url");
    assert_eq!(document.size, 0);
    assert_eq!(document.remote_id.as_deref(), Some("db-3"));
}

#[tokio::test]
async fn test_file_upload_falls_back_to_source_derived_fields() {
    // The backend answers with an empty object; everything derives from
    // the source.
    let transport = MockTransport::new().route(
        "POST /process/document [corpus_key,userId,file]",
        200,
        json!({}),
    );

    let pipeline = UploadPipeline::new(&transport);
    let document = pipeline
        .upload_document(
            "general",
            UploadSource::File {
                name: "notes.md".to_string(),
                bytes: b"hello".to_vec(),
            },
            Some("u-1"),
        )
        .await
        .unwrap();

    assert_eq!(document.file_name, "notes.md");
    assert_eq!(document.file_type, "md");
    assert_eq!(document.size, 5);
    assert!(document.id.starts_with("doc-"));
    assert!(document.remote_id.is_none());
}

#[tokio::test]
async fn test_rejected_upload_surfaces_detail_message() {
    let transport = MockTransport::new().route(
        "POST /process/document [corpus_key,userId,file]",
        422,
        json!({"detail": "unsupported file type"}),
    );

    let pipeline = UploadPipeline::new(&transport);
    let err = pipeline
        .upload_document(
            "general",
            UploadSource::File {
                name: "binary.exe".to_string(),
                bytes: vec![0, 1, 2],
            },
            Some("u-1"),
        )
        .await
        .unwrap_err();

    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "unsupported file type");
        }
        other => panic!("expected Remote error, got {:?}", other),
    }
}

// ============ Search ============

#[tokio::test]
async fn test_search_normalizes_full_payload() {
    let transport = MockTransport::new().route(
        "POST /search",
        200,
        json!({
            "answer": "The sky is blue.",
            "results": [{"content": "The sky is blue.", "metadata": {"source": "sky.pdf"}}],
            "sources": ["sky.pdf"],
            "chunks": [[0, "sky scattering", 0.9], [1, "unrelated", 0.2]]
        }),
    );

    let retrieval = RetrievalConfig::default();
    let client = SearchClient::new(&transport, &retrieval);
    let response = client.search("general", "why is the sky blue", 5, 0.5).await.unwrap();

    assert_eq!(response.answer, "The sky is blue.");
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].source, "sky.pdf");
    assert_eq!(response.source_documents, vec!["sky.pdf"]);
    assert_eq!(response.chunks.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_search_validates_parameters_before_io() {
    let transport = MockTransport::new();
    let retrieval = RetrievalConfig::default();
    let client = SearchClient::new(&transport, &retrieval);

    let err = client.search("general", "q", 0, 0.5).await.unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));

    let err = client.search("general", "q", 5, 1.5).await.unwrap_err();
    assert!(matches!(err, Error::Invalid(_)));

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_search_failure_surfaces_remote_error() {
    let transport =
        MockTransport::new().route("POST /search", 500, json!({"detail": "index rebuilding"}));

    let retrieval = RetrievalConfig::default();
    let client = SearchClient::new(&transport, &retrieval);
    let err = client.search("general", "q", 5, 0.5).await.unwrap_err();

    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "index rebuilding");
        }
        other => panic!("expected Remote error, got {:?}", other),
    }
}

// ============ Session store ============

#[tokio::test]
async fn test_corrupt_session_rehydrates_logged_out() {
    let tmp = TempDir::new().unwrap();
    let storage = Storage::open(tmp.path()).unwrap();
    storage.write(USER_ENTRY, "definitely not json {{").unwrap();
    storage.write(USER_ID_ENTRY, "u-1").unwrap();

    let transport = MockTransport::new();
    let session = SessionStore::open(&transport, storage.clone(), false);

    assert!(!session.is_authenticated());
    assert!(storage.read(USER_ENTRY).is_none());
    assert!(storage.read(USER_ID_ENTRY).is_none());
}

#[tokio::test]
async fn test_login_persists_across_restarts() {
    let tmp = TempDir::new().unwrap();
    let storage = Storage::open(tmp.path()).unwrap();
    let transport = MockTransport::new().route(
        "POST /auth/login",
        200,
        json!({"results": {"userId": "u-1", "username": "ada", "email": "ada@example.com"}}),
    );

    {
        let mut session = SessionStore::open(&transport, storage.clone(), false);
        let user = session.login("ada@example.com", "hunter2").await.unwrap();
        assert_eq!(user.username, "ada");
        assert!(session.is_authenticated());
    }

    // A fresh process rehydrates from persisted state without any call.
    let idle_transport = MockTransport::new();
    let session = SessionStore::open(&idle_transport, storage, false);
    assert!(session.is_authenticated());
    assert_eq!(session.user_id(), Some("u-1"));
    assert!(idle_transport.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_login_surfaces_error_message() {
    let tmp = TempDir::new().unwrap();
    let storage = Storage::open(tmp.path()).unwrap();
    let transport =
        MockTransport::new().route("POST /auth/login", 401, json!({"error": "bad credentials"}));

    let mut session = SessionStore::open(&transport, storage, false);
    let err = session.login("ada@example.com", "wrong").await.unwrap_err();

    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "bad credentials");
        }
        other => panic!("expected Remote error, got {:?}", other),
    }
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let storage = Storage::open(tmp.path()).unwrap();
    let transport = MockTransport::new().route(
        "POST /auth/register",
        200,
        json!({"results": {"userId": "u-2", "username": "bob", "email": "bob@example.com"}}),
    );

    let mut session = SessionStore::open(&transport, storage.clone(), false);
    session.register("bob", "bob@example.com", "secret").await.unwrap();
    assert!(session.is_authenticated());

    session.logout();
    assert!(!session.is_authenticated());
    assert!(storage.read(USER_ENTRY).is_none());

    // Logging out again is not an error.
    session.logout();
    assert!(!session.is_authenticated());
}
