//! Upload pipeline: submit a file or a URL as one document source.
//!
//! The polymorphic source is resolved into a tagged [`UploadSource`] once
//! at the boundary; nothing downstream inspects types. The returned
//! [`Document`] is assembled from whichever response fields the backend
//! chose to send, with source-derived fallbacks, so `file_name` is never
//! empty.

use std::io;
use std::path::Path;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{field_datetime, field_str, Document};
use crate::transport::{FormPart, Transport};

/// A document source: either raw file bytes or a URL to ingest.
#[derive(Debug, Clone)]
pub enum UploadSource {
    File { name: String, bytes: Vec<u8> },
    Url(String),
}

impl UploadSource {
    /// Read a local file into an upload source, keeping its file name.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        Ok(UploadSource::File { name, bytes })
    }

    /// The client-side document type: the lowercased file extension, or
    /// the literal `"url"` for URL sources.
    fn file_type(&self) -> String {
        match self {
            UploadSource::Url(_) => "url".to_string(),
            UploadSource::File { name, .. } => name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

pub struct UploadPipeline<'a> {
    transport: &'a dyn Transport,
}

impl<'a> UploadPipeline<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Submit a document source for processing into `corpus_key`.
    ///
    /// Rejects immediately with [`Error::Identity`] when `owner_id` is
    /// absent — ownership is never silently defaulted on uploads. Write
    /// failures surface the message extracted from the response body.
    pub async fn upload_document(
        &self,
        corpus_key: &str,
        source: UploadSource,
        owner_id: Option<&str>,
    ) -> Result<Document> {
        let owner = owner_id.ok_or_else(|| {
            Error::Identity("an owner id is required to upload documents".to_string())
        })?;

        let mut parts = vec![
            ("corpus_key".to_string(), FormPart::Text(corpus_key.to_string())),
            ("userId".to_string(), FormPart::Text(owner.to_string())),
        ];
        let (size, source_name) = match &source {
            UploadSource::Url(url) => {
                parts.push(("url".to_string(), FormPart::Text(url.clone())));
                (0u64, url.clone())
            }
            UploadSource::File { name, bytes } => {
                parts.push((
                    "file".to_string(),
                    FormPart::File {
                        file_name: name.clone(),
                        bytes: bytes.clone(),
                    },
                ));
                (bytes.len() as u64, name.clone())
            }
        };

        let resp = self.transport.post_form("/process/document", parts).await?;
        if !resp.is_success() {
            return Err(Error::Remote {
                status: resp.status,
                message: resp.error_message("detail"),
            });
        }
        let payload = resp.json()?;

        // URL uploads let the backend name the document; file uploads keep
        // the original filename regardless of what came back.
        let file_name = match &source {
            UploadSource::Url(_) => field_str(&payload, &["fileName", "docName"])
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| source_name.clone()),
            UploadSource::File { .. } => source_name.clone(),
        };

        let document = Document {
            id: field_str(&payload, &["id", "docId", "documentId"])
                .unwrap_or_else(|| format!("doc-{}", Uuid::new_v4())),
            file_name,
            file_type: source.file_type(),
            corpus_key: corpus_key.to_string(),
            size,
            upload_date: field_datetime(&payload, "createdAt").unwrap_or_else(Utc::now),
            remote_id: field_str(&payload, &["docId", "id"]),
        };
        debug!(id = %document.id, corpus = %corpus_key, "document uploaded");
        Ok(document)
    }
}
