use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use ragdesk_llm::{EmbeddingClient, EmbeddingRequest};
use ragdesk_persist::{DocumentChunk, KnowledgeBase, PersistenceClient, UserFile};
use serde_json::{json, Map, Value};

use crate::chunker::chunk_text;
use crate::error::{Result, RetrievalError};
use crate::loader::{
    clean_metadata, content_type_for, is_supported, parse_document_blocking, ParsedDocument,
};
use crate::web::fetch_page;

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    /// Chunks sent per embedding request
    pub embedding_batch_size: usize,
    /// Raw uploads are kept here as `{file_id}_{filename}`
    pub upload_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_batch_size: 64,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

/// Outcome of a bulk directory load
#[derive(Debug, Default)]
pub struct DirectoryReport {
    pub ingested: Vec<UserFile>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Outcome of loading a list of web pages
#[derive(Debug, Default)]
pub struct WebReport {
    pub ingested: Vec<UserFile>,
    pub failed: Vec<(String, String)>,
}

/// Parse, chunk, embed and store uploaded documents
#[derive(Clone)]
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn PersistenceClient>,
    http: reqwest::Client,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn PersistenceClient>,
        config: IngestConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Stores one document into `kb`; returns the file pointer with its chunk count
    pub async fn ingest(&self, kb: &KnowledgeBase, filename: &str, bytes: &[u8]) -> Result<UserFile> {
        let filename = base_name(filename);
        let parsed = parse_document_blocking(&filename, bytes).await?;
        self.store_document(kb, &filename, &filename, parsed, bytes).await
    }

    /// Fetches `url` and stores the page text into `kb` under the URL as its source
    pub async fn ingest_url(&self, kb: &KnowledgeBase, url: &str) -> Result<UserFile> {
        let page = fetch_page(&self.http, url).await?;
        self.store_document(kb, &page.url, &page.blob_name, page.parsed, &page.body)
            .await
    }

    /// Loads each page into the default knowledge base; one failure does not stop the rest
    pub async fn ingest_urls(&self, urls: &[String]) -> WebReport {
        let mut report = WebReport::default();

        for url in urls {
            match self.ingest_url(&KnowledgeBase::Default, url).await {
                Ok(file) => report.ingested.push(file),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to ingest page");
                    report.failed.push((url.clone(), e.to_string()));
                }
            }
        }

        report
    }

    /// Chunks, embeds and writes one parsed document. `source` is recorded on the
    /// file and every chunk; the raw bytes are kept under `blob_name`.
    async fn store_document(
        &self,
        kb: &KnowledgeBase,
        source: &str,
        blob_name: &str,
        parsed: ParsedDocument,
        bytes: &[u8],
    ) -> Result<UserFile> {
        let filename = source.to_string();
        let texts = chunk_text(
            &parsed.content,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );
        if texts.is_empty() {
            return Err(RetrievalError::EmptyDocument(filename));
        }

        let embeddings = self.embed_chunks(&texts).await?;

        let mut file = UserFile::new(
            kb.user_id().map(str::to_string),
            filename.clone(),
            content_type_for(blob_name),
        );
        file.storage_path = self.store_blob(&file.id, blob_name, bytes).await?;
        file.chunk_count = texts.len();

        let created_at = Utc::now().to_rfc3339();
        let chunks: Vec<DocumentChunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| {
                let mut metadata = Map::new();
                metadata.insert("source".into(), json!(filename));
                metadata.insert("chunk_index".into(), json!(index));
                metadata.insert("file_type".into(), json!(parsed.file_type));
                metadata.insert("created_at".into(), json!(created_at));
                if let Some(user_id) = kb.user_id() {
                    metadata.insert("user_id".into(), Value::String(user_id.to_string()));
                }
                DocumentChunk::new(kb.clone(), text, clean_metadata(metadata), embedding)
                    .with_file_id(file.id.clone())
            })
            .collect();

        if let Err(e) = self.store.insert_file(file.clone()).await {
            self.remove_blob(&file).await;
            return Err(e.into());
        }
        let inserted = match self.store.insert_chunks(chunks).await {
            Ok(inserted) => inserted,
            Err(e) => {
                self.rollback(&file).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            kb = %kb,
            file_id = %file.id,
            filename = %filename,
            chunks = inserted,
            "Document ingested"
        );
        Ok(file)
    }

    /// Loads every supported file under `dir` (recursively) into the default knowledge base
    pub async fn ingest_directory(&self, dir: &Path) -> Result<DirectoryReport> {
        let mut report = DirectoryReport::default();

        for path in collect_files(dir).await? {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !is_supported(&filename) {
                tracing::debug!(path = %path.display(), "Skipping unsupported file");
                continue;
            }

            let outcome = match tokio::fs::read(&path).await {
                Ok(bytes) => self.ingest(&KnowledgeBase::Default, &filename, &bytes).await,
                Err(e) => Err(e.into()),
            };

            match outcome {
                Ok(file) => report.ingested.push(file),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to ingest file");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    async fn embed_chunks(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch_size = self.config.embedding_batch_size.max(1);
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let response = self
                .embedder
                .embed(EmbeddingRequest::new(
                    &self.config.embedding_model,
                    batch.to_vec(),
                ))
                .await
                .map_err(|e| RetrievalError::Embedding(format!("{:#}", e)))?;

            if response.embeddings.len() != batch.len() {
                return Err(RetrievalError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            embeddings.extend(response.embeddings);
        }

        Ok(embeddings)
    }

    /// Drops the file pointer, any chunks already written and the raw blob
    async fn rollback(&self, file: &UserFile) {
        tracing::warn!(file_id = %file.id, filename = %file.filename, "Rolling back partial ingestion");
        if let Err(e) = self.store.delete_file(&file.id).await {
            tracing::warn!(file_id = %file.id, error = %e, "Failed to delete file record");
        }
        self.remove_blob(file).await;
    }

    async fn remove_blob(&self, file: &UserFile) {
        if file.storage_path.is_empty() {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&file.storage_path).await {
            tracing::warn!(path = %file.storage_path, error = %e, "Failed to remove stored upload");
        }
    }

    async fn store_blob(&self, file_id: &str, filename: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        let path = self
            .config
            .upload_dir
            .join(format!("{}_{}", file_id, filename));
        tokio::fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Strips any directory components a client may have sent
fn base_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

async fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
