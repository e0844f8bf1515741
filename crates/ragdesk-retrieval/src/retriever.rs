use std::sync::Arc;

use ragdesk_llm::EmbeddingClient;
use ragdesk_persist::{KnowledgeBase, PersistenceClient};
use serde_json::Value;

use crate::error::{Result, RetrievalError};
use crate::reranker::{RankedDocument, Reranker};

pub const NO_DOCUMENTS_FOUND: &str = "No matching documents found.";

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    pub embedding_model: String,
    /// Chunks fetched from the vector store before re-ranking
    pub candidate_count: usize,
    /// Chunks kept after re-ranking
    pub top_k: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-3-small".to_string(),
            candidate_count: 5,
            top_k: 3,
        }
    }
}

/// Documents plus the text handed to the model
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub documents: Vec<RankedDocument>,
    pub serialized: String,
}

/// Embed, search, re-rank, truncate
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn PersistenceClient>,
    reranker: Arc<dyn Reranker>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn PersistenceClient>,
        reranker: Arc<dyn Reranker>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            reranker,
            config,
        }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn reranker_name(&self) -> &str {
        self.reranker.name()
    }

    pub async fn retrieve(&self, kb: &KnowledgeBase, query: &str) -> Result<Retrieval> {
        let embedding = self
            .embedder
            .embed_query(&self.config.embedding_model, query)
            .await
            .map_err(|e| RetrievalError::Embedding(format!("{:#}", e)))?;

        let candidates = self
            .store
            .match_documents(kb, &embedding, self.config.candidate_count)
            .await?;

        if candidates.is_empty() {
            tracing::info!(kb = %kb, "No candidates found");
            return Ok(Retrieval {
                documents: Vec::new(),
                serialized: NO_DOCUMENTS_FOUND.to_string(),
            });
        }

        tracing::debug!(kb = %kb, count = candidates.len(), reranker = self.reranker.name(), "Re-ranking candidates");

        let documents: Vec<RankedDocument> = candidates.into_iter().map(RankedDocument::from).collect();
        let mut documents = self.reranker.rerank(query, documents).await?;
        documents.truncate(self.config.top_k);

        let serialized = serialize_documents(&documents);
        Ok(Retrieval {
            documents,
            serialized,
        })
    }
}

/// The text the model sees for a set of retrieved documents
pub fn serialize_documents(documents: &[RankedDocument]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS_FOUND.to_string();
    }

    documents
        .iter()
        .map(|doc| {
            format!(
                "Rerank Score: {:.3}\nSource: {}\nContent: {}",
                doc.rerank_score,
                Value::Object(doc.metadata.clone()),
                doc.page_content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
