#[cfg(feature = "cross-encoder")]
mod cross_encoder;
mod similarity;

use async_trait::async_trait;
use ragdesk_persist::ScoredChunk;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

#[cfg(feature = "cross-encoder")]
pub use cross_encoder::{CrossEncoderReranker, DEFAULT_RERANK_MODEL};
pub use similarity::SimilarityReranker;

/// A retrieved passage with its vector similarity and re-rank score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub page_content: String,
    pub metadata: Map<String, Value>,
    pub similarity: f32,
    #[serde(default)]
    pub rerank_score: f32,
}

impl RankedDocument {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }
}

impl From<ScoredChunk> for RankedDocument {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            page_content: scored.chunk.content,
            metadata: scored.chunk.metadata,
            similarity: scored.similarity,
            rerank_score: 0.0,
        }
    }
}

#[async_trait]
pub trait Reranker: Send + Sync {
    fn name(&self) -> &str;

    /// Scores every document against `query` and returns them best first
    async fn rerank(&self, query: &str, documents: Vec<RankedDocument>)
        -> Result<Vec<RankedDocument>>;
}

/// Stable descending sort on `rerank_score`
pub fn sort_by_rerank_score(documents: &mut [RankedDocument]) {
    documents.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
}
