use async_trait::async_trait;

use super::{sort_by_rerank_score, RankedDocument, Reranker};
use crate::error::Result;

/// Uses the vector similarity as the re-rank score
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityReranker;

#[async_trait]
impl Reranker for SimilarityReranker {
    fn name(&self) -> &str {
        "similarity"
    }

    async fn rerank(
        &self,
        _query: &str,
        mut documents: Vec<RankedDocument>,
    ) -> Result<Vec<RankedDocument>> {
        for doc in &mut documents {
            doc.rerank_score = doc.similarity;
        }
        sort_by_rerank_score(&mut documents);
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn test_scores_follow_similarity() {
        let docs = vec![
            RankedDocument {
                page_content: "low".into(),
                metadata: Map::new(),
                similarity: 0.2,
                rerank_score: 0.0,
            },
            RankedDocument {
                page_content: "high".into(),
                metadata: Map::new(),
                similarity: 0.8,
                rerank_score: 0.0,
            },
        ];
        let ranked = SimilarityReranker.rerank("q", docs).await.unwrap();
        assert_eq!(ranked[0].page_content, "high");
        assert_eq!(ranked[0].rerank_score, 0.8);
        assert_eq!(ranked[1].rerank_score, 0.2);
    }
}
