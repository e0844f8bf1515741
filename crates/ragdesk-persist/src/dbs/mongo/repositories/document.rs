use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::{MongoChunk, MongoScoredChunk, MongoUserFile};
use crate::error::Result;
use crate::models::{DocumentChunk, KnowledgeBase, ScoredChunk, UserFile};

/// Chunks and file pointers.
///
/// Similarity search needs an Atlas Vector Search index on `documents.embedding`
/// with `kb` declared as a filter field.
#[derive(Clone)]
pub struct MongoDocumentRepository {
    chunks: Collection<MongoChunk>,
    files: Collection<MongoUserFile>,
    vector_index: String,
}

impl MongoDocumentRepository {
    pub fn new(client: &Client, db_name: &str, vector_index: impl Into<String>) -> Self {
        let db = client.database(db_name);
        Self {
            chunks: db.collection("documents"),
            files: db.collection("user_files"),
            vector_index: vector_index.into(),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        self.chunks
            .create_index(IndexModel::builder().keys(doc! { "kb": 1 }).build())
            .await?;
        self.chunks
            .create_index(IndexModel::builder().keys(doc! { "file_id": 1 }).build())
            .await?;
        self.files
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
            .await?;
        Ok(())
    }

    pub async fn insert_file(&self, file: UserFile) -> Result<()> {
        self.files.insert_one(MongoUserFile::from(file)).await?;
        Ok(())
    }

    pub async fn insert_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let docs: Vec<MongoChunk> = chunks.into_iter().map(MongoChunk::from).collect();
        let result = self.chunks.insert_many(docs).await?;
        Ok(result.inserted_ids.len())
    }

    pub async fn match_documents(
        &self,
        kb: &KnowledgeBase,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vector: Vec<f64> = query_embedding.iter().map(|v| *v as f64).collect();
        let limit = match_count as i64;
        let num_candidates = (limit * 10).max(100);

        let pipeline = vec![
            doc! { "$vectorSearch": {
                "index": &self.vector_index,
                "path": "embedding",
                "queryVector": query_vector,
                "numCandidates": num_candidates,
                "limit": limit,
                "filter": { "kb": kb.partition_key() },
            } },
            doc! { "$set": { "similarity": { "$meta": "vectorSearchScore" } } },
            doc! { "$unset": "embedding" },
        ];

        let raw: Vec<Document> = self.chunks.aggregate(pipeline).await?.try_collect().await?;

        raw.into_iter()
            .map(|d| -> Result<ScoredChunk> {
                let scored: MongoScoredChunk = bson::from_document(d)?;
                Ok(ScoredChunk {
                    similarity: scored.similarity as f32,
                    chunk: scored.chunk.into(),
                })
            })
            .collect()
    }

    pub async fn has_documents(&self, user_id: &str) -> Result<bool> {
        let count = self
            .chunks
            .count_documents(doc! { "kb": KnowledgeBase::user(user_id).partition_key() })
            .limit(1)
            .await?;
        Ok(count > 0)
    }

    pub async fn list_user_files(&self, user_id: &str) -> Result<Vec<UserFile>> {
        let files: Vec<MongoUserFile> = self
            .files
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(files.into_iter().map(UserFile::from).collect())
    }

    pub async fn get_user_file(&self, user_id: &str, file_id: &str) -> Result<Option<UserFile>> {
        Ok(self
            .files
            .find_one(doc! { "_id": file_id, "user_id": user_id })
            .await?
            .map(UserFile::from))
    }

    pub async fn delete_user_file(&self, user_id: &str, file_id: &str) -> Result<bool> {
        let result = self
            .files
            .delete_one(doc! { "_id": file_id, "user_id": user_id })
            .await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }

        let chunks = self
            .chunks
            .delete_many(doc! { "file_id": file_id, "user_id": user_id })
            .await?;
        tracing::debug!(file_id, deleted_chunks = chunks.deleted_count, "Deleted user file");
        Ok(true)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<bool> {
        let result = self.files.delete_one(doc! { "_id": file_id }).await?;
        let chunks = self.chunks.delete_many(doc! { "file_id": file_id }).await?;
        tracing::debug!(file_id, deleted_chunks = chunks.deleted_count, "Deleted file");
        Ok(result.deleted_count > 0 || chunks.deleted_count > 0)
    }

    pub async fn count_chunks(&self, kb: &KnowledgeBase) -> Result<u64> {
        Ok(self
            .chunks
            .count_documents(doc! { "kb": kb.partition_key() })
            .await?)
    }
}
