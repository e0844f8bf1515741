use async_trait::async_trait;
use bson::doc;
use mongodb::Client;

use crate::dbs::mongo::repositories::{
    MongoAccessRepository, MongoConversationRepository, MongoDocumentRepository,
    MongoMemoryRepository, MongoPromptRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{
    Conversation, DocumentChunk, KbAccess, KnowledgeBase, Prompt, ScoredChunk, StoredMessage,
    UserFile, UserMemory,
};
use crate::trait_client::{
    AccessStore, ConversationStore, DocumentStore, MemoryStore, PersistenceClient, PromptStore,
};

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    /// Atlas Vector Search index over `documents.embedding`
    pub vector_index: String,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            vector_index: "vector_index".to_string(),
        }
    }

    pub fn with_vector_index(mut self, index: impl Into<String>) -> Self {
        self.vector_index = index.into();
        self
    }
}

pub struct MongoPersistenceClient {
    client: Client,
    database: String,
    prompts: MongoPromptRepository,
    documents: MongoDocumentRepository,
    conversations: MongoConversationRepository,
    access: MongoAccessRepository,
    memories: MongoMemoryRepository,
}

impl MongoPersistenceClient {
    /// Connect and make sure the regular (non-vector) indexes exist
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let this = Self {
            prompts: MongoPromptRepository::new(&client, &config.database),
            documents: MongoDocumentRepository::new(
                &client,
                &config.database,
                config.vector_index.clone(),
            ),
            conversations: MongoConversationRepository::new(&client, &config.database),
            access: MongoAccessRepository::new(&client, &config.database),
            memories: MongoMemoryRepository::new(&client, &config.database),
            database: config.database.clone(),
            client,
        };

        this.prompts.ensure_indexes().await?;
        this.documents.ensure_indexes().await?;
        this.conversations.ensure_indexes().await?;

        tracing::info!(database = %config.database, "Connected to MongoDB");
        Ok(this)
    }
}

#[async_trait]
impl PromptStore for MongoPersistenceClient {
    async fn add_prompt(&self, user_id: &str, name: &str, prompt: &str) -> Result<Prompt> {
        self.prompts.add(user_id, name, prompt).await
    }

    async fn list_prompts(&self, user_id: &str) -> Result<Vec<Prompt>> {
        self.prompts.list(user_id).await
    }

    async fn edit_prompt(
        &self,
        user_id: &str,
        old_name: &str,
        new_name: Option<&str>,
        new_prompt: Option<&str>,
    ) -> Result<Prompt> {
        self.prompts.edit(user_id, old_name, new_name, new_prompt).await
    }

    async fn delete_prompt(&self, user_id: &str, name: &str) -> Result<()> {
        self.prompts.delete(user_id, name).await
    }

    async fn set_active_prompt(&self, user_id: &str, name: &str) -> Result<Prompt> {
        self.prompts.set_active(user_id, name).await
    }

    async fn get_active_prompt(&self, user_id: &str) -> Result<Option<Prompt>> {
        self.prompts.active(user_id).await
    }
}

#[async_trait]
impl DocumentStore for MongoPersistenceClient {
    async fn insert_file(&self, file: UserFile) -> Result<()> {
        self.documents.insert_file(file).await
    }

    async fn insert_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        self.documents.insert_chunks(chunks).await
    }

    async fn match_documents(
        &self,
        kb: &KnowledgeBase,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<ScoredChunk>> {
        self.documents
            .match_documents(kb, query_embedding, match_count)
            .await
    }

    async fn has_documents(&self, user_id: &str) -> Result<bool> {
        self.documents.has_documents(user_id).await
    }

    async fn list_user_files(&self, user_id: &str) -> Result<Vec<UserFile>> {
        self.documents.list_user_files(user_id).await
    }

    async fn get_user_file(&self, user_id: &str, file_id: &str) -> Result<Option<UserFile>> {
        self.documents.get_user_file(user_id, file_id).await
    }

    async fn delete_user_file(&self, user_id: &str, file_id: &str) -> Result<bool> {
        self.documents.delete_user_file(user_id, file_id).await
    }

    async fn delete_file(&self, file_id: &str) -> Result<bool> {
        self.documents.delete_file(file_id).await
    }

    async fn count_chunks(&self, kb: &KnowledgeBase) -> Result<u64> {
        self.documents.count_chunks(kb).await
    }
}

#[async_trait]
impl ConversationStore for MongoPersistenceClient {
    async fn create_conversation(&self, user_id: &str, title: Option<&str>) -> Result<Conversation> {
        self.conversations.create(user_id, title).await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.conversations.get(conversation_id).await
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: Option<i64>,
        skip: Option<u64>,
    ) -> Result<Vec<Conversation>> {
        self.conversations.list(user_id, limit, skip).await
    }

    async fn delete_conversation(&self, conversation_id: &str, user_id: &str) -> Result<bool> {
        self.conversations.delete(conversation_id, user_id).await
    }

    async fn save_message(&self, message: StoredMessage) -> Result<()> {
        self.conversations.save_message(message).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        self.conversations.get_messages(conversation_id).await
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<()> {
        self.conversations.touch(conversation_id).await
    }
}

#[async_trait]
impl AccessStore for MongoPersistenceClient {
    async fn get_kb_access(&self, user_id: &str) -> Result<Option<KbAccess>> {
        self.access.get(user_id).await
    }

    async fn set_kb_access(&self, user_id: &str, has_access: bool) -> Result<KbAccess> {
        self.access.set(user_id, has_access).await
    }
}

#[async_trait]
impl MemoryStore for MongoPersistenceClient {
    async fn save_memory(&self, user_id: &str, memory_text: &str) -> Result<UserMemory> {
        self.memories.save(user_id, memory_text).await
    }

    async fn load_memories(&self, user_id: &str) -> Result<Vec<UserMemory>> {
        self.memories.load(user_id).await
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}
