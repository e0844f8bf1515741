use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Conversation, DocumentChunk, KbAccess, KnowledgeBase, Prompt, ScoredChunk, StoredMessage,
    UserFile, UserMemory,
};

/// Named prompts, one active per user
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate name. Becomes active when the user has no active prompt.
    async fn add_prompt(&self, user_id: &str, name: &str, prompt: &str) -> Result<Prompt>;

    async fn list_prompts(&self, user_id: &str) -> Result<Vec<Prompt>>;

    async fn edit_prompt(
        &self,
        user_id: &str,
        old_name: &str,
        new_name: Option<&str>,
        new_prompt: Option<&str>,
    ) -> Result<Prompt>;

    async fn delete_prompt(&self, user_id: &str, name: &str) -> Result<()>;

    /// Deactivates every other prompt of the user
    async fn set_active_prompt(&self, user_id: &str, name: &str) -> Result<Prompt>;

    async fn get_active_prompt(&self, user_id: &str) -> Result<Option<Prompt>>;
}

/// Chunk storage and similarity search, partitioned by knowledge base
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_file(&self, file: UserFile) -> Result<()>;

    async fn insert_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize>;

    /// Nearest chunks in `kb`, most similar first
    async fn match_documents(
        &self,
        kb: &KnowledgeBase,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<ScoredChunk>>;

    async fn has_documents(&self, user_id: &str) -> Result<bool>;

    async fn list_user_files(&self, user_id: &str) -> Result<Vec<UserFile>>;

    async fn get_user_file(&self, user_id: &str, file_id: &str) -> Result<Option<UserFile>>;

    /// Removes the file and its chunks. `false` when the user owns no such file.
    async fn delete_user_file(&self, user_id: &str, file_id: &str) -> Result<bool>;

    /// Removes a file and its chunks whatever knowledge base they belong to
    async fn delete_file(&self, file_id: &str) -> Result<bool>;

    async fn count_chunks(&self, kb: &KnowledgeBase) -> Result<u64>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, user_id: &str, title: Option<&str>) -> Result<Conversation>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Most recently updated first
    async fn list_conversations(
        &self,
        user_id: &str,
        limit: Option<i64>,
        skip: Option<u64>,
    ) -> Result<Vec<Conversation>>;

    /// Deletes the conversation and its messages. `false` when the user owns no such conversation.
    async fn delete_conversation(&self, conversation_id: &str, user_id: &str) -> Result<bool>;

    async fn save_message(&self, message: StoredMessage) -> Result<()>;

    /// Oldest first
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>>;

    async fn touch_conversation(&self, conversation_id: &str) -> Result<()>;
}

#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn get_kb_access(&self, user_id: &str) -> Result<Option<KbAccess>>;

    async fn set_kb_access(&self, user_id: &str, has_access: bool) -> Result<KbAccess>;
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn save_memory(&self, user_id: &str, memory_text: &str) -> Result<UserMemory>;

    /// Oldest first
    async fn load_memories(&self, user_id: &str) -> Result<Vec<UserMemory>>;
}

/// Every store the service needs, behind one backend
#[async_trait]
pub trait PersistenceClient:
    PromptStore + DocumentStore + ConversationStore + AccessStore + MemoryStore
{
    fn backend_name(&self) -> &'static str;

    /// Round-trip to the backing database
    async fn ping(&self) -> Result<()>;
}
