use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::cosine_similarity;
use crate::error::{PersistError, Result};
use crate::models::{
    Conversation, DocumentChunk, KbAccess, KnowledgeBase, Prompt, ScoredChunk, StoredMessage,
    UserFile, UserMemory,
};
use crate::trait_client::{
    AccessStore, ConversationStore, DocumentStore, MemoryStore, PersistenceClient, PromptStore,
};

/// Process-local backend with the same semantics as the MongoDB one.
///
/// Similarity search is a brute-force cosine scan.
#[derive(Default)]
pub struct InMemoryPersistenceClient {
    prompts: RwLock<Vec<Prompt>>,
    files: RwLock<HashMap<String, UserFile>>,
    chunks: RwLock<Vec<DocumentChunk>>,
    conversations: RwLock<HashMap<String, Conversation>>,
    messages: RwLock<Vec<StoredMessage>>,
    kb_access: RwLock<HashMap<String, KbAccess>>,
    memories: RwLock<Vec<UserMemory>>,
}

impl InMemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromptStore for InMemoryPersistenceClient {
    async fn add_prompt(&self, user_id: &str, name: &str, prompt: &str) -> Result<Prompt> {
        let mut prompts = self.prompts.write().await;

        if prompts.iter().any(|p| p.user_id == user_id && p.name == name) {
            return Err(PersistError::Conflict(format!("prompt '{}'", name)));
        }

        let mut record = Prompt::new(user_id, name, prompt);
        record.is_active = !prompts.iter().any(|p| p.user_id == user_id && p.is_active);
        prompts.push(record.clone());
        Ok(record)
    }

    async fn list_prompts(&self, user_id: &str) -> Result<Vec<Prompt>> {
        let prompts = self.prompts.read().await;
        Ok(prompts.iter().filter(|p| p.user_id == user_id).cloned().collect())
    }

    async fn edit_prompt(
        &self,
        user_id: &str,
        old_name: &str,
        new_name: Option<&str>,
        new_prompt: Option<&str>,
    ) -> Result<Prompt> {
        let mut prompts = self.prompts.write().await;

        if let Some(new_name) = new_name {
            if new_name != old_name
                && prompts.iter().any(|p| p.user_id == user_id && p.name == new_name)
            {
                return Err(PersistError::Conflict(format!("prompt '{}'", new_name)));
            }
        }

        let record = prompts
            .iter_mut()
            .find(|p| p.user_id == user_id && p.name == old_name)
            .ok_or_else(|| PersistError::NotFound(format!("prompt '{}'", old_name)))?;

        if let Some(new_name) = new_name {
            record.name = new_name.to_string();
        }
        if let Some(new_prompt) = new_prompt {
            record.prompt = new_prompt.to_string();
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_prompt(&self, user_id: &str, name: &str) -> Result<()> {
        let mut prompts = self.prompts.write().await;
        let before = prompts.len();
        prompts.retain(|p| !(p.user_id == user_id && p.name == name));
        if prompts.len() == before {
            return Err(PersistError::NotFound(format!("prompt '{}'", name)));
        }
        Ok(())
    }

    async fn set_active_prompt(&self, user_id: &str, name: &str) -> Result<Prompt> {
        let mut prompts = self.prompts.write().await;

        if !prompts.iter().any(|p| p.user_id == user_id && p.name == name) {
            return Err(PersistError::NotFound(format!("prompt '{}'", name)));
        }

        let now = Utc::now();
        let mut activated = None;
        for p in prompts.iter_mut().filter(|p| p.user_id == user_id) {
            let active = p.name == name;
            if p.is_active != active {
                p.is_active = active;
                p.updated_at = now;
            }
            if active {
                activated = Some(p.clone());
            }
        }

        activated.ok_or_else(|| PersistError::NotFound(format!("prompt '{}'", name)))
    }

    async fn get_active_prompt(&self, user_id: &str) -> Result<Option<Prompt>> {
        let prompts = self.prompts.read().await;
        Ok(prompts
            .iter()
            .find(|p| p.user_id == user_id && p.is_active)
            .cloned())
    }
}

#[async_trait]
impl DocumentStore for InMemoryPersistenceClient {
    async fn insert_file(&self, file: UserFile) -> Result<()> {
        self.files.write().await.insert(file.id.clone(), file);
        Ok(())
    }

    async fn insert_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        let count = chunks.len();
        self.chunks.write().await.extend(chunks);
        Ok(count)
    }

    async fn match_documents(
        &self,
        kb: &KnowledgeBase,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().await;

        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|c| &c.kb == kb)
            .map(|c| ScoredChunk {
                similarity: cosine_similarity(&c.embedding, query_embedding),
                chunk: c.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(match_count);
        Ok(scored)
    }

    async fn has_documents(&self, user_id: &str) -> Result<bool> {
        let kb = KnowledgeBase::user(user_id);
        Ok(self.chunks.read().await.iter().any(|c| c.kb == kb))
    }

    async fn list_user_files(&self, user_id: &str) -> Result<Vec<UserFile>> {
        let files = self.files.read().await;
        let mut owned: Vec<UserFile> = files
            .values()
            .filter(|f| f.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn get_user_file(&self, user_id: &str, file_id: &str) -> Result<Option<UserFile>> {
        let files = self.files.read().await;
        Ok(files
            .get(file_id)
            .filter(|f| f.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn delete_user_file(&self, user_id: &str, file_id: &str) -> Result<bool> {
        let mut files = self.files.write().await;

        let owned = files
            .get(file_id)
            .is_some_and(|f| f.user_id.as_deref() == Some(user_id));
        if !owned {
            return Ok(false);
        }

        files.remove(file_id);
        self.chunks
            .write()
            .await
            .retain(|c| c.file_id.as_deref() != Some(file_id));
        Ok(true)
    }

    async fn delete_file(&self, file_id: &str) -> Result<bool> {
        let removed = self.files.write().await.remove(file_id).is_some();
        self.chunks
            .write()
            .await
            .retain(|c| c.file_id.as_deref() != Some(file_id));
        Ok(removed)
    }

    async fn count_chunks(&self, kb: &KnowledgeBase) -> Result<u64> {
        let chunks = self.chunks.read().await;
        Ok(chunks.iter().filter(|c| &c.kb == kb).count() as u64)
    }
}

#[async_trait]
impl ConversationStore for InMemoryPersistenceClient {
    async fn create_conversation(&self, user_id: &str, title: Option<&str>) -> Result<Conversation> {
        let conversation = Conversation::new(user_id, title);
        self.conversations
            .write()
            .await
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(conversation_id).cloned())
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: Option<i64>,
        skip: Option<u64>,
    ) -> Result<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut owned: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let skip = skip.unwrap_or(0) as usize;
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(owned.into_iter().skip(skip).take(limit).collect())
    }

    async fn delete_conversation(&self, conversation_id: &str, user_id: &str) -> Result<bool> {
        let mut conversations = self.conversations.write().await;

        let owned = conversations
            .get(conversation_id)
            .is_some_and(|c| c.user_id == user_id);
        if !owned {
            return Ok(false);
        }

        conversations.remove(conversation_id);
        self.messages
            .write()
            .await
            .retain(|m| m.conversation_id != conversation_id);
        Ok(true)
    }

    async fn save_message(&self, message: StoredMessage) -> Result<()> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let messages = self.messages.read().await;
        let mut found: Vec<StoredMessage> = messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // stable: insertion order breaks timestamp ties
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| PersistError::NotFound(format!("conversation '{}'", conversation_id)))?;
        conversation.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AccessStore for InMemoryPersistenceClient {
    async fn get_kb_access(&self, user_id: &str) -> Result<Option<KbAccess>> {
        Ok(self.kb_access.read().await.get(user_id).cloned())
    }

    async fn set_kb_access(&self, user_id: &str, has_access: bool) -> Result<KbAccess> {
        let mut grants = self.kb_access.write().await;
        let now = Utc::now();
        let grant = grants
            .entry(user_id.to_string())
            .and_modify(|g| {
                g.has_access_to_default_kb = has_access;
                g.updated_at = now;
            })
            .or_insert_with(|| KbAccess {
                user_id: user_id.to_string(),
                has_access_to_default_kb: has_access,
                created_at: now,
                updated_at: now,
            });
        Ok(grant.clone())
    }
}

#[async_trait]
impl MemoryStore for InMemoryPersistenceClient {
    async fn save_memory(&self, user_id: &str, memory_text: &str) -> Result<UserMemory> {
        let memory = UserMemory::new(user_id, memory_text);
        self.memories.write().await.push(memory.clone());
        Ok(memory)
    }

    async fn load_memories(&self, user_id: &str) -> Result<Vec<UserMemory>> {
        let memories = self.memories.read().await;
        Ok(memories.iter().filter(|m| m.user_id == user_id).cloned().collect())
    }
}

#[async_trait]
impl PersistenceClient for InMemoryPersistenceClient {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
