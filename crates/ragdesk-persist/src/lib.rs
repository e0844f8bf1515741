pub mod dbs;
pub mod error;
pub mod models;
pub mod trait_client;

pub use dbs::memory::InMemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use dbs::mongo::{MongoConfig, MongoPersistenceClient};
pub use error::{PersistError, Result};
pub use models::{
    Conversation, DocumentChunk, KbAccess, KnowledgeBase, MessageRole, MessageType, Prompt,
    ScoredChunk, StoredMessage, UserFile, UserMemory,
};
pub use trait_client::{
    AccessStore, ConversationStore, DocumentStore, MemoryStore, PersistenceClient, PromptStore,
};

/// Cosine similarity; `0.0` when either vector has no magnitude or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
