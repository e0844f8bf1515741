pub mod access;
pub mod conversation;
pub mod document;
pub mod knowledge_base;
pub mod prompt;

pub use access::{KbAccess, UserMemory};
pub use conversation::{Conversation, MessageRole, MessageType, StoredMessage, DEFAULT_CONVERSATION_TITLE};
pub use document::{DocumentChunk, ScoredChunk, UserFile};
pub use knowledge_base::KnowledgeBase;
pub use prompt::Prompt;
