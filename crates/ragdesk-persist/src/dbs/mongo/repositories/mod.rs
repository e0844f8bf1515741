mod access;
mod conversation;
mod document;
mod memory;
mod prompt;

pub use access::MongoAccessRepository;
pub use conversation::MongoConversationRepository;
pub use document::MongoDocumentRepository;
pub use memory::MongoMemoryRepository;
pub use prompt::MongoPromptRepository;
