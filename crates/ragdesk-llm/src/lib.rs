pub mod buffer_utils;
pub mod config;
pub mod mock;
pub mod openai;
pub mod streaming;
pub mod traits;
pub mod types;

pub use traits::{
    ChatClient, ChatOptions, ChatRequest, ChatResponse, EmbeddingClient, EmbeddingRequest,
    EmbeddingResponse, EventStream, LLMClient, TokenUsage,
};

pub use config::{ClientFactory, OpenAIConfig, ProviderClients, ProviderConfig, ProviderType};
pub use openai::OpenAIClient;
pub use streaming::StreamEvent;
pub use types::{Content, Message, Tool, ToolCall, ToolChoice};
