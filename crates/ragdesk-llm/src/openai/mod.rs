mod client;

pub use client::{OpenAIClient, DEFAULT_EMBEDDING_BATCH_SIZE};
