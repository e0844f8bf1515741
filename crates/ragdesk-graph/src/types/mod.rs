pub mod config;
pub mod events;
pub mod outcome;
pub mod state;

pub use config::{GraphConfig, LLMConfig};
pub use events::StreamEvent;
pub use outcome::GraphOutcome;
pub use state::{GraphInput, GraphState, ToolArtifact};
