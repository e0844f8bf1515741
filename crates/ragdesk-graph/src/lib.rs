pub mod builder;
pub mod context;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod router;
pub mod tools;
pub mod types;

pub use builder::GraphBuilder;
pub use context::{build_history, ContextPolicy};
pub use graph::{Graph, PersistenceContext};
pub use node::{EventSender, Node, NodeType};
pub use router::{NextNode, Router, SimpleRouter};
pub use tools::{ToolExecutor, ToolOutput, ToolRegistry};
pub use types::{GraphConfig, GraphInput, GraphOutcome, GraphState, LLMConfig, StreamEvent, ToolArtifact};
