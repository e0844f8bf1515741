use std::sync::Arc;

use ragdesk_graph::{Graph, ToolRegistry};
use ragdesk_llm::{ChatClient, EmbeddingClient};
use ragdesk_persist::{KnowledgeBase, PersistenceClient};
use ragdesk_retrieval::{Ingestor, Reranker, Retriever, RetrieverTool};

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Everything is behind `Arc`; the retriever and ingestor hold their own handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub llm_client: Arc<dyn ChatClient>,
    pub retriever: Retriever,
    pub ingestor: Ingestor,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        llm_client: Arc<dyn ChatClient>,
        embedder: Arc<dyn EmbeddingClient>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        let retriever = Retriever::new(
            Arc::clone(&embedder),
            Arc::clone(&persist),
            reranker,
            config.retriever_config(),
        );
        let ingestor = Ingestor::new(embedder, Arc::clone(&persist), config.ingest_config());

        Self {
            config: Arc::new(config),
            persist,
            llm_client,
            retriever,
            ingestor,
        }
    }

    /// Agent graph whose retrieval tool is bound to `kb`
    pub fn graph_for(&self, kb: KnowledgeBase) -> anyhow::Result<Graph> {
        let tools = ToolRegistry::new().register(Arc::new(RetrieverTool::new(
            self.retriever.clone(),
            kb,
        )));

        Graph::builder()
            .llm_client(Arc::clone(&self.llm_client))
            .tools(Arc::new(tools))
            .config(self.config.graph_config())
            .with_persistence(Arc::clone(&self.persist))
            .build()
    }
}
