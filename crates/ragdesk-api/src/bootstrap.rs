//! Wiring shared by the server and the ingest CLI.

use std::sync::Arc;

use ragdesk_llm::{ClientFactory, OpenAIConfig, ProviderClients, ProviderConfig};
use ragdesk_persist::{InMemoryPersistenceClient, PersistenceClient};
use ragdesk_retrieval::{Reranker, SimilarityReranker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StorageBackend};
use crate::state::AppState;

pub fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

pub fn provider_clients(config: &Config) -> anyhow::Result<ProviderClients> {
    let mut openai = OpenAIConfig::new(config.openai_api_key.clone());
    openai.embedding_batch_size = config.llm.embedding_batch_size;
    if let Some(base_url) = &config.llm.base_url {
        openai = openai.with_base_url(base_url.clone());
    }
    ClientFactory::create_clients(ProviderConfig::openai_with(openai))
}

pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn PersistenceClient>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing survives a restart");
            Ok(Arc::new(InMemoryPersistenceClient::new()))
        }
        StorageBackend::Mongodb => connect_mongo(config).await,
    }
}

#[cfg(feature = "mongodb")]
async fn connect_mongo(config: &Config) -> anyhow::Result<Arc<dyn PersistenceClient>> {
    use anyhow::Context;
    use ragdesk_persist::{MongoConfig, MongoPersistenceClient};

    tracing::info!(database = %config.mongodb.database, "Connecting to MongoDB");
    let mongo = MongoConfig::new(&config.mongodb_uri, &config.mongodb.database)
        .with_vector_index(&config.retrieval.vector_index);
    let client = MongoPersistenceClient::connect(&mongo)
        .await
        .context("Failed to connect to MongoDB")?;
    tracing::info!("MongoDB connected");
    Ok(Arc::new(client))
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongo(_config: &Config) -> anyhow::Result<Arc<dyn PersistenceClient>> {
    anyhow::bail!("storage.backend = \"mongodb\" requires the `mongodb` feature")
}

/// Cross-encoder when enabled and compiled in, vector similarity otherwise
pub async fn load_reranker(config: &Config) -> anyhow::Result<Arc<dyn Reranker>> {
    if !config.retrieval.rerank {
        tracing::info!("Re-ranking disabled; ordering by vector similarity");
        return Ok(Arc::new(SimilarityReranker));
    }
    load_cross_encoder(&config.retrieval.rerank_model).await
}

#[cfg(feature = "cross-encoder")]
async fn load_cross_encoder(model_id: &str) -> anyhow::Result<Arc<dyn Reranker>> {
    use anyhow::Context;
    use ragdesk_retrieval::CrossEncoderReranker;

    tracing::info!(model = %model_id, "Loading cross-encoder");
    let model_id = model_id.to_string();
    let reranker = tokio::task::spawn_blocking(move || CrossEncoderReranker::load(&model_id))
        .await
        .context("Cross-encoder loader panicked")??;
    tracing::info!(model = %reranker.model_id(), "Cross-encoder ready");
    Ok(Arc::new(reranker))
}

#[cfg(not(feature = "cross-encoder"))]
async fn load_cross_encoder(model_id: &str) -> anyhow::Result<Arc<dyn Reranker>> {
    tracing::warn!(
        model = %model_id,
        "Built without the `cross-encoder` feature; ordering by vector similarity"
    );
    Ok(Arc::new(SimilarityReranker))
}

/// Connects every backend named in `config`
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let clients = provider_clients(&config)?;
    let persist = connect_store(&config).await?;
    let reranker = load_reranker(&config).await?;

    Ok(AppState::new(
        config,
        persist,
        clients.chat,
        clients.embeddings,
        reranker,
    ))
}
