//! Local cross-encoder scoring on candle.
//!
//! Loads a BERT sequence-classification checkpoint from the Hugging Face Hub
//! (encoder, pooler, single-logit classifier) and scores `(query, passage)`
//! pairs. Scores are passed through a sigmoid so they land in `0..1`.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};

use super::{sort_by_rerank_score, RankedDocument, Reranker};
use crate::error::{Result, RetrievalError};

pub const DEFAULT_RERANK_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

const MAX_SEQUENCE_LEN: usize = 512;

/// Fields the classification head needs from `config.json`
#[derive(Deserialize)]
struct HeadConfig {
    hidden_size: usize,
}

struct CrossEncoderModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderModel {
    fn load(model_id: &str) -> anyhow::Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .context("Failed to download model config")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to download model weights")?;

        let config_contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&config_contents).context("Failed to parse model config")?;
        let head: HeadConfig =
            serde_json::from_str(&config_contents).context("Failed to parse model config")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };

        // Sequence-classification checkpoints nest the encoder under `bert.`
        let encoder_vb = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            vb.pp("bert")
        } else {
            vb.clone()
        };

        let bert = BertModel::load(encoder_vb.clone(), &config)
            .context("Failed to create BERT model")?;
        let pooler = linear(head.hidden_size, head.hidden_size, encoder_vb.pp("pooler.dense"))
            .context("Failed to load pooler")?;
        let classifier = linear(head.hidden_size, 1, vb.pp("classifier"))
            .context("Failed to load classifier head")?;

        Ok(Self {
            bert,
            pooler,
            classifier,
            tokenizer,
            device,
        })
    }

    fn score(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(String, String)> = passages
            .iter()
            .map(|passage| (query.to_string(), passage.clone()))
            .collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut ids = Vec::with_capacity(batch_size * max_len);
        let mut type_ids = Vec::with_capacity(batch_size * max_len);
        let mut mask = Vec::with_capacity(batch_size * max_len);
        for encoding in &encodings {
            let pad = max_len - encoding.get_ids().len();
            ids.extend_from_slice(encoding.get_ids());
            ids.extend(std::iter::repeat(0u32).take(pad));
            type_ids.extend_from_slice(encoding.get_type_ids());
            type_ids.extend(std::iter::repeat(0u32).take(pad));
            mask.extend_from_slice(encoding.get_attention_mask());
            mask.extend(std::iter::repeat(0u32).take(pad));
        }

        let input_ids = Tensor::from_vec(ids, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(type_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch_size, max_len), &self.device)?;

        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self
            .classifier
            .forward(&pooled)?
            .squeeze(1)?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?;

        Ok(logits.into_iter().map(sigmoid).collect())
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Re-ranks with a locally run cross-encoder; load once and share
pub struct CrossEncoderReranker {
    model: Arc<CrossEncoderModel>,
    model_id: String,
}

impl CrossEncoderReranker {
    /// Downloads the model on first use (cached by hf-hub afterwards)
    pub fn load(model_id: &str) -> anyhow::Result<Self> {
        tracing::info!(model = %model_id, "Loading cross-encoder");
        let model = CrossEncoderModel::load(model_id)?;
        Ok(Self {
            model: Arc::new(model),
            model_id: model_id.to_string(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    fn name(&self) -> &str {
        "cross-encoder"
    }

    async fn rerank(
        &self,
        query: &str,
        mut documents: Vec<RankedDocument>,
    ) -> Result<Vec<RankedDocument>> {
        if documents.is_empty() {
            return Ok(documents);
        }

        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let passages: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();

        let scores = tokio::task::spawn_blocking(move || model.score(&query, &passages))
            .await
            .map_err(|e| RetrievalError::Rerank(e.to_string()))?
            .map_err(|e| RetrievalError::Rerank(format!("{:#}", e)))?;

        if scores.len() != documents.len() {
            return Err(RetrievalError::Rerank(format!(
                "expected {} scores, got {}",
                documents.len(),
                scores.len()
            )));
        }

        for (doc, score) in documents.iter_mut().zip(scores) {
            doc.rerank_score = score;
        }
        sort_by_rerank_score(&mut documents);
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(8.0) > 0.99);
        assert!(sigmoid(-8.0) < 0.01);
    }

    #[tokio::test]
    #[ignore] // Integration test - requires model download
    async fn test_relevant_passage_ranks_first() {
        let reranker = CrossEncoderReranker::load(DEFAULT_RERANK_MODEL).expect("load model");
        let docs = ["Paris is the capital of France.", "Bananas are rich in potassium."]
            .into_iter()
            .map(|text| RankedDocument {
                page_content: text.to_string(),
                metadata: Map::new(),
                similarity: 0.5,
                rerank_score: 0.0,
            })
            .collect();

        let ranked = reranker
            .rerank("What is the capital of France?", docs)
            .await
            .expect("rerank");
        assert!(ranked[0].page_content.starts_with("Paris"));
        assert!(ranked[0].rerank_score > ranked[1].rerank_score);
    }
}
