use crate::streaming::parse_chat_sse_stream;
use crate::traits::{
    ChatClient, ChatOptions, ChatRequest, ChatResponse, EmbeddingClient, EmbeddingRequest,
    EmbeddingResponse, EventStream, LLMClient, TokenUsage,
};
use crate::types::{Message, ToolCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Inputs sent per `/embeddings` call
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 256;

/// OpenAI client (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
    embedding_batch_size: usize,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENAI_API_BASE.to_string(),
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        })
    }

    /// Point at a compatible endpoint (proxy, local gateway, test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_embedding_batch_size(mut self, batch_size: usize) -> Self {
        self.embedding_batch_size = batch_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_chat_request(
        &self,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let mut request = serde_json::json!({
            "model": model,
            "messages": serde_json::to_value(messages)?,
            "stream": stream,
        });

        let Some(obj) = request.as_object_mut() else {
            anyhow::bail!("Chat payload is not a JSON object");
        };

        // o1 and gpt-5 reject temperature and rename max_tokens
        let is_reasoning_model = model.starts_with("o1") || model.starts_with("gpt-5");

        if let Some(temp) = options.temperature {
            if !is_reasoning_model {
                obj.insert("temperature".to_string(), serde_json::json!(temp));
            }
        }
        if let Some(max_tokens) = options.max_tokens {
            let token_field = if is_reasoning_model {
                "max_completion_tokens"
            } else {
                "max_tokens"
            };
            obj.insert(token_field.to_string(), serde_json::json!(max_tokens));
        }
        if let Some(tools) = &options.tools {
            if !tools.is_empty() {
                obj.insert("tools".to_string(), serde_json::to_value(tools)?);
            }
        }
        if let Some(tool_choice) = &options.tool_choice {
            obj.insert("tool_choice".to_string(), serde_json::to_value(tool_choice)?);
        }

        Ok(request)
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        Ok(response)
    }

    async fn embed_batch(
        &self,
        model: &str,
        input: &[String],
        dimensions: Option<u32>,
    ) -> Result<(Vec<Vec<f32>>, Option<TokenUsage>)> {
        let mut payload = serde_json::json!({
            "model": model,
            "input": input,
            "encoding_format": "float",
        });
        if let (Some(dimensions), Some(obj)) = (dimensions, payload.as_object_mut()) {
            obj.insert("dimensions".to_string(), serde_json::json!(dimensions));
        }

        let response = self.post_json("/embeddings", &payload).await?;
        let raw: OpenAIEmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        if raw.data.len() != input.len() {
            anyhow::bail!(
                "Embedding count mismatch: sent {} inputs, received {} vectors",
                input.len(),
                raw.data.len()
            );
        }

        let mut data = raw.data;
        data.sort_by_key(|d| d.index);

        let usage = raw.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: 0,
            total_tokens: u.total_tokens,
        });

        Ok((data.into_iter().map(|d| d.embedding).collect(), usage))
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload =
            self.build_chat_request(&request.model, &request.messages, &request.options, false)?;

        let response = self.post_json("/chat/completions", &payload).await?;

        let raw: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        let choice = raw.choices.first();
        Ok(ChatResponse {
            content: choice.and_then(|c| c.message.content.clone()),
            tool_calls: choice.and_then(|c| c.message.tool_calls.clone()),
            usage: raw.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason.clone()),
            raw: serde_json::to_value(&raw)?,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload =
            self.build_chat_request(&request.model, &request.messages, &request.options, true)?;

        let response = self.post_json("/chat/completions", &payload).await?;

        Ok(parse_chat_sse_stream(response))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIClient {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let mut embeddings = Vec::with_capacity(request.input.len());
        let mut usage: Option<TokenUsage> = None;

        for batch in request.input.chunks(self.embedding_batch_size) {
            let (vectors, batch_usage) = self
                .embed_batch(&request.model, batch, request.dimensions)
                .await?;
            embeddings.extend(vectors);

            if let Some(batch_usage) = batch_usage {
                usage.get_or_insert_with(TokenUsage::default).add(&batch_usage);
            }
        }

        tracing::debug!(
            model = %request.model,
            inputs = request.input.len(),
            "Embedded inputs"
        );

        Ok(EmbeddingResponse { embeddings, usage })
    }
}

impl LLMClient for OpenAIClient {}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Usage {
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<EmbeddingData>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}
