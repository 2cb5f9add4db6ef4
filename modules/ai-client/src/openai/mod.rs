mod client;
pub(crate) mod types;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::error::AiError;
use crate::traits::{CompletionModel, EmbedAgent, Message};
use client::{OpenAiClient, OPENAI_API_URL};
use types::ChatRequest;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const MAX_COMPLETION_TOKENS: u32 = 4096;

// =============================================================================
// OpenAi Agent
// =============================================================================

/// OpenAI (or compatible) chat + embedding provider.
///
/// The HTTP client is built on first use and shared by every clone, so
/// repeated generation calls reuse pooled connections.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    embedding_model: String,
    base_url: Option<String>,
    client: Arc<OnceLock<OpenAiClient>>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: "text-embedding-3-large".to_string(),
            base_url: None,
            client: Arc::new(OnceLock::new()),
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self.client = Arc::new(OnceLock::new());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn client(&self) -> &OpenAiClient {
        self.client.get_or_init(|| {
            OpenAiClient::new(
                &self.api_key,
                self.base_url.as_deref().unwrap_or(OPENAI_API_URL),
            )
        })
    }

    /// Send a conversation and return the first choice's text.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, AiError> {
        let request = ChatRequest::new(&self.model)
            .messages(messages)
            .token_limit(MAX_COMPLETION_TOKENS);

        self.client()
            .chat(&request)
            .await?
            .text()
            .ok_or(AiError::EmptyResponse)
    }

    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String, AiError> {
        self.chat(&[Message::system(system), Message::user(user)])
            .await
    }
}

#[async_trait]
impl CompletionModel for OpenAi {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.chat_completion(DEFAULT_SYSTEM_PROMPT, prompt).await
    }
}

#[async_trait]
impl EmbedAgent for OpenAi {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(AiError::EmptyResponse)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.client()
            .embed_batch(&self.embedding_model, texts)
            .await
    }
}
