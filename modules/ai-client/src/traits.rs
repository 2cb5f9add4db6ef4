use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AiError;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// CompletionModel Trait
// =============================================================================

/// Text in, text out. Implementations make no promise about the shape of
/// what comes back; callers validate it.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

#[async_trait]
impl<M: CompletionModel + ?Sized> CompletionModel for Arc<M> {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        (**self).complete(prompt).await
    }
}

// =============================================================================
// EmbedAgent Trait
// =============================================================================

#[async_trait]
pub trait EmbedAgent: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CompletionModel for Echo {
        async fn complete(&self, prompt: &str) -> Result<String, AiError> {
            Ok(format!("echo: {prompt}"))
        }
    }

    #[tokio::test]
    async fn arc_wrapped_model_delegates() {
        let model: Arc<dyn CompletionModel> = Arc::new(Echo);
        let out = model.complete("hi").await.unwrap();
        assert_eq!(out, "echo: hi");
    }

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::user("u").content, "u");
    }
}
