use std::env;
use std::str::FromStr;

use tracing::info;

use crate::error::RankwiseError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Generation model
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub llm_model: String,
    pub embeddings_model: String,

    // Retrieval
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub default_collection: String,

    // Validation
    pub validation_max_retries: u32,
    pub faq_target_count: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, RankwiseError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RankwiseError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            openai_api_key: optional("OPENAI_API_KEY").ok_or_else(|| {
                RankwiseError::Config("OPENAI_API_KEY environment variable is required".into())
            })?,
            openai_base_url: optional("OPENAI_BASE_URL"),
            llm_model: or_default("LLM_MODEL", "gpt-4o"),
            embeddings_model: or_default("EMBEDDINGS_MODEL", "text-embedding-3-large"),
            qdrant_url: or_default("QDRANT_URL", "http://localhost:6333"),
            qdrant_api_key: optional("QDRANT_API_KEY"),
            serper_api_key: optional("SERPER_API_KEY"),
            default_collection: or_default("SEO_COLLECTION", "seo_content"),
            validation_max_retries: parsed(optional("VALIDATION_MAX_RETRIES"), "VALIDATION_MAX_RETRIES", 2)?,
            faq_target_count: parsed(optional("FAQ_TARGET_COUNT"), "FAQ_TARGET_COUNT", 5)?,
        })
    }

    /// Collection holding competitor pages.
    pub fn competitor_collection(&self) -> String {
        format!("{}_competitors", self.default_collection)
    }

    /// Log the configuration with secrets reduced to presence flags.
    pub fn log_redacted(&self) {
        info!(
            llm_model = %self.llm_model,
            embeddings_model = %self.embeddings_model,
            openai_base_url = self.openai_base_url.as_deref().unwrap_or("default"),
            qdrant_url = %self.qdrant_url,
            qdrant_api_key = self.qdrant_api_key.is_some(),
            serper_api_key = self.serper_api_key.is_some(),
            default_collection = %self.default_collection,
            validation_max_retries = self.validation_max_retries,
            faq_target_count = self.faq_target_count,
            "Loaded config"
        );
    }
}

fn parsed<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, RankwiseError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| RankwiseError::Config(format!("{key} must be a number, got {value:?}"))),
    }
}
