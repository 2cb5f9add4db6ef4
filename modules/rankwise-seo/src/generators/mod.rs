//! One generation module per task: a prompt template bound to a contract.

mod anomaly;
mod content_refresh;
mod faq;
mod meta_description;
mod schema_injector;

use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use ai_client::{CompletionModel, StructuredOutput};
use tracing::{debug, info};

use crate::contracts::TaskKind;
use crate::error::{GenerationError, ValidatorBuildError};
use crate::prompts;
use crate::validator::{OutputValidator, DEFAULT_MAX_RETRIES};

pub use anomaly::{AnomalyAnalysisResult, AnomalyRequest, AnomalyTask};
pub use content_refresh::{ContentRefreshRequest, ContentRefreshResult, ContentRefreshTask};
pub use faq::{FaqEntry, FaqGenerationResult, FaqRequest, FaqTask, DEFAULT_FAQ_TARGET};
pub use meta_description::{MetaDescriptionRequest, MetaDescriptionResult, MetaDescriptionTask};
pub use schema_injector::{SchemaInjectionRequest, SchemaInjectionResult, SchemaInjectionTask};

pub type FaqGenerator = Generator<FaqTask>;
pub type MetaDescriptionRewriter = Generator<MetaDescriptionTask>;
pub type ContentRefresher = Generator<ContentRefreshTask>;
pub type SchemaInjector = Generator<SchemaInjectionTask>;
pub type AnomalyAnalyzer = Generator<AnomalyTask>;

/// Knobs shared by prompt templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptSettings {
    /// Advisory; the FAQ contract does not enforce it.
    pub faq_target: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            faq_target: DEFAULT_FAQ_TARGET,
        }
    }
}

/// A generation task: its input bundle, its typed output, and its prompt.
///
/// Inputs carry every field the template needs; presence is enforced by
/// the type, not by the validator.
pub trait Task: Send + Sync + 'static {
    const KIND: TaskKind;
    type Input: Send + Sync;
    type Output: StructuredOutput + Send;

    fn render_prompt(input: &Self::Input, settings: &PromptSettings) -> String;

    /// Log line after a successful generation.
    fn log_output(_output: &Self::Output, _settings: &PromptSettings) {}
}

pub struct Generator<T: Task> {
    model: Arc<dyn CompletionModel>,
    validator: OutputValidator,
    settings: PromptSettings,
    schema_hint: OnceLock<String>,
    _task: PhantomData<fn() -> T>,
}

impl<T: Task> Generator<T> {
    /// Schema coercion against the task's contract with the default repair prompt.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            validator: OutputValidator::for_contract(T::KIND.contract(), DEFAULT_MAX_RETRIES),
            settings: PromptSettings::default(),
            schema_hint: OnceLock::new(),
            _task: PhantomData,
        }
    }

    /// Swap in a custom validator. It must check this task's own contract:
    /// pattern validators yield bare text, which no task output decodes from.
    pub fn with_validator(mut self, validator: OutputValidator) -> Result<Self, ValidatorBuildError> {
        match validator.contract() {
            Some(contract) if contract.task == T::KIND => {
                self.validator = validator;
                Ok(self)
            }
            _ => Err(ValidatorBuildError::ContractMismatch { task: T::KIND }),
        }
    }

    /// Change only the retry budget; a custom validator's repair strategy is kept.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.validator = self.validator.with_max_retries(max_retries);
        self
    }

    pub fn with_settings(mut self, settings: PromptSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn validator(&self) -> &OutputValidator {
        &self.validator
    }

    /// Full prompt for `input`, including the rendered response schema.
    pub fn render(&self, input: &T::Input) -> String {
        let hint = self.schema_hint.get_or_init(|| {
            let schema = T::Output::response_schema();
            prompts::schema_hint(&serde_json::to_string_pretty(&schema).unwrap_or_default())
        });
        let mut prompt = T::render_prompt(input, &self.settings);
        prompt.push_str(hint);
        prompt
    }

    /// One model call plus the validator's bounded repairs. Never returns a
    /// partial result.
    pub async fn generate(&self, input: &T::Input) -> Result<T::Output, GenerationError> {
        let task = T::KIND;
        info!(%task, "Generating");

        let prompt = self.render(input);
        let raw = self
            .model
            .complete(&prompt)
            .await
            .map_err(|source| GenerationError::Upstream { task, source })?;

        let validated = self
            .validator
            .validate(raw, self.model.as_ref())
            .await
            .map_err(|source| GenerationError::Validation { task, source })?;
        debug!(%task, attempts = validated.attempts, "Output accepted");

        let output: T::Output =
            serde_json::from_value(validated.value.into_value()).map_err(|source| GenerationError::Decode { task, source })?;

        T::log_output(&output, &self.settings);
        Ok(output)
    }
}
