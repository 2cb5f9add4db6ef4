use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PromptSettings, Task};
use crate::contracts::TaskKind;
use crate::prompts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetaDescriptionResult {
    /// The rewritten meta description (at most 200 characters)
    pub meta_description: String,
    /// Why this wording was chosen
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct MetaDescriptionRequest {
    pub page_content: String,
    pub current_description: String,
    pub target_keywords: String,
}

pub struct MetaDescriptionTask;

impl Task for MetaDescriptionTask {
    const KIND: TaskKind = TaskKind::MetaDescription;
    type Input = MetaDescriptionRequest;
    type Output = MetaDescriptionResult;

    fn render_prompt(input: &MetaDescriptionRequest, _settings: &PromptSettings) -> String {
        prompts::meta_description(
            &input.page_content,
            &input.current_description,
            &input.target_keywords,
        )
    }

    fn log_output(output: &MetaDescriptionResult, _settings: &PromptSettings) {
        debug!(chars = output.meta_description.chars().count(), "Meta description generated");
    }
}
