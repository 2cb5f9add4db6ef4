use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{PromptSettings, Task};
use crate::contracts::TaskKind;
use crate::prompts;

pub const DEFAULT_FAQ_TARGET: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaqGenerationResult {
    /// Question/answer pairs for the page
    pub faqs: Vec<FaqEntry>,
}

#[derive(Debug, Clone)]
pub struct FaqRequest {
    pub page_content: String,
    pub topic: String,
}

pub struct FaqTask;

impl Task for FaqTask {
    const KIND: TaskKind = TaskKind::Faq;
    type Input = FaqRequest;
    type Output = FaqGenerationResult;

    fn render_prompt(input: &FaqRequest, settings: &PromptSettings) -> String {
        prompts::faq(&input.topic, &input.page_content, settings.faq_target)
    }

    /// The requested count is advisory: a different count is logged and kept.
    fn log_output(output: &FaqGenerationResult, settings: &PromptSettings) {
        if output.faqs.len() != settings.faq_target {
            warn!(
                requested = settings.faq_target,
                returned = output.faqs.len(),
                "FAQ count differs from target"
            );
        }
        debug!(entries = output.faqs.len(), "FAQ generation complete");
    }
}
