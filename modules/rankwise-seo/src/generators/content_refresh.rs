use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PromptSettings, Task};
use crate::contracts::TaskKind;
use crate::prompts;

/// Two independent lists; no positional correspondence between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentRefreshResult {
    pub sections_to_improve: Vec<String>,
    pub suggested_updates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ContentRefreshRequest {
    pub page_content: String,
    pub topic: String,
    pub competitor_insights: String,
}

pub struct ContentRefreshTask;

impl Task for ContentRefreshTask {
    const KIND: TaskKind = TaskKind::ContentRefresh;
    type Input = ContentRefreshRequest;
    type Output = ContentRefreshResult;

    fn render_prompt(input: &ContentRefreshRequest, _settings: &PromptSettings) -> String {
        prompts::content_refresh(&input.page_content, &input.topic, &input.competitor_insights)
    }

    fn log_output(output: &ContentRefreshResult, _settings: &PromptSettings) {
        debug!(
            sections = output.sections_to_improve.len(),
            suggestions = output.suggested_updates.len(),
            "Content refresh suggestions ready"
        );
    }
}
