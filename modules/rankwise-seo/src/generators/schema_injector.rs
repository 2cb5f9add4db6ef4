use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{FaqEntry, PromptSettings, Task};
use crate::contracts::TaskKind;
use crate::prompts;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaInjectionResult {
    /// JSON-LD object for the page
    pub schema_json: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct SchemaInjectionRequest {
    pub page_content: String,
    pub faqs: Vec<FaqEntry>,
    pub business_info: String,
}

pub struct SchemaInjectionTask;

impl Task for SchemaInjectionTask {
    const KIND: TaskKind = TaskKind::SchemaInjection;
    type Input = SchemaInjectionRequest;
    type Output = SchemaInjectionResult;

    fn render_prompt(input: &SchemaInjectionRequest, _settings: &PromptSettings) -> String {
        let faqs = serde_json::to_string(&input.faqs).unwrap_or_default();
        prompts::schema_injection(&input.page_content, &faqs, &input.business_info)
    }
}
