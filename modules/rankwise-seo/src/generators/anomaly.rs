use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PromptSettings, Task};
use crate::contracts::TaskKind;
use crate::prompts;

/// Diagnosis of a performance anomaly. Drives remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnomalyAnalysisResult {
    pub likely_causes: Vec<String>,
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AnomalyRequest {
    pub page_metrics: String,
    pub competitor_context: String,
    pub recent_changes: String,
}

pub struct AnomalyTask;

impl Task for AnomalyTask {
    const KIND: TaskKind = TaskKind::AnomalyAnalysis;
    type Input = AnomalyRequest;
    type Output = AnomalyAnalysisResult;

    fn render_prompt(input: &AnomalyRequest, _settings: &PromptSettings) -> String {
        prompts::anomaly_analysis(&input.page_metrics, &input.competitor_context, &input.recent_changes)
    }

    fn log_output(output: &AnomalyAnalysisResult, _settings: &PromptSettings) {
        debug!(
            causes = output.likely_causes.len(),
            actions = output.recommended_actions.len(),
            "Anomaly analysis complete"
        );
    }
}
