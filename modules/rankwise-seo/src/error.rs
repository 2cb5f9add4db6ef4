use ai_client::AiError;
use rankwise_common::RankwiseError;
use thiserror::Error;

use crate::contracts::TaskKind;
use crate::orchestrator::RemediationStep;

/// Why a single candidate failed to coerce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("output is not valid JSON: {0}")]
    Json(String),

    #[error("expected a JSON object at `{path}`")]
    NotAnObject { path: String },

    #[error("missing required field `{path}`")]
    MissingField { path: String },

    #[error("field `{path}` should be {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("field `{path}` is {actual} characters, limit is {max}")]
    TooLong { path: String, max: usize, actual: usize },

    #[error("field `{path}` needs at least {min} item(s), got {actual}")]
    TooFewItems { path: String, min: usize, actual: usize },

    #[error("output does not match required pattern `{pattern}`")]
    PatternMismatch { pattern: String },
}

/// The validator gave up on a model's output.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No candidate coerced within the retry budget.
    #[error("output failed validation after {attempts} attempt(s): {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: CoercionError,
        raw_output: String,
    },

    /// The repair re-prompt itself failed. Not retried.
    #[error("repair call failed: {0}")]
    Repair(#[source] AiError),
}

impl ValidationError {
    /// Last candidate text seen, when the loop ran to exhaustion.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Exhausted { raw_output, .. } => Some(raw_output),
            Self::Repair(_) => None,
        }
    }
}

/// Building a validator with an ambiguous or missing coercion mode.
#[derive(Debug, Error)]
pub enum ValidatorBuildError {
    #[error("validator needs either a schema contract or a pattern")]
    NoCoercion,

    #[error("validator cannot use both a schema contract and a pattern")]
    Ambiguous,

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("{task} generation needs a schema validator for its own contract")]
    ContractMismatch { task: TaskKind },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{task} generation call failed: {source}")]
    Upstream {
        task: TaskKind,
        #[source]
        source: AiError,
    },

    #[error("{task} {source}")]
    Validation {
        task: TaskKind,
        #[source]
        source: ValidationError,
    },

    #[error("{task} output passed its contract but did not decode: {source}")]
    Decode {
        task: TaskKind,
        #[source]
        source: serde_json::Error,
    },
}

impl GenerationError {
    pub fn task(&self) -> TaskKind {
        match self {
            Self::Upstream { task, .. } | Self::Validation { task, .. } | Self::Decode { task, .. } => *task,
        }
    }

    /// Last raw model output, when the failure was structural.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Validation { source, .. } => source.raw_output(),
            _ => None,
        }
    }
}

/// A remediation step failed; steps already recorded stay recorded.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("{step} aborted remediation of page {page_id}: {source}")]
    Aborted {
        page_id: String,
        step: RemediationStep,
        #[source]
        source: GenerationError,
    },

    #[error("{step} payload for page {page_id} could not be serialized: {source}")]
    Payload {
        page_id: String,
        step: RemediationStep,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("anomaly analysis failed for page {page_id}: {source}")]
    Analysis {
        page_id: String,
        #[source]
        source: GenerationError,
    },

    #[error("meta description failed for page {page_id}: {source}")]
    MetaDescription {
        page_id: String,
        #[source]
        source: GenerationError,
    },

    #[error(transparent)]
    Remediation(#[from] OrchestrationError),

    #[error("ingestion into {collection} failed: {source}")]
    Ingest {
        collection: String,
        #[source]
        source: RankwiseError,
    },
}
