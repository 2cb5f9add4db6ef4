//! Coerce untrusted model output into a declared shape, re-prompting the
//! model a bounded number of times when it doesn't fit.

mod repair;

use std::fmt;
use std::sync::Arc;

use ai_client::{strip_code_blocks, truncate_to_char_boundary, CompletionModel};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::contracts::StructuredOutputContract;
use crate::error::{CoercionError, ValidationError, ValidatorBuildError};

pub use repair::{default_repair_prompt, RepairStrategy};

/// Default retry budget: up to three coercion attempts in total.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

const LOG_PREVIEW_BYTES: usize = 200;

/// How a candidate is checked. Exactly one mode per validator.
#[derive(Clone)]
pub enum Coercion {
    /// Parse as JSON and check every field of the contract.
    Schema(&'static StructuredOutputContract),
    /// The candidate must contain a match; it is returned unchanged.
    Pattern(Regex),
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(contract) => write!(f, "Schema({})", contract.task),
            Self::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
        }
    }
}

/// A successfully coerced candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Structured(Value),
    Text(String),
}

impl Coerced {
    /// Text from pattern mode becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Structured(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub value: Coerced,
    /// Coercion attempts made, including the successful one.
    pub attempts: u32,
}

/// One coercion try. Lives only inside the retry loop.
struct ValidationAttempt {
    number: u32,
    candidate: String,
    outcome: Result<Coerced, CoercionError>,
}

#[derive(Clone)]
pub struct OutputValidator {
    coercion: Coercion,
    max_retries: u32,
    repair: Option<RepairStrategy>,
}

impl fmt::Debug for OutputValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputValidator")
            .field("coercion", &self.coercion)
            .field("max_retries", &self.max_retries)
            .field("repair", &self.repair.is_some())
            .finish()
    }
}

impl OutputValidator {
    pub fn builder() -> OutputValidatorBuilder {
        OutputValidatorBuilder::default()
    }

    /// Schema coercion against `contract` with the default repair prompt.
    pub fn for_contract(contract: &'static StructuredOutputContract, max_retries: u32) -> Self {
        Self {
            coercion: Coercion::Schema(contract),
            max_retries,
            repair: Some(Arc::new(default_repair_prompt)),
        }
    }

    /// Same coercion and repair strategy, different retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The contract checked in schema mode.
    pub fn contract(&self) -> Option<&'static StructuredOutputContract> {
        match &self.coercion {
            Coercion::Schema(contract) => Some(contract),
            Coercion::Pattern(_) => None,
        }
    }

    pub fn has_repair(&self) -> bool {
        self.repair.is_some()
    }

    pub fn coercion(&self) -> &Coercion {
        &self.coercion
    }

    /// Try to coerce a single candidate. No retries.
    pub fn coerce(&self, candidate: &str) -> Result<Coerced, CoercionError> {
        match &self.coercion {
            Coercion::Schema(contract) => {
                let value: Value = serde_json::from_str(strip_code_blocks(candidate))
                    .map_err(|e| CoercionError::Json(e.to_string()))?;
                contract.check(&value)?;
                Ok(Coerced::Structured(value))
            }
            Coercion::Pattern(re) => {
                if re.is_match(candidate) {
                    Ok(Coerced::Text(candidate.to_string()))
                } else {
                    Err(CoercionError::PatternMismatch {
                        pattern: re.as_str().to_string(),
                    })
                }
            }
        }
    }

    /// Validate `raw_output`, re-prompting `model` with a repair prompt after
    /// each failed attempt while the retry budget lasts.
    ///
    /// Makes at most `max_retries + 1` coercion attempts and at most
    /// `max_retries` repair calls. Returns on the first success.
    pub async fn validate<M>(&self, raw_output: String, model: &M) -> Result<Validated, ValidationError>
    where
        M: CompletionModel + ?Sized,
    {
        let mut candidate = raw_output;
        let mut number = 0;

        loop {
            number += 1;
            let attempt = self.attempt(number, candidate);

            let error = match attempt.outcome {
                Ok(value) => {
                    debug!(attempt = attempt.number, "Output validated");
                    return Ok(Validated {
                        value,
                        attempts: attempt.number,
                    });
                }
                Err(error) => error,
            };

            warn!(
                attempt = attempt.number,
                max_retries = self.max_retries,
                error = %error,
                preview = truncate_to_char_boundary(&attempt.candidate, LOG_PREVIEW_BYTES),
                "Validation failed"
            );

            if attempt.number > self.max_retries {
                return Err(ValidationError::Exhausted {
                    attempts: attempt.number,
                    last_error: error,
                    raw_output: attempt.candidate,
                });
            }

            candidate = match &self.repair {
                Some(repair) => {
                    let prompt = repair(&attempt.candidate);
                    model.complete(&prompt).await.map_err(ValidationError::Repair)?
                }
                None => attempt.candidate.trim().to_string(),
            };
        }
    }

    fn attempt(&self, number: u32, candidate: String) -> ValidationAttempt {
        let outcome = self.coerce(&candidate);
        ValidationAttempt {
            number,
            candidate,
            outcome,
        }
    }
}

#[derive(Default)]
pub struct OutputValidatorBuilder {
    schema: Option<&'static StructuredOutputContract>,
    pattern: Option<String>,
    max_retries: Option<u32>,
    repair: Option<RepairStrategy>,
}

impl OutputValidatorBuilder {
    pub fn schema(mut self, contract: &'static StructuredOutputContract) -> Self {
        self.schema = Some(contract);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn repair(mut self, strategy: RepairStrategy) -> Self {
        self.repair = Some(strategy);
        self
    }

    pub fn build(self) -> Result<OutputValidator, ValidatorBuildError> {
        let coercion = match (self.schema, self.pattern) {
            (Some(_), Some(_)) => return Err(ValidatorBuildError::Ambiguous),
            (None, None) => return Err(ValidatorBuildError::NoCoercion),
            (Some(contract), None) => Coercion::Schema(contract),
            (None, Some(pattern)) => Coercion::Pattern(Regex::new(&pattern)?),
        };

        Ok(OutputValidator {
            coercion,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            repair: self.repair,
        })
    }
}
