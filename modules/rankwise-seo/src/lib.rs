pub mod contracts;
pub mod error;
pub mod generators;
pub mod ledger;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod retrieval;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod validator;

pub use contracts::{StructuredOutputContract, TaskKind};
pub use error::{
    CoercionError, GenerationError, OrchestrationError, PipelineError, ValidationError,
    ValidatorBuildError,
};
pub use ledger::{Ledger, LedgerSnapshot};
pub use orchestrator::{PageContext, RemediationOrchestrator, RemediationStep};
pub use pipeline::{CycleReport, PipelineSettings, SeoContext, SeoPipeline};
pub use validator::{Coerced, OutputValidator, Validated};
