//! Validation of emitted statements, the retry loop and the strategy pipeline.

pub mod errors;
pub mod model;
pub mod report;
pub mod retry;
pub mod strategy;
pub mod validator;

pub use errors::EvalError;
pub use model::{
    AttemptRecord, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_PASS_RATE, DEFAULT_RETRY_DELAY, KindStats,
    RetryOutcome, RetryPolicy, Severity, ValidationReport, Violation,
};
pub use report::render_report;
pub use retry::{CancelToken, Deadline, RetryOrchestrator};
pub use strategy::{
    ConstrainedStrategy, GenerationRequest, GenerationStrategy, PipelineOutcome, PreparedQuery,
    StrategyFailure, StrategyOutcome, StrategyPipeline, UnconstrainedStrategy,
};
pub use validator::{Validator, like_regex};
