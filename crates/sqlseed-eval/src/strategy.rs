use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sqlseed_core::SchemaCatalog;
use sqlseed_generate::{
    CoordinatedGenerator, GenerateOptions, InsertStatement, LiteralCodec, Resolution,
    StandardFormatter, render_inserts, render_teardown, resolve,
};
use sqlseed_query::{ConstraintBinding, ConstraintSet, extract};
use tracing::{info, warn};

use crate::errors::EvalError;
use crate::model::{AttemptRecord, RetryOutcome, RetryPolicy, ValidationReport};
use crate::retry::{CancelToken, Deadline, RetryOrchestrator};
use crate::validator::Validator;

/// Everything a strategy needs for one request.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub sql: &'a str,
    pub catalog: &'a SchemaCatalog,
    pub options: GenerateOptions,
    pub seed: u64,
}

/// Query analysis computed once and shared by every strategy.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedQuery {
    pub constraints: ConstraintSet,
    pub resolution: Resolution,
    pub binding: ConstraintBinding,
}

impl PreparedQuery {
    pub fn prepare(sql: &str, catalog: &SchemaCatalog) -> Result<Self, EvalError> {
        let constraints = extract(sql);
        let resolution = resolve(sql, catalog)?;
        let binding = ConstraintBinding::build(&constraints, &resolution.generation_order, catalog);
        info!(
            fingerprint = %constraints.fingerprint,
            constraints = constraints.len(),
            bound = binding.len(),
            unresolved = binding.unresolved().len(),
            "query prepared"
        );
        Ok(Self {
            constraints,
            resolution,
            binding,
        })
    }
}

/// Result of a successful strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyOutcome {
    pub strategy: &'static str,
    pub statements: Vec<InsertStatement>,
    pub teardown: Vec<String>,
    pub report: ValidationReport,
    pub attempts: Vec<AttemptRecord>,
    pub accepted: bool,
}

/// One way of producing statements for a request.
pub trait GenerationStrategy {
    fn name(&self) -> &'static str;

    fn run(
        &self,
        request: &GenerationRequest<'_>,
        prepared: &PreparedQuery,
    ) -> Result<StrategyOutcome, EvalError>;
}

/// Constraint-driven generation inside the retry loop.
#[derive(Debug, Clone, Default)]
pub struct ConstrainedStrategy {
    pub policy: RetryPolicy,
    pub cancel: Option<CancelToken>,
    pub deadline: Option<Deadline>,
}

impl GenerationStrategy for ConstrainedStrategy {
    fn name(&self) -> &'static str {
        "constrained"
    }

    fn run(
        &self,
        request: &GenerationRequest<'_>,
        prepared: &PreparedQuery,
    ) -> Result<StrategyOutcome, EvalError> {
        let catalog = request.catalog;
        let generator = CoordinatedGenerator::new(
            catalog,
            &prepared.binding,
            &prepared.resolution,
            request.options.clone(),
        )?;
        let formatter = StandardFormatter::new(request.options.dialect);
        let codec = LiteralCodec::new(&formatter);
        let validator = Validator::new(
            catalog,
            &prepared.binding,
            &codec,
            request.options.reference_date,
        );

        let mut orchestrator = RetryOrchestrator::new(self.policy.clone());
        if let Some(token) = &self.cancel {
            orchestrator = orchestrator.with_cancel(token.clone());
        }
        if let Some(deadline) = self.deadline {
            orchestrator = orchestrator.with_deadline(deadline);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(request.seed);
        let RetryOutcome {
            statements,
            report,
            attempts,
            accepted,
        } = orchestrator.run(
            |attempt| {
                info!(attempt, seed = request.seed, "generating attempt");
                let sets = generator.generate(&mut rng)?;
                Ok(render_inserts(
                    &sets,
                    &prepared.resolution.generation_order,
                    catalog,
                    &codec,
                )?)
            },
            |statements| validator.validate(statements),
        )?;

        Ok(StrategyOutcome {
            strategy: self.name(),
            statements,
            teardown: render_teardown(&prepared.resolution.teardown_order, &formatter),
            report,
            attempts,
            accepted,
        })
    }
}

/// Schema-only generation: FK-consistent rows with no query constraints.
///
/// The report still scores the rows against the query so the caller can see
/// how far off the fallback is.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconstrainedStrategy;

impl GenerationStrategy for UnconstrainedStrategy {
    fn name(&self) -> &'static str {
        "unconstrained"
    }

    fn run(
        &self,
        request: &GenerationRequest<'_>,
        prepared: &PreparedQuery,
    ) -> Result<StrategyOutcome, EvalError> {
        let empty = ConstraintBinding::default();
        let generator = CoordinatedGenerator::new(
            request.catalog,
            &empty,
            &prepared.resolution,
            request.options.clone(),
        )?;
        let formatter = StandardFormatter::new(request.options.dialect);
        let codec = LiteralCodec::new(&formatter);

        let mut rng = ChaCha8Rng::seed_from_u64(request.seed);
        let sets = generator.generate(&mut rng)?;
        let statements = render_inserts(
            &sets,
            &prepared.resolution.generation_order,
            request.catalog,
            &codec,
        )?;
        let mut report = Validator::new(
            request.catalog,
            &prepared.binding,
            &codec,
            request.options.reference_date,
        )
        .validate(&statements)?;
        let accepted = report.all_passed();
        report.below_threshold = !accepted;

        Ok(StrategyOutcome {
            strategy: self.name(),
            statements,
            teardown: render_teardown(&prepared.resolution.teardown_order, &formatter),
            attempts: vec![AttemptRecord {
                attempt: 1,
                pass_rate: Some(report.pass_rate()),
                error: None,
            }],
            report,
            accepted,
        })
    }
}

/// Why a strategy was skipped.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub reason: String,
}

/// Outcome of the pipeline: the winning strategy plus the ones that failed.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub prepared: PreparedQuery,
    pub outcome: StrategyOutcome,
    pub failures: Vec<StrategyFailure>,
}

/// Ordered fallback list; the first strategy that returns statements wins.
pub struct StrategyPipeline {
    strategies: Vec<Box<dyn GenerationStrategy + Send + Sync>>,
}

impl StrategyPipeline {
    pub fn new(strategies: Vec<Box<dyn GenerationStrategy + Send + Sync>>) -> Self {
        Self { strategies }
    }

    /// Constrained generation, then the unconstrained fallback.
    pub fn standard(policy: RetryPolicy, cancel: Option<CancelToken>, deadline: Option<Deadline>) -> Self {
        Self::new(vec![
            Box::new(ConstrainedStrategy {
                policy,
                cancel,
                deadline,
            }),
            Box::new(UnconstrainedStrategy),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    pub fn run(&self, request: &GenerationRequest<'_>) -> Result<PipelineOutcome, EvalError> {
        let prepared = PreparedQuery::prepare(request.sql, request.catalog)?;
        let mut failures = Vec::new();
        let mut last_error = None;

        for strategy in &self.strategies {
            match strategy.run(request, &prepared) {
                Ok(outcome) => {
                    info!(
                        strategy = strategy.name(),
                        accepted = outcome.accepted,
                        pass_rate = outcome.report.pass_rate(),
                        statements = outcome.statements.len(),
                        "strategy succeeded"
                    );
                    return Ok(PipelineOutcome {
                        prepared,
                        outcome,
                        failures,
                    });
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "strategy failed");
                    failures.push(StrategyFailure {
                        strategy: strategy.name(),
                        reason: err.to_string(),
                    });
                    if err.stops_pipeline() {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(EvalError::Exhausted {
            attempts: 0,
            last_error: "no strategies configured".to_string(),
        }))
    }
}
