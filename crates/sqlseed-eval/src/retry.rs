use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use sqlseed_generate::InsertStatement;
use tracing::{info, warn};

use crate::errors::EvalError;
use crate::model::{AttemptRecord, RetryOutcome, RetryPolicy, ValidationReport};

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Wall-clock bound for the whole retry loop.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}

/// Generate, validate and regenerate until an attempt is good enough.
///
/// An attempt is accepted when every check passed or the pass rate reached
/// `min_pass_rate`. Errors and panics inside an attempt count as failed
/// attempts; fatal schema errors end the loop at once. When attempts run
/// out the last produced statements come back with `accepted = false`.
#[derive(Debug, Clone, Default)]
pub struct RetryOrchestrator {
    policy: RetryPolicy,
    cancel: Option<CancelToken>,
    deadline: Option<Deadline>,
}

impl RetryOrchestrator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
            deadline: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// `generate` receives the 1-based attempt number.
    pub fn run<G, V>(&self, mut generate: G, mut validate: V) -> Result<RetryOutcome, EvalError>
    where
        G: FnMut(usize) -> Result<Vec<InsertStatement>, EvalError>,
        V: FnMut(&[InsertStatement]) -> Result<ValidationReport, EvalError>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = Vec::with_capacity(max_attempts);
        let mut last: Option<(Vec<InsertStatement>, ValidationReport)> = None;
        let mut last_error = String::from("no attempt ran");

        for attempt in 1..=max_attempts {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                warn!(attempt, "generation cancelled");
                return Err(EvalError::Cancelled);
            }
            if self.deadline.as_ref().is_some_and(Deadline::expired) {
                warn!(attempt, "deadline reached");
                return finish_early(last, attempts);
            }

            let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<_, EvalError> {
                let statements = generate(attempt)?;
                let report = validate(&statements)?;
                Ok((statements, report))
            }));

            match outcome {
                Ok(Ok((statements, report))) => {
                    let pass_rate = report.pass_rate();
                    attempts.push(AttemptRecord {
                        attempt,
                        pass_rate: Some(pass_rate),
                        error: None,
                    });
                    if self.policy.accepts(&report) {
                        info!(attempt, pass_rate, statements = statements.len(), "attempt accepted");
                        return Ok(RetryOutcome {
                            statements,
                            report,
                            attempts,
                            accepted: true,
                        });
                    }
                    warn!(
                        attempt,
                        pass_rate,
                        min_pass_rate = self.policy.min_pass_rate,
                        failed = report.total_checks - report.passed_checks,
                        "attempt below pass-rate threshold"
                    );
                    last = Some((statements, report));
                }
                Ok(Err(err)) => {
                    if err.is_fatal() {
                        warn!(attempt, error = %err, "fatal error; not retrying");
                        return Err(err);
                    }
                    warn!(attempt, error = %err, "attempt failed");
                    last_error = err.to_string();
                    attempts.push(AttemptRecord {
                        attempt,
                        pass_rate: None,
                        error: Some(last_error.clone()),
                    });
                }
                Err(panic) => {
                    last_error = panic_message(panic);
                    warn!(attempt, error = %last_error, "attempt panicked");
                    attempts.push(AttemptRecord {
                        attempt,
                        pass_rate: None,
                        error: Some(last_error.clone()),
                    });
                }
            }

            if attempt < max_attempts {
                self.pause(attempt);
            }
        }

        match last {
            Some((statements, mut report)) => {
                report.below_threshold = true;
                warn!(
                    attempts = attempts.len(),
                    pass_rate = report.pass_rate(),
                    "attempts exhausted; returning best effort"
                );
                Ok(RetryOutcome {
                    statements,
                    report,
                    attempts,
                    accepted: false,
                })
            }
            None => Err(EvalError::Exhausted {
                attempts: attempts.len(),
                last_error,
            }),
        }
    }

    fn pause(&self, attempt: usize) {
        let mut delay = self.policy.retry_delay.saturating_mul(attempt as u32);
        if let Some(deadline) = &self.deadline {
            delay = delay.min(deadline.remaining());
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

fn finish_early(
    last: Option<(Vec<InsertStatement>, ValidationReport)>,
    attempts: Vec<AttemptRecord>,
) -> Result<RetryOutcome, EvalError> {
    match last {
        Some((statements, mut report)) => {
            report.below_threshold = true;
            Ok(RetryOutcome {
                statements,
                report,
                attempts,
                accepted: false,
            })
        }
        None => Err(EvalError::DeadlineExceeded),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}
