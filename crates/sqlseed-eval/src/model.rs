use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlseed_generate::InsertStatement;
use sqlseed_query::ConstraintKind;

/// Default minimum pass rate (percent) for accepting an attempt.
pub const DEFAULT_MIN_PASS_RATE: f64 = 60.0;
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One failed or unevaluated check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ConstraintKind,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub expected: String,
    pub actual: String,
    pub severity: Severity,
}

/// Per-kind counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindStats {
    pub checked: u64,
    pub failed: u64,
    pub not_evaluated: u64,
}

/// Outcome of checking emitted statements against the bound constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_checks: u64,
    pub passed_checks: u64,
    pub not_evaluated: u64,
    pub violations: Vec<Violation>,
    pub by_kind: BTreeMap<ConstraintKind, KindStats>,
    /// Set when the report was accepted without reaching the minimum pass rate.
    pub below_threshold: bool,
}

impl ValidationReport {
    /// Percentage of evaluated checks that passed; 100 when nothing was checked.
    pub fn pass_rate(&self) -> f64 {
        if self.total_checks == 0 {
            return 100.0;
        }
        self.passed_checks as f64 * 100.0 / self.total_checks as f64
    }

    pub fn all_passed(&self) -> bool {
        self.passed_checks == self.total_checks
    }

    /// Errors only, without the not-evaluated warnings.
    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|violation| violation.severity == Severity::Error)
    }

    pub(crate) fn record_pass(&mut self, kind: ConstraintKind) {
        self.total_checks += 1;
        self.passed_checks += 1;
        self.by_kind.entry(kind).or_default().checked += 1;
    }

    pub(crate) fn record_failure(&mut self, violation: Violation) {
        self.total_checks += 1;
        let stats = self.by_kind.entry(violation.kind).or_default();
        stats.checked += 1;
        stats.failed += 1;
        self.violations.push(violation);
    }

    pub(crate) fn record_not_evaluated(&mut self, violation: Violation) {
        self.not_evaluated += 1;
        self.by_kind.entry(violation.kind).or_default().not_evaluated += 1;
        self.violations.push(Violation {
            severity: Severity::Warning,
            ..violation
        });
    }
}

/// Retry loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Percent, 0..=100.
    pub min_pass_rate: f64,
    /// Base delay; attempt `k` waits `k * retry_delay` before the next one.
    #[serde(with = "millis")]
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_pass_rate: DEFAULT_MIN_PASS_RATE,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn accepts(&self, report: &ValidationReport) -> bool {
        report.all_passed() || report.pass_rate() >= self.min_pass_rate
    }
}

/// Summary of one attempt of the retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the retry loop hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryOutcome {
    pub statements: Vec<InsertStatement>,
    pub report: ValidationReport,
    pub attempts: Vec<AttemptRecord>,
    /// False when the loop ran out of attempts (or time) and returned its
    /// last result anyway.
    pub accepted: bool,
}

impl RetryOutcome {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
