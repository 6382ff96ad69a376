use crate::model::{Severity, ValidationReport};
use crate::strategy::PipelineOutcome;

/// Render a deterministic markdown report for a pipeline run.
pub fn render_report(run_id: &str, pipeline: &PipelineOutcome, max_examples: usize) -> String {
    let outcome = &pipeline.outcome;
    let report = &outcome.report;
    let mut lines = Vec::new();

    lines.push("# sqlseed Validation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- run_id: {run_id}"));
    lines.push(format!("- query_fingerprint: {}", pipeline.prepared.constraints.fingerprint));
    lines.push(format!("- strategy: {}", outcome.strategy));
    lines.push(format!("- attempts: {}", outcome.attempts.len()));
    lines.push(format!("- accepted: {}", outcome.accepted));
    lines.push(format!("- statements: {}", outcome.statements.len()));
    lines.push(format!("- pass_rate: {:.1}%", report.pass_rate()));
    if report.below_threshold {
        lines.push("- below_threshold: true".to_string());
    }
    lines.push(String::new());

    lines.push("## Tables".to_string());
    lines.push("| order | table | rows |".to_string());
    lines.push("| --- | --- | --- |".to_string());
    for (position, table) in pipeline.prepared.resolution.generation_order.iter().enumerate() {
        let rows = outcome
            .statements
            .iter()
            .filter(|statement| statement.table.eq_ignore_ascii_case(table))
            .count();
        lines.push(format!("| {} | {} | {} |", position + 1, table, rows));
    }
    lines.push(String::new());

    lines.push("## Checks by constraint kind".to_string());
    lines.push("| kind | checked | failed | not_evaluated |".to_string());
    lines.push("| --- | --- | --- | --- |".to_string());
    for (kind, stats) in &report.by_kind {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            kind.as_str(),
            stats.checked,
            stats.failed,
            stats.not_evaluated
        ));
    }
    lines.push(format!(
        "| total | {} | {} | {} |",
        report.total_checks,
        report.total_checks - report.passed_checks,
        report.not_evaluated
    ));
    lines.push(String::new());

    if outcome.attempts.len() > 1 {
        lines.push("## Attempts".to_string());
        for attempt in &outcome.attempts {
            let detail = match (&attempt.pass_rate, &attempt.error) {
                (Some(rate), _) => format!("pass_rate {rate:.1}%"),
                (None, Some(error)) => format!("error: {error}"),
                (None, None) => "no result".to_string(),
            };
            lines.push(format!("- attempt {}: {detail}", attempt.attempt));
        }
        lines.push(String::new());
    }

    if !pipeline.failures.is_empty() {
        lines.push("## Strategy fallbacks".to_string());
        for failure in &pipeline.failures {
            lines.push(format!("- {}: {}", failure.strategy, failure.reason));
        }
        lines.push(String::new());
    }

    let warnings: Vec<_> = report
        .violations
        .iter()
        .filter(|violation| violation.severity == Severity::Warning)
        .collect();
    if !warnings.is_empty() {
        lines.push("## Not evaluated".to_string());
        for warning in warnings.iter().take(max_examples) {
            lines.push(format!("- {} `{}`: {}", warning.kind.as_str(), warning.expected, warning.actual));
        }
        lines.push(String::new());
    }

    let errors: Vec<_> = report.errors().collect();
    if !errors.is_empty() {
        lines.push("## Top violations".to_string());
        for violation in errors.iter().take(max_examples) {
            let column = violation
                .column
                .as_ref()
                .map(|column| format!(".{column}"))
                .unwrap_or_default();
            lines.push(format!(
                "- {}{} {}: expected `{}`, got {}",
                violation.table,
                column,
                violation.kind.as_str(),
                violation.expected,
                violation.actual
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(report, pipeline));
    lines.join("\n")
}

fn recommendations(report: &ValidationReport, pipeline: &PipelineOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if !pipeline.prepared.binding.unresolved().is_empty() {
        lines.push("- qualify column references with table aliases so every predicate binds.".to_string());
    }
    if report.not_evaluated > 0 {
        lines.push("- subquery and NOT EXISTS predicates need manual review.".to_string());
    }
    if !pipeline.failures.is_empty() {
        lines.push("- constrained generation failed; rows come from the unconstrained fallback.".to_string());
    }
    if report.below_threshold {
        lines.push("- raise the row count or simplify conflicting predicates.".to_string());
    }
    if report.errors().next().is_none() {
        lines.push("- no violations detected.".to_string());
    }
    lines
}
