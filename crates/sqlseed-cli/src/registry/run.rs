use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlseed_eval::{
    AttemptRecord, PipelineOutcome, StrategyFailure, ValidationReport, render_report,
};
use sqlseed_generate::to_script;

use super::{RegistryError, RegistryResult};
use crate::settings::Settings;

const REPORT_EXAMPLES: usize = 10;

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub catalog_path: PathBuf,
    /// `--sql-file` path, or `None` for inline SQL.
    pub sql_path: Option<PathBuf>,
    pub settings: Settings,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig<'a> {
    pub run_id: &'a str,
    pub started_at: String,
    pub catalog: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_file: Option<&'a Path>,
    pub settings: &'a Settings,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub inserts_path: PathBuf,
    pub teardown_path: PathBuf,
    pub report_json_path: PathBuf,
    pub report_md_path: PathBuf,
    pub logs_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ValidationArtifact<'a> {
    run_id: &'a str,
    query_fingerprint: &'a str,
    strategy: &'a str,
    accepted: bool,
    pass_rate: f64,
    attempts: &'a [AttemptRecord],
    failures: &'a [StrategyFailure],
    report: &'a ValidationReport,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        catalog: &ctx.catalog_path,
        sql_file: ctx.sql_path.as_deref(),
        settings: &ctx.settings,
        git: collect_git_info(),
    };
    write_json(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        inserts_path: root.join("inserts.sql"),
        teardown_path: root.join("teardown.sql"),
        report_json_path: root.join("validation_report.json"),
        report_md_path: root.join("report.md"),
        logs_path,
        root,
    })
}

/// Write the script, optional teardown, and both reports. `out` receives
/// an extra copy of the insert script.
pub fn write_artifacts(
    paths: &RunPaths,
    run_id: &str,
    pipeline: &PipelineOutcome,
    teardown: bool,
    out: Option<&Path>,
) -> RegistryResult<()> {
    let outcome = &pipeline.outcome;
    let script = to_script(&outcome.statements);
    std::fs::write(&paths.inserts_path, &script)?;

    if teardown {
        std::fs::write(&paths.teardown_path, to_script(&outcome.teardown))?;
    }

    let artifact = ValidationArtifact {
        run_id,
        query_fingerprint: &pipeline.prepared.constraints.fingerprint,
        strategy: outcome.strategy,
        accepted: outcome.accepted,
        pass_rate: outcome.report.pass_rate(),
        attempts: &outcome.attempts,
        failures: &pipeline.failures,
        report: &outcome.report,
    };
    write_json(&paths.report_json_path, &artifact)?;
    std::fs::write(
        &paths.report_md_path,
        render_report(run_id, pipeline, REPORT_EXAMPLES),
    )?;

    if let Some(out_path) = out {
        if let Some(parent) = out_path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }
        std::fs::write(out_path, &script)?;
    }

    Ok(())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, TimeZone};
    use sqlseed_core::load_catalog;
    use sqlseed_eval::{GenerationRequest, RetryPolicy, StrategyPipeline};
    use sqlseed_generate::{Dialect, GenerateOptions};

    use super::*;

    fn context(run_dir: &Path) -> RunContext {
        RunContext {
            run_id: "0b7c6f1e".to_string(),
            started_at: Utc
                .with_ymd_and_hms(2025, 6, 15, 12, 30, 0)
                .single()
                .expect("timestamp"),
            run_dir: run_dir.to_path_buf(),
            catalog_path: PathBuf::from("fixtures/shop.catalog.json"),
            sql_path: None,
            settings: Settings::default(),
        }
    }

    #[test]
    fn run_directory_is_named_by_timestamp_and_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = start_run(&context(dir.path())).expect("start run");

        assert_eq!(
            paths.root.file_name().and_then(|name| name.to_str()),
            Some("2025-06-15T12-30-00Z__run_0b7c6f1e")
        );
        assert!(paths.logs_path.exists());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(paths.root.join("config.json")).expect("config"),
        )
        .expect("config json");
        assert_eq!(config["run_id"], "0b7c6f1e");
        assert_eq!(config["settings"]["dialect"], "mysql");
        assert!(config.get("sql_file").is_none());
    }

    #[test]
    fn artifacts_cover_script_teardown_and_reports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = start_run(&context(dir.path())).expect("start run");

        let catalog_path =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/shop.catalog.json");
        let catalog = load_catalog(&catalog_path).expect("catalog");
        let request = GenerationRequest {
            sql: "SELECT * FROM orders o WHERE o.status IN ('paid', 'shipped')",
            catalog: &catalog,
            options: GenerateOptions {
                rows: 3,
                dialect: Dialect::Mysql,
                preserve_ids: false,
                reference_date: NaiveDate::from_ymd_opt(2025, 6, 15).expect("date"),
            },
            seed: 11,
        };
        let policy = RetryPolicy {
            retry_delay: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let pipeline = StrategyPipeline::standard(policy, None, None)
            .run(&request)
            .expect("pipeline");

        let copy = dir.path().join("out/seed.sql");
        write_artifacts(&paths, "0b7c6f1e", &pipeline, true, Some(&copy)).expect("artifacts");

        let script = std::fs::read_to_string(&paths.inserts_path).expect("inserts");
        assert_eq!(script.lines().count(), 9);
        assert!(script.lines().all(|line| line.starts_with("INSERT INTO ") && line.ends_with(';')));
        assert_eq!(std::fs::read_to_string(&copy).expect("copy"), script);

        let teardown = std::fs::read_to_string(&paths.teardown_path).expect("teardown");
        assert_eq!(
            teardown,
            "DELETE FROM orders;\nDELETE FROM users;\nDELETE FROM roles;\n"
        );

        let report: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&paths.report_json_path).expect("report json"),
        )
        .expect("parse report");
        assert_eq!(report["strategy"], "constrained");
        assert_eq!(report["accepted"], true);
        assert_eq!(report["report"]["total_checks"], 3);

        let markdown = std::fs::read_to_string(&paths.report_md_path).expect("report md");
        assert!(markdown.starts_with("# sqlseed Validation Report"));
    }
}
