mod registry;
mod settings;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use registry::{RunContext, init_logging, start_run, write_artifacts};
use settings::{Settings, SettingsError, load_settings};
use sqlseed_core::{Error as CoreError, catalog_json_schema, load_catalog};
use sqlseed_eval::{Deadline, EvalError, GenerationRequest, StrategyPipeline};
use sqlseed_generate::{Dialect, GenerateOptions, GenerationError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("pass rate {pass_rate:.1}% is below the accepted threshold")]
    BelowThreshold { pass_rate: f64 },
}

#[derive(Parser, Debug)]
#[command(
    name = "sqlseed",
    version,
    about = "Generate INSERT statements that make a SELECT return rows"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate, validate and store INSERT statements for a query.
    Generate(GenerateArgs),
    /// Print the JSON Schema of the catalog file format.
    CatalogSchema(CatalogSchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// SELECT statement (positional form).
    #[arg(value_name = "SQL", required_unless_present = "sql_file")]
    sql: Option<String>,
    /// File holding the SELECT statement.
    #[arg(long, value_name = "PATH", conflicts_with = "sql")]
    sql_file: Option<PathBuf>,
    /// Schema catalog JSON.
    #[arg(long, value_name = "PATH")]
    catalog: PathBuf,
    /// Settings file; defaults to ./sqlseed.toml when present.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Rows per required table.
    #[arg(long)]
    rows: Option<usize>,
    /// Target dialect: mysql, oracle or postgres.
    #[arg(long)]
    dialect: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_attempts: Option<usize>,
    /// Minimum pass rate in percent.
    #[arg(long)]
    min_pass_rate: Option<f64>,
    /// Wall-clock budget for the retry loop.
    #[arg(long)]
    deadline_ms: Option<u64>,
    /// Emit identity columns filled with the row index.
    #[arg(long, default_value_t = false)]
    preserve_ids: bool,
    /// Also write teardown.sql with DELETE statements, children first.
    #[arg(long, default_value_t = false)]
    teardown: bool,
    /// Anchor date for NOW()-relative predicates (YYYY-MM-DD); defaults to today.
    #[arg(long, value_name = "DATE")]
    reference_date: Option<NaiveDate>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Extra copy of the insert script.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Fail when the result was not accepted.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct CatalogSchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::CatalogSchema(args) => run_catalog_schema(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let settings = resolve_settings(&args)?;

    let sql = match (&args.sql, &args.sql_file) {
        (Some(sql), None) => sql.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (Some(_), Some(_)) => {
            return Err(CliError::InvalidConfig(
                "use either positional SQL or --sql-file".to_string(),
            ));
        }
        (None, None) => {
            return Err(CliError::InvalidConfig("SQL text is required".to_string()));
        }
    };
    if sql.trim().is_empty() {
        return Err(CliError::InvalidConfig("SQL text is empty".to_string()));
    }

    let catalog = load_catalog(&args.catalog)?;

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir: settings.run_dir.clone(),
        catalog_path: args.catalog.clone(),
        sql_path: args.sql_file.clone(),
        settings: settings.clone(),
    };
    let run_paths = start_run(&run_ctx)?;
    init_logging(&settings.log_level, Some(&run_paths.logs_path))?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        dialect = %settings.dialect,
        rows = settings.rows,
        seed = settings.seed,
        tables = catalog.tables.len()
    );
    let timer = Instant::now();

    let request = GenerationRequest {
        sql: &sql,
        catalog: &catalog,
        options: GenerateOptions {
            rows: settings.rows,
            dialect: settings.dialect,
            preserve_ids: settings.preserve_ids,
            reference_date: args
                .reference_date
                .unwrap_or_else(|| chrono::Utc::now().date_naive()),
        },
        seed: settings.seed,
    };
    let deadline = settings
        .deadline_ms
        .map(|millis| Deadline::after(Duration::from_millis(millis)));
    let pipeline = StrategyPipeline::standard(settings.retry_policy(), None, deadline);
    tracing::debug!(strategies = ?pipeline.names(), "pipeline ready");

    let outcome = pipeline.run(&request)?;
    write_artifacts(
        &run_paths,
        &run_id,
        &outcome,
        args.teardown,
        args.out.as_deref(),
    )?;
    tracing::info!(event = "artifacts_written", path = %run_paths.root.display());

    let pass_rate = outcome.outcome.report.pass_rate();
    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(
        event = "run_finished",
        strategy = outcome.outcome.strategy,
        accepted = outcome.outcome.accepted,
        pass_rate,
        statements = outcome.outcome.statements.len(),
        duration_ms = duration_ms
    );
    println!("{}", run_paths.root.display());

    if args.strict && !outcome.outcome.accepted {
        return Err(CliError::BelowThreshold { pass_rate });
    }
    Ok(())
}

/// Settings file first, then command-line overrides.
fn resolve_settings(args: &GenerateArgs) -> Result<Settings, CliError> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(rows) = args.rows {
        settings.rows = rows;
    }
    if let Some(dialect) = &args.dialect {
        settings.dialect = dialect.parse::<Dialect>()?;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(max_attempts) = args.max_attempts {
        settings.max_attempts = max_attempts;
    }
    if let Some(min_pass_rate) = args.min_pass_rate {
        settings.min_pass_rate = min_pass_rate;
    }
    if let Some(deadline_ms) = args.deadline_ms {
        settings.deadline_ms = Some(deadline_ms);
    }
    if args.preserve_ids {
        settings.preserve_ids = true;
    }
    if let Some(run_dir) = &args.run_dir {
        settings.run_dir = run_dir.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn run_catalog_schema(args: CatalogSchemaArgs) -> Result<(), CliError> {
    let schema = catalog_json_schema()?;
    let rendered = serde_json::to_string_pretty(&schema)?;
    match args.out {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> GenerateArgs {
        let cli = Cli::try_parse_from(args.iter().copied()).expect("parse args");
        match cli.command {
            Command::Generate(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn generate_flags_parse() {
        let args = parse(&[
            "sqlseed",
            "generate",
            "SELECT * FROM users",
            "--catalog",
            "catalog.json",
            "--dialect",
            "postgresql",
            "--rows",
            "3",
            "--reference-date",
            "2025-06-15",
            "--preserve-ids",
        ]);
        assert_eq!(args.sql.as_deref(), Some("SELECT * FROM users"));
        assert_eq!(args.rows, Some(3));
        assert_eq!(args.dialect.as_deref(), Some("postgresql"));
        assert_eq!(args.reference_date, NaiveDate::from_ymd_opt(2025, 6, 15));
        assert!(args.preserve_ids);
        assert!(!args.teardown);
    }

    #[test]
    fn sql_and_sql_file_are_exclusive() {
        let result = Cli::try_parse_from([
            "sqlseed",
            "generate",
            "SELECT 1",
            "--sql-file",
            "query.sql",
            "--catalog",
            "catalog.json",
        ]);
        assert!(result.is_err());

        let missing = Cli::try_parse_from(["sqlseed", "generate", "--catalog", "catalog.json"]);
        assert!(missing.is_err());
    }

    #[test]
    fn unknown_dialects_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("sqlseed.toml");
        std::fs::write(&config, "rows = 4\n").expect("write settings");
        let config = config.to_string_lossy().to_string();

        let args = parse(&[
            "sqlseed",
            "generate",
            "SELECT * FROM users",
            "--catalog",
            "catalog.json",
            "--config",
            &config,
            "--dialect",
            "sqlite",
        ]);
        assert!(matches!(resolve_settings(&args), Err(CliError::Generation(_))));

        let args = parse(&[
            "sqlseed",
            "generate",
            "SELECT * FROM users",
            "--catalog",
            "catalog.json",
            "--config",
            &config,
            "--seed",
            "9",
        ]);
        let settings = resolve_settings(&args).expect("settings");
        assert_eq!((settings.rows, settings.seed), (4, 9));
    }
}
