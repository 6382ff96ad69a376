use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use sqlseed_core::{SchemaCatalog, load_catalog};
use sqlseed_eval::{
    GenerationRequest, PreparedQuery, RetryPolicy, Severity, StrategyPipeline, Validator,
};
use sqlseed_generate::{
    Dialect, GenerateOptions, GeneratedValue, InsertStatement, LiteralCodec, StandardFormatter,
};
use sqlseed_query::ConstraintKind;

fn catalog() -> SchemaCatalog {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/shop.catalog.json");
    load_catalog(&path).expect("load shop catalog")
}

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("reference date")
}

fn statement(table: &str, sql: &str) -> InsertStatement {
    InsertStatement {
        table: table.to_string(),
        sql: sql.to_string(),
        priority: 0,
    }
}

fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        retry_delay: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

fn request<'a>(sql: &'a str, catalog: &'a SchemaCatalog, dialect: Dialect) -> GenerationRequest<'a> {
    GenerationRequest {
        sql,
        catalog,
        options: GenerateOptions {
            rows: 10,
            dialect,
            preserve_ids: false,
            reference_date: reference_date(),
        },
        seed: 42,
    }
}

const SCENARIO_B: &str = "SELECT u.* FROM users u JOIN roles r ON u.role_id = r.id \
                          AND r.is_active = TRUE WHERE u.status = 'active'";

fn scenario_b_rows(is_active: u8) -> Vec<InsertStatement> {
    vec![
        statement(
            "roles",
            &format!(
                "INSERT INTO roles (name, is_active, created_at) \
                 VALUES ('admin', {is_active}, '2024-01-01 00:00:00')"
            ),
        ),
        statement(
            "users",
            "INSERT INTO users (email, first_name, last_name, age, status, role_id, phone, created_at, balance) \
             VALUES ('ann@example.com', 'Ann', 'O''Neil', 30, 'active', 1, NULL, '2024-01-02 08:30:00', 10.50)",
        ),
    ]
}

#[test]
fn scenario_b_inactive_role_is_a_violation() {
    let catalog = catalog();
    let prepared = PreparedQuery::prepare(SCENARIO_B, &catalog).expect("prepare");
    let formatter = StandardFormatter::new(Dialect::Mysql);
    let codec = LiteralCodec::new(&formatter);
    let validator = Validator::new(&catalog, &prepared.binding, &codec, reference_date());

    let passing = validator.validate(&scenario_b_rows(1)).expect("validate active");
    assert_eq!(passing.total_checks, 3);
    assert!(passing.all_passed(), "{:#?}", passing.violations);

    let failing = validator.validate(&scenario_b_rows(0)).expect("validate inactive");
    assert_eq!(failing.total_checks, 3);
    assert_eq!(failing.passed_checks, 2);
    let violation = failing.errors().next().expect("one violation");
    assert_eq!(violation.kind, ConstraintKind::Join);
    assert_eq!(violation.table, "roles");
    assert_eq!(violation.column.as_deref(), Some("is_active"));
    assert_eq!(violation.severity, Severity::Error);
}

/// Shop catalog with `roles.is_active` stored as a plain `int`.
fn int_flag_catalog() -> SchemaCatalog {
    let mut catalog = catalog();
    let column = catalog
        .tables
        .iter_mut()
        .find(|table| table.name == "roles")
        .and_then(|table| table.columns.iter_mut().find(|column| column.name == "is_active"))
        .expect("roles.is_active");
    column.column_type.data_type = "int".to_string();
    catalog
}

#[test]
fn scenario_b_with_int_flag_compares_true_as_one() {
    let catalog = int_flag_catalog();
    let prepared = PreparedQuery::prepare(SCENARIO_B, &catalog).expect("prepare");
    let formatter = StandardFormatter::new(Dialect::Mysql);
    let codec = LiteralCodec::new(&formatter);
    let validator = Validator::new(&catalog, &prepared.binding, &codec, reference_date());

    let passing = validator.validate(&scenario_b_rows(1)).expect("validate active");
    assert_eq!(passing.total_checks, 3);
    assert!(passing.all_passed(), "{:#?}", passing.violations);

    let failing = validator.validate(&scenario_b_rows(0)).expect("validate inactive");
    assert_eq!(failing.passed_checks, 2);
    let violation = failing.errors().next().expect("one violation");
    assert_eq!(violation.column.as_deref(), Some("is_active"));
    assert_eq!(violation.actual, "0");
}

#[test]
fn constrained_pipeline_emits_one_for_int_flags() {
    let catalog = int_flag_catalog();
    let pipeline = StrategyPipeline::standard(quick_policy(), None, None);
    let result = pipeline
        .run(&request(SCENARIO_B, &catalog, Dialect::Mysql))
        .expect("pipeline");

    assert_eq!(result.outcome.strategy, "constrained");
    assert!(
        result.outcome.report.all_passed(),
        "{:#?}",
        result.outcome.report.violations
    );

    let formatter = StandardFormatter::new(Dialect::Mysql);
    let codec = LiteralCodec::new(&formatter);
    let flags: Vec<GeneratedValue> = result
        .outcome
        .statements
        .iter()
        .filter(|statement| statement.table == "roles")
        .map(|statement| {
            let row = codec.decode(&statement.sql, &catalog).expect("decode role");
            row.record.get("is_active").cloned().expect("is_active")
        })
        .collect();
    assert_eq!(flags.len(), 10);
    assert!(flags.iter().all(|flag| *flag == GeneratedValue::Int(1)), "{flags:?}");
}

#[test]
fn primary_key_literals_are_not_evaluated() {
    let catalog = catalog();
    let sql = "SELECT * FROM users u WHERE u.id = 5 AND u.status = 'active'";
    let prepared = PreparedQuery::prepare(sql, &catalog).expect("prepare");
    let formatter = StandardFormatter::new(Dialect::Mysql);
    let codec = LiteralCodec::new(&formatter);
    let validator = Validator::new(&catalog, &prepared.binding, &codec, reference_date());

    let report = validator.validate(&scenario_b_rows(1)).expect("validate");
    assert_eq!(report.not_evaluated, 1);
    assert_eq!(report.total_checks, 1);
    assert!(report.all_passed(), "{:#?}", report.violations);
    assert!(
        report
            .violations
            .iter()
            .any(|violation| violation.column.as_deref() == Some("id")
                && violation.severity == Severity::Warning)
    );
}

#[test]
fn missing_target_columns_fail_the_check() {
    let catalog = catalog();
    let sql = "SELECT * FROM users u WHERE u.phone IS NOT NULL";
    let prepared = PreparedQuery::prepare(sql, &catalog).expect("prepare");
    let formatter = StandardFormatter::new(Dialect::Mysql);
    let codec = LiteralCodec::new(&formatter);
    let validator = Validator::new(&catalog, &prepared.binding, &codec, reference_date());

    let report = validator
        .validate(&[statement(
            "users",
            "INSERT INTO users (email, first_name, last_name, age, status, role_id, created_at, balance) \
             VALUES ('b@example.com', 'Bo', 'Li', 40, 'active', 1, '2024-01-02 00:00:00', 1.00)",
        )])
        .expect("validate");
    assert_eq!(report.total_checks, 1);
    assert_eq!(report.passed_checks, 0);
    assert_eq!(report.pass_rate(), 0.0);
}

#[test]
fn subquery_membership_and_not_exists_are_not_evaluated() {
    let catalog = catalog();
    let sql = "SELECT * FROM users u WHERE u.role_id IN (SELECT id FROM roles) \
               AND NOT EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)";
    let prepared = PreparedQuery::prepare(sql, &catalog).expect("prepare");
    let formatter = StandardFormatter::new(Dialect::Mysql);
    let codec = LiteralCodec::new(&formatter);
    let validator = Validator::new(&catalog, &prepared.binding, &codec, reference_date());

    let report = validator.validate(&scenario_b_rows(1)).expect("validate");
    assert_eq!(report.not_evaluated, 2);
    assert_eq!(report.total_checks, 0);
    assert_eq!(report.pass_rate(), 100.0);
    assert!(
        report
            .violations
            .iter()
            .all(|violation| violation.severity == Severity::Warning)
    );
}

#[test]
fn constrained_pipeline_satisfies_scenario_a() {
    let catalog = catalog();
    let sql = "SELECT * FROM users u WHERE u.email LIKE '%test%' AND u.age >= 18";
    let pipeline = StrategyPipeline::standard(quick_policy(), None, None);
    let result = pipeline
        .run(&request(sql, &catalog, Dialect::Mysql))
        .expect("pipeline");

    assert_eq!(result.outcome.strategy, "constrained");
    assert!(result.outcome.accepted);
    assert_eq!(result.outcome.attempts.len(), 1);
    assert!(result.failures.is_empty());
    // 10 users x (LIKE + range)
    assert_eq!(result.outcome.report.total_checks, 20);
    assert!(result.outcome.report.all_passed());
    assert_eq!(
        result.outcome.teardown,
        vec!["DELETE FROM users".to_string(), "DELETE FROM roles".to_string()]
    );
}

#[test]
fn constrained_pipeline_satisfies_joins_exists_and_dates() {
    let catalog = catalog();
    let queries = [
        SCENARIO_B,
        "SELECT * FROM users u WHERE EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id)",
        "SELECT * FROM orders o WHERE o.shipped_at >= NOW() - INTERVAL 30 DAY \
         AND o.order_date > DATE_SUB(CURDATE(), INTERVAL 2 WEEK) \
         AND o.total BETWEEN 10 AND 500",
        "SELECT * FROM products p JOIN categories c ON p.category_id = c.id \
         WHERE p.is_available = TRUE AND p.price < 50 AND p.sku LIKE 'SKU-%'",
    ];

    for dialect in [Dialect::Mysql, Dialect::Postgres, Dialect::Oracle] {
        for sql in queries {
            let pipeline = StrategyPipeline::standard(quick_policy(), None, None);
            let result = pipeline
                .run(&request(sql, &catalog, dialect))
                .unwrap_or_else(|err| panic!("{dialect}: {sql}: {err}"));
            let report = &result.outcome.report;
            assert!(report.total_checks > 0, "{sql}");
            assert!(
                report.all_passed(),
                "{dialect}: {sql}: {:#?}",
                report.violations
            );
        }
    }
}
