use std::path::PathBuf;

use sqlseed_core::{
    DataKind, Error, SchemaCatalog, load_catalog, validate_catalog, validate_catalog_json,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/shop.catalog.json")
}

fn load_fixture() -> SchemaCatalog {
    load_catalog(&fixture_path()).expect("load shop catalog")
}

#[test]
fn shop_catalog_loads_and_validates() {
    let catalog = load_fixture();
    assert_eq!(catalog.engine, "mysql");
    assert_eq!(catalog.tables.len(), 7);

    let users = catalog.table("USERS").expect("case-insensitive lookup");
    assert!(users.column("Email").is_some());
    assert!(users.is_unique("email"));
    assert!(users.is_primary_key("id"));
    assert_eq!(users.fk_count(), 1);

    let full_name = users.column("full_name").expect("full_name");
    assert!(full_name.is_generated());
    assert_eq!(users.column("id").map(|c| c.is_identity()), Some(true));
    assert_eq!(
        users.column("status").map(|c| c.enum_values.len()),
        Some(3)
    );

    let roles = catalog.table("roles").expect("roles");
    assert_eq!(
        roles.column("is_active").map(|c| c.data_kind()),
        Some(DataKind::Boolean)
    );
}

#[test]
fn structural_check_reports_missing_fields() {
    let document = serde_json::json!({
        "catalog_version": "0.1",
        "engine": "mysql",
        "tables": [{ "name": "users", "columns": [{ "name": "id" }] }]
    });

    let issues = validate_catalog_json(&document).expect("compile schema");
    assert!(!issues.is_empty());
    assert!(issues.iter().any(|issue| issue.starts_with("/tables/0/columns/0")));
}

#[test]
fn semantic_check_rejects_dangling_foreign_key() {
    let mut catalog = load_fixture();
    catalog.tables.retain(|table| table.name != "roles");

    let err = validate_catalog(&catalog).expect_err("roles is referenced by users");
    assert!(matches!(err, Error::InvalidCatalog(message) if message.contains("roles")));
}

#[test]
fn semantic_check_rejects_duplicate_tables() {
    let mut catalog = load_fixture();
    let mut copy = catalog.tables[0].clone();
    copy.name = copy.name.to_uppercase();
    catalog.tables.push(copy);

    assert!(matches!(
        validate_catalog(&catalog),
        Err(Error::InvalidCatalog(_))
    ));
}
