use std::path::PathBuf;

use sqlseed_core::{SchemaCatalog, load_catalog};
use sqlseed_query::{
    BetweenKind, ColumnRef, CompareOp, Constraint, ConstraintBinding, ConstraintKind,
    DateCondition, InList, IntervalDirection, IntervalUnit, JoinCondition, LikeKind, extract,
};

fn catalog() -> SchemaCatalog {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/shop.catalog.json");
    load_catalog(&path).expect("load shop catalog")
}

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn like_and_range_on_users() {
    let set = extract("SELECT * FROM users u WHERE u.email LIKE '%test%' AND u.age >= 18");

    assert_eq!(set.len(), 2);
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Where { target, op: CompareOp::Ge, value, .. }
            if *target == ColumnRef::new("u", "age") && value == "18"
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Like { target, required_substring, kind: LikeKind::Contains, .. }
            if *target == ColumnRef::new("u", "email") && required_substring == "test"
    )));
    assert_eq!(set.aliases.table_for("u"), Some("users"));
    assert_eq!(set.fingerprint.len(), 64);
}

#[test]
fn join_on_clause_yields_equi_join_and_filter() {
    let set = extract(
        "SELECT u.* FROM users u JOIN roles r ON u.role_id = r.id AND r.is_active = TRUE \
         WHERE u.status = 'active' ORDER BY u.id",
    );

    let joins: Vec<&JoinCondition> = set
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::Join { condition, .. } => Some(condition),
            _ => None,
        })
        .collect();
    assert_eq!(joins.len(), 2);
    assert!(joins.iter().any(|condition| matches!(
        condition,
        JoinCondition::Equi { left, right, right_table }
            if *left == ColumnRef::new("u", "role_id")
                && *right == ColumnRef::new("r", "id")
                && right_table.as_deref() == Some("roles")
    )));
    assert!(joins.iter().any(|condition| matches!(
        condition,
        JoinCondition::Filter { target, op: CompareOp::Eq, value }
            if *target == ColumnRef::new("r", "is_active") && value == "TRUE"
    )));
    assert_eq!(set.of_kind(ConstraintKind::Where).count(), 1);
    assert_eq!(set.of_kind(ConstraintKind::Boolean).count(), 0);
}

#[test]
fn between_in_null_and_year_families() {
    let set = extract(
        "SELECT * FROM orders o WHERE o.total BETWEEN 10 AND 500 \
         AND o.status IN ('paid', 'shipped') AND o.notes IS NULL \
         AND o.shipped_at IS NOT NULL AND YEAR(o.order_date) = 2024 \
         AND o.user_id NOT IN (1, 2)",
    );

    assert_eq!(set.len(), 6, "{:#?}", set.constraints);
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Between { min, max, data_kind: BetweenKind::Numeric, .. }
            if min == "10" && max == "500"
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::In { list: InList::StringList { values }, negated: false, .. }
            if values == &["paid".to_string(), "shipped".to_string()]
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::In { list: InList::NumericList { values }, negated: true, .. }
            if values.len() == 2
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Null { target, is_null: true, .. } if target.column == "notes"
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Null { target, is_null: false, .. } if target.column == "shipped_at"
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Date { condition: DateCondition::YearEquals { year: 2024 }, op: CompareOp::Eq, .. }
    )));
}

#[test]
fn relative_date_forms() {
    let set = extract(
        "SELECT * FROM orders o WHERE o.shipped_at >= NOW() - INTERVAL 30 DAY \
         AND o.order_date > DATE_SUB(CURDATE(), INTERVAL 2 WEEK) \
         AND o.shipped_at < SYSDATE - 7 \
         AND EXTRACT(YEAR FROM o.order_date) = 2023",
    );

    let dates: Vec<(&DateCondition, CompareOp)> = set
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::Date { condition, op, .. } => Some((condition, *op)),
            _ => None,
        })
        .collect();
    assert_eq!(dates.len(), 4, "{:#?}", set.constraints);
    assert_eq!(set.of_kind(ConstraintKind::Where).count(), 0);

    let interval = |amount, unit| DateCondition::Interval {
        amount,
        unit,
        direction: IntervalDirection::Past,
    };
    assert!(dates.contains(&(&interval(30, IntervalUnit::Day), CompareOp::Ge)));
    assert!(dates.contains(&(&interval(2, IntervalUnit::Week), CompareOp::Gt)));
    assert!(dates.contains(&(&interval(7, IntervalUnit::Day), CompareOp::Lt)));
    assert!(dates.contains(&(&DateCondition::YearEquals { year: 2023 }, CompareOp::Eq)));
}

#[test]
fn not_exists_predicates_are_not_positive_constraints() {
    let set = extract(
        "SELECT * FROM users u \
         WHERE EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id) \
         AND NOT EXISTS (SELECT 1 FROM user_roles ur WHERE ur.user_id = u.id AND ur.role_id = 3)",
    );

    let exists: Vec<(bool, Option<&str>)> = set
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::Exists { is_exists, table, .. } => Some((*is_exists, table.as_deref())),
            _ => None,
        })
        .collect();
    assert_eq!(exists, vec![(true, Some("orders")), (false, Some("user_roles"))]);
    assert!(
        set.iter()
            .filter_map(Constraint::target)
            .all(|target| target.column != "role_id")
    );
}

#[test]
fn bare_columns_and_booleans() {
    let set = extract(
        "SELECT * FROM products WHERE price > 9.5 AND name LIKE 'Pro%' AND is_available = TRUE",
    );

    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Where { target, op: CompareOp::Gt, value, .. }
            if target.alias.is_empty() && target.column == "price" && value == "9.5"
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Like { kind: LikeKind::StartsWith, required_substring, .. }
            if required_substring == "Pro"
    )));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Boolean { value: true, literal, .. } if literal == "TRUE"
    )));
    assert_eq!(set.len(), 3);
}

#[test]
fn quoted_identifiers_are_unquoted_outside_literals_only() {
    let set = extract("SELECT * FROM \"users\" u WHERE u.\"status\" = '\"vip\"'");

    assert_eq!(set.aliases.table_for("u"), Some("users"));
    assert!(set.iter().any(|constraint| matches!(
        constraint,
        Constraint::Where { target, op: CompareOp::Eq, value, .. }
            if *target == ColumnRef::new("u", "status") && value == "\"vip\""
    )));
}

#[test]
fn binding_resolves_aliases_against_the_catalog() {
    let catalog = catalog();
    let set = extract(
        "SELECT u.* FROM users u JOIN roles r ON u.role_id = r.id AND r.is_active = TRUE \
         WHERE u.status = 'active'",
    );
    let binding = ConstraintBinding::build(&set, &tables(&["roles", "users"]), &catalog);

    assert!(binding.unresolved().is_empty());
    assert_eq!(binding.for_column("users", "status").count(), 1);
    assert_eq!(binding.for_column("roles", "is_active").count(), 1);

    let equi = binding
        .for_column("users", "role_id")
        .find(|bound| bound.peer.is_some())
        .expect("equi join bound to users.role_id");
    let peer = equi.peer.as_ref().expect("peer");
    assert_eq!((peer.table.as_str(), peer.column.as_str()), ("roles", "id"));
}

#[test]
fn undeclared_aliases_fall_back_to_heuristics_deterministically() {
    let catalog = catalog();
    let set = extract("SELECT * FROM order_items, orders WHERE oi.quantity > 2 AND status = 'paid'");
    let order = tables(&["orders", "order_items"]);

    let first = ConstraintBinding::build(&set, &order, &catalog);
    let second = ConstraintBinding::build(&set, &order, &catalog);
    assert_eq!(
        first.iter().collect::<Vec<_>>(),
        second.iter().collect::<Vec<_>>()
    );

    assert_eq!(first.for_column("order_items", "quantity").count(), 1);
    // Unqualified `status` binds to the query table that owns it.
    assert_eq!(first.for_column("orders", "status").count(), 1);
    assert_eq!(first.for_table("order_items").count(), 1);
}
