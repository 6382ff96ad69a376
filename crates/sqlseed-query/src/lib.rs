//! SQL constraint extraction, table-reference scanning and constraint binding.

pub mod alias;
pub mod binding;
pub mod extract;
pub mod model;
pub mod tables;
pub mod text;

pub use alias::{alias_matches, resolve_alias};
pub use binding::{BoundConstraint, ConstraintBinding, JoinPeer};
pub use extract::{extract, isolate_where};
pub use model::{
    AliasMap, BetweenKind, ColumnRef, CompareOp, Constraint, ConstraintKind, ConstraintSet,
    DateCondition, InList, IntervalDirection, IntervalUnit, JoinCondition, LikeKind,
};
pub use tables::{TableRef, alias_map, scan_table_refs};
pub use text::normalize_sql;
