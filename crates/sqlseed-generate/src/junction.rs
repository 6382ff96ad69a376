use std::collections::HashSet;

use sqlseed_core::Table;
use tracing::debug;

const MAX_JUNCTION_COLUMNS: usize = 6;
const BUMP_ATTEMPTS: i64 = 10;

/// FK layout of a many-to-many link table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionLayout {
    /// FK-shaped columns in ordinal order.
    pub columns: Vec<String>,
}

impl JunctionLayout {
    /// Detect a link table: at least two FK-shaped columns (declared FK or
    /// `_id` suffix) making up at least half of at most six columns.
    pub fn detect(table: &Table) -> Option<Self> {
        if table.columns.len() > MAX_JUNCTION_COLUMNS {
            return None;
        }
        let columns: Vec<String> = table
            .ordered_columns()
            .into_iter()
            .filter(|column| {
                table.is_foreign_key(&column.name) || column.name.to_lowercase().ends_with("_id")
            })
            .map(|column| column.name.clone())
            .collect();

        if columns.len() >= 2 && columns.len() * 2 >= table.columns.len() {
            Some(Self { columns })
        } else {
            None
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column))
    }
}

/// Per-request composite key tracker for one junction table.
#[derive(Debug, Default)]
pub struct JunctionKeys {
    seen: HashSet<Vec<i64>>,
}

impl JunctionKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite FK values for `row` of `rows`.
    ///
    /// Column `j` takes `((row - 1 + j * stride) mod rows) + 1` with
    /// `stride = rows / #columns`, unless `pinned[j]` fixes it. On collision
    /// the last free value is bumped to `(value + attempt) mod rows + 1`, up
    /// to ten times.
    pub fn next(
        &mut self,
        layout: &JunctionLayout,
        row: usize,
        rows: usize,
        pinned: &[Option<i64>],
    ) -> Vec<i64> {
        let rows = rows.max(1) as i64;
        let width = layout.columns.len().max(1) as i64;
        let stride = rows / width;
        let row = row as i64;

        let mut key: Vec<i64> = (0..width)
            .map(|j| {
                pinned
                    .get(j as usize)
                    .copied()
                    .flatten()
                    .unwrap_or((row - 1 + j * stride).rem_euclid(rows) + 1)
            })
            .collect();

        if self.seen.insert(key.clone()) {
            return key;
        }

        let Some(last) = (0..key.len())
            .rev()
            .find(|&j| pinned.get(j).copied().flatten().is_none())
        else {
            debug!(row, "junction key collision with every column pinned");
            return key;
        };
        let base = key[last];
        for attempt in 1..=BUMP_ATTEMPTS {
            key[last] = (base + attempt).rem_euclid(rows) + 1;
            if !self.seen.contains(&key) {
                debug!(row, attempt, "junction key collision resolved");
                self.seen.insert(key.clone());
                return key;
            }
        }

        debug!(row, "junction key collision unresolved");
        key
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
