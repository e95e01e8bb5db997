//! Row-keyed variable tables and the outer join that merges them into a
//! [`Matrix`].

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Fill value for a variable that is absent from a source.
pub const NOT_SET: &str = "not_set";

// ---------------------------------------------------------------------------
// VariableTable
// ---------------------------------------------------------------------------

/// One source's view of the variables: name → one cell per column.
///
/// A `None` cell means the source knows the row but holds no value for it;
/// it is rendered as [`NOT_SET`] once merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableTable {
    columns: Vec<String>,
    rows: BTreeMap<String, Vec<Option<String>>>,
}

impl VariableTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
        }
    }

    /// A table with a single column named `column`.
    pub fn single(column: impl Into<String>) -> Self {
        Self::new([column.into()])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert or replace a row. Short rows are padded with `None`, long rows
    /// are truncated to the table's width.
    pub fn insert(&mut self, name: impl Into<String>, mut cells: Vec<Option<String>>) {
        cells.resize(self.columns.len(), None);
        self.rows.insert(name.into(), cells);
    }

    /// Row names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// The cell at `name` × `column`, or `None` when either is absent or the
    /// cell holds no value.
    pub fn get(&self, name: &str, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(name)?.get(idx)?.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }
}

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub name: String,
    pub cells: Vec<String>,
}

/// The merged result: every cell is populated, absent values read [`NOT_SET`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Matrix {
    pub columns: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

/// Required names that read [`NOT_SET`] in one column of a [`Matrix`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingReport {
    pub column: String,
    pub names: Vec<String>,
}

/// Outer-join `tables` on variable name.
///
/// Columns appear in table order. Rows are the union of every table's names,
/// ascending. A name missing from a table gets [`NOT_SET`] in each of that
/// table's columns.
pub fn outer_join(tables: &[VariableTable]) -> Matrix {
    let columns: Vec<String> = tables
        .iter()
        .flat_map(|t| t.columns.iter().cloned())
        .collect();

    let names: BTreeSet<&str> = tables.iter().flat_map(|t| t.names()).collect();

    let rows = names
        .into_iter()
        .map(|name| {
            let mut cells = Vec::with_capacity(columns.len());
            for table in tables {
                match table.rows.get(name) {
                    Some(row) => cells.extend(
                        row.iter()
                            .map(|c| c.clone().unwrap_or_else(|| NOT_SET.to_string())),
                    ),
                    None => cells.extend(
                        std::iter::repeat_with(|| NOT_SET.to_string()).take(table.columns.len()),
                    ),
                }
            }
            MatrixRow {
                name: name.to_string(),
                cells,
            }
        })
        .collect();

    Matrix { columns, rows }
}

impl Matrix {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn row(&self, name: &str) -> Option<&MatrixRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    pub fn cell(&self, name: &str, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.row(name)?.cells.get(idx).map(String::as_str)
    }

    /// Reorder rows so that those whose `column` reads `marker` come first.
    /// Names sort ascending within each group. Without such a column the rows
    /// are sorted by name only.
    pub fn group_first_by(&mut self, column: &str, marker: &str) {
        match self.column_index(column) {
            Some(idx) => self.rows.sort_by(|a, b| {
                let a_out = a.cells[idx] != marker;
                let b_out = b.cells[idx] != marker;
                a_out.cmp(&b_out).then_with(|| a.name.cmp(&b.name))
            }),
            None => self.rows.sort_by(|a, b| a.name.cmp(&b.name)),
        }
    }

    /// For every column other than `flag_column`, the names flagged with
    /// `marker` whose cell reads [`NOT_SET`]. Columns with nothing missing are
    /// omitted.
    pub fn missing(&self, flag_column: &str, marker: &str) -> Vec<MissingReport> {
        let Some(flag_idx) = self.column_index(flag_column) else {
            return Vec::new();
        };
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != flag_idx)
            .filter_map(|(i, column)| {
                let names: Vec<String> = self
                    .rows
                    .iter()
                    .filter(|r| r.cells[flag_idx] == marker && r.cells[i] == NOT_SET)
                    .map(|r| r.name.clone())
                    .collect();
                (!names.is_empty()).then(|| MissingReport {
                    column: column.clone(),
                    names,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
