//! Record batches
//!
//! A [`RecordBatch`] is an ordered set of uniform rows bound for one staging
//! table: a shared column list plus one [`Value`] per column per row. Batches
//! are created by a source, optionally mutated in place by a transform, and
//! consumed exactly once by the loader.
//!
//! Values render as SQL literals rather than bind parameters because the
//! target column types are unknown at this layer; quoted literals arrive at
//! PostgreSQL as `unknown`-typed and coerce to the column type server-side.

use serde_json::Value as Json;
use tracing::warn;

/// A single scalar cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Convert a JSON scalar into a cell
    ///
    /// Nested arrays/objects are kept as their JSON text so they can still
    /// land in json/jsonb/text staging columns.
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            },
            Json::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Append this cell to `sql` as a PostgreSQL literal
    pub fn write_sql_literal(&self, sql: &mut String) {
        match self {
            Value::Null => sql.push_str("NULL"),
            Value::Bool(b) => sql.push_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Int(i) => sql.push_str(&i.to_string()),
            Value::Float(f) => {
                // numeric columns reject NaN/inf literals
                if f.is_finite() {
                    sql.push_str(&f.to_string());
                } else {
                    sql.push_str("NULL");
                }
            },
            Value::Text(s) => {
                sql.push('\'');
                for c in s.chars() {
                    match c {
                        '\'' => sql.push_str("''"),
                        '\0' => {},
                        _ => sql.push(c),
                    }
                }
                sql.push('\'');
            },
        }
    }
}

/// An ordered sequence of uniform records for one staging table
#[derive(Debug, Clone)]
pub struct RecordBatch {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordBatch {
    /// Create an empty batch with a fixed column list
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a batch from JSON objects as returned by the API source
    ///
    /// The column list is the union of keys across all records in first-seen
    /// order; keys missing from an individual record become NULL cells.
    pub fn from_json_records(table: impl Into<String>, records: &[serde_json::Map<String, Json>]) -> Self {
        let table = table.into();
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).map(Value::from_json).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { table, columns, rows }
    }

    /// Append one row; length must match the column list
    pub fn push_row(&mut self, row: Vec<Value>) {
        if row.len() != self.columns.len() {
            warn!(
                table = %self.table,
                expected = self.columns.len(),
                got = row.len(),
                "dropping row with mismatched column count"
            );
            return;
        }
        self.rows.push(row);
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Position of a column by name, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rename all columns through `f` (used by the lowercase normalization)
    pub fn rename_columns(&mut self, f: impl Fn(&str) -> String) {
        for col in &mut self.columns {
            *col = f(col);
        }
    }

    /// Apply `f` to every cell of one column
    pub fn map_column(&mut self, index: usize, f: impl Fn(&Value) -> Value) {
        for row in &mut self.rows {
            row[index] = f(&row[index]);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
