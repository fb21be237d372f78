//! Per-batch transformations
//!
//! Pure, table-specific mutations applied between extraction and loading.
//! Column names are matched case-insensitively upstream and normalized to
//! lowercase here, before any per-table coercion runs.

use tracing::debug;

use crate::record::{RecordBatch, Value};

/// Table whose integer `activeflag` column must land as boolean
const COMPLETION_TABLE: &str = "stg_pro_count__completiontb";

/// Apply the declared transformations for `table`
pub fn apply(table: &str, batch: &mut RecordBatch) {
    normalize_column_names(batch);
    if table == COMPLETION_TABLE {
        coerce_flag_to_bool(batch, "activeflag");
    }
}

/// Lowercase every column name
pub fn normalize_column_names(batch: &mut RecordBatch) {
    batch.rename_columns(|c| c.to_lowercase());
}

/// Coerce a numeric 0/1 flag column to boolean; non-flag cells pass through
pub fn coerce_flag_to_bool(batch: &mut RecordBatch, column: &str) {
    let Some(index) = batch.column_index(column) else {
        return;
    };
    debug!(table = %batch.table(), column = %column, "coercing flag column to boolean");

    batch.map_column(index, |value| match value {
        Value::Int(i) => Value::Bool(*i != 0),
        Value::Float(f) => Value::Bool(*f != 0.0),
        Value::Text(s) => match s.trim() {
            "1" | "1.0" | "true" | "TRUE" | "True" => Value::Bool(true),
            "0" | "0.0" | "false" | "FALSE" | "False" => Value::Bool(false),
            _ => value.clone(),
        },
        other => other.clone(),
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn batch(columns: &[&str], rows: Vec<Vec<Value>>) -> RecordBatch {
        let mut batch = RecordBatch::new(
            COMPLETION_TABLE,
            columns.iter().map(|c| c.to_string()).collect(),
        );
        for row in rows {
            batch.push_row(row);
        }
        batch
    }

    #[test]
    fn test_normalize_column_names() {
        let mut batch = batch(&["MerrickID", "WellName"], vec![]);
        normalize_column_names(&mut batch);
        assert_eq!(batch.columns(), &["merrickid", "wellname"]);
    }

    #[test]
    fn test_coerce_flag_variants() {
        let mut batch = batch(
            &["activeflag"],
            vec![
                vec![Value::Int(1)],
                vec![Value::Int(0)],
                vec![Value::Float(1.0)],
                vec![Value::Text("0".into())],
                vec![Value::Null],
            ],
        );
        coerce_flag_to_bool(&mut batch, "activeflag");

        let flags: Vec<_> = batch.rows().iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            flags,
            vec![
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(true),
                Value::Bool(false),
                Value::Null,
            ]
        );
    }

    #[test]
    fn test_coerce_missing_column_is_noop() {
        let mut batch = batch(&["wellname"], vec![vec![Value::Text("A-1".into())]]);
        coerce_flag_to_bool(&mut batch, "activeflag");
        assert_eq!(batch.rows()[0][0], Value::Text("A-1".into()));
    }

    #[test]
    fn test_apply_runs_normalization_before_coercion() {
        // column arrives uppercase; apply() must still find it
        let mut batch = batch(&["ActiveFlag"], vec![vec![Value::Int(1)]]);
        apply(COMPLETION_TABLE, &mut batch);
        assert_eq!(batch.columns(), &["activeflag"]);
        assert_eq!(batch.rows()[0][0], Value::Bool(true));
    }
}
