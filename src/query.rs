//! Ad-hoc analytical queries
//!
//! Investigations get a full SQL surface over log files through an
//! embedded DuckDB connection, e.g.
//! `SELECT * FROM read_json_auto('logs/trail.json') WHERE errorCode IS NOT NULL`.
//! This path is independent of the rule evaluator; engine diagnostics
//! are surfaced verbatim.

use std::time::Instant;

use duckdb::types::ValueRef;
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

/// Result of an ad-hoc query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The query that was executed
    pub query: String,
    /// Column names of the result set
    pub columns: Vec<String>,
    /// Rows as JSON objects keyed by column name
    pub rows: Vec<Value>,
    /// Number of rows returned
    pub row_count: usize,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Run an analytical SQL query on a fresh in-memory connection
pub fn run_query(sql: &str) -> Result<QueryResult> {
    let start = Instant::now();
    let conn = Connection::open_in_memory().map_err(|e| EngineError::Query(e.to_string()))?;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| EngineError::Query(e.to_string()))?;
    let mut raw_rows = stmt
        .query([])
        .map_err(|e| EngineError::Query(e.to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Value> = Vec::new();

    while let Some(row) = raw_rows
        .next()
        .map_err(|e| EngineError::Query(e.to_string()))?
    {
        let stmt_ref = row.as_ref();
        if columns.is_empty() {
            columns = (0..stmt_ref.column_count())
                .map(|i| {
                    stmt_ref
                        .column_name(i)
                        .ok()
                        .cloned()
                        .unwrap_or_else(|| format!("column_{}", i))
                })
                .collect();
        }

        let mut object = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            let value = row
                .get_ref(i)
                .map(value_ref_to_json)
                .unwrap_or(Value::Null);
            object.insert(name.clone(), value);
        }
        rows.push(Value::Object(object));
    }

    Ok(QueryResult {
        query: sql.to_string(),
        columns,
        row_count: rows.len(),
        rows,
        execution_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Decode the common DuckDB value kinds into JSON. Exotic types
/// (intervals, nested lists, decimals) come back as null rather than
/// failing the whole query.
fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::from(n),
        ValueRef::SmallInt(n) => Value::from(n),
        ValueRef::Int(n) => Value::from(n),
        ValueRef::BigInt(n) => Value::from(n),
        ValueRef::UTinyInt(n) => Value::from(n),
        ValueRef::USmallInt(n) => Value::from(n),
        ValueRef::UInt(n) => Value::from(n),
        ValueRef::UBigInt(n) => Value::from(n),
        ValueRef::Float(n) => Value::from(n),
        ValueRef::Double(n) => Value::from(n),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_constants() {
        let result = run_query("SELECT 1 AS one, 'x' AS name, true AS flag").unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.columns, vec!["one", "name", "flag"]);
        assert_eq!(result.rows[0]["one"], serde_json::json!(1));
        assert_eq!(result.rows[0]["name"], serde_json::json!("x"));
        assert_eq!(result.rows[0]["flag"], serde_json::json!(true));
    }

    #[test]
    fn test_multiple_rows() {
        let result = run_query("SELECT * FROM (VALUES (1), (2), (3)) t(n) ORDER BY n").unwrap();
        assert_eq!(result.row_count, 3);
        assert_eq!(result.rows[2]["n"], serde_json::json!(3));
    }

    #[test]
    fn test_bad_sql_surfaces_engine_error() {
        let err = run_query("SELEC broken").unwrap_err();
        assert!(matches!(err, EngineError::Query(_)));
    }

    #[test]
    fn test_read_json_over_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            "{\"eventName\": \"ConsoleLogin\", \"count\": 2}\n{\"eventName\": \"AssumeRole\", \"count\": 5}\n",
        )
        .unwrap();

        let sql = format!(
            "SELECT eventName FROM read_json_auto('{}') WHERE count > 3",
            path.display()
        );
        let result = run_query(&sql).unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0]["eventName"], serde_json::json!("AssumeRole"));
    }
}
