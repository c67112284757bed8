//! Response interpretation shared by the client operations

use std::path::Path;

use super::QueryResult;
use crate::command::Command;
use crate::error::{DriverError, Result};
use crate::grammar::{parse_output, DecodedRow, Record, TableInfo};
use crate::schema::TableSchema;
use crate::transport::Transport;
use crate::value::Metadata;

/// Run a command, loading the session's artifact first when bound to a path
pub(super) fn execute<T: Transport>(
    transport: &T,
    path: Option<&Path>,
    command: &str,
) -> Result<String> {
    match path {
        Some(path) => {
            let text = format!("{}\n{}", Command::Open(path).build(None)?, command);
            transport.execute(&text)
        }
        None => transport.execute(command),
    }
}

/// Run a command and parse its output, failing on an engine-reported error
pub(super) fn execute_records<T: Transport>(
    transport: &T,
    path: Option<&Path>,
    command: &str,
) -> Result<Vec<Record>> {
    let output = execute(transport, path, command)?;
    let records = parse_output(&output);
    check_engine_error(&records, command)?;
    Ok(records)
}

pub(super) fn check_engine_error(records: &[Record], command: &str) -> Result<()> {
    match records.iter().find_map(|r| match r {
        Record::EngineError(message) => Some(message),
        _ => None,
    }) {
        Some(message) => Err(DriverError::query(message.clone(), command)),
        None => Ok(()),
    }
}

pub(super) fn fetch_listing<T: Transport>(
    transport: &T,
    path: Option<&Path>,
) -> Result<Vec<TableInfo>> {
    let command = Command::ShowTables.build(None)?;
    let records = execute_records(transport, path, &command)?;
    Ok(tables(records))
}

pub(super) fn tables(records: Vec<Record>) -> Vec<TableInfo> {
    records
        .into_iter()
        .filter_map(|r| match r {
            Record::Table(info) => Some(info),
            _ => None,
        })
        .collect()
}

/// Id from the last insert acknowledgment
pub(super) fn row_echo(records: &[Record], command: &str) -> Result<u64> {
    records
        .iter()
        .rev()
        .find_map(|r| match r {
            Record::RowEcho { id } => Some(*id),
            _ => None,
        })
        .ok_or_else(|| DriverError::query("engine did not acknowledge the insert with a row id", command))
}

/// Affected-row count from an UPDATE / DELETE acknowledgment
pub(super) fn affected(records: &[Record], command: &str) -> Result<usize> {
    records
        .iter()
        .find_map(|r| match r {
            Record::Affected { count } => Some(*count),
            _ => None,
        })
        .ok_or_else(|| DriverError::query("engine did not report an affected row count", command))
}

pub(super) fn rows(records: Vec<Record>) -> impl Iterator<Item = DecodedRow> {
    records.into_iter().filter_map(|r| match r {
        Record::Row(row) => Some(row),
        _ => None,
    })
}

/// Name decoded values by schema column order, or by position when the counts differ
pub(super) fn attribute(row: DecodedRow, schema: Option<&TableSchema>) -> QueryResult {
    let names: Option<Vec<&str>> = schema
        .map(|s| s.column_names().collect::<Vec<_>>())
        .filter(|names| names.len() == row.values.len());

    let values: Metadata = match names {
        Some(names) => names
            .into_iter()
            .map(str::to_string)
            .zip(row.values)
            .collect(),
        None => row
            .values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("_{}", i), v))
            .collect(),
    };

    QueryResult {
        id: row.id,
        distance: row.distance,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn decoded(values: Vec<Value>) -> DecodedRow {
        DecodedRow {
            id: 1,
            distance: Some(0.5),
            values,
        }
    }

    #[test]
    fn test_attribute_by_schema() {
        let schema = TableSchema::new("docs", 2, &[("title", "str")]);
        let result = attribute(
            decoded(vec![Value::Vector(vec![1.0, 0.0]), Value::Text("A".into())]),
            Some(&schema),
        );
        assert_eq!(result.get("title"), Some(&Value::Text("A".into())));
        assert_eq!(result.get("embedding"), Some(&Value::Vector(vec![1.0, 0.0])));
    }

    #[test]
    fn test_attribute_falls_back_to_positions() {
        let schema = TableSchema::new("docs", 2, &[("title", "str")]);
        let result = attribute(decoded(vec![Value::Raw("[garbage".into())]), Some(&schema));
        assert_eq!(result.get("_0"), Some(&Value::Raw("[garbage".into())));
        assert_eq!(result.values.len(), 1);

        let result = attribute(decoded(vec![Value::Integer(1), Value::Integer(2)]), None);
        assert_eq!(result.get("_1"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_values_keep_schema_order() {
        let schema = TableSchema::new("docs", 2, &[("title", "str"), ("score", "float")]);
        let result = attribute(
            decoded(vec![
                Value::Vector(vec![1.0, 0.0]),
                Value::Text("A".into()),
                Value::Float(0.5),
            ]),
            Some(&schema),
        );
        let columns: Vec<&str> = result.values.iter().map(|(k, _)| k).collect();
        assert_eq!(columns, vec!["embedding", "title", "score"]);

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"id":1,"distance":0.5,"values":{"embedding":[1.0,0.0],"title":"A","score":0.5}}"#
        );
    }

    #[test]
    fn test_engine_error_becomes_query_failure() {
        let records = vec![Record::EngineError("Table 'x' does not exist".into())];
        let err = check_engine_error(&records, "DELETE FROM x").unwrap_err();
        match err {
            DriverError::QueryFailure { message, command } => {
                assert_eq!(message, "Table 'x' does not exist");
                assert_eq!(command.as_deref(), Some("DELETE FROM x"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_echo() {
        let err = row_echo(&[], "INSERT INTO docs (embedding) VALUES ([1.0])").unwrap_err();
        assert!(matches!(err, DriverError::QueryFailure { .. }));
        assert_eq!(
            row_echo(&[Record::RowEcho { id: 1 }, Record::RowEcho { id: 4 }], "").unwrap(),
            4
        );
    }
}
