//! Positional host replies → keyed records
//!
//! The host answers list-shaped queries with bare arrays. A [`FieldSchema`]
//! names each position; the caller decides whether the reply is row-major
//! (one tuple per record) or column-major (one list per field, as AppleScript
//! returns `{name, album, ...} of every track`).

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{BridgeError, DecodeError};

/// One decoded record, keyed by schema field name
pub type Record = Map<String, Value>;

/// How positional data is laid out in a reply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// `[[f1, f2, ...], [f1, f2, ...]]`
    Rows,
    /// `[[f1 of every row], [f2 of every row], ...]`
    Columns,
}

/// Ordered list of field names used to zip positional data into records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<String>,
}

impl FieldSchema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn decode(&self, layout: Layout, reply: &Value) -> Result<Vec<Record>, DecodeError> {
        match layout {
            Layout::Rows => self.decode_rows(reply),
            Layout::Columns => self.decode_columns(reply),
        }
    }

    /// Decode a list of M tuples, each exactly as long as the schema
    pub fn decode_rows(&self, reply: &Value) -> Result<Vec<Record>, DecodeError> {
        let Some(rows) = as_list(reply)? else {
            return Ok(Vec::new());
        };

        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let values = row.as_array().ok_or(DecodeError::NotARow { row: index })?;
                if values.len() != self.fields.len() {
                    return Err(DecodeError::RowArity {
                        row: index,
                        expected: self.fields.len(),
                        found: values.len(),
                    });
                }
                Ok(self.zip(values.iter().cloned()))
            })
            .collect()
    }

    /// Decode N columns of M values each, transposing into M records
    pub fn decode_columns(&self, reply: &Value) -> Result<Vec<Record>, DecodeError> {
        let Some(columns) = as_list(reply)? else {
            return Ok(Vec::new());
        };
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        if columns.len() != self.fields.len() {
            return Err(DecodeError::ColumnCount {
                expected: self.fields.len(),
                found: columns.len(),
            });
        }

        let columns = columns
            .iter()
            .enumerate()
            .map(|(index, column)| column.as_array().ok_or(DecodeError::NotAColumn { column: index }))
            .collect::<Result<Vec<_>, _>>()?;

        let height = columns.first().map_or(0, |column| column.len());
        if let Some((column, ragged)) = columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.len() != height)
        {
            return Err(DecodeError::RaggedColumns {
                column,
                expected: height,
                found: ragged.len(),
            });
        }

        Ok((0..height)
            .map(|row| self.zip(columns.iter().map(|column| column[row].clone())))
            .collect())
    }

    fn zip(&self, values: impl Iterator<Item = Value>) -> Record {
        self.fields.iter().cloned().zip(values).collect()
    }
}

/// `null` is an empty result set; anything else must be a list
fn as_list(reply: &Value) -> Result<Option<&Vec<Value>>, DecodeError> {
    match reply {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(items)),
        other => Err(DecodeError::NotAList {
            found: value_kind(other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Records as a JSON list of objects
pub fn records_to_value(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

/// Convert decoded records into typed items
pub fn decode_as<T: DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, BridgeError> {
    records
        .into_iter()
        .map(|record| serde_json::from_value(Value::Object(record)).map_err(BridgeError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_columns_transposes_in_order() {
        let schema = FieldSchema::new(["name", "year"]);
        let records = schema
            .decode_columns(&json!([["a", "b"], [2000, 2001]]))
            .unwrap();

        assert_eq!(
            records_to_value(records),
            json!([{"name": "a", "year": 2000}, {"name": "b", "year": 2001}])
        );
    }

    #[test]
    fn test_decode_rows_zips_each_tuple() {
        let schema = FieldSchema::new(["id", "title"]);
        let records = schema.decode_rows(&json!([[1, "x"], [2, "y"]])).unwrap();

        assert_eq!(
            records_to_value(records),
            json!([{"id": 1, "title": "x"}, {"id": 2, "title": "y"}])
        );
    }

    #[test]
    fn test_decode_dispatches_on_layout() {
        let schema = FieldSchema::new(["a", "b"]);
        let reply = json!([[1, 2], [3, 4]]);

        let rows = records_to_value(schema.decode(Layout::Rows, &reply).unwrap());
        let columns = records_to_value(schema.decode(Layout::Columns, &reply).unwrap());

        assert_eq!(rows, json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]));
        assert_eq!(columns, json!([{"a": 1, "b": 3}, {"a": 2, "b": 4}]));
    }

    #[test]
    fn test_null_and_empty_replies_are_empty_result_sets() {
        let schema = FieldSchema::new(["a", "b"]);
        assert!(schema.decode_rows(&Value::Null).unwrap().is_empty());
        assert!(schema.decode_rows(&json!([])).unwrap().is_empty());
        assert!(schema.decode_columns(&Value::Null).unwrap().is_empty());
        assert!(schema.decode_columns(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_short_row_is_rejected_not_truncated() {
        let schema = FieldSchema::new(["id", "name", "closeable"]);
        let err = schema
            .decode_rows(&json!([[1, "a", true], [2, "b"]]))
            .unwrap_err();

        assert_eq!(
            err,
            DecodeError::RowArity {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_non_list_reply_is_rejected() {
        let schema = FieldSchema::new(["a"]);
        assert_eq!(
            schema.decode_rows(&json!({"a": 1})).unwrap_err(),
            DecodeError::NotAList { found: "object" }
        );
        assert_eq!(
            schema.decode_rows(&json!(["a"])).unwrap_err(),
            DecodeError::NotARow { row: 0 }
        );
    }

    #[test]
    fn test_non_list_column_is_named_as_column() {
        let schema = FieldSchema::new(["name", "year"]);
        let err = schema.decode_columns(&json!([["a"], 1999])).unwrap_err();
        assert_eq!(err, DecodeError::NotAColumn { column: 1 });
        assert_eq!(err.to_string(), "Column 1 is not a list");
    }

    #[test]
    fn test_column_count_and_ragged_columns_are_rejected() {
        let schema = FieldSchema::new(["name", "year"]);
        assert_eq!(
            schema.decode_columns(&json!([["a"]])).unwrap_err(),
            DecodeError::ColumnCount {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            schema
                .decode_columns(&json!([["a", "b"], [2000]]))
                .unwrap_err(),
            DecodeError::RaggedColumns {
                column: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_decode_as_typed_items() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Item {
            id: u32,
            title: String,
        }

        let schema = FieldSchema::new(["id", "title"]);
        let records = schema.decode_rows(&json!([[1, "x"]])).unwrap();
        let items: Vec<Item> = decode_as(records).unwrap();

        assert_eq!(
            items,
            vec![Item {
                id: 1,
                title: "x".to_string()
            }]
        );
    }
}
