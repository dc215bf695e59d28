//! Projection of raw JSON records onto the logical schema.
//!
//! Each decoded record is consumed immediately into a [`Row`] and discarded.
//! Field lookup is by column name; an absent field or JSON null projects to
//! [`CellValue::Null`]. A value that cannot be coerced to its column's
//! declared type fails the whole operation rather than being skipped.

use serde_json::Value;

use super::{ConnectorError, Result};
use crate::domain::{CellValue, Column, ColumnType, IncludedColumns, MessageId, Row, Schema};

/// Maps raw records onto ordered, typed rows.
pub struct RowProjector {
    schema: Schema,
}

impl RowProjector {
    /// Creates a projector for the given schema.
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// The schema rows are projected onto.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Projects one record onto the schema, honoring the inclusion filter.
    ///
    /// The identifier is always read from the record's `id` field, even when
    /// `id` is not an included column, since every row must carry it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Projection`] when the identifier is missing
    /// or null, or when an included field cannot be coerced to its column's
    /// declared type.
    pub fn project(&self, record: &Value, included: &IncludedColumns) -> Result<Row> {
        let identifier = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ConnectorError::Projection {
                column: "id".to_string(),
                detail: "identifier field is missing or null".to_string(),
            })?;

        let mut values = Vec::new();
        for column in self.schema.columns() {
            if !included.contains(&column.name) {
                continue;
            }

            let cell = match record.get(&column.name) {
                None | Some(Value::Null) => CellValue::Null,
                Some(value) => coerce(column, value)?,
            };
            values.push((column.name.clone(), cell));
        }

        Ok(Row {
            identifier: MessageId::from(identifier),
            values,
        })
    }
}

fn coerce(column: &Column, value: &Value) -> Result<CellValue> {
    match column.column_type {
        ColumnType::Text => value
            .as_str()
            .map(|s| CellValue::Text(s.to_owned()))
            .ok_or_else(|| ConnectorError::Projection {
                column: column.name.clone(),
                detail: format!("expected string, got {}", value),
            }),
        ColumnType::DateTime => {
            let text = value.as_str().ok_or_else(|| ConnectorError::Projection {
                column: column.name.clone(),
                detail: format!("expected RFC 3339 timestamp, got {}", value),
            })?;
            chrono::DateTime::parse_from_rfc3339(text)
                .map(|dt| CellValue::DateTime(dt.with_timezone(&chrono::Utc)))
                .map_err(|e| ConnectorError::Projection {
                    column: column.name.clone(),
                    detail: format!("invalid timestamp '{}': {}", text, e),
                })
        }
    }
}
