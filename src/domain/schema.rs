//! Logical schema model and projected rows.
//!
//! The connector exposes a fixed, ordered schema over the remote message
//! records. Exactly one column is the identifier column; its value is the
//! remote message id and is never null for an emitted row. Rows carry the
//! identifier plus a typed value for every included column, and ownership of
//! each row passes to the destination row store as soon as it is emitted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::MessageId;

/// Logical type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 text, passed through from the record verbatim.
    Text,
    /// RFC 3339 timestamp, parsed to UTC.
    DateTime,
}

/// A single column descriptor in the logical schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name; matches the field name on the raw record.
    pub name: String,
    /// Declared logical type.
    pub column_type: ColumnType,
    /// Whether this column is the identifier column.
    pub is_identifier: bool,
    /// Whether this column participates in the host's key matching.
    pub is_key: bool,
    /// Whether the host treats this column as read-only/derived.
    pub read_only: bool,
    /// Suggested display width; -1 means unspecified.
    pub display_width: i32,
}

impl Column {
    fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_owned(),
            column_type,
            is_identifier: false,
            is_key: false,
            read_only: false,
            display_width: -1,
        }
    }

    fn identifier(mut self) -> Self {
        self.is_identifier = true;
        self
    }

    fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Ordered sequence of column descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// The fixed schema this connector exposes over mailbox messages.
    pub fn exchange_messages() -> Self {
        Self {
            columns: vec![
                Column::new("id", ColumnType::Text).identifier(),
                Column::new("internetMessageId", ColumnType::Text),
                Column::new("subject", ColumnType::Text).read_only(),
                Column::new("receivedDateTime", ColumnType::DateTime),
            ],
        }
    }

    /// Returns the columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the identifier column.
    pub fn identifier(&self) -> &Column {
        // exchange_messages() declares exactly one identifier column
        self.columns
            .iter()
            .find(|c| c.is_identifier)
            .unwrap_or(&self.columns[0])
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Comma-separated column names, as sent in the `$select` query option.
    pub fn select_clause(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The set of column names the host wants projected into each row.
#[derive(Debug, Clone)]
pub struct IncludedColumns(HashSet<String>);

impl IncludedColumns {
    /// Builds an inclusion set from the given column names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Includes every column the schema declares.
    pub fn all(schema: &Schema) -> Self {
        Self::new(schema.columns().iter().map(|c| c.name.clone()))
    }

    /// Whether the named column is included.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

/// A typed cell value in a projected row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Field absent on the record, or JSON null.
    Null,
    /// Text value.
    Text(String),
    /// Timestamp value.
    DateTime(DateTime<Utc>),
}

/// A projected, schema-typed row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The record's identifier, read from the `id` field regardless of the
    /// inclusion filter.
    pub identifier: MessageId,
    /// Included-column values in schema order.
    pub values: Vec<(String, CellValue)>,
}

impl Row {
    /// Accessor for an included column's value.
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}
