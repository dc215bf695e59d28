//! Domain types for the connector.
//!
//! This module contains the identifier newtypes and the logical schema model:
//!
//! - [`types`] - Identifier newtypes
//! - [`schema`] - Column descriptors, cell values, and projected rows

mod schema;
mod types;

pub use schema::{CellValue, Column, ColumnType, IncludedColumns, Row, Schema};
pub use types::MessageId;
