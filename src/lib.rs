//! graph-mail-connector - an Exchange mailbox connector for Microsoft Graph
//!
//! This crate reads mail-message metadata from a mailbox behind the Graph
//! REST API and exposes the results as an identifier-keyed, schema-typed row
//! stream for a downstream synchronization engine. Full MIME message bodies
//! are downloaded separately, per identifier, into scoped temporary files.

pub mod config;
pub mod connector;
pub mod domain;

pub use config::ConnectorConfig;
pub use connector::{GraphMailConnector, MailSource};
