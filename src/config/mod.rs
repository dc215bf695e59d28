//! Connector configuration.
//!
//! Configuration arrives from the host as a flat key-value parameter list
//! and is converted into an immutable [`ConnectorConfig`] at startup.

mod settings;

pub use settings::{ConnectorConfig, Parameter};
