//! Connector error types.

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Errors that can occur during connector operations.
///
/// Every variant is fatal to the single operation it occurs in; the
/// connector never retries on its own, and never rolls back rows already
/// delivered to the row store. Error messages never contain the client
/// secret or a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Token request failed or was rejected by the identity endpoint.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// List-page request failed or returned an unparseable body.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A record field could not be coerced to its declared column type.
    #[error("projection failed for column '{column}': {detail}")]
    Projection {
        /// Column whose value could not be coerced.
        column: String,
        /// What went wrong.
        detail: String,
    },

    /// Binary message download failed or was interrupted.
    #[error("blob fetch failed: {0}")]
    BlobFetch(String),

    /// Host-supplied configuration is invalid or incomplete.
    #[error("invalid configuration: {0}")]
    Config(String),
}
