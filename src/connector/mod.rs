//! Connector core: token lifecycle, pagination, projection, blob download.
//!
//! # Architecture
//!
//! Four components, composed by [`GraphMailConnector`]:
//!
//! - [`TokenProvider`] - acquires and reuses a client-credentials access
//!   token against the tenant's identity endpoint
//! - [`PaginatedFetcher`] - follows the list endpoint's next-link cursor and
//!   emits one row per record, in server order, until exhaustion, failure,
//!   or a caller abort
//! - [`RowProjector`] - maps raw JSON records onto the fixed logical schema,
//!   honoring the host's included-columns filter
//! - [`BlobFetcher`] - streams full MIME message bodies into scoped
//!   temporary files, one authorized request per identifier
//!
//! All network I/O is sequential within an operation: the pagination loop
//! awaits each page before requesting the next. Blob downloads are
//! independent calls and may run concurrently with each other; the token
//! cache is the only shared state and is internally synchronized.
//!
//! # Example
//!
//! ```ignore
//! use graph_mail_connector::{ConnectorConfig, GraphMailConnector, MailSource};
//! use graph_mail_connector::connector::ControlSignal;
//! use graph_mail_connector::domain::IncludedColumns;
//!
//! let config = ConnectorConfig::from_parameters(&host_parameters)?;
//! let connector = GraphMailConnector::new(config);
//!
//! let included = IncludedColumns::all(connector.schema());
//! let mut sink = |row| {
//!     println!("{}", row.identifier);
//!     ControlSignal::Continue
//! };
//! connector.fetch_rows(&included, &mut sink).await?;
//! ```

mod blob;
mod error;
mod fetch;
mod project;
mod sink;
mod token;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

pub use blob::BlobFetcher;
pub use error::{ConnectorError, Result};
pub use fetch::{FetchOutcome, PaginatedFetcher, GRAPH_API_BASE};
pub use project::RowProjector;
pub use sink::{ControlSignal, RowSink};
pub use token::{AccessToken, TokenProvider};

use crate::config::ConnectorConfig;
use crate::domain::{IncludedColumns, MessageId, Schema};

/// Capability surface a mailbox source exposes to the host engine.
///
/// The host depends on this trait rather than on the concrete connector, so
/// sync pipelines can be exercised against fakes.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// The fixed logical schema this source exposes.
    fn schema(&self) -> &Schema;

    /// Fetches all matching records, emitting one row each through `sink`.
    async fn fetch_rows(
        &self,
        included: &IncludedColumns,
        sink: &mut dyn RowSink,
    ) -> Result<FetchOutcome>;

    /// Downloads one record's binary payload to a caller-owned temp file.
    async fn fetch_blob(&self, id: &MessageId) -> Result<PathBuf>;

    /// Suggested file name for a downloaded payload.
    fn blob_file_name(&self, id: &MessageId) -> String;
}

/// The assembled mailbox connector.
///
/// Owns one HTTP client and one token cache shared by the pagination loop
/// and blob downloads.
pub struct GraphMailConnector {
    config: ConnectorConfig,
    fetcher: PaginatedFetcher,
    blobs: BlobFetcher,
    schema: Schema,
}

impl GraphMailConnector {
    /// Creates a connector against the production Graph endpoints.
    pub fn new(config: ConnectorConfig) -> Self {
        let token_url = token::default_token_url(&config.tenant_id);
        Self::with_endpoints(config, token_url, GRAPH_API_BASE)
    }

    /// Creates a connector with explicit identity and API endpoints.
    ///
    /// Production callers use [`new`](Self::new); this constructor exists so
    /// tests can point the connector at a local mock server.
    pub fn with_endpoints(
        config: ConnectorConfig,
        token_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::new();
        let api_base = api_base.into();
        let tokens = Arc::new(TokenProvider::new(client.clone(), &config, token_url));
        let schema = Schema::exchange_messages();

        let fetcher = PaginatedFetcher::new(
            client.clone(),
            Arc::clone(&tokens),
            api_base.clone(),
            &config,
            schema.clone(),
        );
        let blobs = BlobFetcher::new(client, tokens, api_base, &config);

        Self {
            config,
            fetcher,
            blobs,
            schema,
        }
    }

    /// The connector's configuration.
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }
}

#[async_trait]
impl MailSource for GraphMailConnector {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    /// See [`PaginatedFetcher::fetch`].
    async fn fetch_rows(
        &self,
        included: &IncludedColumns,
        sink: &mut dyn RowSink,
    ) -> Result<FetchOutcome> {
        self.fetcher.fetch(included, sink).await
    }

    /// See [`BlobFetcher::fetch_blob`].
    async fn fetch_blob(&self, id: &MessageId) -> Result<PathBuf> {
        self.blobs.fetch_blob(id).await
    }

    fn blob_file_name(&self, id: &MessageId) -> String {
        BlobFetcher::blob_file_name(id)
    }
}
