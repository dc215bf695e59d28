//! Cursor-driven pagination over the Graph message list endpoint.
//!
//! [`PaginatedFetcher`] builds the initial list URL from the mailbox and
//! sender filter, then follows the server's `@odata.nextLink` cursor until
//! it is exhausted, the operation fails, or the row sink aborts. Requests
//! are issued one at a time; rows are emitted in server order with no
//! buffering or deduplication.

use std::sync::Arc;

use serde::Deserialize;

use super::project::RowProjector;
use super::sink::{ControlSignal, RowSink};
use super::token::{TokenProvider, REQUEST_TIMEOUT};
use super::{ConnectorError, Result};
use crate::config::ConnectorConfig;
use crate::domain::{IncludedColumns, Schema};

/// Default Graph API base URL.
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// One decoded page of the list endpoint.
///
/// A page with no `value` field is a valid empty page, and pagination still
/// continues through its cursor if one is present.
#[derive(Debug, Deserialize)]
struct MessagesPage {
    value: Option<Vec<serde_json::Value>>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Terminal state of a completed fetch operation.
///
/// Failures surface as `Err` instead; an abort is a normal early
/// termination requested by the row sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cursor was exhausted; all pages were emitted.
    Completed {
        /// Rows delivered to the sink.
        rows: usize,
    },
    /// The sink aborted mid-stream.
    Aborted {
        /// Rows delivered to the sink before the abort, including the row
        /// whose emission returned the abort signal.
        rows: usize,
    },
}

/// Drives the pagination loop and routes records through projection to the
/// row sink.
pub struct PaginatedFetcher {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    api_base: String,
    mailbox: String,
    sender_filter: String,
    projector: RowProjector,
}

impl PaginatedFetcher {
    /// Creates a fetcher for the configured mailbox and sender filter.
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<TokenProvider>,
        api_base: impl Into<String>,
        config: &ConnectorConfig,
        schema: Schema,
    ) -> Self {
        Self {
            client,
            tokens,
            api_base: api_base.into(),
            mailbox: config.user_principal_name.clone(),
            sender_filter: config.sender_email.clone(),
            projector: RowProjector::new(schema),
        }
    }

    fn initial_url(&self) -> String {
        format!(
            "{}/users/{}/messages?$filter=from/emailAddress/address eq '{}'&$select={}",
            self.api_base,
            self.mailbox,
            self.sender_filter,
            self.projector.schema().select_clause()
        )
    }

    /// Fetches all pages, emitting one row per record through `sink`.
    ///
    /// The sink's abort signal is honored per record: no further rows are
    /// emitted from the current page and no further pages are requested.
    /// Rows already delivered before a failure are not rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Authentication`] when a bearer token cannot
    /// be obtained or is rejected, [`ConnectorError::Fetch`] when a page
    /// request fails or its body cannot be decoded, and
    /// [`ConnectorError::Projection`] when a record cannot be coerced onto
    /// the schema.
    pub async fn fetch(
        &self,
        included: &IncludedColumns,
        sink: &mut dyn RowSink,
    ) -> Result<FetchOutcome> {
        let mut url = Some(self.initial_url());
        let mut rows = 0usize;
        let mut pages = 0usize;

        while let Some(current) = url.take() {
            let page = self.fetch_page(&current).await?;
            pages += 1;

            let records = page.value.unwrap_or_default();
            tracing::debug!(page = pages, records = records.len(), "fetched message page");

            for record in &records {
                let row = self.projector.project(record, included)?;
                rows += 1;
                if sink.add_row(row) == ControlSignal::Abort {
                    tracing::info!(rows, pages, "fetch aborted by row store");
                    return Ok(FetchOutcome::Aborted { rows });
                }
            }

            url = page.next_link;
        }

        tracing::info!(rows, pages, "mailbox fetch complete");
        Ok(FetchOutcome::Completed { rows })
    }

    async fn fetch_page(&self, url: &str) -> Result<MessagesPage> {
        let token = self.tokens.bearer_token().await?;

        let response = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ConnectorError::Fetch(format!("page request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(256).collect();
            return Err(match status.as_u16() {
                401 => ConnectorError::Authentication(format!(
                    "list request unauthorized: {}",
                    snippet
                )),
                _ => ConnectorError::Fetch(format!("page request rejected ({}): {}", status, snippet)),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ConnectorError::Fetch(format!("parse page response: {}", e)))
    }
}
