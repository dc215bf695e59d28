//! Full-message (MIME) downloads into scoped temporary files.
//!
//! [`BlobFetcher`] performs an independently authorized request per message
//! and streams the raw body into a new temporary file. The file is only
//! persisted once the download completes; on any failure the partial file
//! is removed before the error propagates. The returned path is owned by
//! the caller, which is responsible for deleting it after use.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use tempfile::NamedTempFile;

use super::token::{TokenProvider, REQUEST_TIMEOUT};
use super::{ConnectorError, Result};
use crate::config::ConnectorConfig;
use crate::domain::MessageId;

/// Downloads full message bodies per identifier.
pub struct BlobFetcher {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    api_base: String,
    mailbox: String,
}

impl BlobFetcher {
    /// Creates a blob fetcher for the configured mailbox.
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<TokenProvider>,
        api_base: impl Into<String>,
        config: &ConnectorConfig,
    ) -> Self {
        Self {
            client,
            tokens,
            api_base: api_base.into(),
            mailbox: config.user_principal_name.clone(),
        }
    }

    /// Downloads the raw MIME body of one message to a new temporary file
    /// and returns its path. Each call creates a distinct file.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::BlobFetch`] on transport failure, a
    /// non-success response, or an interrupted download; any partially
    /// written file is removed first. Token acquisition failures surface as
    /// [`ConnectorError::Authentication`].
    pub async fn fetch_blob(&self, id: &MessageId) -> Result<PathBuf> {
        let token = self.tokens.bearer_token().await?;
        let url = format!("{}/users/{}/messages/{}/$value", self.api_base, self.mailbox, id);

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ConnectorError::BlobFetch(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(256).collect();
            return Err(match status.as_u16() {
                401 => {
                    ConnectorError::Authentication(format!("blob request unauthorized: {}", snippet))
                }
                404 => ConnectorError::BlobFetch(format!("message {} not found", id)),
                _ => ConnectorError::BlobFetch(format!(
                    "request rejected ({}): {}",
                    status, snippet
                )),
            });
        }

        // Dropping the NamedTempFile on any error path below deletes the
        // partially written file.
        let mut file = NamedTempFile::new()
            .map_err(|e| ConnectorError::BlobFetch(format!("create temp file: {}", e)))?;

        let mut bytes = 0usize;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| ConnectorError::BlobFetch(format!("download interrupted: {}", e)))?;
            file.write_all(&chunk)
                .map_err(|e| ConnectorError::BlobFetch(format!("write temp file: {}", e)))?;
            bytes += chunk.len();
        }
        file.flush()
            .map_err(|e| ConnectorError::BlobFetch(format!("flush temp file: {}", e)))?;

        let (_file, path) = file
            .keep()
            .map_err(|e| ConnectorError::BlobFetch(format!("persist temp file: {}", e)))?;

        tracing::debug!(message_id = %id, bytes, path = %path.display(), "downloaded message blob");
        Ok(path)
    }

    /// Suggested file name for a downloaded message, keyed by identifier.
    pub fn blob_file_name(id: &MessageId) -> String {
        format!("{}.eml", id)
    }
}
