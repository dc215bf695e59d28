//! Connector configuration types.
//!
//! The host engine hands the connector a flat list of named parameters when
//! a sync project is loaded. [`ConnectorConfig::from_parameters`] validates
//! that list into an immutable configuration value; nothing in the connector
//! mutates it afterwards. The client secret is expected to arrive already
//! decrypted, is never written back out, and is redacted from all debug
//! output.

use std::fmt;

use crate::connector::{ConnectorError, Result};

/// Host parameter names, as persisted in the sync project file.
const PARAM_TENANT_ID: &str = "TenantId";
const PARAM_CLIENT_ID: &str = "ClientId";
const PARAM_CLIENT_SECRET: &str = "ClientSecret";
const PARAM_USER_PRINCIPAL_NAME: &str = "UserPrincipalName";
const PARAM_SENDER_EMAIL: &str = "SenderEmail";

/// A single named configuration parameter from the host.
pub type Parameter = (String, String);

/// Immutable connector configuration.
#[derive(Clone)]
pub struct ConnectorConfig {
    /// Azure AD tenant the client credentials belong to.
    pub tenant_id: String,
    /// OAuth client (application) id.
    pub client_id: String,
    /// OAuth client secret, already decrypted by the host.
    pub client_secret: String,
    /// Mailbox to read mail from.
    pub user_principal_name: String,
    /// Sender address used to filter returned messages.
    pub sender_email: String,
}

impl ConnectorConfig {
    /// Builds a configuration from the host's parameter list.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Config`] when a required parameter is
    /// missing or empty.
    pub fn from_parameters(parameters: &[Parameter]) -> Result<Self> {
        let get = |name: &str| -> Result<String> {
            parameters
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    ConnectorError::Config(format!("missing required parameter: {}", name))
                })
        };

        Ok(Self {
            tenant_id: get(PARAM_TENANT_ID)?,
            client_id: get(PARAM_CLIENT_ID)?,
            client_secret: get(PARAM_CLIENT_SECRET)?,
            user_principal_name: get(PARAM_USER_PRINCIPAL_NAME)?,
            sender_email: get(PARAM_SENDER_EMAIL)?,
        })
    }

    /// Returns the parameter list for the host to persist.
    ///
    /// The client secret is deliberately omitted: encryption of the stored
    /// secret is the host's responsibility and the decrypted value must
    /// never be written back to any persisted form.
    pub fn to_parameters(&self) -> Vec<Parameter> {
        vec![
            (PARAM_TENANT_ID.to_string(), self.tenant_id.clone()),
            (PARAM_CLIENT_ID.to_string(), self.client_id.clone()),
            (
                PARAM_USER_PRINCIPAL_NAME.to_string(),
                self.user_principal_name.clone(),
            ),
            (PARAM_SENDER_EMAIL.to_string(), self.sender_email.clone()),
        ]
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_principal_name", &self.user_principal_name)
            .field("sender_email", &self.sender_email)
            .finish()
    }
}
