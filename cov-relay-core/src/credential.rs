//! Credentials for the coverage service and redaction of their secret.
//!
//! A credential is either a plain project token or a structured API token.
//! Supplying both, or neither, is rejected when the credential is built.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder written in place of a secret.
pub const REDACTED: &str = "[REDACTED]";

/// Structured API-token configuration: the secret plus the repository it is scoped to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTokenConfig {
    pub api_token: String,
    pub username: String,
    pub project_name: String,
    /// Git provider short name (e.g. `gh`, `gl`, `bb`).
    pub provider: String,
}

impl fmt::Debug for ApiTokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTokenConfig")
            .field("api_token", &REDACTED)
            .field("username", &self.username)
            .field("project_name", &self.project_name)
            .field("provider", &self.provider)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Token(String),
    ApiToken(ApiTokenConfig),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no credential configured: supply either a project token or an API token")]
    Missing,
    #[error("both a project token and an API token were supplied; configure only one")]
    Conflicting,
    #[error("credential secret is empty")]
    Empty,
}

impl Credential {
    /// Builds a credential from the two mutually exclusive optional sources.
    pub fn from_parts(
        token: Option<String>,
        api_token: Option<ApiTokenConfig>,
    ) -> Result<Self, CredentialError> {
        let credential = match (token, api_token) {
            (Some(_), Some(_)) => return Err(CredentialError::Conflicting),
            (None, None) => return Err(CredentialError::Missing),
            (Some(token), None) => Credential::Token(token),
            (None, Some(config)) => Credential::ApiToken(config),
        };
        if credential.secret().is_empty() {
            return Err(CredentialError::Empty);
        }
        Ok(credential)
    }

    pub fn secret(&self) -> &str {
        match self {
            Credential::Token(token) => token,
            Credential::ApiToken(config) => &config.api_token,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Token(_) => "project-token",
            Credential::ApiToken(_) => "api-token",
        }
    }

    /// Strips this credential's secret from `text`.
    pub fn redact(&self, text: &str) -> String {
        redact(text, self.secret())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Token(_) => f.debug_tuple("Token").field(&REDACTED).finish(),
            Credential::ApiToken(config) => f.debug_tuple("ApiToken").field(config).finish(),
        }
    }
}

/// Replaces every literal occurrence of `secret` in `text` with [`REDACTED`].
///
/// The output never contains `secret`. When the placeholder itself would
/// recreate the secret at a boundary, occurrences are removed instead.
/// An empty secret leaves the text untouched.
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    let replaced = text.replace(secret, REDACTED);
    if !replaced.contains(secret) {
        return replaced;
    }
    let mut stripped = text.to_string();
    while stripped.contains(secret) {
        stripped = stripped.replace(secret, "");
    }
    stripped
}
