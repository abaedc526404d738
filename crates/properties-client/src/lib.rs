//! Remote property store client.
//!
//! The CMS exposes two key-value property resources, one scoped to the
//! current user and one to the whole site. This crate defines the
//! [`PropertiesApi`] seam the settings engine consumes and the HTTP
//! implementation against the real endpoints.

pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;

pub use http::HttpPropertiesClient;

/// Namespace prefix owned by this toolkit on the remote property store.
pub const NAMESPACE: &str = "snipstudio";

/// Which property resource a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Properties of the currently authenticated user.
    User,
    /// Site-wide properties; writes require elevated privilege.
    Site,
}

impl Scope {
    pub fn as_path(self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Site => "site",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Flat mapping from leaf key (namespace prefix stripped) to raw JSON value.
pub type PropertyMap = HashMap<String, serde_json::Value>;

/// Unified error type for the properties-client crate.
///
/// `Unavailable` is the degradable kind: the caller falls back to a lower
/// settings layer or queues the write. `Unauthorized` is surfaced distinctly
/// and never retried.
#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
    #[error("remote property store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("unauthorized (status {status})")]
    Unauthorized { status: u16 },

    #[error("invalid session token")]
    InvalidToken,

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl PropertiesError {
    /// Whether a later retry of the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PropertiesError::Unavailable { .. })
    }
}

impl From<reqwest::Error> for PropertiesError {
    fn from(e: reqwest::Error) -> Self {
        PropertiesError::Unavailable {
            reason: e.to_string(),
        }
    }
}

/// Remote property operations the settings engine depends on.
///
/// Each call is independent and idempotent at the single-key level; the
/// store resolves concurrent writers by arrival order (last writer wins).
#[async_trait]
pub trait PropertiesApi: Send + Sync {
    /// Read all keys under the toolkit namespace.
    ///
    /// Failure is an explicit error, never an empty map, so the caller can
    /// distinguish "nothing saved yet" from "could not reach the server".
    async fn read_namespace(&self, scope: Scope) -> Result<PropertyMap, PropertiesError>;

    /// Write a single key under the toolkit namespace.
    async fn write_key(
        &self,
        scope: Scope,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PropertiesError>;

    /// Delete a single key under the toolkit namespace. Deleting an absent
    /// key succeeds.
    async fn delete_key(&self, scope: Scope, key: &str) -> Result<(), PropertiesError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_paths() {
        assert_eq!(Scope::User.as_path(), "user");
        assert_eq!(Scope::Site.as_path(), "site");
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(
            PropertiesError::Unavailable {
                reason: "connection refused".into()
            }
            .is_retryable()
        );
        assert!(!PropertiesError::Unauthorized { status: 403 }.is_retryable());
    }
}
