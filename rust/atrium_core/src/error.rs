//! Error types for access resolution and query caching.

use thiserror::Error;

/// Errors surfaced to callers of the access core.
///
/// Collaborator failures (resource store, group membership) never show up
/// here: they are absorbed as absent data and therefore as "no access".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The requesting user is not among the resolved readers of the scope.
    #[error("access denied: user {user_id} cannot read {scope}")]
    AccessDenied { user_id: String, scope: String },

    /// A scope id could not be parsed into organization/project/collection.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// A query failed structural validation.
    #[error("malformed query: {0}")]
    MalformedQuery(String),
}

pub type Result<T> = std::result::Result<T, AccessError>;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
