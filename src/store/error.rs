//! Errors raised while talking to a store.

use crate::models::TargetId;
use thiserror::Error;

/// PostgreSQL error code for a foreign key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request to the store failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A review pointed at a target that does not exist.
    #[error("target {0} does not exist")]
    UnknownTarget(TargetId),

    /// The response body did not match the expected rows.
    #[error("could not read {table} rows: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// An insert came back without the created row.
    #[error("insert into {0} returned no row")]
    EmptyInsert(&'static str),

    /// The store cannot be built from the current settings.
    #[error("store is not configured: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the store rejected the write because of a dangling reference.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            StoreError::UnknownTarget(_) => true,
            StoreError::Api { code, .. } => code.as_deref() == Some(FOREIGN_KEY_VIOLATION),
            _ => false,
        }
    }
}
