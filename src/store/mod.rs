//! Persistence for targets and reviews.
//!
//! The board only ever inserts rows and reads whole tables back, so the
//! [`Store`] trait is four calls wide. [`PostgrestStore`] talks to the hosted
//! Supabase tables; [`MemoryStore`] keeps everything in process.

mod error;
mod memory;
mod postgrest;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use crate::config::SupabaseConfig;
use crate::models::{NewReview, NewTarget, Review, Target};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Table holding registered targets.
pub const TARGETS_TABLE: &str = "targets";

/// Table holding submitted reviews.
pub const REVIEWS_TABLE: &str = "reviews";

/// Insert and select-all access to the two tables.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short name used in log lines.
    fn kind(&self) -> &'static str;

    /// Register a target and return the stored row.
    async fn insert_target(&self, target: &NewTarget) -> Result<Target, StoreError>;

    /// All targets, in id order.
    async fn list_targets(&self) -> Result<Vec<Target>, StoreError>;

    /// Submit a review and return the stored row.
    ///
    /// Fails with [`StoreError::UnknownTarget`] when `target_id` does not
    /// resolve.
    async fn insert_review(&self, review: &NewReview) -> Result<Review, StoreError>;

    /// All reviews, in id order.
    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError>;
}

/// Build the store the settings point at.
pub fn connect(config: &SupabaseConfig, in_memory: bool) -> Result<Arc<dyn Store>, StoreError> {
    if in_memory {
        info!("Using in-memory store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let url = config.url.trim();
    let key = config.key.trim();

    if url.is_empty() || key.is_empty() {
        return Err(StoreError::Config(
            "supabase url and key are required (set [supabase] in the config file, \
             SUPABASE_URL/SUPABASE_KEY, or pass --memory)"
                .to_string(),
        ));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(StoreError::Config(format!(
            "supabase url must start with 'http://' or 'https://': {}",
            url
        )));
    }

    info!("Using Supabase store at {}", url);
    let store = PostgrestStore::new(url, key, Duration::from_secs(config.timeout_seconds))?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supabase(url: &str, key: &str) -> SupabaseConfig {
        SupabaseConfig {
            url: url.to_string(),
            key: key.to_string(),
            ..SupabaseConfig::default()
        }
    }

    #[test]
    fn test_connect_in_memory_ignores_credentials() {
        let store = connect(&supabase("", ""), true).unwrap();
        assert_eq!(store.kind(), "memory");
    }

    #[test]
    fn test_connect_requires_credentials() {
        let err = connect(&supabase("https://x.supabase.co", ""), false)
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_connect_rejects_bad_scheme() {
        let err = connect(&supabase("x.supabase.co", "key"), false)
            .err()
            .unwrap();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_connect_supabase() {
        let store = connect(&supabase("https://x.supabase.co/", "key"), false).unwrap();
        assert_eq!(store.kind(), "supabase");
    }
}
