//! In-process store.

use super::{Store, StoreError};
use crate::models::{NewReview, NewTarget, Review, ReviewId, Target, TargetId};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    targets: Vec<Target>,
    reviews: Vec<Review>,
    last_target_id: TargetId,
    last_review_id: ReviewId,
}

/// Keeps both tables in memory. Ids are sequential from 1 and reviews are
/// stamped with the insertion time, like the hosted tables do.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn insert_target(&self, target: &NewTarget) -> Result<Target, StoreError> {
        let mut tables = self.tables.write().await;
        tables.last_target_id += 1;

        let row = Target {
            id: tables.last_target_id,
            name: target.name.clone(),
            role: target.role,
            department: target.department.clone(),
        };
        tables.targets.push(row.clone());

        debug!("Stored target {} ({})", row.id, row.name);
        Ok(row)
    }

    async fn list_targets(&self) -> Result<Vec<Target>, StoreError> {
        Ok(self.tables.read().await.targets.clone())
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Review, StoreError> {
        let mut tables = self.tables.write().await;

        if !tables.targets.iter().any(|t| t.id == review.target_id) {
            return Err(StoreError::UnknownTarget(review.target_id));
        }

        tables.last_review_id += 1;
        let row = Review {
            id: tables.last_review_id,
            target_id: review.target_id,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: Some(Utc::now()),
        };
        tables.reviews.push(row.clone());

        debug!("Stored review {} for target {}", row.id, row.target_id);
        Ok(row)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError> {
        Ok(self.tables.read().await.reviews.clone())
    }
}
