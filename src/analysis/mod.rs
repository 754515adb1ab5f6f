//! Analysis modules.
//!
//! [`load_dashboard`] is the one entry point the results page and the CLI
//! share: fetch both tables, join, filter and rank.

pub mod aggregator;

pub use aggregator::*;

use crate::models::{Review, Role, Target};
use crate::store::{Store, StoreError};
use serde::Serialize;
use tracing::{debug, info};

/// What there is to show on the results page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dashboard {
    /// No target has been registered.
    NoTargets,
    /// Targets exist but nobody has reviewed them yet.
    NoReviews,
    /// Ranking for the selected category; may be empty.
    Ready(RankingView),
}

/// Ranking for one category plus the rows behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingView {
    pub filter: CategoryFilter,
    pub categories: Vec<Role>,
    pub ranking: Vec<RankingEntry>,
    #[serde(skip)]
    pub rows: Vec<ScoredReview>,
}

impl RankingView {
    /// Drill-down for `name` within the current category.
    pub fn detail(&self, name: &str) -> Option<TargetDetail> {
        target_detail(&self.rows, name)
    }

    /// The name selected when the user has not picked one: the top entry.
    pub fn default_selection(&self) -> Option<&str> {
        self.ranking.first().map(|e| e.name.as_str())
    }

    /// Resolve a requested selection, falling back to the top entry when
    /// the name is absent from this ranking.
    pub fn selection<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        match requested {
            Some(name) if self.ranking.iter().any(|e| e.name == name) => Some(name),
            _ => self.default_selection(),
        }
    }
}

impl Dashboard {
    /// Build the dashboard from already-fetched tables.
    pub fn from_tables(targets: &[Target], reviews: &[Review], filter: CategoryFilter) -> Self {
        if targets.is_empty() {
            return Dashboard::NoTargets;
        }
        if reviews.is_empty() {
            return Dashboard::NoReviews;
        }

        let rows = filter_by_category(join_reviews(targets, reviews), filter);
        let ranking = build_ranking(&rows);

        Dashboard::Ready(RankingView {
            filter,
            categories: categories(targets),
            ranking,
            rows,
        })
    }
}

/// Fetch both tables concurrently and aggregate them.
pub async fn load_dashboard(
    store: &dyn Store,
    filter: CategoryFilter,
) -> Result<Dashboard, StoreError> {
    debug!("Loading dashboard from {} store ({})", store.kind(), filter);

    let (targets, reviews) = futures::try_join!(store.list_targets(), store.list_reviews())?;
    info!(
        "Fetched {} targets and {} reviews",
        targets.len(),
        reviews.len()
    );

    Ok(Dashboard::from_tables(&targets, &reviews, filter))
}
