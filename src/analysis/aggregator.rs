//! Review aggregation and statistics.
//!
//! Joins reviews to their targets, narrows them to a category, and builds
//! the ranking and per-target drill-down shown on the results page.

use crate::models::{Rating, Review, ReviewId, Role, Target, TargetId, ValidationError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A review joined with the target it was written about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredReview {
    pub review_id: ReviewId,
    pub target_id: TargetId,
    pub name: String,
    pub role: Role,
    pub department: String,
    pub rating: Rating,
    pub comment: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Which targets the ranking covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Role),
}

impl CategoryFilter {
    pub fn matches(&self, role: Role) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == role,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All"),
            CategoryFilter::Only(role) => write!(f, "{}", role),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

impl Serialize for CategoryFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One line of the ranking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub name: String,
    pub average: f64,
    pub reviews: usize,
    pub role: Role,
    pub department: String,
}

/// Every review of one target, newest first, with headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetDetail {
    pub name: String,
    pub average: f64,
    pub reviews: usize,
    pub comments: Vec<ScoredReview>,
}

/// Inner join of reviews to targets on `target_id`.
///
/// Reviews whose target is missing are dropped. Output keeps review order.
pub fn join_reviews(targets: &[Target], reviews: &[Review]) -> Vec<ScoredReview> {
    let by_id: HashMap<TargetId, &Target> = targets.iter().map(|t| (t.id, t)).collect();

    reviews
        .iter()
        .filter_map(|review| {
            let target = by_id.get(&review.target_id)?;
            Some(ScoredReview {
                review_id: review.id,
                target_id: target.id,
                name: target.name.clone(),
                role: target.role,
                department: target.department.clone(),
                rating: review.rating,
                comment: review.comment.clone(),
                created_at: review.created_at,
            })
        })
        .collect()
}

/// Distinct target roles, in order of first appearance.
pub fn categories(targets: &[Target]) -> Vec<Role> {
    let mut seen = Vec::new();
    for target in targets {
        if !seen.contains(&target.role) {
            seen.push(target.role);
        }
    }
    seen
}

/// Keep only rows whose target matches the filter.
pub fn filter_by_category(rows: Vec<ScoredReview>, filter: CategoryFilter) -> Vec<ScoredReview> {
    rows.into_iter().filter(|r| filter.matches(r.role)).collect()
}

/// Group rows by target name and rank the groups.
///
/// Role and department come from the first row of each group. Groups are
/// ordered by review count, then average (both descending), then name.
pub fn build_ranking(rows: &[ScoredReview]) -> Vec<RankingEntry> {
    struct Group<'a> {
        first: &'a ScoredReview,
        total: u64,
        count: usize,
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.name.as_str()).or_insert_with(|| {
            groups.push(Group {
                first: row,
                total: 0,
                count: 0,
            });
            groups.len() - 1
        });
        groups[slot].total += u64::from(row.rating.value());
        groups[slot].count += 1;
    }

    let mut ranking: Vec<RankingEntry> = groups
        .into_iter()
        .map(|g| RankingEntry {
            name: g.first.name.clone(),
            average: g.total as f64 / g.count as f64,
            reviews: g.count,
            role: g.first.role,
            department: g.first.department.clone(),
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.reviews
            .cmp(&a.reviews)
            .then_with(|| b.average.partial_cmp(&a.average).unwrap_or(Ordering::Equal))
            .then_with(|| a.name.cmp(&b.name))
    });

    ranking
}

/// Reviews of the target called `name`, newest first.
///
/// Rows without a timestamp go last. Returns `None` when nothing matches.
pub fn target_detail(rows: &[ScoredReview], name: &str) -> Option<TargetDetail> {
    let mut comments: Vec<ScoredReview> = rows.iter().filter(|r| r.name == name).cloned().collect();
    if comments.is_empty() {
        return None;
    }

    comments.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let total: u64 = comments.iter().map(|r| u64::from(r.rating.value())).sum();
    let reviews = comments.len();

    Some(TargetDetail {
        name: name.to_string(),
        average: total as f64 / reviews as f64,
        reviews,
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn target(id: TargetId, name: &str, role: Role, department: &str) -> Target {
        Target {
            id,
            name: name.to_string(),
            role,
            department: department.to_string(),
        }
    }

    fn review(id: ReviewId, target_id: TargetId, rating: i64, day: Option<u32>) -> Review {
        Review {
            id,
            target_id,
            rating: Rating::new(rating).unwrap(),
            comment: format!("review {}", id),
            created_at: day.map(|d| Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap()),
        }
    }

    fn sample_targets() -> Vec<Target> {
        vec![
            target(1, "Ana", Role::Professor, "COMP"),
            target(2, "Bandejão", Role::PlaceOrFood, "H8"),
            target(3, "Carlos", Role::Student, "MEC"),
            target(4, "Dora", Role::Professor, "FIS"),
        ]
    }

    fn sample_reviews() -> Vec<Review> {
        vec![
            review(1, 1, 5, Some(1)),
            review(2, 2, 2, Some(2)),
            review(3, 1, 4, Some(3)),
            review(4, 2, 1, Some(4)),
            review(5, 3, 5, Some(5)),
            review(6, 99, 5, Some(6)),
            review(7, 2, 3, None),
        ]
    }

    #[test]
    fn test_join_drops_orphans() {
        let rows = join_reviews(&sample_targets(), &sample_reviews());

        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.target_id != 99));
        assert_eq!(rows[0].name, "Ana");
        assert_eq!(rows[1].department, "H8");
    }

    #[test]
    fn test_categories_in_first_seen_order() {
        let roles = categories(&sample_targets());
        assert_eq!(roles, vec![Role::Professor, Role::PlaceOrFood, Role::Student]);
    }

    #[test]
    fn test_ranking_orders_by_count_then_average() {
        let rows = join_reviews(&sample_targets(), &sample_reviews());
        let ranking = build_ranking(&rows);

        let names: Vec<&str> = ranking.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Bandejão", "Ana", "Carlos"]);

        assert_eq!(ranking[0].reviews, 3);
        assert!((ranking[0].average - 2.0).abs() < f64::EPSILON);
        assert_eq!(ranking[1].reviews, 2);
        assert!((ranking[1].average - 4.5).abs() < f64::EPSILON);
        assert_eq!(ranking[2].role, Role::Student);
    }

    #[test]
    fn test_ranking_ties_break_on_name() {
        let targets = vec![
            target(1, "Zeca", Role::Other, ""),
            target(2, "Bia", Role::Other, ""),
        ];
        let reviews = vec![review(1, 1, 4, None), review(2, 2, 4, None)];

        let ranking = build_ranking(&join_reviews(&targets, &reviews));
        assert_eq!(ranking[0].name, "Bia");
        assert_eq!(ranking[1].name, "Zeca");
    }

    #[test]
    fn test_same_name_targets_share_a_row() {
        let targets = vec![
            target(1, "Ana", Role::Professor, "COMP"),
            target(2, "Ana", Role::Student, "MAT"),
        ];
        let reviews = vec![review(1, 2, 2, None), review(2, 1, 4, None)];

        let ranking = build_ranking(&join_reviews(&targets, &reviews));
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].reviews, 2);
        assert_eq!(ranking[0].role, Role::Student);
        assert_eq!(ranking[0].department, "MAT");
    }

    #[test]
    fn test_category_filter() {
        let rows = join_reviews(&sample_targets(), &sample_reviews());
        let professors = filter_by_category(rows.clone(), CategoryFilter::Only(Role::Professor));
        assert_eq!(professors.len(), 2);

        let staff = filter_by_category(rows.clone(), CategoryFilter::Only(Role::Staff));
        assert!(build_ranking(&staff).is_empty());

        assert_eq!(filter_by_category(rows, CategoryFilter::All).len(), 6);
    }

    #[test]
    fn test_category_filter_parsing() {
        assert_eq!("All".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!("".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "Aluno".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Role::Student))
        );
        assert!("nobody".parse::<CategoryFilter>().is_err());
        assert_eq!(CategoryFilter::Only(Role::Staff).to_string(), "Funcionário");
    }

    #[test]
    fn test_detail_newest_first_unknown_dates_last() {
        let rows = join_reviews(&sample_targets(), &sample_reviews());
        let detail = target_detail(&rows, "Bandejão").unwrap();

        let ids: Vec<ReviewId> = detail.comments.iter().map(|r| r.review_id).collect();
        assert_eq!(ids, vec![4, 2, 7]);
        assert_eq!(detail.reviews, 3);
        assert!((detail.average - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detail_for_unknown_name() {
        let rows = join_reviews(&sample_targets(), &sample_reviews());
        assert!(target_detail(&rows, "Dora").is_none());
    }
}
