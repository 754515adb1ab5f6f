//! Askama page templates and the view rows they render.

use crate::analysis::{RankingEntry, RankingView, ScoredReview, TargetDetail};
use crate::models::{format_review_date, Rating, Target, TargetId};
use askama::Template;

/// Banner shown at the top of a page after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.kind {
            NoticeKind::Success => "notice-success",
            NoticeKind::Info => "notice-info",
            NoticeKind::Warning => "notice-warning",
            NoticeKind::Error => "notice-error",
        }
    }
}

// ============================================
// Evaluate page
// ============================================

#[derive(Template)]
#[template(path = "evaluate.html")]
pub struct EvaluateTemplate {
    pub active_nav: &'static str,
    pub notice: Option<Notice>,
    pub register_tab: bool,
    pub roles: Vec<&'static str>,
    pub draft_name: String,
    pub draft_department: String,
    pub targets: Vec<TargetOption>,
    pub load_error: Option<String>,
    pub show_empty_hint: bool,
    pub min_rating: u8,
    pub max_rating: u8,
    pub default_rating: u8,
}

/// Entry of the "who do you want to review" select box.
#[derive(Debug, Clone)]
pub struct TargetOption {
    pub id: TargetId,
    pub label: String,
    pub selected: bool,
}

impl TargetOption {
    /// Build options for every target, preselecting `selected` when given.
    pub fn from_targets(targets: &[Target], selected: Option<TargetId>) -> Vec<Self> {
        targets
            .iter()
            .map(|t| TargetOption {
                id: t.id,
                label: if t.department.is_empty() {
                    t.name.clone()
                } else {
                    format!("{} ({})", t.name, t.department)
                },
                selected: Some(t.id) == selected,
            })
            .collect()
    }
}

// ============================================
// Results page
// ============================================

#[derive(Template)]
#[template(path = "results.html")]
pub struct ResultsTemplate {
    pub active_nav: &'static str,
    pub notice: Option<Notice>,
    pub has_ranking_view: bool,
    pub category_label: String,
    pub category_options: Vec<CategoryOption>,
    pub ranking: Vec<RankingRow>,
    pub detail: Option<DetailView>,
}

#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub value: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct RankingRow {
    pub name: String,
    pub average: String,
    pub reviews: usize,
    pub department: String,
    pub color: String,
}

impl From<&RankingEntry> for RankingRow {
    fn from(entry: &RankingEntry) -> Self {
        Self {
            name: entry.name.clone(),
            average: format!("{:.2}", entry.average),
            reviews: entry.reviews,
            department: entry.department.clone(),
            color: rating_color(entry.average),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetailView {
    pub name: String,
    pub average: String,
    pub reviews: usize,
    pub comments: Vec<CommentRow>,
}

impl From<TargetDetail> for DetailView {
    fn from(detail: TargetDetail) -> Self {
        Self {
            name: detail.name,
            average: format!("{:.2}", detail.average),
            reviews: detail.reviews,
            comments: detail.comments.iter().map(CommentRow::from).collect(),
        }
    }
}

/// One chat bubble in the drill-down.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub rating: u8,
    pub emoji: &'static str,
    pub text: String,
    pub when: String,
}

impl From<&ScoredReview> for CommentRow {
    fn from(review: &ScoredReview) -> Self {
        Self {
            rating: review.rating.value(),
            emoji: review.rating.tone().emoji(),
            text: review.comment.clone(),
            when: match format_review_date(review.created_at) {
                Some(date) => format!("On {}", date),
                None => "Unknown date".to_string(),
            },
        }
    }
}

impl ResultsTemplate {
    /// A results page with only a banner (empty states and load failures).
    pub fn notice_only(notice: Notice) -> Self {
        Self {
            active_nav: "results",
            notice: Some(notice),
            has_ranking_view: false,
            category_label: String::new(),
            category_options: Vec::new(),
            ranking: Vec::new(),
            detail: None,
        }
    }

    /// Full results page for a ranking view and the selected target.
    pub fn from_view(view: &RankingView, selected: Option<&str>) -> Self {
        let category_label = view.filter.to_string();

        let mut category_options = vec![CategoryOption {
            value: "All".to_string(),
            selected: category_label == "All",
        }];
        category_options.extend(view.categories.iter().map(|role| CategoryOption {
            value: role.to_string(),
            selected: role.label() == category_label,
        }));

        Self {
            active_nav: "results",
            notice: None,
            has_ranking_view: true,
            category_options,
            ranking: view.ranking.iter().map(RankingRow::from).collect(),
            detail: view
                .selection(selected)
                .and_then(|name| view.detail(name))
                .map(DetailView::from),
            category_label,
        }
    }
}

/// Red-yellow-green background for an average on the rating scale.
pub fn rating_color(average: f64) -> String {
    let min = f64::from(Rating::MIN);
    let max = f64::from(Rating::MAX);
    let ratio = ((average - min) / (max - min)).clamp(0.0, 1.0);
    let hue = (ratio * 120.0).round() as u32;
    format!("hsl({}, 70%, 75%)", hue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_color_scale() {
        assert_eq!(rating_color(1.0), "hsl(0, 70%, 75%)");
        assert_eq!(rating_color(3.0), "hsl(60, 70%, 75%)");
        assert_eq!(rating_color(5.0), "hsl(120, 70%, 75%)");
        assert_eq!(rating_color(9.0), "hsl(120, 70%, 75%)");
    }

    #[test]
    fn test_target_option_labels() {
        let targets = vec![
            Target {
                id: 1,
                name: "Ana".to_string(),
                role: crate::models::Role::Professor,
                department: "COMP".to_string(),
            },
            Target {
                id: 2,
                name: "RU".to_string(),
                role: crate::models::Role::PlaceOrFood,
                department: String::new(),
            },
        ];

        let options = TargetOption::from_targets(&targets, Some(2));
        assert_eq!(options[0].label, "Ana (COMP)");
        assert_eq!(options[1].label, "RU");
        assert!(!options[0].selected);
        assert!(options[1].selected);
    }
}
