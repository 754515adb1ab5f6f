//! Markdown and JSON rendering of the ranking for the terminal.

use crate::analysis::{Dashboard, RankingEntry, RankingView, TargetDetail};
use crate::models::{format_review_date, Target};
use anyhow::Result;

/// Render the whole dashboard: ranking table or the matching empty state.
pub fn generate_markdown_dashboard(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    output.push_str("# 📊 Review Dashboard\n\n");

    match dashboard {
        Dashboard::NoTargets => output.push_str("> ⚠️ No targets registered yet.\n\n"),
        Dashboard::NoReviews => output.push_str("> ℹ️ There are no reviews yet.\n\n"),
        Dashboard::Ready(view) => output.push_str(&generate_ranking_section(view)),
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the ranking section for one category.
fn generate_ranking_section(view: &RankingView) -> String {
    let mut section = String::new();

    section.push_str(&format!("## 🏆 Ranking ({})\n\n", view.filter));

    if view.ranking.is_empty() {
        section.push_str("> ⚠️ No data in this category.\n\n");
        return section;
    }

    section.push_str("| # | Name | Average | Reviews | Department |\n");
    section.push_str("|---:|:---|:---:|:---:|:---|\n");

    for (position, entry) in view.ranking.iter().enumerate() {
        section.push_str(&generate_ranking_row(position + 1, entry));
    }
    section.push('\n');

    if view.categories.len() > 1 {
        let labels: Vec<String> = view.categories.iter().map(|r| r.to_string()).collect();
        section.push_str(&format!("*Categories: All, {}*\n\n", labels.join(", ")));
    }

    section
}

fn generate_ranking_row(position: usize, entry: &RankingEntry) -> String {
    format!(
        "| {} | {} | {:.2} | {} | {} |\n",
        position,
        escape_cell(&entry.name),
        entry.average,
        entry.reviews,
        escape_cell(&entry.department)
    )
}

/// Render the drill-down for one target as a chat-style comment list.
pub fn generate_markdown_detail(detail: &TargetDetail) -> String {
    let mut output = String::new();

    output.push_str(&format!("# 🔎 {}\n\n", detail.name));
    output.push_str(&format!("- **Average rating:** {:.2}\n", detail.average));
    output.push_str(&format!("- **Total reviews:** {}\n\n", detail.reviews));

    output.push_str("## 💬 Latest comments\n\n");

    for review in &detail.comments {
        output.push_str(&format!(
            "**{}/5** {} — {}\n",
            review.rating,
            review.rating.tone().emoji(),
            review.comment
        ));
        match format_review_date(review.created_at) {
            Some(date) => output.push_str(&format!("*On {}*\n\n", date)),
            None => output.push_str("*Unknown date*\n\n"),
        }
    }

    output.push_str(&generate_footer());

    output
}

/// Render the list of registered targets.
pub fn generate_targets_table(targets: &[Target]) -> String {
    if targets.is_empty() {
        return "Nobody registered yet. Run `rateboard register` first!\n".to_string();
    }

    let mut table = String::new();
    table.push_str("| ID | Name | Category | Department |\n");
    table.push_str("|---:|:---|:---|:---|\n");

    for target in targets {
        table.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            target.id,
            escape_cell(&target.name),
            target.role,
            escape_cell(&target.department)
        ));
    }

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Generated by rateboard*\n".to_string()
}

/// Keep free text from breaking table columns.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON dashboard.
pub fn generate_json_dashboard(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

/// Generate a JSON drill-down.
pub fn generate_json_detail(detail: &TargetDetail) -> Result<String> {
    serde_json::to_string_pretty(detail).map_err(Into::into)
}
