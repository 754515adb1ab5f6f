//! Web dashboard: the evaluate page (register + review forms) and the
//! results page (ranking + drill-down), rendered with Askama templates.

mod templates;

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::analysis::{load_dashboard, CategoryFilter, Dashboard};
use crate::models::{NewReview, NewTarget, Rating, Role, TargetId, ValidationError};
use crate::store::Store;
use templates::*;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

/// Failures that end a request with an error page instead of a notice.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!("{}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Wraps an Askama template so handlers can return it directly.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: askama::Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => axum::response::Html(html).into_response(),
            Err(err) => WebError::from(err).into_response(),
        }
    }
}

/// Creates the dashboard router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/evaluate") }))
        .route("/evaluate", get(evaluate_page))
        .route("/evaluate/register", post(register_target))
        .route("/evaluate/review", post(submit_review))
        .route("/results", get(results_page))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

// ============================================
// Evaluate page
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct EvaluateQuery {
    #[serde(default)]
    pub tab: Option<String>,
}

/// Fields arrive as raw text so that bad input becomes a notice, not a 422.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub role: String,
    pub department: String,
}

impl RegisterForm {
    fn to_new_target(&self) -> Result<NewTarget, ValidationError> {
        let role = self.role.parse::<Role>()?;
        NewTarget::new(&self.name, role, &self.department)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub target_id: String,
    pub rating: String,
    pub comment: String,
}

impl ReviewForm {
    fn target_id(&self) -> Option<TargetId> {
        self.target_id.trim().parse().ok()
    }

    fn to_new_review(&self) -> Result<NewReview, ValidationError> {
        let target_id = self.target_id().ok_or(ValidationError::TargetRequired)?;
        let rating = self.rating.parse::<Rating>()?;
        Ok(NewReview::new(target_id, rating, &self.comment))
    }
}

/// What the evaluate page should show besides the forms.
struct EvaluateContext {
    register_tab: bool,
    notice: Option<Notice>,
    draft: Option<RegisterForm>,
    selected_target: Option<TargetId>,
}

async fn evaluate_page(
    State(state): State<AppState>,
    Query(query): Query<EvaluateQuery>,
) -> HtmlTemplate<EvaluateTemplate> {
    let register_tab = query.tab.as_deref() == Some("register");

    render_evaluate(
        &state,
        EvaluateContext {
            register_tab,
            notice: None,
            draft: None,
            selected_target: None,
        },
    )
    .await
}

async fn register_target(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> HtmlTemplate<EvaluateTemplate> {
    let (notice, keep_draft) = match form.to_new_target() {
        Err(e @ (ValidationError::NameRequired | ValidationError::RoleRequired)) => {
            (Notice::warning(e.to_string()), true)
        }
        Err(e) => (Notice::error(format!("Failed to register: {}", e)), true),
        Ok(new_target) => match state.store.insert_target(&new_target).await {
            Ok(target) => {
                info!("Registered target {} ({})", target.id, target.name);
                (
                    Notice::success(format!("{} registered successfully!", target.name)),
                    false,
                )
            }
            Err(e) => {
                warn!("Failed to register {}: {}", new_target.name, e);
                (Notice::error(format!("Failed to register: {}", e)), true)
            }
        },
    };

    render_evaluate(
        &state,
        EvaluateContext {
            register_tab: true,
            notice: Some(notice),
            draft: keep_draft.then_some(form),
            selected_target: None,
        },
    )
    .await
}

async fn submit_review(
    State(state): State<AppState>,
    Form(form): Form<ReviewForm>,
) -> HtmlTemplate<EvaluateTemplate> {
    let notice = match form.to_new_review() {
        Err(e) => Notice::error(format!("Failed to submit: {}", e)),
        Ok(review) => match state.store.insert_review(&review).await {
            Ok(stored) => {
                info!(
                    "Stored review {} ({}/5) for target {}",
                    stored.id, stored.rating, stored.target_id
                );
                Notice::success("Review submitted! 🚀")
            }
            Err(e) => {
                warn!("Failed to store review for {}: {}", review.target_id, e);
                Notice::error(format!("Failed to submit: {}", e))
            }
        },
    };

    render_evaluate(
        &state,
        EvaluateContext {
            register_tab: false,
            notice: Some(notice),
            draft: None,
            selected_target: form.target_id(),
        },
    )
    .await
}

async fn render_evaluate(state: &AppState, ctx: EvaluateContext) -> HtmlTemplate<EvaluateTemplate> {
    let (targets, load_error) = if ctx.register_tab {
        (Vec::new(), None)
    } else {
        match state.store.list_targets().await {
            Ok(targets) => (TargetOption::from_targets(&targets, ctx.selected_target), None),
            Err(e) => {
                warn!("Failed to load targets: {}", e);
                (Vec::new(), Some(e.to_string()))
            }
        }
    };

    let show_empty_hint = !ctx.register_tab && load_error.is_none() && targets.is_empty();
    let (draft_name, draft_department) = ctx
        .draft
        .map(|d| (d.name, d.department))
        .unwrap_or_default();

    HtmlTemplate(EvaluateTemplate {
        active_nav: "evaluate",
        notice: ctx.notice,
        register_tab: ctx.register_tab,
        roles: Role::ALL.iter().map(|r| r.label()).collect(),
        draft_name,
        draft_department,
        targets,
        load_error,
        show_empty_hint,
        min_rating: Rating::MIN,
        max_rating: Rating::MAX,
        default_rating: Rating::default().value(),
    })
}

// ============================================
// Results page
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

async fn results_page(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> HtmlTemplate<ResultsTemplate> {
    let filter = match query.category.as_deref().map(str::parse::<CategoryFilter>) {
        None => CategoryFilter::All,
        Some(Ok(filter)) => filter,
        Some(Err(e)) => {
            warn!("Ignoring category filter: {}", e);
            CategoryFilter::All
        }
    };

    let page = match load_dashboard(state.store.as_ref(), filter).await {
        Err(e) => {
            error!("Failed to load results: {}", e);
            ResultsTemplate::notice_only(Notice::error(format!("Failed to load data: {}", e)))
        }
        Ok(Dashboard::NoTargets) => {
            ResultsTemplate::notice_only(Notice::warning("No targets registered yet."))
        }
        Ok(Dashboard::NoReviews) => {
            ResultsTemplate::notice_only(Notice::info("There are no reviews yet."))
        }
        Ok(Dashboard::Ready(view)) => ResultsTemplate::from_view(&view, query.target.as_deref()),
    };

    HtmlTemplate(page)
}
