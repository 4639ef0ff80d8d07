//! Web layer - server-rendered pages and routing
//!
//! It includes:
//! - Exercise catalog and detail pages
//! - Comment add, edit and delete
//! - Comment reporting (page and script callers)
//! - Contact form
//! - Account login, logout and signup
//! - Staff admin
//! - Embedded static assets

pub mod accounts;
pub mod admin;
pub mod comments;
pub mod contact;
pub mod exercises;
pub mod middleware;
pub mod notice;
pub mod reports;
pub mod static_files;


use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::admin::{default_registry, AdminBackend, AdminSite};
use crate::config::Config;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxContactRepository, SqlxExerciseRepository, SqlxReportRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    CloudinaryUrlBuilder, CommentService, ContactService, ExerciseService, ReportService,
    UserService,
};
use crate::theme::ThemeEngine;

pub use middleware::{AppState, Viewer, WebError};

/// Wire repositories, services, templates and the admin registry together
pub fn build_state(pool: DynDatabasePool, config: &Config) -> anyhow::Result<AppState> {
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let exercise_repo = SqlxExerciseRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let contact_repo = SqlxContactRepository::boxed(pool.clone());
    let report_repo = SqlxReportRepository::boxed(pool);

    let user_service = Arc::new(UserService::with_session_days(
        user_repo,
        session_repo,
        config.site.session_days,
    ));
    let exercise_service = Arc::new(ExerciseService::new(exercise_repo.clone()));
    let comment_service = Arc::new(CommentService::new(comment_repo.clone(), exercise_repo));
    let contact_service = Arc::new(ContactService::new(contact_repo));
    let report_service = Arc::new(ReportService::new(report_repo, comment_repo));

    let images = CloudinaryUrlBuilder::from_config(&config.images);
    let theme = ThemeEngine::new(&config.theme.path, images.clone())?;

    let admin = AdminSite::new(
        default_registry(),
        AdminBackend::new(
            exercise_service.clone(),
            comment_service.clone(),
            contact_service.clone(),
            report_service.clone(),
        ),
    );

    Ok(AppState {
        site: Arc::new(config.site.clone()),
        user_service,
        exercise_service,
        comment_service,
        contact_service,
        report_service,
        theme: Arc::new(theme),
        admin: Arc::new(admin),
        images,
    })
}

fn comment_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/exercise/{id}/comment/add",
            get(comments::add_form).post(comments::add_submit),
        )
        .route(
            "/exercise/{id}/comment/{comment_id}/edit",
            get(comments::edit_form).post(comments::edit_submit),
        )
        .route(
            "/exercise/{id}/comment/{comment_id}/delete",
            post(comments::delete),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_login,
        ))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::index))
        .route("/admin/{model}", get(admin::list))
        .route(
            "/admin/{model}/add",
            get(admin::add_form).post(admin::add_submit),
        )
        .route("/admin/{model}/{id}", get(admin::view))
        .route(
            "/admin/{model}/{id}/edit",
            get(admin::edit_form).post(admin::edit_submit),
        )
        .route(
            "/admin/{model}/{id}/delete",
            get(admin::delete_form).post(admin::delete_submit),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_staff,
        ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(exercises::list))
        .route("/exercise/{id}", get(exercises::detail))
        .route("/contact", get(contact::show).post(contact::submit))
        .route(
            "/comment/{id}/report",
            get(reports::show).post(reports::submit),
        )
        .route(
            "/accounts/login/",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route("/accounts/logout/", post(accounts::logout))
        .route(
            "/accounts/signup/",
            get(accounts::signup_form).post(accounts::signup_submit),
        )
        .route("/static/{*path}", get(static_files::serve_static))
        .merge(comment_routes(&state))
        .merge(admin_routes(&state))
        .fallback(middleware::not_found)
        // Branded error pages need the viewer, so they sit inside optional_auth
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
