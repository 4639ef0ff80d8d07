//! Web middleware and shared request plumbing
//!
//! Contains:
//! - Application state
//! - Session authentication (`optional_auth`, `require_login`, `require_staff`)
//! - The [`Viewer`] extractor used to render pages
//! - [`WebError`] and the middleware that turns it into branded error pages

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::admin::{AdminError, AdminSite};
use crate::config::SiteConfig;
use crate::models::User;
use crate::services::{
    CloudinaryUrlBuilder, CommentService, CommentServiceError, ContactService, ExerciseService,
    ExerciseServiceError, ReportService, ReportServiceError, UserService,
};
use crate::theme::ThemeEngine;
use crate::web::notice::{clear_notice, cookie_value, Notice};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<SiteConfig>,
    pub user_service: Arc<UserService>,
    pub exercise_service: Arc<ExerciseService>,
    pub comment_service: Arc<CommentService>,
    pub contact_service: Arc<ContactService>,
    pub report_service: Arc<ReportService>,
    pub theme: Arc<ThemeEngine>,
    pub admin: Arc<AdminSite>,
    pub images: CloudinaryUrlBuilder,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// ============================================================================
// Errors
// ============================================================================

/// Errors a handler can end with
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Marker left on error responses; `error_pages` renders the body
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                StatusCode::NOT_FOUND
            }
            WebError::Forbidden(why) => {
                tracing::info!("Forbidden: {}", why);
                StatusCode::FORBIDDEN
            }
            WebError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let mut response = (status, Html(crate::theme::simple_error_page(
            status.canonical_reason().unwrap_or("Error"),
            "Something went wrong.",
        )))
            .into_response();
        response.extensions_mut().insert(ErrorPage { status });
        response
    }
}

impl From<ExerciseServiceError> for WebError {
    fn from(e: ExerciseServiceError) -> Self {
        match e {
            ExerciseServiceError::NotFound(id) => WebError::NotFound(format!("exercise {}", id)),
            ExerciseServiceError::ValidationError(errors) => {
                WebError::Internal(anyhow::anyhow!("Unhandled validation error: {}", errors))
            }
            ExerciseServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(what) => WebError::NotFound(what),
            CommentServiceError::ValidationError(errors) => {
                WebError::Internal(anyhow::anyhow!("Unhandled validation error: {}", errors))
            }
            CommentServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<ReportServiceError> for WebError {
    fn from(e: ReportServiceError) -> Self {
        match e {
            ReportServiceError::NotFound(what) => WebError::NotFound(what),
            ReportServiceError::ValidationError(errors) => {
                WebError::Internal(anyhow::anyhow!("Unhandled validation error: {}", errors))
            }
            ReportServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<AdminError> for WebError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::NotFound(what) => WebError::NotFound(what),
            AdminError::NotAllowed(what) => WebError::NotFound(format!("operation on {}", what)),
            AdminError::ValidationError(errors) => {
                WebError::Internal(anyhow::anyhow!("Unhandled validation error: {}", errors))
            }
            AdminError::InternalError(e) => WebError::Internal(e),
        }
    }
}

/// Parse a numeric path segment; anything else is a missing page
pub fn parse_id(raw: &str) -> Result<i64, WebError> {
    raw.parse::<i64>()
        .map_err(|_| WebError::NotFound(format!("id {}", raw)))
}

/// Fallback handler for unmatched routes
pub async fn not_found() -> WebError {
    WebError::NotFound("route".to_string())
}

/// Render branded pages for responses produced by [`WebError`]
pub async fn error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let viewer = Viewer::from_request(&request);
    let mut response = next.run(request).await;

    let status = match response.extensions().get::<ErrorPage>() {
        Some(page) => page.status,
        None => return response,
    };

    let (template, message) = match status {
        StatusCode::NOT_FOUND => ("404.html", "The page you were looking for does not exist."),
        StatusCode::FORBIDDEN => ("error.html", "You do not have permission to view this page."),
        _ => ("error.html", "Something went wrong on our end. Please try again later."),
    };

    let mut context = TeraContext::new();
    context.insert("status", &status.as_u16());
    context.insert("error_message", message);
    let html = state
        .theme
        .render_with_fallback(template, &viewer.context(&state, context));
    *response.body_mut() = axum::body::Body::from(html);
    response.headers_mut().remove(header::CONTENT_LENGTH);
    if viewer.incoming.is_some() {
        clear_notice(&mut response);
    }
    response
}

// ============================================================================
// Authentication
// ============================================================================

/// Session token from the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, "session")
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Attach the signed-in user, if any, to the request
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Redirect to the login page, remembering where to come back to
pub fn login_redirect(login_url: &str, next: &str) -> Response {
    let target = format!("{}?next={}", login_url, urlencoding::encode(next));
    Redirect::to(&target).into_response()
}

fn path_and_query(request: &Request) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Signed-in users only; others are sent to the login page
pub async fn require_login(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return login_redirect(&state.site.login_url, &path_and_query(&request));
    }
    next.run(request).await
}

/// Staff only; anonymous users go to login, members get a 403 page
pub async fn require_staff(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthenticatedUser>() {
        None => login_redirect(&state.site.login_url, &path_and_query(&request)),
        Some(AuthenticatedUser(user)) if !user.is_staff() => {
            WebError::Forbidden(format!("{} is not staff", user.username)).into_response()
        }
        Some(_) => next.run(request).await,
    }
}

// ============================================================================
// Page rendering
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct ViewerSummary<'a> {
    username: &'a str,
    is_staff: bool,
}

/// The request as the page renderer sees it: who is asking, which notice
/// is pending, and where they are.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<User>,
    incoming: Option<Notice>,
    shown: Option<Notice>,
    pub path: String,
}

impl Viewer {
    fn from_parts_ref(extensions: &axum::http::Extensions, headers: &HeaderMap, path: &str) -> Self {
        let incoming = Notice::from_headers(headers);
        Self {
            user: extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
            shown: incoming.clone(),
            incoming,
            path: path.to_string(),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        Self::from_parts_ref(request.extensions(), request.headers(), request.uri().path())
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Show `notice` on the page being rendered instead of the pending one
    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.shown = Some(notice);
        self
    }

    /// Template context with the variables every page uses
    pub fn context(&self, state: &AppState, mut context: TeraContext) -> TeraContext {
        context.insert("site_name", &state.site.name);
        context.insert("login_url", &state.site.login_url);
        context.insert("request_path", &self.path);
        context.insert(
            "current_user",
            &self.user.as_ref().map(|u| ViewerSummary {
                username: &u.username,
                is_staff: u.is_staff(),
            }),
        );
        context.insert("notice", &self.shown);
        context
    }

    pub fn render(&self, state: &AppState, template: &str, context: TeraContext) -> Response {
        self.render_status(state, StatusCode::OK, template, context)
    }

    /// Render a page; a pending notice cookie is cleared since it was shown
    pub fn render_status(
        &self,
        state: &AppState,
        status: StatusCode,
        template: &str,
        context: TeraContext,
    ) -> Response {
        let html = state
            .theme
            .render_with_fallback(template, &self.context(state, context));
        let mut response = (status, Html(html)).into_response();
        if self.incoming.is_some() {
            clear_notice(&mut response);
        }
        response
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts_ref(&parts.extensions, &parts.headers, parts.uri.path()))
    }
}

/// The signed-in user. Only used behind `require_login` or `require_staff`.
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .map(|u| CurrentUser(u.0.clone()))
            .ok_or_else(|| WebError::Forbidden("authentication required".to_string()))
    }
}

/// Whether the request was made by page script rather than navigation
pub fn is_programmatic(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}

/// Cookie starting a session
pub fn session_cookie(token: &str, max_age_secs: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age_secs
    ))
    .ok()
}

pub const CLEAR_SESSION_COOKIE: &str = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";
