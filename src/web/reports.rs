//! Comment reporting
//!
//! Serves both page navigation and page script. Script callers send
//! `X-Requested-With: XMLHttpRequest`; they get the bare form fragment and
//! JSON answers, including a JSON 403 when not signed in.

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde_json::json;
use tera::Context as TeraContext;

use crate::forms::{FieldErrors, ReportForm};
use crate::models::User;
use crate::services::ReportServiceError;
use crate::web::middleware::{is_programmatic, parse_id, AppState, Viewer, WebError};

pub const REPORTED: &str = "Comment reported successfully!";
pub const REPORT_FAILED: &str = "Error reporting comment";

/// The signed-in user, or the response sending anonymous callers to login
fn reporter(state: &AppState, viewer: &Viewer, headers: &HeaderMap) -> Result<User, Response> {
    match &viewer.user {
        Some(user) => Ok(user.clone()),
        None if is_programmatic(headers) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "redirect_url": state.site.login_url })),
        )
            .into_response()),
        None => Err(Redirect::to(&state.site.login_url).into_response()),
    }
}

pub async fn show(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    if let Err(response) = reporter(&state, &viewer, &headers) {
        return Ok(response);
    }
    let comment = state.report_service.comment_for_report(parse_id(&id)?).await?;

    let mut context = TeraContext::new();
    context.insert("comment", &comment);
    context.insert("form", &ReportForm::default());
    context.insert("errors", &FieldErrors::new());

    let template = if is_programmatic(&headers) {
        "exercises/_report_form.html"
    } else {
        "exercises/report_comment_form.html"
    };
    Ok(viewer.render(&state, template, context))
}

pub async fn submit(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    Path(id): Path<String>,
    form: Result<Form<ReportForm>, FormRejection>,
) -> Result<Response, WebError> {
    let user = match reporter(&state, &viewer, &headers) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let form = form.map(|Form(form)| form).unwrap_or_default();

    match state.report_service.report(parse_id(&id)?, user.id, &form).await {
        Ok(_) => Ok(Json(json!({ "message": REPORTED })).into_response()),
        Err(ReportServiceError::ValidationError(_)) => {
            Ok((StatusCode::BAD_REQUEST, Json(json!({ "message": REPORT_FAILED }))).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
