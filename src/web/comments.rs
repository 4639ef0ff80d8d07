//! Comment workflows on the exercise pages
//!
//! All routes here sit behind `require_login`.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tera::Context as TeraContext;

use crate::forms::{CommentForm, FieldErrors};
use crate::models::{Comment, Exercise};
use crate::services::{CommentServiceError, DeleteOutcome};
use crate::web::middleware::{parse_id, AppState, CurrentUser, Viewer, WebError};
use crate::web::notice::{redirect_with_notice, Notice};

pub const COMMENT_ADDED: &str = "Your comment has been added and is awaiting approval.";
pub const COMMENT_DELETED: &str = "Comment deleted!";
pub const NOT_YOUR_COMMENT: &str = "You can only delete your own comments!";

pub fn detail_url(exercise_id: i64) -> String {
    format!("/exercise/{}", exercise_id)
}

fn add_form_page(
    state: &AppState,
    viewer: &Viewer,
    exercise: &Exercise,
    form: &CommentForm,
    errors: &FieldErrors,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("exercise", exercise);
    context.insert("form", form);
    context.insert("errors", errors);
    viewer.render(state, "exercises/add_comment.html", context)
}

fn edit_form_page(
    state: &AppState,
    viewer: &Viewer,
    exercise: &Exercise,
    comment: &Comment,
    form: &CommentForm,
    errors: &FieldErrors,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("exercise", exercise);
    context.insert("comment", comment);
    context.insert("form", form);
    context.insert("errors", errors);
    viewer.render(state, "exercises/edit_comment.html", context)
}

pub async fn add_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let exercise = state.exercise_service.get(parse_id(&id)?).await?;
    Ok(add_form_page(&state, &viewer, &exercise, &CommentForm::default(), &FieldErrors::new()))
}

pub async fn add_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, WebError> {
    let exercise_id = parse_id(&id)?;
    match state.comment_service.add(exercise_id, user.id, &form).await {
        Ok(_) => Ok(redirect_with_notice(&detail_url(exercise_id), Notice::success(COMMENT_ADDED))),
        Err(CommentServiceError::ValidationError(errors)) => {
            let exercise = state.exercise_service.get(exercise_id).await?;
            Ok(add_form_page(&state, &viewer, &exercise, &form, &errors))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let (exercise, comment) = state
        .comment_service
        .get_pair(parse_id(&id)?, parse_id(&comment_id)?)
        .await?;
    let form = CommentForm {
        body: comment.body.clone(),
    };
    Ok(edit_form_page(&state, &viewer, &exercise, &comment, &form, &FieldErrors::new()))
}

pub async fn edit_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((id, comment_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, WebError> {
    let (exercise_id, comment_id) = (parse_id(&id)?, parse_id(&comment_id)?);
    match state.comment_service.edit(exercise_id, comment_id, &form).await {
        Ok(_) => Ok(Redirect::to(&detail_url(exercise_id)).into_response()),
        Err(CommentServiceError::ValidationError(errors)) => {
            let (exercise, comment) = state.comment_service.get_pair(exercise_id, comment_id).await?;
            Ok(edit_form_page(&state, &viewer, &exercise, &comment, &form, &errors))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let (exercise_id, comment_id) = (parse_id(&id)?, parse_id(&comment_id)?);
    let notice = match state
        .comment_service
        .delete(exercise_id, comment_id, user.id)
        .await?
    {
        DeleteOutcome::Deleted => Notice::success(COMMENT_DELETED),
        DeleteOutcome::NotOwner => Notice::error(NOT_YOUR_COMMENT),
    };
    Ok(redirect_with_notice(&detail_url(exercise_id), notice))
}
