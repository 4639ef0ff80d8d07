//! Exercise catalog pages
//!
//! - GET / - paginated list, ordered by title
//! - GET /exercise/{id} - detail with every comment

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::forms::{CommentForm, ContactForm, FieldErrors};
use crate::web::middleware::{parse_id, AppState, Viewer, WebError};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Response, WebError> {
    let page = state
        .exercise_service
        .list_page(query.page.as_deref(), state.site.page_size)
        .await?;

    let mut context = TeraContext::new();
    context.insert("exercises", &page.items);
    context.insert("page_obj", &page.page_info());
    context.insert("contact_form", &ContactForm::default());
    context.insert("errors", &FieldErrors::new());
    Ok(viewer.render(&state, "exercises/list.html", context))
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let id = parse_id(&id)?;
    let exercise = state.exercise_service.get(id).await?;
    let comments = state.comment_service.comments_for(exercise.id).await?;

    let mut context = TeraContext::new();
    context.insert("comment_count", &comments.len());
    context.insert("exercise", &exercise);
    context.insert("comments", &comments);
    context.insert("comment_form", &CommentForm::default());
    Ok(viewer.render(&state, "exercises/detail.html", context))
}
