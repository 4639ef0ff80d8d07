//! Staff administration pages
//!
//! One set of handlers serves every record type in the admin registry.
//! Operations a registration does not list answer with the 404 page.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Form,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::admin::{
    apply, filter_options, with_errors, AdminError, AdminQuery, Cell, FormField, ModelAdmin,
    Operation, Row,
};
use crate::forms::{FieldErrors, NON_FIELD};
use crate::services::CloudinaryUrlBuilder;
use crate::web::middleware::{parse_id, AppState, Viewer, WebError};
use crate::web::notice::{redirect_with_notice, Notice};

#[derive(Debug, Serialize)]
struct ModelView {
    slug: &'static str,
    name: &'static str,
    singular: &'static str,
    can_create: bool,
    can_edit: bool,
    can_delete: bool,
}

impl From<&ModelAdmin> for ModelView {
    fn from(model: &ModelAdmin) -> Self {
        Self {
            slug: model.slug,
            name: model.name,
            singular: model.singular,
            can_create: model.allows(Operation::Create),
            can_edit: model.allows(Operation::Edit),
            can_delete: model.allows(Operation::Delete),
        }
    }
}

/// A cell ready for the template
#[derive(Debug, Serialize, PartialEq, Eq)]
struct CellView {
    kind: &'static str,
    text: String,
    url: Option<String>,
}

fn cell_view(cell: Option<&Cell>, images: &CloudinaryUrlBuilder) -> CellView {
    match cell {
        None => CellView {
            kind: "text",
            text: String::new(),
            url: None,
        },
        Some(Cell::Text(text)) => CellView {
            kind: "text",
            text: text.clone(),
            url: None,
        },
        Some(Cell::Bool(b)) => CellView {
            kind: "bool",
            text: if *b { "Yes" } else { "No" }.to_string(),
            url: None,
        },
        Some(Cell::DateTime(dt)) => CellView {
            kind: "datetime",
            text: dt.format("%b %-d, %Y, %H:%M").to_string(),
            url: None,
        },
        Some(Cell::Image(Some(image))) if !image.trim().is_empty() => CellView {
            kind: "image",
            text: image.clone(),
            url: Some(images.thumbnail_url(image)),
        },
        Some(Cell::Image(_)) => CellView {
            kind: "text",
            text: "No image".to_string(),
            url: None,
        },
    }
}

#[derive(Debug, Serialize)]
struct RowView {
    id: i64,
    cells: Vec<CellView>,
}

#[derive(Debug, Serialize)]
struct Column {
    field: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct FilterLink {
    label: String,
    href: String,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct FilterView {
    label: &'static str,
    links: Vec<FilterLink>,
}

#[derive(Debug, Serialize)]
struct FieldView {
    label: &'static str,
    cell: CellView,
}

/// Query string for the list with `field` set to `value`, keeping the rest
fn list_href(query: &AdminQuery, field: &str, value: &str) -> String {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .filter(|(k, _)| k.as_str() != field)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !value.is_empty() {
        params.push((field.to_string(), value.to_string()));
    }
    if !query.search.is_empty() {
        params.push(("q".to_string(), query.search.clone()));
    }
    params.sort();

    let encoded: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("?{}", encoded.join("&"))
}

fn model_context(model: &ModelAdmin) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("model", &ModelView::from(model));
    context
}

fn list_url(model: &ModelAdmin) -> String {
    format!("/admin/{}", model.slug)
}

pub async fn index(State(state): State<AppState>, viewer: Viewer) -> Result<Response, WebError> {
    #[derive(Serialize)]
    struct Entry {
        model: ModelView,
        count: usize,
    }

    let mut entries = Vec::new();
    for model in state.admin.models() {
        let count = state.admin.backend().rows(model.kind).await?.len();
        entries.push(Entry {
            model: ModelView::from(model),
            count,
        });
    }

    let mut context = TeraContext::new();
    context.insert("entries", &entries);
    Ok(viewer.render(&state, "admin/index.html", context))
}

pub async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::List)?;
    let all_rows = state.admin.backend().rows(model.kind).await?;
    let query = AdminQuery::from_params(model, &params);

    let filters: Vec<FilterView> = model
        .list_filter
        .iter()
        .map(|filter| FilterView {
            label: model.kind.label(filter.field),
            links: filter_options(filter.kind, filter.field, &all_rows, query.selected(filter.field))
                .into_iter()
                .map(|option| FilterLink {
                    href: list_href(&query, filter.field, &option.value),
                    label: option.label,
                    selected: option.selected,
                })
                .collect(),
        })
        .collect();

    let total = all_rows.len();
    let rows: Vec<RowView> = apply(model, all_rows, &query, Utc::now())
        .iter()
        .map(|row: &Row| RowView {
            id: row.id,
            cells: model
                .list_display
                .iter()
                .map(|field| cell_view(row.get(field), &state.images))
                .collect(),
        })
        .collect();
    let columns: Vec<Column> = model
        .list_display
        .iter()
        .map(|&field| Column {
            field,
            label: model.kind.label(field),
        })
        .collect();

    let mut context = model_context(model);
    context.insert("columns", &columns);
    context.insert("rows", &rows);
    context.insert("filters", &filters);
    context.insert("colspan", &(columns.len() + 1));
    context.insert("active_filters", &query.filters);
    context.insert("q", &query.search);
    context.insert("total", &total);
    context.insert("has_search", &!model.search_fields.is_empty());
    Ok(viewer.render(&state, "admin/list.html", context))
}

pub async fn view(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::View)?;
    let id = parse_id(&id)?;
    let row = state.admin.backend().row(model.kind, id).await?;

    let fields: Vec<FieldView> = model
        .kind
        .fields()
        .iter()
        .map(|&(field, label)| FieldView {
            label,
            cell: cell_view(row.get(field), &state.images),
        })
        .collect();

    let mut context = model_context(model);
    context.insert("record_id", &id);
    context.insert("title", &state.admin.backend().describe(model.kind, id).await?);
    context.insert("fields", &fields);
    Ok(viewer.render(&state, "admin/detail.html", context))
}

fn form_page(
    state: &AppState,
    viewer: &Viewer,
    model: &ModelAdmin,
    heading: String,
    action: String,
    fields: Vec<FormField>,
    errors: &FieldErrors,
) -> Response {
    let mut context = model_context(model);
    context.insert("heading", &heading);
    context.insert("action", &action);
    context.insert("fields", &fields);
    context.insert("form_errors", errors.get(NON_FIELD));
    context.insert("has_errors", &!errors.is_empty());
    viewer.render(state, "admin/form.html", context)
}

pub async fn add_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::Create)?;
    let fields = state.admin.backend().blank_form(model.kind)?;
    Ok(form_page(
        &state,
        &viewer,
        model,
        format!("Add {}", model.singular),
        format!("/admin/{}/add", model.slug),
        fields,
        &FieldErrors::new(),
    ))
}

pub async fn add_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::Create)?;
    match state.admin.backend().create(model.kind, &values).await {
        Ok(id) => {
            tracing::info!(model = model.slug, id, "Admin created record");
            Ok(redirect_with_notice(
                &list_url(model),
                Notice::success(format!("The {} #{} was added successfully.", model.singular, id)),
            ))
        }
        Err(AdminError::ValidationError(errors)) => {
            let fields = with_errors(state.admin.backend().submitted_form(model.kind, &values)?, &errors);
            let viewer = viewer.with_notice(Notice::error("Please correct the errors below."));
            Ok(form_page(
                &state,
                &viewer,
                model,
                format!("Add {}", model.singular),
                format!("/admin/{}/add", model.slug),
                fields,
                &errors,
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::Edit)?;
    let id = parse_id(&id)?;
    let fields = state.admin.backend().edit_form(model.kind, id).await?;
    Ok(form_page(
        &state,
        &viewer,
        model,
        format!("Change {} #{}", model.singular, id),
        format!("/admin/{}/{}/edit", model.slug, id),
        fields,
        &FieldErrors::new(),
    ))
}

pub async fn edit_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, id)): Path<(String, String)>,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::Edit)?;
    let id = parse_id(&id)?;
    match state.admin.backend().update(model.kind, id, &values).await {
        Ok(()) => {
            tracing::info!(model = model.slug, id, "Admin updated record");
            Ok(redirect_with_notice(
                &list_url(model),
                Notice::success(format!("The {} #{} was changed successfully.", model.singular, id)),
            ))
        }
        Err(AdminError::ValidationError(errors)) => {
            let fields = with_errors(state.admin.backend().submitted_form(model.kind, &values)?, &errors);
            let viewer = viewer.with_notice(Notice::error("Please correct the errors below."));
            Ok(form_page(
                &state,
                &viewer,
                model,
                format!("Change {} #{}", model.singular, id),
                format!("/admin/{}/{}/edit", model.slug, id),
                fields,
                &errors,
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::Delete)?;
    let id = parse_id(&id)?;
    let title = state.admin.backend().describe(model.kind, id).await?;

    let mut context = model_context(model);
    context.insert("record_id", &id);
    context.insert("title", &title);
    Ok(viewer.render(&state, "admin/confirm_delete.html", context))
}

pub async fn delete_submit(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let model = state.admin.model_for(&slug, Operation::Delete)?;
    let id = parse_id(&id)?;
    state.admin.backend().delete(model.kind, id).await?;
    tracing::info!(model = model.slug, id, "Admin deleted record");
    Ok(redirect_with_notice(
        &list_url(model),
        Notice::success(format!("The {} #{} was deleted successfully.", model.singular, id)),
    ))
}
