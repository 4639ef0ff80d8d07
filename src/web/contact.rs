//! Contact form
//!
//! - GET /contact - empty form
//! - POST /contact - store the message or re-render with errors

use axum::{extract::State, response::Response, Form};
use tera::Context as TeraContext;

use crate::forms::{ContactForm, FieldErrors};
use crate::services::ContactServiceError;
use crate::web::middleware::{AppState, Viewer, WebError};
use crate::web::notice::{redirect_with_notice, Notice};

pub const MESSAGE_SENT: &str = "Thank you for your message. We will get back to you soon!";
pub const SUBMISSION_ERROR: &str = "There was an error with your submission.";

fn form_page(state: &AppState, viewer: &Viewer, form: &ContactForm, errors: &FieldErrors) -> Response {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    viewer.render(state, "exercises/contact_form.html", context)
}

pub async fn show(State(state): State<AppState>, viewer: Viewer) -> Response {
    form_page(&state, &viewer, &ContactForm::default(), &FieldErrors::new())
}

pub async fn submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<ContactForm>,
) -> Result<Response, WebError> {
    match state.contact_service.submit(&form).await {
        Ok(_) => Ok(redirect_with_notice("/", Notice::success(MESSAGE_SENT))),
        Err(ContactServiceError::ValidationError(errors)) => {
            let viewer = viewer.with_notice(Notice::error(SUBMISSION_ERROR));
            Ok(form_page(&state, &viewer, &form, &errors))
        }
        Err(ContactServiceError::NotFound(id)) => Err(WebError::NotFound(format!("contact message {}", id))),
        Err(ContactServiceError::InternalError(e)) => Err(WebError::Internal(e)),
    }
}
