//! Account pages
//!
//! - GET|POST /accounts/login/
//! - POST /accounts/logout/
//! - GET|POST /accounts/signup/

use axum::{
    extract::{Query, State},
    http::header,
    response::Response,
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::forms::{FieldErrors, LoginForm, SignupForm, NON_FIELD};
use crate::models::{Session, User};
use crate::services::UserServiceError;
use crate::web::middleware::{
    extract_session_token, session_cookie, AppState, Viewer, WebError, CLEAR_SESSION_COOKIE,
};
use crate::web::notice::{redirect_with_notice, Notice};

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Only same-site paths are followed after login.
///
/// Browsers treat `\` like `/`, so `/\host` would leave the site.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

fn signed_in(session: &Session, user: &User, next: &str) -> Response {
    let mut response = redirect_with_notice(
        next,
        Notice::success(format!("Successfully signed in as {}.", user.username)),
    );
    let max_age = (session.expires_at - session.created_at).num_seconds().max(0);
    if let Some(cookie) = session_cookie(&session.id, max_age) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

fn login_page(state: &AppState, viewer: &Viewer, form: &LoginForm, errors: &FieldErrors) -> Response {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    viewer.render(state, "account/login.html", context)
}

fn signup_page(state: &AppState, viewer: &Viewer, form: &SignupForm, errors: &FieldErrors) -> Response {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    viewer.render(state, "account/signup.html", context)
}

pub async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Response {
    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };
    login_page(&state, &viewer, &form, &FieldErrors::new())
}

pub async fn login_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(login_page(&state, &viewer, &form, &errors)),
    };

    match state.user_service.login(credentials).await {
        Ok((session, user)) => {
            tracing::info!(user_id = user.id, "User signed in");
            Ok(signed_in(&session, &user, safe_next(form.next.as_deref())))
        }
        Err(UserServiceError::AuthenticationError(message)) => {
            let errors = FieldErrors::single(NON_FIELD, message);
            Ok(login_page(&state, &viewer, &form, &errors))
        }
        Err(UserServiceError::ValidationError(errors)) => Ok(login_page(&state, &viewer, &form, &errors)),
        Err(UserServiceError::InternalError(e)) => Err(WebError::Internal(e)),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(e) = state.user_service.logout(&token).await {
            tracing::warn!("Failed to end session: {}", e);
        }
    }
    let mut response = redirect_with_notice("/", Notice::info("You have signed out."));
    response.headers_mut().append(
        header::SET_COOKIE,
        header::HeaderValue::from_static(CLEAR_SESSION_COOKIE),
    );
    Ok(response)
}

pub async fn signup_form(State(state): State<AppState>, viewer: Viewer) -> Response {
    signup_page(&state, &viewer, &SignupForm::default(), &FieldErrors::new())
}

pub async fn signup_submit(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<SignupForm>,
) -> Result<Response, WebError> {
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => return Ok(signup_page(&state, &viewer, &form, &errors)),
    };
    let credentials = crate::forms::Credentials {
        username: registration.username.clone(),
        password: registration.password.clone(),
    };

    match state.user_service.register(registration).await {
        Ok(_) => {}
        Err(UserServiceError::ValidationError(errors)) => {
            return Ok(signup_page(&state, &viewer, &form, &errors))
        }
        Err(UserServiceError::AuthenticationError(message)) => {
            let errors = FieldErrors::single(NON_FIELD, message);
            return Ok(signup_page(&state, &viewer, &form, &errors));
        }
        Err(UserServiceError::InternalError(e)) => return Err(WebError::Internal(e)),
    }

    match state.user_service.login(credentials).await {
        Ok((session, user)) => Ok(signed_in(&session, &user, "/")),
        Err(e) => Err(WebError::Internal(anyhow::anyhow!("Login after signup failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/exercise/1")), "/exercise/1");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(Some("/exercise/1\\x")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
