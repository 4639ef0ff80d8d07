//! One-shot notices
//!
//! A notice is attached to a redirect as a `notice` cookie holding
//! urlencoded JSON. The next rendered page shows it and clears the cookie.

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

pub const COOKIE_NAME: &str = "notice";

const CLEAR_COOKIE: &str = "notice=; Path=/; Max-Age=0; SameSite=Lax";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// `Set-Cookie` value carrying this notice
    pub fn to_cookie(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            COOKIE_NAME,
            urlencoding::encode(&json)
        )
    }

    /// Read the notice cookie from request headers. Malformed values are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = cookie_value(headers, COOKIE_NAME)?;
        if raw.is_empty() {
            return None;
        }
        let json = urlencoding::decode(raw).ok()?;
        serde_json::from_str(&json).ok()
    }
}

/// Value of cookie `name` from the `Cookie` header(s)
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Redirect to `to`, carrying `notice` to the next page
pub fn redirect_with_notice(to: &str, notice: Notice) -> Response {
    let mut response = Redirect::to(to).into_response();
    if let Ok(value) = HeaderValue::from_str(&notice.to_cookie()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// Expire the notice cookie on `response`
pub fn clear_notice(response: &mut Response) {
    response
        .headers_mut()
        .append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_COOKIE));
}
