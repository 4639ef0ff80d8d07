//! Form validation
//!
//! Every form has a raw struct deserialized from the request body and a
//! `validate` function returning either the cleaned value-object or a map of
//! field errors. Validation never touches the database; uniqueness checks
//! live in the services.
//!
//! Text fields are trimmed before validation, so whitespace-only input counts
//! as empty.

use crate::models::{ContactInput, ExerciseInput, ModerateCommentInput};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const PASSWORD_MISMATCH: &str = "You must type the same password each time.";
pub const PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 254;
pub const TITLE_MAX: usize = 200;
pub const USERNAME_MAX: usize = 150;
pub const IMAGE_MAX: usize = 500;
pub const PASSWORD_MIN: usize = 8;

/// Key for errors that belong to the whole form
pub const NON_FIELD: &str = "__all__";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$",
    )
    .expect("email pattern is valid")
});

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Field name → messages, in field order for stable rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message on one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(value)` when no errors were recorded
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

/// Trim and check a required text field
fn required(errors: &mut FieldErrors, field: &str, raw: &str, max: Option<usize>) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        check_length(errors, field, value, max);
    }
    value.to_string()
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str, max: Option<usize>) {
    if let Some(max) = max {
        let len = value.chars().count();
        if len > max {
            errors.add(field, max_length_message(max, len));
        }
    }
}

/// Syntactic email check
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

// ============================================================================
// Public forms
// ============================================================================

/// Comment body, used for both adding and editing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let body = required(&mut errors, "body", &self.body, None);
        errors.finish(body)
    }
}

/// Contact form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<ContactInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", &self.name, Some(NAME_MAX));

        let email = self.email.trim().to_string();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else {
            if !is_valid_email(&email) {
                errors.add("email", INVALID_EMAIL);
            }
            check_length(&mut errors, "email", &email, Some(EMAIL_MAX));
        }

        let message = required(&mut errors, "message", &self.message, None);

        errors.finish(ContactInput {
            name,
            email,
            message,
        })
    }
}

/// Report form. The comment text is display-only and never read back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportForm {
    #[serde(default)]
    pub reason: String,
}

impl ReportForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let reason = required(&mut errors, "reason", &self.reason, None);
        errors.finish(reason)
    }
}

// ============================================================================
// Account forms
// ============================================================================

/// Login form; `next` carries the page to return to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Cleaned login credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = required(&mut errors, "username", &self.username, None);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.finish(Credentials {
            username,
            password: self.password.clone(),
        })
    }
}

/// Signup form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

/// Cleaned signup fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = required(&mut errors, "username", &self.username, Some(USERNAME_MAX));
        if !username.is_empty() && !USERNAME_RE.is_match(&username) {
            errors.add("username", INVALID_USERNAME);
        }

        let email = self.email.trim().to_string();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !is_valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        }
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                if self.password1.chars().count() < PASSWORD_MIN {
                    errors.add("password1", PASSWORD_TOO_SHORT);
                }
                if self.password1.chars().all(|c| c.is_ascii_digit()) {
                    errors.add("password1", PASSWORD_NUMERIC);
                }
            }
        }

        errors.finish(Registration {
            username,
            email,
            password: self.password1.clone(),
        })
    }
}

// ============================================================================
// Admin forms
// ============================================================================

/// Exercise create/edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExerciseForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub detailed_description1: String,
    #[serde(default)]
    pub detailed_description2: String,
    #[serde(default)]
    pub image: String,
}

impl ExerciseForm {
    pub fn validate(&self) -> Result<ExerciseInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required(&mut errors, "title", &self.title, Some(TITLE_MAX));
        let description = required(&mut errors, "description", &self.description, None);

        let image = self.image.trim();
        check_length(&mut errors, "image", image, Some(IMAGE_MAX));
        let image = (!image.is_empty()).then(|| image.to_string());

        errors.finish(ExerciseInput {
            title,
            description,
            detailed_description1: self.detailed_description1.trim().to_string(),
            detailed_description2: self.detailed_description2.trim().to_string(),
            image,
        })
    }
}

impl From<&crate::models::Exercise> for ExerciseForm {
    fn from(exercise: &crate::models::Exercise) -> Self {
        Self {
            title: exercise.title.clone(),
            description: exercise.description.clone(),
            detailed_description1: exercise.detailed_description1.clone(),
            detailed_description2: exercise.detailed_description2.clone(),
            image: exercise.image.clone().unwrap_or_default(),
        }
    }
}

/// Comment moderation form. An unchecked checkbox is simply absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentModerationForm {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub approved: Option<String>,
}

impl CommentModerationForm {
    pub fn validate(&self) -> Result<ModerateCommentInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let body = required(&mut errors, "body", &self.body, None);
        let approved = matches!(
            self.approved.as_deref().map(str::trim),
            Some("on" | "true" | "1" | "yes")
        );
        errors.finish(ModerateCommentInput { body, approved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn contact(name: &str, email: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_comment_body_required() {
        let errors = CommentForm { body: "   ".to_string() }.validate().unwrap_err();
        assert_eq!(errors.get("body"), [REQUIRED]);

        let body = CommentForm { body: "  Great cue!  ".to_string() }.validate().unwrap();
        assert_eq!(body, "Great cue!");
    }

    #[test]
    fn test_contact_empty_email_is_required_error() {
        let errors = contact("Ivy", "", "Hello").validate().unwrap_err();
        assert_eq!(errors.get("email"), [REQUIRED]);
        assert!(!errors.has("name"));
        assert!(!errors.has("message"));
    }

    #[test]
    fn test_contact_malformed_email() {
        for bad in ["ivy", "ivy@", "@example.com", "ivy@example", "i vy@example.com", "ivy..x@example.com"] {
            let errors = contact("Ivy", bad, "Hello").validate().unwrap_err();
            assert_eq!(errors.get("email"), [INVALID_EMAIL], "accepted {}", bad);
        }
    }

    #[test]
    fn test_contact_valid() {
        let input = contact(" Ivy ", "ivy.lee+gym@example.co.uk", "Hi").validate().unwrap();
        assert_eq!(input.name, "Ivy");
        assert_eq!(input.email, "ivy.lee+gym@example.co.uk");
    }

    #[test]
    fn test_contact_length_limits() {
        let errors = contact(&"n".repeat(101), "a@example.com", "x").validate().unwrap_err();
        assert_eq!(
            errors.get("name"),
            ["Ensure this value has at most 100 characters (it has 101)."]
        );

        let long_email = format!("{}@example.com", "a".repeat(250));
        let errors = contact("Ivy", &long_email, "x").validate().unwrap_err();
        assert!(errors.get("email")[0].starts_with("Ensure this value has at most 254"));
    }

    #[test]
    fn test_contact_all_missing() {
        let errors = contact("", "", "").validate().unwrap_err();
        for field in ["name", "email", "message"] {
            assert_eq!(errors.get(field), [REQUIRED]);
        }
    }

    #[test]
    fn test_report_reason_required() {
        assert!(ReportForm::default().validate().is_err());
        assert_eq!(
            ReportForm { reason: "spam".to_string() }.validate().unwrap(),
            "spam"
        );
    }

    #[test]
    fn test_signup_rules() {
        let form = SignupForm {
            username: "jo hn".to_string(),
            email: "john@example.com".to_string(),
            password1: "12345".to_string(),
            password2: "12345".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("username"), [INVALID_USERNAME]);
        assert_eq!(errors.get("password1"), [PASSWORD_TOO_SHORT, PASSWORD_NUMERIC]);

        let form = SignupForm {
            username: "john".to_string(),
            email: "john@example.com".to_string(),
            password1: "squats-daily".to_string(),
            password2: "squats-weekly".to_string(),
        };
        assert_eq!(form.validate().unwrap_err().get("password2"), [PASSWORD_MISMATCH]);

        let form = SignupForm {
            password2: "squats-daily".to_string(),
            ..form
        };
        let registration = form.validate().unwrap();
        assert_eq!(registration.username, "john");
        assert_eq!(registration.password, "squats-daily");
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_exercise_form() {
        let form = ExerciseForm {
            title: "t".repeat(201),
            description: String::new(),
            image: "   ".to_string(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("title"));
        assert_eq!(errors.get("description"), [REQUIRED]);

        let input = ExerciseForm {
            title: "Squat".to_string(),
            description: "Legs".to_string(),
            detailed_description1: "<p>Brace</p>".to_string(),
            image: "   ".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert!(input.image.is_none());
        assert_eq!(input.detailed_description1, "<p>Brace</p>");
    }

    #[test]
    fn test_moderation_checkbox() {
        let checked = CommentModerationForm {
            body: "ok".to_string(),
            approved: Some("on".to_string()),
        };
        assert!(checked.validate().unwrap().approved);

        let unchecked = CommentModerationForm {
            body: "ok".to_string(),
            approved: None,
        };
        assert!(!unchecked.validate().unwrap().approved);
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let errors = FieldErrors::single("email", REQUIRED);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["email"][0], REQUIRED);
        assert_eq!(errors.to_string(), "email: This field is required.");
    }

    proptest! {
        #[test]
        fn whitespace_only_bodies_are_rejected(body in "[ \t\n]{0,20}") {
            let form = CommentForm { body };
            prop_assert!(form.validate().is_err());
        }

        #[test]
        fn names_within_limit_are_accepted(name in "[a-zA-Z]{1,100}") {
            let form = contact(&name, "a@example.com", "hi");
            prop_assert!(form.validate().is_ok());
        }

        #[test]
        fn names_over_limit_are_rejected(name in "[a-zA-Z]{101,150}") {
            let form = contact(&name, "a@example.com", "hi");
            let errors = form.validate().unwrap_err();
            prop_assert!(errors.has("name"));
        }
    }
}
