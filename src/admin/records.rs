//! Loading and saving registered records
//!
//! Bridges the generic admin to the services. Records are flattened into
//! rows for lists and detail pages; edits arrive as raw form values and go
//! through the same form validation as the public pages.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::query::{Cell, Row};
use super::RecordKind;
use crate::forms::{CommentModerationForm, ExerciseForm, FieldErrors};
use crate::models::{CommentReportWithMeta, CommentWithMeta, ContactMessage, Exercise};
use crate::services::{
    CommentService, CommentServiceError, ContactService, ContactServiceError, ExerciseService,
    ExerciseServiceError, ReportService, ReportServiceError,
};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not registered for this record type
    #[error("Operation not allowed on {0}")]
    NotAllowed(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ExerciseServiceError> for AdminError {
    fn from(e: ExerciseServiceError) -> Self {
        match e {
            ExerciseServiceError::NotFound(id) => AdminError::NotFound(format!("exercise {}", id)),
            ExerciseServiceError::ValidationError(errors) => AdminError::ValidationError(errors),
            ExerciseServiceError::InternalError(e) => AdminError::InternalError(e),
        }
    }
}

impl From<CommentServiceError> for AdminError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(what) => AdminError::NotFound(what),
            CommentServiceError::ValidationError(errors) => AdminError::ValidationError(errors),
            CommentServiceError::InternalError(e) => AdminError::InternalError(e),
        }
    }
}

impl From<ContactServiceError> for AdminError {
    fn from(e: ContactServiceError) -> Self {
        match e {
            ContactServiceError::NotFound(id) => AdminError::NotFound(format!("contact message {}", id)),
            ContactServiceError::ValidationError(errors) => AdminError::ValidationError(errors),
            ContactServiceError::InternalError(e) => AdminError::InternalError(e),
        }
    }
}

impl From<ReportServiceError> for AdminError {
    fn from(e: ReportServiceError) -> Self {
        match e {
            ReportServiceError::NotFound(what) => AdminError::NotFound(what),
            ReportServiceError::ValidationError(errors) => AdminError::ValidationError(errors),
            ReportServiceError::InternalError(e) => AdminError::InternalError(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Widget {
    Text,
    Textarea,
    Checkbox,
}

/// One input of an admin edit form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: Widget,
    pub value: String,
    pub checked: bool,
    pub errors: Vec<String>,
}

impl FormField {
    fn text(name: &'static str, label: &'static str, widget: Widget, value: &str) -> Self {
        Self {
            name,
            label,
            widget,
            value: value.to_string(),
            checked: false,
            errors: Vec::new(),
        }
    }

    fn checkbox(name: &'static str, label: &'static str, checked: bool) -> Self {
        Self {
            name,
            label,
            widget: Widget::Checkbox,
            value: String::new(),
            checked,
            errors: Vec::new(),
        }
    }
}

fn exercise_fields(form: &ExerciseForm) -> Vec<FormField> {
    vec![
        FormField::text("title", "Title", Widget::Text, &form.title),
        FormField::text("description", "Description", Widget::Textarea, &form.description),
        FormField::text(
            "detailed_description1",
            "Detailed description 1",
            Widget::Textarea,
            &form.detailed_description1,
        ),
        FormField::text(
            "detailed_description2",
            "Detailed description 2",
            Widget::Textarea,
            &form.detailed_description2,
        ),
        FormField::text("image", "Image", Widget::Text, &form.image),
    ]
}

fn moderation_fields(form: &CommentModerationForm) -> Vec<FormField> {
    vec![
        FormField::text("body", "Body", Widget::Textarea, &form.body),
        FormField::checkbox("approved", "Approved", form.approved.is_some()),
    ]
}

/// Attach validation messages to the matching inputs
pub fn with_errors(mut fields: Vec<FormField>, errors: &FieldErrors) -> Vec<FormField> {
    for field in &mut fields {
        field.errors = errors.get(field.name).to_vec();
    }
    fields
}

fn exercise_row(exercise: &Exercise) -> Row {
    Row::new(exercise.id)
        .text("title", exercise.title.clone())
        .text("description", exercise.description.clone())
        .text("detailed_description1", exercise.detailed_description1.clone())
        .text("detailed_description2", exercise.detailed_description2.clone())
        .with("image", Cell::Image(exercise.image.clone()))
        .with("created_at", Cell::DateTime(exercise.created_at))
}

fn comment_row(meta: &CommentWithMeta) -> Row {
    Row::new(meta.comment.id)
        .text("exercise", meta.exercise_title.clone())
        .text("user", meta.username.clone())
        .text("body", meta.comment.body.clone())
        .with("created_on", Cell::DateTime(meta.comment.created_on))
        .with("approved", Cell::Bool(meta.comment.approved))
}

fn contact_row(message: &ContactMessage) -> Row {
    Row::new(message.id)
        .text("name", message.name.clone())
        .text("email", message.email.clone())
        .text("message", message.message.clone())
        .with("created_at", Cell::DateTime(message.created_at))
}

fn report_row(meta: &CommentReportWithMeta) -> Row {
    Row::new(meta.report.id)
        .text("user", meta.username.clone())
        .text("comment", meta.comment_body.clone())
        .text("reason", meta.report.reason.clone())
        .with("created_at", Cell::DateTime(meta.report.created_at))
}

/// Raw form values into the typed form of the record
fn decode<T: serde::de::DeserializeOwned>(values: &HashMap<String, String>) -> Result<T, AdminError> {
    let object: serde_json::Map<String, Value> = values
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    serde_json::from_value(Value::Object(object))
        .map_err(|e| AdminError::InternalError(anyhow::anyhow!("Malformed admin form: {}", e)))
}

/// Services the admin reads and writes through
pub struct AdminBackend {
    exercises: Arc<ExerciseService>,
    comments: Arc<CommentService>,
    contacts: Arc<ContactService>,
    reports: Arc<ReportService>,
}

impl AdminBackend {
    pub fn new(
        exercises: Arc<ExerciseService>,
        comments: Arc<CommentService>,
        contacts: Arc<ContactService>,
        reports: Arc<ReportService>,
    ) -> Self {
        Self {
            exercises,
            comments,
            contacts,
            reports,
        }
    }

    /// All records of a kind, newest first
    pub async fn rows(&self, kind: RecordKind) -> Result<Vec<Row>, AdminError> {
        let rows = match kind {
            RecordKind::Exercise => self.exercises.list_all().await?.iter().map(exercise_row).collect(),
            RecordKind::Comment => self.comments.list_all().await?.iter().map(comment_row).collect(),
            RecordKind::ContactMessage => self.contacts.list_all().await?.iter().map(contact_row).collect(),
            RecordKind::CommentReport => self.reports.list_all().await?.iter().map(report_row).collect(),
        };
        Ok(rows)
    }

    /// One record with every detail field
    pub async fn row(&self, kind: RecordKind, id: i64) -> Result<Row, AdminError> {
        let row = match kind {
            RecordKind::Exercise => exercise_row(&self.exercises.get(id).await?),
            RecordKind::Comment => {
                let meta = self.comments.get_with_meta(id).await?;
                let reports = self.reports.report_count(id).await?;
                comment_row(&meta).text("reports", reports.to_string())
            }
            RecordKind::ContactMessage => contact_row(&self.contacts.get(id).await?),
            RecordKind::CommentReport => report_row(&self.reports.get_with_meta(id).await?),
        };
        Ok(row)
    }

    /// Empty create form
    pub fn blank_form(&self, kind: RecordKind) -> Result<Vec<FormField>, AdminError> {
        match kind {
            RecordKind::Exercise => Ok(exercise_fields(&ExerciseForm::default())),
            _ => Err(AdminError::NotAllowed(format!("{:?}", kind))),
        }
    }

    /// Edit form filled from the stored record
    pub async fn edit_form(&self, kind: RecordKind, id: i64) -> Result<Vec<FormField>, AdminError> {
        match kind {
            RecordKind::Exercise => {
                let exercise = self.exercises.get(id).await?;
                Ok(exercise_fields(&ExerciseForm::from(&exercise)))
            }
            RecordKind::Comment => {
                let meta = self.comments.get_with_meta(id).await?;
                Ok(moderation_fields(&CommentModerationForm {
                    body: meta.comment.body,
                    approved: meta.comment.approved.then(|| "on".to_string()),
                }))
            }
            _ => Err(AdminError::NotAllowed(format!("{:?}", kind))),
        }
    }

    /// Form fields echoing submitted values, used to re-render after errors
    pub fn submitted_form(
        &self,
        kind: RecordKind,
        values: &HashMap<String, String>,
    ) -> Result<Vec<FormField>, AdminError> {
        match kind {
            RecordKind::Exercise => Ok(exercise_fields(&decode::<ExerciseForm>(values)?)),
            RecordKind::Comment => Ok(moderation_fields(&decode::<CommentModerationForm>(values)?)),
            _ => Err(AdminError::NotAllowed(format!("{:?}", kind))),
        }
    }

    /// Create a record from raw form values, returning its id
    pub async fn create(&self, kind: RecordKind, values: &HashMap<String, String>) -> Result<i64, AdminError> {
        match kind {
            RecordKind::Exercise => {
                let form: ExerciseForm = decode(values)?;
                Ok(self.exercises.create(&form).await?.id)
            }
            _ => Err(AdminError::NotAllowed(format!("{:?}", kind))),
        }
    }

    /// Update a record from raw form values
    pub async fn update(
        &self,
        kind: RecordKind,
        id: i64,
        values: &HashMap<String, String>,
    ) -> Result<(), AdminError> {
        match kind {
            RecordKind::Exercise => {
                let form: ExerciseForm = decode(values)?;
                self.exercises.update(id, &form).await?;
                Ok(())
            }
            RecordKind::Comment => {
                let form: CommentModerationForm = decode(values)?;
                self.comments.moderate(id, &form).await?;
                Ok(())
            }
            _ => Err(AdminError::NotAllowed(format!("{:?}", kind))),
        }
    }

    pub async fn delete(&self, kind: RecordKind, id: i64) -> Result<(), AdminError> {
        match kind {
            RecordKind::Exercise => Ok(self.exercises.delete(id).await?),
            RecordKind::Comment => Ok(self.comments.admin_delete(id).await?),
            _ => Err(AdminError::NotAllowed(format!("{:?}", kind))),
        }
    }

    /// Short human label of a record, for headings
    pub async fn describe(&self, kind: RecordKind, id: i64) -> Result<String, AdminError> {
        let row = self.row(kind, id).await?;
        let lead = match kind {
            RecordKind::Exercise => "title",
            RecordKind::Comment => "body",
            RecordKind::ContactMessage => "name",
            RecordKind::CommentReport => "reason",
        };
        let text = row.get(lead).map(Cell::as_text).unwrap_or_default();
        Ok(truncate(&text, 50))
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCommentRepository, SqlxContactRepository, SqlxExerciseRepository,
        SqlxReportRepository,
    };
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> AdminBackend {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let exercise_repo = SqlxExerciseRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        AdminBackend::new(
            Arc::new(ExerciseService::new(exercise_repo.clone())),
            Arc::new(CommentService::new(comment_repo.clone(), exercise_repo)),
            Arc::new(ContactService::new(SqlxContactRepository::boxed(pool.clone()))),
            Arc::new(ReportService::new(SqlxReportRepository::boxed(pool), comment_repo)),
        )
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_exercise_crud_through_raw_values() {
        let backend = setup().await;

        let errors = match backend.create(RecordKind::Exercise, &values(&[("title", "")])).await {
            Err(AdminError::ValidationError(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        };
        assert!(errors.has("title"));

        let id = backend
            .create(
                RecordKind::Exercise,
                &values(&[("title", "Row"), ("description", "Back"), ("image", "rows.jpg")]),
            )
            .await
            .unwrap();

        let row = backend.row(RecordKind::Exercise, id).await.unwrap();
        assert_eq!(row.get("title"), Some(&Cell::Text("Row".to_string())));
        assert_eq!(row.get("image"), Some(&Cell::Image(Some("rows.jpg".to_string()))));

        backend
            .update(RecordKind::Exercise, id, &values(&[("title", "Bent-over Row"), ("description", "Back")]))
            .await
            .unwrap();
        assert_eq!(backend.describe(RecordKind::Exercise, id).await.unwrap(), "Bent-over Row");

        let form = backend.edit_form(RecordKind::Exercise, id).await.unwrap();
        assert_eq!(form[0].value, "Bent-over Row");
        assert_eq!(form[4].value, "");

        backend.delete(RecordKind::Exercise, id).await.unwrap();
        assert!(backend.rows(RecordKind::Exercise).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_kinds_refuse_writes() {
        let backend = setup().await;
        assert!(matches!(
            backend.create(RecordKind::ContactMessage, &HashMap::new()).await,
            Err(AdminError::NotAllowed(_))
        ));
        assert!(matches!(
            backend.delete(RecordKind::CommentReport, 1).await,
            Err(AdminError::NotAllowed(_))
        ));
        assert!(matches!(
            backend.row(RecordKind::ContactMessage, 1).await,
            Err(AdminError::NotFound(_))
        ));
    }

    #[test]
    fn test_with_errors_attaches_messages() {
        let fields = exercise_fields(&ExerciseForm::default());
        let errors = FieldErrors::single("title", "This field is required.");
        let fields = with_errors(fields, &errors);
        assert_eq!(fields[0].errors, vec!["This field is required.".to_string()]);
        assert!(fields[1].errors.is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
