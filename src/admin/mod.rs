//! Staff administration
//!
//! The admin is one generic component driven by an explicit registry: each
//! [`ModelAdmin`] names a record type, the operations staff may perform on
//! it, the columns of its list, its search fields and its filters. The
//! registry is built once at startup and handed to [`AdminSite`].

mod query;
mod records;

pub use query::{apply, filter_options, AdminQuery, Cell, DateRange, FilterOption, Row};
pub use records::{with_errors, AdminBackend, AdminError, FormField, Widget};

/// Admin operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    View,
    Create,
    Edit,
    Delete,
}

/// How a list filter matches its field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// yes / no
    Bool,
    /// any, today, past 7 days, this month, this year
    Date,
    /// exact match on one of the distinct values
    Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub field: &'static str,
    pub kind: FilterKind,
}

impl FilterSpec {
    pub const fn new(field: &'static str, kind: FilterKind) -> Self {
        Self { field, kind }
    }
}

/// Record types the admin knows how to load and save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Exercise,
    Comment,
    ContactMessage,
    CommentReport,
}

impl RecordKind {
    /// Every field shown on the detail page, with its label, in display order
    pub fn fields(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            RecordKind::Exercise => &[
                ("title", "Title"),
                ("description", "Description"),
                ("detailed_description1", "Detailed description 1"),
                ("detailed_description2", "Detailed description 2"),
                ("image", "Image"),
                ("created_at", "Created at"),
            ],
            RecordKind::Comment => &[
                ("exercise", "Exercise"),
                ("user", "User"),
                ("body", "Body"),
                ("created_on", "Created on"),
                ("approved", "Approved"),
                ("reports", "Reports"),
            ],
            RecordKind::ContactMessage => &[
                ("name", "Name"),
                ("email", "Email"),
                ("message", "Message"),
                ("created_at", "Created at"),
            ],
            RecordKind::CommentReport => &[
                ("user", "User"),
                ("comment", "Comment"),
                ("reason", "Reason"),
                ("created_at", "Created at"),
            ],
        }
    }

    pub fn label(&self, field: &str) -> &'static str {
        self.fields()
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, label)| *label)
            .unwrap_or("")
    }
}

/// Registration of one record type
#[derive(Debug, Clone)]
pub struct ModelAdmin {
    /// URL segment, e.g. `exercises`
    pub slug: &'static str,
    /// Plural display name
    pub name: &'static str,
    pub singular: &'static str,
    pub kind: RecordKind,
    pub list_display: Vec<&'static str>,
    pub search_fields: Vec<&'static str>,
    pub list_filter: Vec<FilterSpec>,
    pub operations: Vec<Operation>,
}

impl ModelAdmin {
    pub fn allows(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

/// The registrations this application ships with
pub fn default_registry() -> Vec<ModelAdmin> {
    use FilterKind::*;
    use Operation::*;

    vec![
        ModelAdmin {
            slug: "exercises",
            name: "Exercises",
            singular: "exercise",
            kind: RecordKind::Exercise,
            list_display: vec![
                "title",
                "description",
                "detailed_description1",
                "detailed_description2",
                "created_at",
                "image",
            ],
            search_fields: vec![
                "title",
                "description",
                "detailed_description1",
                "detailed_description2",
            ],
            list_filter: vec![FilterSpec::new("created_at", Date)],
            operations: vec![List, View, Create, Edit, Delete],
        },
        ModelAdmin {
            slug: "comments",
            name: "Comments",
            singular: "comment",
            kind: RecordKind::Comment,
            list_display: vec!["exercise", "user", "created_on", "approved"],
            search_fields: vec!["exercise", "user", "body"],
            list_filter: vec![
                FilterSpec::new("approved", Bool),
                FilterSpec::new("created_on", Date),
            ],
            operations: vec![List, View, Edit, Delete],
        },
        ModelAdmin {
            slug: "contact-messages",
            name: "Contact messages",
            singular: "contact message",
            kind: RecordKind::ContactMessage,
            list_display: vec!["name", "email", "message", "created_at"],
            search_fields: vec!["name", "email", "message"],
            list_filter: vec![
                FilterSpec::new("name", Choice),
                FilterSpec::new("created_at", Date),
            ],
            operations: vec![List, View],
        },
        ModelAdmin {
            slug: "comment-reports",
            name: "Comment reports",
            singular: "comment report",
            kind: RecordKind::CommentReport,
            list_display: vec!["user", "comment", "reason", "created_at"],
            search_fields: vec!["user", "comment", "reason"],
            list_filter: vec![
                FilterSpec::new("created_at", Date),
                FilterSpec::new("user", Choice),
            ],
            operations: vec![List, View],
        },
    ]
}

/// Registry plus the backend that loads and saves registered records
pub struct AdminSite {
    models: Vec<ModelAdmin>,
    backend: AdminBackend,
}

impl AdminSite {
    pub fn new(models: Vec<ModelAdmin>, backend: AdminBackend) -> Self {
        Self { models, backend }
    }

    pub fn models(&self) -> &[ModelAdmin] {
        &self.models
    }

    pub fn model(&self, slug: &str) -> Option<&ModelAdmin> {
        self.models.iter().find(|m| m.slug == slug)
    }

    /// Look up a registration and check it permits `operation`
    pub fn model_for(&self, slug: &str, operation: Operation) -> Result<&ModelAdmin, AdminError> {
        let model = self
            .model(slug)
            .ok_or_else(|| AdminError::NotFound(format!("model {}", slug)))?;
        if !model.allows(operation) {
            tracing::warn!(model = slug, ?operation, "Refused admin operation");
            return Err(AdminError::NotAllowed(slug.to_string()));
        }
        Ok(model)
    }

    pub fn backend(&self) -> &AdminBackend {
        &self.backend
    }
}
