//! Comment report model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's complaint about a comment. Read-only once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentReport {
    pub id: i64,
    /// Reporter
    pub user_id: i64,
    pub comment_id: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Report joined with reporter name and the reported text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentReportWithMeta {
    #[serde(flatten)]
    pub report: CommentReport,
    pub username: String,
    pub comment_body: String,
}

/// Input for filing a report
#[derive(Debug, Clone)]
pub struct CreateReportInput {
    pub user_id: i64,
    pub comment_id: i64,
    pub reason: String,
}
