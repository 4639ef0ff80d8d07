//! Comment report service

use crate::db::repositories::{CommentRepository, ReportRepository};
use crate::forms::{FieldErrors, ReportForm};
use crate::models::{Comment, CommentReport, CommentReportWithMeta, CreateReportInput};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ReportServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ReportService {
    repo: Arc<dyn ReportRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

impl ReportService {
    pub fn new(repo: Arc<dyn ReportRepository>, comment_repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo, comment_repo }
    }

    /// The comment a report form is about
    pub async fn comment_for_report(&self, comment_id: i64) -> Result<Comment, ReportServiceError> {
        self.comment_repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| ReportServiceError::NotFound(format!("comment {}", comment_id)))
    }

    /// File a report against a comment
    pub async fn report(
        &self,
        comment_id: i64,
        user_id: i64,
        form: &ReportForm,
    ) -> Result<CommentReport, ReportServiceError> {
        let comment = self.comment_for_report(comment_id).await?;
        let reason = form.validate().map_err(ReportServiceError::ValidationError)?;

        let report = self
            .repo
            .create(&CreateReportInput {
                user_id,
                comment_id: comment.id,
                reason,
            })
            .await
            .context("Failed to store report")?;

        tracing::info!(report_id = report.id, comment_id, user_id, "Comment reported");
        Ok(report)
    }

    /// Number of reports filed against a comment
    pub async fn report_count(&self, comment_id: i64) -> Result<i64, ReportServiceError> {
        Ok(self
            .repo
            .count_for_comment(comment_id)
            .await
            .context("Failed to count reports")?)
    }

    pub async fn list_all(&self) -> Result<Vec<CommentReportWithMeta>, ReportServiceError> {
        Ok(self.repo.list_all().await.context("Failed to list reports")?)
    }

    pub async fn get_with_meta(&self, id: i64) -> Result<CommentReportWithMeta, ReportServiceError> {
        self.repo
            .get_with_meta(id)
            .await
            .context("Failed to get report")?
            .ok_or_else(|| ReportServiceError::NotFound(format!("report {}", id)))
    }
}
