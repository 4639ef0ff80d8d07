//! Comment report repository

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{CommentReport, CommentReportWithMeta, CreateReportInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Comment report repository trait
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// File a report against a comment
    async fn create(&self, input: &CreateReportInput) -> Result<CommentReport>;

    /// Get report by ID with reporter name and comment text
    async fn get_with_meta(&self, id: i64) -> Result<Option<CommentReportWithMeta>>;

    /// Every report, newest first
    async fn list_all(&self) -> Result<Vec<CommentReportWithMeta>>;

    /// Number of reports filed against a comment
    async fn count_for_comment(&self, comment_id: i64) -> Result<i64>;
}

/// SQLx-based report repository implementation
pub struct SqlxReportRepository {
    pool: DynDatabasePool,
}

impl SqlxReportRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReportRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_meta(&self, clause: &str, id: Option<i64>) -> Result<Vec<CommentReportWithMeta>> {
        let sql = format!("{} {}", META_SELECT, clause);
        let reports = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                if let Some(id) = id {
                    query = query.bind(id);
                }
                query
                    .fetch_all(sqlite_pool(self.pool.as_ref())?)
                    .await
                    .context("Failed to list comment reports")?
                    .iter()
                    .map(|row| CommentReportWithMeta {
                        report: CommentReport {
                            id: row.get("id"),
                            user_id: row.get("user_id"),
                            comment_id: row.get("comment_id"),
                            reason: row.get("reason"),
                            created_at: row.get("created_at"),
                        },
                        username: row.get("username"),
                        comment_body: row.get("comment_body"),
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                if let Some(id) = id {
                    query = query.bind(id);
                }
                query
                    .fetch_all(mysql_pool(self.pool.as_ref())?)
                    .await
                    .context("Failed to list comment reports")?
                    .iter()
                    .map(|row| CommentReportWithMeta {
                        report: CommentReport {
                            id: row.get("id"),
                            user_id: row.get("user_id"),
                            comment_id: row.get("comment_id"),
                            reason: row.get("reason"),
                            created_at: row.get("created_at"),
                        },
                        username: row.get("username"),
                        comment_body: row.get("comment_body"),
                    })
                    .collect()
            }
        };
        Ok(reports)
    }
}

const META_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.comment_id, r.reason, r.created_at,
           u.username AS username, c.body AS comment_body
    FROM comment_reports r
    JOIN users u ON u.id = r.user_id
    JOIN comments c ON c.id = r.comment_id
"#;

#[async_trait]
impl ReportRepository for SqlxReportRepository {
    async fn create(&self, input: &CreateReportInput) -> Result<CommentReport> {
        let sql = "INSERT INTO comment_reports (user_id, comment_id, reason, created_at) VALUES (?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(input.user_id)
                .bind(input.comment_id)
                .bind(&input.reason)
                .bind(now)
                .execute(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to create comment report")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(input.user_id)
                .bind(input.comment_id)
                .bind(&input.reason)
                .bind(now)
                .execute(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to create comment report")?
                .last_insert_id() as i64,
        };

        Ok(CommentReport {
            id,
            user_id: input.user_id,
            comment_id: input.comment_id,
            reason: input.reason.clone(),
            created_at: now,
        })
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<CommentReportWithMeta>> {
        let mut rows = self.fetch_meta("WHERE r.id = ?", Some(id)).await?;
        Ok(rows.pop())
    }

    async fn list_all(&self) -> Result<Vec<CommentReportWithMeta>> {
        self.fetch_meta("ORDER BY r.id DESC", None).await
    }

    async fn count_for_comment(&self, comment_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM comment_reports WHERE comment_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(comment_id)
                .fetch_one(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to count comment reports")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(comment_id)
                .fetch_one(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to count comment reports")?
                .get("count"),
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CommentRepository, ExerciseRepository, SqlxCommentRepository, SqlxExerciseRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateCommentInput, ExerciseInput, User, UserRole};

    #[tokio::test]
    async fn test_create_and_list_reports() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "hank".to_string(),
                "hank@example.com".to_string(),
                "hash".to_string(),
                UserRole::Member,
            ))
            .await
            .unwrap();
        let exercise = SqlxExerciseRepository::new(pool.clone())
            .create(&ExerciseInput {
                title: "Dip".to_string(),
                description: "Triceps".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let comments = SqlxCommentRepository::new(pool.clone());
        let comment = comments
            .create(&CreateCommentInput {
                exercise_id: exercise.id,
                user_id: user.id,
                body: "buy cheap pills".to_string(),
            })
            .await
            .unwrap();

        let repo = SqlxReportRepository::new(pool);
        let report = repo
            .create(&CreateReportInput {
                user_id: user.id,
                comment_id: comment.id,
                reason: "spam".to_string(),
            })
            .await
            .unwrap();

        let meta = repo.get_with_meta(report.id).await.unwrap().expect("missing");
        assert_eq!(meta.username, "hank");
        assert_eq!(meta.comment_body, "buy cheap pills");
        assert_eq!(meta.report.reason, "spam");
        assert_eq!(repo.count_for_comment(comment.id).await.unwrap(), 1);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);

        comments.delete(comment.id).await.unwrap();
        assert_eq!(repo.count_for_comment(comment.id).await.unwrap(), 0);
        assert!(repo.get_with_meta(report.id).await.unwrap().is_none());
    }
}
