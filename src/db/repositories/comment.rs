//! Comment repository
//!
//! Comments are always read together with their author's username and the
//! exercise title through explicit joins.

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{Comment, CommentWithMeta, CreateCommentInput, ModerateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create an unapproved comment
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Get comment by ID with author and exercise names
    async fn get_with_meta(&self, id: i64) -> Result<Option<CommentWithMeta>>;

    /// All comments on an exercise, oldest first, approved or not
    async fn list_for_exercise(&self, exercise_id: i64) -> Result<Vec<CommentWithMeta>>;

    /// Every comment, newest first
    async fn list_all(&self) -> Result<Vec<CommentWithMeta>>;

    /// Replace the body text
    async fn update_body(&self, id: i64, body: &str) -> Result<bool>;

    /// Replace body and approval flag
    async fn moderate(&self, id: i64, input: &ModerateCommentInput) -> Result<bool>;

    /// Delete a comment and its reports
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_meta(&self, clause: &str, id: Option<i64>) -> Result<Vec<CommentWithMeta>> {
        let sql = format!("{} {}", META_SELECT, clause);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                if let Some(id) = id {
                    query = query.bind(id);
                }
                let rows = query
                    .fetch_all(sqlite_pool(self.pool.as_ref())?)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows.iter().map(row_to_meta_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                if let Some(id) = id {
                    query = query.bind(id);
                }
                let rows = query
                    .fetch_all(mysql_pool(self.pool.as_ref())?)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows.iter().map(row_to_meta_mysql).collect())
            }
        }
    }

    async fn execute(&self, sql: &str, binds: CommentWrite<'_>, what: &'static str) -> Result<u64> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = sqlx::query(sql);
                let query = match binds {
                    CommentWrite::Id(id) => query.bind(id),
                    CommentWrite::Body(body, id) => query.bind(body).bind(id),
                    CommentWrite::Moderate(body, approved, id) => {
                        query.bind(body).bind(approved).bind(id)
                    }
                };
                query
                    .execute(sqlite_pool(self.pool.as_ref())?)
                    .await
                    .context(what)?
                    .rows_affected()
            }
            DatabaseDriver::Mysql => {
                let query = sqlx::query(sql);
                let query = match binds {
                    CommentWrite::Id(id) => query.bind(id),
                    CommentWrite::Body(body, id) => query.bind(body).bind(id),
                    CommentWrite::Moderate(body, approved, id) => {
                        query.bind(body).bind(approved).bind(id)
                    }
                };
                query
                    .execute(mysql_pool(self.pool.as_ref())?)
                    .await
                    .context(what)?
                    .rows_affected()
            }
        };
        Ok(affected)
    }
}

/// Bind values for single-row writes
enum CommentWrite<'a> {
    Id(i64),
    Body(&'a str, i64),
    Moderate(&'a str, bool, i64),
}

const COMMENT_COLUMNS: &str = "id, exercise_id, user_id, body, approved, created_on";

const META_SELECT: &str = r#"
    SELECT c.id, c.exercise_id, c.user_id, c.body, c.approved, c.created_on,
           u.username AS username, e.title AS exercise_title
    FROM comments c
    JOIN users u ON u.id = c.user_id
    JOIN exercises e ON e.id = c.exercise_id
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite_pool(self.pool.as_ref())?, input).await,
            DatabaseDriver::Mysql => create_mysql(mysql_pool(self.pool.as_ref())?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(sqlite_pool(self.pool.as_ref())?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(mysql_pool(self.pool.as_ref())?, id).await,
        }
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<CommentWithMeta>> {
        let mut rows = self.fetch_meta("WHERE c.id = ?", Some(id)).await?;
        Ok(rows.pop())
    }

    async fn list_for_exercise(&self, exercise_id: i64) -> Result<Vec<CommentWithMeta>> {
        self.fetch_meta(
            "WHERE c.exercise_id = ? ORDER BY c.created_on ASC, c.id ASC",
            Some(exercise_id),
        )
        .await
    }

    async fn list_all(&self) -> Result<Vec<CommentWithMeta>> {
        self.fetch_meta("ORDER BY c.id DESC", None).await
    }

    async fn update_body(&self, id: i64, body: &str) -> Result<bool> {
        let affected = self
            .execute(
                "UPDATE comments SET body = ? WHERE id = ?",
                CommentWrite::Body(body, id),
                "Failed to update comment",
            )
            .await?;
        Ok(affected > 0)
    }

    async fn moderate(&self, id: i64, input: &ModerateCommentInput) -> Result<bool> {
        self.execute(
            "UPDATE comments SET body = ?, approved = ? WHERE id = ?",
            CommentWrite::Moderate(&input.body, input.approved, id),
            "Failed to moderate comment",
        )
        .await?;
        Ok(self.get_by_id(id).await?.is_some())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .execute(
                "DELETE FROM comments WHERE id = ?",
                CommentWrite::Id(id),
                "Failed to delete comment",
            )
            .await?;
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO comments (exercise_id, user_id, body, approved, created_on) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(input.exercise_id)
    .bind(input.user_id)
    .bind(&input.body)
    .bind(false)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        exercise_id: input.exercise_id,
        user_id: input.user_id,
        body: input.body.clone(),
        approved: false,
        created_on: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;
    Ok(row.as_ref().map(row_to_comment_sqlite))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        exercise_id: row.get("exercise_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        approved: row.get("approved"),
        created_on: row.get("created_on"),
    }
}

fn row_to_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> CommentWithMeta {
    CommentWithMeta {
        comment: row_to_comment_sqlite(row),
        username: row.get("username"),
        exercise_title: row.get("exercise_title"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO comments (exercise_id, user_id, body, approved, created_on) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(input.exercise_id)
    .bind(input.user_id)
    .bind(&input.body)
    .bind(false)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        exercise_id: input.exercise_id,
        user_id: input.user_id,
        body: input.body.clone(),
        approved: false,
        created_on: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;
    Ok(row.as_ref().map(row_to_comment_mysql))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        exercise_id: row.get("exercise_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        approved: row.get("approved"),
        created_on: row.get("created_on"),
    }
}

fn row_to_meta_mysql(row: &sqlx::mysql::MySqlRow) -> CommentWithMeta {
    CommentWithMeta {
        comment: row_to_comment_mysql(row),
        username: row.get("username"),
        exercise_title: row.get("exercise_title"),
    }
}
