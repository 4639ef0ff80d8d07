//! Exercise repository
//!
//! - `ExerciseRepository` trait defining the interface for exercise data access
//! - `SqlxExerciseRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{Exercise, ExerciseInput, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Exercise repository trait
#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    /// Create a new exercise, stamping `created_at`
    async fn create(&self, input: &ExerciseInput) -> Result<Exercise>;

    /// Get exercise by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Exercise>>;

    /// Replace the editable fields of an exercise
    async fn update(&self, id: i64, input: &ExerciseInput) -> Result<Option<Exercise>>;

    /// Delete an exercise and, through the foreign keys, its comments
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all exercises
    async fn count(&self) -> Result<i64>;

    /// One page of exercises ordered by title
    async fn list_by_title(&self, params: &ListParams) -> Result<PagedResult<Exercise>>;

    /// Every exercise, newest first
    async fn list_all(&self) -> Result<Vec<Exercise>>;
}

/// SQLx-based exercise repository implementation
pub struct SqlxExerciseRepository {
    pool: DynDatabasePool,
}

impl SqlxExerciseRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ExerciseRepository> {
        Arc::new(Self::new(pool))
    }
}

const EXERCISE_COLUMNS: &str =
    "id, title, description, detailed_description1, detailed_description2, image, created_at";

#[async_trait]
impl ExerciseRepository for SqlxExerciseRepository {
    async fn create(&self, input: &ExerciseInput) -> Result<Exercise> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(sqlite_pool(self.pool.as_ref())?, input).await,
            DatabaseDriver::Mysql => create_mysql(mysql_pool(self.pool.as_ref())?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Exercise>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(sqlite_pool(self.pool.as_ref())?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(mysql_pool(self.pool.as_ref())?, id).await,
        }
    }

    async fn update(&self, id: i64, input: &ExerciseInput) -> Result<Option<Exercise>> {
        let sql = r#"
            UPDATE exercises
            SET title = ?, description = ?, detailed_description1 = ?,
                detailed_description2 = ?, image = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.detailed_description1)
                    .bind(&input.detailed_description2)
                    .bind(&input.image)
                    .bind(id)
                    .execute(sqlite_pool(self.pool.as_ref())?)
                    .await
                    .context("Failed to update exercise")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.detailed_description1)
                    .bind(&input.detailed_description2)
                    .bind(&input.image)
                    .bind(id)
                    .execute(mysql_pool(self.pool.as_ref())?)
                    .await
                    .context("Failed to update exercise")?;
            }
        }

        // MySQL reports zero affected rows for a no-op update; re-read instead.
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM exercises WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to delete exercise")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to delete exercise")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM exercises";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to count exercises")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to count exercises")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list_by_title(&self, params: &ListParams) -> Result<PagedResult<Exercise>> {
        let total = self.count().await?;
        let sql = format!(
            "SELECT {} FROM exercises ORDER BY title ASC, id ASC LIMIT ? OFFSET ?",
            EXERCISE_COLUMNS
        );
        let items = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to list exercises")?
                .iter()
                .map(row_to_exercise_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to list exercises")?
                .iter()
                .map(row_to_exercise_mysql)
                .collect(),
        };
        Ok(PagedResult::new(items, total, params))
    }

    async fn list_all(&self) -> Result<Vec<Exercise>> {
        let sql = format!("SELECT {} FROM exercises ORDER BY id DESC", EXERCISE_COLUMNS);
        let items = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to list exercises")?
                .iter()
                .map(row_to_exercise_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to list exercises")?
                .iter()
                .map(row_to_exercise_mysql)
                .collect(),
        };
        Ok(items)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, input: &ExerciseInput) -> Result<Exercise> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO exercises (title, description, detailed_description1, detailed_description2, image, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.detailed_description1)
    .bind(&input.detailed_description2)
    .bind(&input.image)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create exercise")?;

    Ok(exercise_from_input(result.last_insert_rowid(), input, now))
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Exercise>> {
    let sql = format!("SELECT {} FROM exercises WHERE id = ?", EXERCISE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exercise by ID")?;
    Ok(row.as_ref().map(row_to_exercise_sqlite))
}

fn row_to_exercise_sqlite(row: &sqlx::sqlite::SqliteRow) -> Exercise {
    Exercise {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        detailed_description1: row.get("detailed_description1"),
        detailed_description2: row.get("detailed_description2"),
        image: row.get("image"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, input: &ExerciseInput) -> Result<Exercise> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO exercises (title, description, detailed_description1, detailed_description2, image, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.detailed_description1)
    .bind(&input.detailed_description2)
    .bind(&input.image)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create exercise")?;

    Ok(exercise_from_input(result.last_insert_id() as i64, input, now))
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Exercise>> {
    let sql = format!("SELECT {} FROM exercises WHERE id = ?", EXERCISE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exercise by ID")?;
    Ok(row.as_ref().map(row_to_exercise_mysql))
}

fn row_to_exercise_mysql(row: &sqlx::mysql::MySqlRow) -> Exercise {
    Exercise {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        detailed_description1: row.get("detailed_description1"),
        detailed_description2: row.get("detailed_description2"),
        image: row.get("image"),
        created_at: row.get("created_at"),
    }
}

fn exercise_from_input(id: i64, input: &ExerciseInput, created_at: chrono::DateTime<Utc>) -> Exercise {
    Exercise {
        id,
        title: input.title.clone(),
        description: input.description.clone(),
        detailed_description1: input.detailed_description1.clone(),
        detailed_description2: input.detailed_description2.clone(),
        image: input.image.clone(),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxExerciseRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxExerciseRepository::new(pool)
    }

    fn input(title: &str) -> ExerciseInput {
        ExerciseInput {
            title: title.to_string(),
            description: format!("{} basics", title),
            detailed_description1: "<p>Step one</p>".to_string(),
            detailed_description2: String::new(),
            image: Some("https://res.cloudinary.com/demo/image/upload/v1/squat.jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("Squat")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().expect("missing");
        assert_eq!(found.title, "Squat");
        assert_eq!(found.detailed_description1, "<p>Step one</p>");
        assert_eq!(found.image.as_deref(), created.image.as_deref());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_title_orders_and_pages() {
        let repo = setup_test_repo().await;
        for title in ["Plank", "Burpee", "Squat", "Lunge", "Deadlift", "Crunch", "Row", "Bridge"] {
            repo.create(&input(title)).await.unwrap();
        }

        let first = repo.list_by_title(&ListParams::new(1, 6)).await.unwrap();
        let titles: Vec<&str> = first.items.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Bridge", "Burpee", "Crunch", "Deadlift", "Lunge", "Plank"]);
        assert_eq!(first.total, 8);
        assert_eq!(first.total_pages(), 2);

        let second = repo.list_by_title(&ListParams::new(2, 6)).await.unwrap();
        let titles: Vec<&str> = second.items.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Row", "Squat"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let created = repo.create(&input("Squat")).await.unwrap();

        let mut changed = input("Front Squat");
        changed.image = None;
        let updated = repo.update(created.id, &changed).await.unwrap().expect("missing");
        assert_eq!(updated.title, "Front Squat");
        assert!(updated.image.is_none());
        assert_eq!(updated.created_at, created.created_at);

        assert!(repo.update(999, &changed).await.unwrap().is_none());

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let repo = setup_test_repo().await;
        repo.create(&input("A")).await.unwrap();
        repo.create(&input("B")).await.unwrap();
        let all = repo.list_all().await.unwrap();
        assert_eq!(all[0].title, "B");
        assert_eq!(all[1].title, "A");
    }
}
