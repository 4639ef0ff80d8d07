//! Exercise service
//!
//! Public catalog reads plus the staff-only mutations used by the admin
//! surface.

use crate::db::repositories::ExerciseRepository;
use crate::forms::{ExerciseForm, FieldErrors};
use crate::models::{Exercise, ListParams, PagedResult};
use anyhow::Context;
use std::sync::Arc;

/// Error types for exercise service operations
#[derive(Debug, thiserror::Error)]
pub enum ExerciseServiceError {
    #[error("Exercise not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ExerciseService {
    repo: Arc<dyn ExerciseRepository>,
}

impl ExerciseService {
    pub fn new(repo: Arc<dyn ExerciseRepository>) -> Self {
        Self { repo }
    }

    /// One page of the catalog ordered by title.
    ///
    /// `raw_page` is the untouched query value; see [`ListParams::resolve`].
    pub async fn list_page(
        &self,
        raw_page: Option<&str>,
        page_size: u32,
    ) -> Result<PagedResult<Exercise>, ExerciseServiceError> {
        let total = self.repo.count().await.context("Failed to count exercises")?;
        let params = ListParams::resolve(raw_page, total, page_size);
        let page = self
            .repo
            .list_by_title(&params)
            .await
            .context("Failed to list exercises")?;
        Ok(page)
    }

    pub async fn get(&self, id: i64) -> Result<Exercise, ExerciseServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get exercise")?
            .ok_or(ExerciseServiceError::NotFound(id))
    }

    /// Every exercise, newest first
    pub async fn list_all(&self) -> Result<Vec<Exercise>, ExerciseServiceError> {
        Ok(self.repo.list_all().await.context("Failed to list exercises")?)
    }

    pub async fn create(&self, form: &ExerciseForm) -> Result<Exercise, ExerciseServiceError> {
        let input = form.validate().map_err(ExerciseServiceError::ValidationError)?;
        let exercise = self
            .repo
            .create(&input)
            .await
            .context("Failed to create exercise")?;
        tracing::info!(exercise_id = exercise.id, "Created exercise {}", exercise.title);
        Ok(exercise)
    }

    pub async fn update(&self, id: i64, form: &ExerciseForm) -> Result<Exercise, ExerciseServiceError> {
        let input = form.validate().map_err(ExerciseServiceError::ValidationError)?;
        self.repo
            .update(id, &input)
            .await
            .context("Failed to update exercise")?
            .ok_or(ExerciseServiceError::NotFound(id))
    }

    /// Delete an exercise together with its comments
    pub async fn delete(&self, id: i64) -> Result<(), ExerciseServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete exercise")?;
        if !deleted {
            return Err(ExerciseServiceError::NotFound(id));
        }
        tracing::info!(exercise_id = id, "Deleted exercise");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxExerciseRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> ExerciseService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        ExerciseService::new(SqlxExerciseRepository::boxed(pool))
    }

    fn form(title: &str) -> ExerciseForm {
        ExerciseForm {
            title: title.to_string(),
            description: format!("How to {}", title),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_page_is_lenient() {
        let service = setup().await;
        for i in 0..8 {
            service.create(&form(&format!("Move {:02}", i))).await.unwrap();
        }

        let first = service.list_page(None, 6).await.unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 6);
        assert_eq!(first.items[0].title, "Move 00");

        let garbage = service.list_page(Some("abc"), 6).await.unwrap();
        assert_eq!(garbage.page, 1);

        let beyond = service.list_page(Some("99"), 6).await.unwrap();
        assert_eq!(beyond.page, 2);
        assert_eq!(beyond.items.len(), 2);

        let negative = service.list_page(Some("-1"), 6).await.unwrap();
        assert_eq!(negative.page, 2);
    }

    #[tokio::test]
    async fn test_empty_catalog_has_one_page() {
        let service = setup().await;
        let page = service.list_page(Some("3"), 6).await.unwrap();
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let service = setup().await;
        assert!(matches!(service.get(42).await, Err(ExerciseServiceError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let service = setup().await;

        let invalid = ExerciseForm::default();
        assert!(matches!(
            service.create(&invalid).await,
            Err(ExerciseServiceError::ValidationError(_))
        ));

        let created = service.create(&form("Squat")).await.unwrap();
        let updated = service.update(created.id, &form("Front Squat")).await.unwrap();
        assert_eq!(updated.title, "Front Squat");
        assert_eq!(updated.created_at.timestamp(), created.created_at.timestamp());

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.delete(created.id).await,
            Err(ExerciseServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.update(created.id, &form("Gone")).await,
            Err(ExerciseServiceError::NotFound(_))
        ));
    }
}
