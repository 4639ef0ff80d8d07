//! Comment service
//!
//! Comments are created unapproved by signed-in users. Only the author may
//! delete a comment from the public pages; staff moderate through the admin
//! surface.

use crate::db::repositories::{CommentRepository, ExerciseRepository};
use crate::forms::{CommentForm, CommentModerationForm, FieldErrors};
use crate::models::{Comment, CommentWithMeta, CreateCommentInput, Exercise};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Exercise or comment does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a public delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The caller is not the author; nothing changed
    NotOwner,
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    exercise_repo: Arc<dyn ExerciseRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, exercise_repo: Arc<dyn ExerciseRepository>) -> Self {
        Self { repo, exercise_repo }
    }

    async fn exercise(&self, id: i64) -> Result<Exercise, CommentServiceError> {
        self.exercise_repo
            .get_by_id(id)
            .await
            .context("Failed to get exercise")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("exercise {}", id)))
    }

    async fn comment(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", id)))
    }

    /// Add a comment on behalf of `user_id`. The new comment awaits approval.
    pub async fn add(
        &self,
        exercise_id: i64,
        user_id: i64,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        let exercise = self.exercise(exercise_id).await?;
        let body = form.validate().map_err(CommentServiceError::ValidationError)?;

        let comment = self
            .repo
            .create(&CreateCommentInput {
                exercise_id: exercise.id,
                user_id,
                body,
            })
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, exercise_id, user_id, "Comment added");
        Ok(comment)
    }

    /// All comments on an exercise in posting order, approved or not
    pub async fn comments_for(&self, exercise_id: i64) -> Result<Vec<CommentWithMeta>, CommentServiceError> {
        Ok(self
            .repo
            .list_for_exercise(exercise_id)
            .await
            .context("Failed to list comments")?)
    }

    /// Resolve both ids of a nested comment route.
    ///
    /// The comment is looked up on its own; it need not belong to the exercise.
    pub async fn get_pair(
        &self,
        exercise_id: i64,
        comment_id: i64,
    ) -> Result<(Exercise, Comment), CommentServiceError> {
        let exercise = self.exercise(exercise_id).await?;
        let comment = self.comment(comment_id).await?;
        Ok((exercise, comment))
    }

    /// Replace a comment's body.
    ///
    /// Any signed-in user may edit any comment; authorship is not checked.
    pub async fn edit(
        &self,
        exercise_id: i64,
        comment_id: i64,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        let (_, mut comment) = self.get_pair(exercise_id, comment_id).await?;
        let body = form.validate().map_err(CommentServiceError::ValidationError)?;

        self.repo
            .update_body(comment.id, &body)
            .await
            .context("Failed to update comment")?;
        comment.body = body;
        Ok(comment)
    }

    /// Delete a comment if `caller_id` wrote it
    pub async fn delete(
        &self,
        exercise_id: i64,
        comment_id: i64,
        caller_id: i64,
    ) -> Result<DeleteOutcome, CommentServiceError> {
        let (_, comment) = self.get_pair(exercise_id, comment_id).await?;

        if !comment.is_owned_by(caller_id) {
            tracing::warn!(
                comment_id,
                caller_id,
                author_id = comment.user_id,
                "Refused to delete another user's comment"
            );
            return Ok(DeleteOutcome::NotOwner);
        }

        self.repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;
        tracing::info!(comment_id, caller_id, "Comment deleted by author");
        Ok(DeleteOutcome::Deleted)
    }

    // ========================================================================
    // Staff operations
    // ========================================================================

    pub async fn list_all(&self) -> Result<Vec<CommentWithMeta>, CommentServiceError> {
        Ok(self.repo.list_all().await.context("Failed to list comments")?)
    }

    pub async fn get_with_meta(&self, id: i64) -> Result<CommentWithMeta, CommentServiceError> {
        self.repo
            .get_with_meta(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", id)))
    }

    /// Staff edit of body and approval flag
    pub async fn moderate(
        &self,
        id: i64,
        form: &CommentModerationForm,
    ) -> Result<(), CommentServiceError> {
        let input = form.validate().map_err(CommentServiceError::ValidationError)?;
        let found = self
            .repo
            .moderate(id, &input)
            .await
            .context("Failed to moderate comment")?;
        if !found {
            return Err(CommentServiceError::NotFound(format!("comment {}", id)));
        }
        tracing::info!(comment_id = id, approved = input.approved, "Comment moderated");
        Ok(())
    }

    /// Staff delete, no ownership check
    pub async fn admin_delete(&self, id: i64) -> Result<(), CommentServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete comment")?;
        if !deleted {
            return Err(CommentServiceError::NotFound(format!("comment {}", id)));
        }
        tracing::info!(comment_id = id, "Comment deleted by staff");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCommentRepository, SqlxExerciseRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ExerciseInput, User, UserRole};

    struct Fixture {
        service: CommentService,
        exercise_id: i64,
        author: i64,
        other: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["author", "other"] {
            let user = users
                .create(&User::new(
                    name.to_string(),
                    format!("{}@example.com", name),
                    "hash".to_string(),
                    UserRole::Member,
                ))
                .await
                .unwrap();
            ids.push(user.id);
        }

        let exercise_repo = SqlxExerciseRepository::boxed(pool.clone());
        let exercise = exercise_repo
            .create(&ExerciseInput {
                title: "Plank".to_string(),
                description: "Core".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        Fixture {
            service: CommentService::new(SqlxCommentRepository::boxed(pool), exercise_repo),
            exercise_id: exercise.id,
            author: ids[0],
            other: ids[1],
        }
    }

    fn body(text: &str) -> CommentForm {
        CommentForm {
            body: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_creates_unapproved_comment() {
        let f = setup().await;
        let comment = f.service.add(f.exercise_id, f.author, &body("Keep hips level")).await.unwrap();
        assert!(!comment.approved);
        assert_eq!(comment.user_id, f.author);

        let listed = f.service.comments_for(f.exercise_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "author");
    }

    #[tokio::test]
    async fn test_add_rejects_blank_body_and_missing_exercise() {
        let f = setup().await;
        assert!(matches!(
            f.service.add(f.exercise_id, f.author, &body("  ")).await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.add(999, f.author, &body("hi")).await,
            Err(CommentServiceError::NotFound(_))
        ));
        assert!(f.service.comments_for(f.exercise_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_keeps_comment() {
        let f = setup().await;
        let comment = f.service.add(f.exercise_id, f.author, &body("mine")).await.unwrap();

        let outcome = f.service.delete(f.exercise_id, comment.id, f.other).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotOwner);
        assert_eq!(f.service.comments_for(f.exercise_id).await.unwrap().len(), 1);

        let outcome = f.service.delete(f.exercise_id, comment.id, f.author).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(f.service.comments_for(f.exercise_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_does_not_check_author() {
        let f = setup().await;
        let comment = f.service.add(f.exercise_id, f.author, &body("before")).await.unwrap();

        let edited = f
            .service
            .edit(f.exercise_id, comment.id, &body("after"))
            .await
            .unwrap();
        assert_eq!(edited.body, "after");
        assert_eq!(edited.user_id, f.author);

        assert!(matches!(
            f.service.edit(f.exercise_id, 999, &body("x")).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_moderate_and_admin_delete() {
        let f = setup().await;
        let comment = f.service.add(f.exercise_id, f.author, &body("pending")).await.unwrap();

        let form = CommentModerationForm {
            body: "approved text".to_string(),
            approved: Some("on".to_string()),
        };
        f.service.moderate(comment.id, &form).await.unwrap();

        let meta = f.service.get_with_meta(comment.id).await.unwrap();
        assert!(meta.comment.approved);
        assert_eq!(meta.comment.body, "approved text");
        assert_eq!(meta.exercise_title, "Plank");

        f.service.admin_delete(comment.id).await.unwrap();
        assert!(matches!(
            f.service.admin_delete(comment.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.moderate(comment.id, &form).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
