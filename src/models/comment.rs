//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment left on an exercise.
///
/// `user_id` is fixed at creation; no update path touches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub exercise_id: i64,
    pub user_id: i64,
    pub body: String,
    /// Set by staff through the admin surface
    pub approved: bool,
    pub created_on: DateTime<Utc>,
}

impl Comment {
    /// Whether `user_id` wrote this comment
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Comment joined with the names the pages display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithMeta {
    #[serde(flatten)]
    pub comment: Comment,
    /// Author username
    pub username: String,
    /// Title of the exercise the comment belongs to
    pub exercise_title: String,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub exercise_id: i64,
    pub user_id: i64,
    pub body: String,
}

/// Moderation edit: body and approval flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerateCommentInput {
    pub body: String,
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership() {
        let comment = Comment {
            id: 1,
            exercise_id: 2,
            user_id: 3,
            body: "Great form tips".to_string(),
            approved: false,
            created_on: Utc::now(),
        };
        assert!(comment.is_owned_by(3));
        assert!(!comment.is_owned_by(4));
    }

    #[test]
    fn test_meta_serializes_flat() {
        let meta = CommentWithMeta {
            comment: Comment {
                id: 1,
                exercise_id: 2,
                user_id: 3,
                body: "hi".to_string(),
                approved: true,
                created_on: Utc::now(),
            },
            username: "dana".to_string(),
            exercise_title: "Lunge".to_string(),
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["body"], "hi");
        assert_eq!(value["username"], "dana");
        assert_eq!(value["approved"], true);
    }
}
