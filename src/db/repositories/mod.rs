//! Database repositories
//!
//! One repository per record type. Each exposes an `async_trait` interface
//! and a sqlx implementation that dispatches on the pool's driver.

pub mod comment;
pub mod contact;
pub mod exercise;
pub mod report;
pub mod session;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use exercise::{ExerciseRepository, SqlxExerciseRepository};
pub use report::{ReportRepository, SqlxReportRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
