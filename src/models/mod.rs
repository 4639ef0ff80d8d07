//! Data models
//!
//! Database entities (User, Session, Exercise, Comment, ContactMessage,
//! CommentReport), their input value-objects, and pagination types.

mod comment;
mod contact;
mod exercise;
mod pagination;
mod report;
mod session;
mod user;

pub use comment::{Comment, CommentWithMeta, CreateCommentInput, ModerateCommentInput};
pub use contact::{ContactInput, ContactMessage};
pub use exercise::{Exercise, ExerciseInput};
pub use pagination::{num_pages, ListParams, PageInfo, PagedResult, MAX_PAGE_SIZE};
pub use report::{CommentReport, CommentReportWithMeta, CreateReportInput};
pub use session::Session;
pub use user::{CreateUserInput, User, UserRole};
