//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories. They own
//! the business rules (who may delete what, which user becomes staff) and
//! turn form validation results into typed errors.

pub mod comment;
pub mod contact;
pub mod exercise;
pub mod images;
pub mod password;
pub mod report;
pub mod user;

pub use comment::{CommentService, CommentServiceError, DeleteOutcome};
pub use contact::{ContactService, ContactServiceError};
pub use exercise::{ExerciseService, ExerciseServiceError};
pub use images::{CloudinaryUrlBuilder, WebpFunction};
pub use password::{hash_password, verify_password};
pub use report::{ReportService, ReportServiceError};
pub use user::{UserService, UserServiceError};
