//! Database layer
//!
//! SQLite is the default backend (single-file deployment); MySQL is
//! available for larger installs. The driver is selected from configuration
//! and hidden behind the `DatabasePool` trait.
//!
//! ```ignore
//! use exercise_blog::config::DatabaseConfig;
//! use exercise_blog::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, mysql_pool, sqlite_pool, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase,
};
