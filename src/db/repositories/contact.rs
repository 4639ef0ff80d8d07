//! Contact message repository

use crate::config::DatabaseDriver;
use crate::db::{mysql_pool, sqlite_pool, DynDatabasePool};
use crate::models::{ContactInput, ContactMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Contact message repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Store a submitted message
    async fn create(&self, input: &ContactInput) -> Result<ContactMessage>;

    /// Get message by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>>;

    /// Every message, newest first
    async fn list_all(&self) -> Result<Vec<ContactMessage>>;
}

/// SQLx-based contact message repository implementation
pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, input: &ContactInput) -> Result<ContactMessage> {
        let sql = "INSERT INTO contact_messages (name, email, message, created_at) VALUES (?, ?, ?, ?)";
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.message)
                .bind(now)
                .execute(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to create contact message")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.message)
                .bind(now)
                .execute(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to create contact message")?
                .last_insert_id() as i64,
        };

        Ok(ContactMessage {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            message: input.message.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContactMessage>> {
        let sql = "SELECT id, name, email, message, created_at FROM contact_messages WHERE id = ?";
        let message = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .fetch_optional(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to get contact message")?
                .map(|row| ContactMessage {
                    id: row.get("id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                }),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .fetch_optional(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to get contact message")?
                .map(|row| ContactMessage {
                    id: row.get("id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                }),
        };
        Ok(message)
    }

    async fn list_all(&self) -> Result<Vec<ContactMessage>> {
        let sql = "SELECT id, name, email, message, created_at FROM contact_messages ORDER BY id DESC";
        let messages = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_all(sqlite_pool(self.pool.as_ref())?)
                .await
                .context("Failed to list contact messages")?
                .iter()
                .map(|row| ContactMessage {
                    id: row.get("id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                })
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_all(mysql_pool(self.pool.as_ref())?)
                .await
                .context("Failed to list contact messages")?
                .iter()
                .map(|row| ContactMessage {
                    id: row.get("id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                })
                .collect(),
        };
        Ok(messages)
    }
}
