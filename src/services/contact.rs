//! Contact message service

use crate::db::repositories::ContactRepository;
use crate::forms::{ContactForm, FieldErrors};
use crate::models::ContactMessage;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    #[error("Contact message not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    /// Validate and store a visitor's message
    pub async fn submit(&self, form: &ContactForm) -> Result<ContactMessage, ContactServiceError> {
        let input = form.validate().map_err(ContactServiceError::ValidationError)?;
        let message = self
            .repo
            .create(&input)
            .await
            .context("Failed to store contact message")?;
        tracing::info!(message_id = message.id, "Contact message received from {}", message.email);
        Ok(message)
    }

    pub async fn list_all(&self) -> Result<Vec<ContactMessage>, ContactServiceError> {
        Ok(self
            .repo
            .list_all()
            .await
            .context("Failed to list contact messages")?)
    }

    pub async fn get(&self, id: i64) -> Result<ContactMessage, ContactServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get contact message")?
            .ok_or(ContactServiceError::NotFound(id))
    }
}
