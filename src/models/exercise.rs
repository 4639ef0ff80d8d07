//! Exercise model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog entry. Descriptions 1 and 2 hold trusted rich-text HTML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub title: String,
    /// Short plain-text summary shown on the list page
    pub description: String,
    pub detailed_description1: String,
    pub detailed_description2: String,
    /// Hosted image reference: a delivery URL or a bare public id
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated fields for creating or replacing an exercise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseInput {
    pub title: String,
    pub description: String,
    pub detailed_description1: String,
    pub detailed_description2: String,
    pub image: Option<String>,
}
