//! The product entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cosmolayer::Document;

/// A catalog product.
///
/// Products are stored in a container partitioned on `/id`, so the id is also the
/// partition key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[document(id)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub created_by: String,
    pub modified_by: String,
}

impl Product {
    /// Creates a product with a fresh random id, authored now by `author`.
    pub fn new(name: impl Into<String>, description: impl Into<String>, author: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, description, author)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let author = author.into();

        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            created_on: now,
            updated_on: now,
            created_by: author.clone(),
            modified_by: author,
        }
    }
}
