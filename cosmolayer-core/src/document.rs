//! Core traits and types for document representation and serialization.
//!
//! This module provides the fundamental trait that all stored documents must implement,
//! the [`PartitionKey`] value used to route documents, and utilities for converting
//! documents between BSON and JSON.

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};
use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Core trait that all documents stored through a client must implement.
///
/// A document has a stable string identifier, unique within its partition, and a
/// partition key value. The client is generic over the document type and places no
/// other constraint on its fields.
///
/// The trait can be derived with `#[derive(Document)]` from the `cosmolayer` crate.
///
/// # Example
///
/// ```ignore
/// use cosmolayer_core::document::{Document, PartitionKey};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Order {
///     pub id: String,
///     pub customer: String,
/// }
///
/// impl Document for Order {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn partition_key(&self) -> PartitionKey {
///         PartitionKey::from(self.customer.as_str())
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Name of the serialized field holding the identifier, used when filtering by id.
    const ID_FIELD: &'static str = "id";

    /// Returns this document's unique identifier.
    fn id(&self) -> &str;

    /// Returns the partition key value this document is routed by.
    ///
    /// Defaults to the document id, matching containers partitioned on `/id`.
    fn partition_key(&self) -> PartitionKey {
        PartitionKey::from(self.id())
    }
}

/// A partition key value.
///
/// Partition keys are scalar JSON values. Integers are normalized to 64 bits so that
/// keys built from `i32` and `i64` compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionKey(Bson);

impl PartitionKey {
    /// The partition key of documents that carry no value at the key path.
    pub fn null() -> Self {
        PartitionKey(Bson::Null)
    }

    /// Builds a partition key from an arbitrary BSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::BadRequest`] if the value is not a scalar.
    pub fn try_from_bson(value: Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::Int32(value) => Ok(PartitionKey(Bson::Int64(value as i64))),
            Bson::Null | Bson::Boolean(_) | Bson::Int64(_) | Bson::Double(_) | Bson::String(_) => {
                Ok(PartitionKey(value))
            }
            other => Err(DocumentStoreError::BadRequest(format!(
                "partition key must be a scalar value, got {other}"
            ))),
        }
    }

    pub fn as_bson(&self) -> &Bson {
        &self.0
    }

    pub fn into_bson(self) -> Bson {
        self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Bson::String(value) => write!(f, "{value}"),
            other => write!(f, "{other}"),
        }
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        PartitionKey(Bson::String(value.to_string()))
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        PartitionKey(Bson::String(value))
    }
}

impl From<&String> for PartitionKey {
    fn from(value: &String) -> Self {
        PartitionKey(Bson::String(value.clone()))
    }
}

impl From<i32> for PartitionKey {
    fn from(value: i32) -> Self {
        PartitionKey(Bson::Int64(value as i64))
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        PartitionKey(Bson::Int64(value))
    }
}

impl From<f64> for PartitionKey {
    fn from(value: f64) -> Self {
        PartitionKey(Bson::Double(value))
    }
}

impl From<bool> for PartitionKey {
    fn from(value: bool) -> Self {
        PartitionKey(Bson::Boolean(value))
    }
}

/// Extension trait providing serialization/deserialization utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON document for transport.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the type does not serialize to a map.
    fn to_bson_document(&self) -> DocumentStoreResult<bson::Document>;

    /// Creates a document from a BSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson_document(&self) -> DocumentStoreResult<bson::Document> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            other => Err(DocumentStoreError::Serialization(format!(
                "expected a document, serialized to {other}"
            ))),
        }
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}
