//! Error types and result types for document client operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Backends map their transport and service failures onto [`DocumentStoreError`],
//! and callers that only care about the broad failure category can use
//! [`DocumentStoreError::class`].

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// The caller supplied invalid arguments. Raised before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the partition.
    /// The first argument is the document ID, the second is the container name.
    #[error("Document {0} already exists in container {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the container.
    /// The first argument is the document ID, the second is the container name.
    #[error("Document not found {0} in container {1}")]
    DocumentNotFound(String, String),
    /// The requested database does not exist.
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),
    /// The requested container does not exist in the database.
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    /// The requested server-side function does not exist in the container.
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
    /// An optimistic concurrency precondition (etag) did not hold.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    /// The service rejected the request as malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// The service is rate limiting this client.
    #[error("Request throttled, retry after {retry_after_ms:?} ms")]
    Throttled { retry_after_ms: Option<u64> },
    /// Transport or service failure unrelated to the request itself.
    #[error("Connectivity error: {0}")]
    Connectivity(String),
    /// The operation was aborted through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
    /// A filter expression could not be expressed in the service's query language.
    #[error("Unsupported predicate: {0}")]
    UnsupportedPredicate(String),
    /// The operation is declared but intentionally not supported.
    #[error("Operation not implemented: {0}")]
    Unimplemented(&'static str),
    /// An error occurred in the underlying backend that fits no other category.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Broad failure categories used to decide how a caller should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Conflict,
    BadRequest,
    Throttled,
    Connectivity,
    Cancelled,
    UnsupportedPredicate,
    Unimplemented,
    Internal,
}

impl ErrorClass {
    /// HTTP status code conventionally associated with this class.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorClass::Validation | ErrorClass::BadRequest | ErrorClass::UnsupportedPredicate => 400,
            ErrorClass::NotFound => 404,
            ErrorClass::Conflict => 409,
            ErrorClass::Throttled => 429,
            ErrorClass::Cancelled => 499,
            ErrorClass::Unimplemented => 501,
            ErrorClass::Connectivity => 503,
            ErrorClass::Internal => 500,
        }
    }
}

impl DocumentStoreError {
    /// Returns the failure category of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            DocumentStoreError::Validation(_) => ErrorClass::Validation,
            DocumentStoreError::DocumentNotFound(..)
            | DocumentStoreError::DatabaseNotFound(_)
            | DocumentStoreError::ContainerNotFound(_)
            | DocumentStoreError::FunctionNotFound(_) => ErrorClass::NotFound,
            DocumentStoreError::DocumentAlreadyExists(..)
            | DocumentStoreError::PreconditionFailed(_) => ErrorClass::Conflict,
            DocumentStoreError::BadRequest(_) => ErrorClass::BadRequest,
            DocumentStoreError::Throttled { .. } => ErrorClass::Throttled,
            DocumentStoreError::Connectivity(_)
            | DocumentStoreError::Initialization(_) => ErrorClass::Connectivity,
            DocumentStoreError::Cancelled => ErrorClass::Cancelled,
            DocumentStoreError::UnsupportedPredicate(_) => ErrorClass::UnsupportedPredicate,
            DocumentStoreError::Unimplemented(_) => ErrorClass::Unimplemented,
            DocumentStoreError::Serialization(_)
            | DocumentStoreError::Backend(_) => ErrorClass::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.class() == ErrorClass::Conflict
    }
}

/// A specialized `Result` type for document client operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
