//! Error types for the persistence layer.
//!
//! This module defines all error types used throughout the persistence layer,
//! following a hierarchy that separates mapping errors (registry, schema and
//! hydration), validation errors, resource state errors, transaction errors
//! and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage operations.
///
/// This enum encompasses all possible errors that can occur during persistence
/// operations, organized by category.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Object mapping errors
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true when the error reports a unique index violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::DuplicateKey { .. }))
    }

    /// Returns true when the error reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Resource(ResourceError::NotFound { .. }))
    }
}

/// Errors raised while mapping between typed models and store rows.
#[derive(Error, Debug)]
pub enum MappingError {
    /// No handler is registered for the native type or datatype.
    #[error("no deserializer registered for {key}")]
    DeserializerNotFound { key: String },

    /// A resource type could not be classified into a schema.
    #[error("cannot build schema for {type_name}: field '{field}' {reason}")]
    SchemaBuild {
        type_name: String,
        field: String,
        reason: String,
    },

    /// A result row does not carry a column the schema expects.
    #[error("result row does not match schema of {type_name}: missing column '{column}'")]
    UnknownResultRow { type_name: String, column: String },

    /// A lexical form could not be parsed with its datatype handler.
    #[error("invalid literal '{lexical}' for datatype {datatype}")]
    InvalidLiteral { datatype: String, lexical: String },

    /// The model does not accept a value for this field.
    #[error("{type_name} has no settable field '{field}'")]
    UnknownField { type_name: String, field: String },
}

/// Errors related to input validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// An identifier is not a syntactically valid absolute URI.
    #[error("invalid identifier '{value}': {message}")]
    InvalidIdentifier { value: String, message: String },

    /// The variable has no declared datatype in the graph store.
    #[error("variable {variable} has no declared datatype")]
    NoVariableDataType { variable: String },

    /// A measurement value does not match its variable's datatype.
    #[error("value {value} of variable {variable} is not a valid {expected}")]
    TypeMismatch {
        variable: String,
        value: String,
        expected: String,
    },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A search asked to sort on a field that cannot be ordered.
    #[error("cannot sort {type_name} by '{field}'")]
    UnsupportedSortField { type_name: String, field: String },

    /// The configuration is not usable.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource was not found.
    #[error("resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// A unique index rejected the write.
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: String, key: String },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },

    /// Transaction is no longer valid (already committed or rolled back).
    #[error("transaction no longer valid")]
    InvalidTransaction,

    /// The backend cannot open multi-document transactions.
    #[error("transactions not supported by {backend_name}")]
    Unsupported { backend_name: String },
}

/// Errors originating from a store backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Blob storage failed for the given path.
    #[error("storage i/o error on {path}: {message}")]
    StorageIo {
        path: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

// Implement conversions from common error types

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::StorageIo {
            path: "unknown".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => {
                StorageError::Resource(ResourceError::NotFound {
                    resource_type: "blob".to_string(),
                    id: path,
                })
            }
            other => StorageError::Backend(BackendError::StorageIo {
                path: "object_store".to_string(),
                message: other.to_string(),
                source: Some(Box::new(other)),
            }),
        }
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "mongodb".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sparql-http")]
impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: "sparql-http".to_string(),
                message: err.to_string(),
            });
        }
        StorageError::Backend(BackendError::Internal {
            backend_name: "sparql-http".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}
