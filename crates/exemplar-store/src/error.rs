//! Error types for exemplar-store

use thiserror::Error;

/// Errors that can occur in the exemplar index layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database connection error
    #[error("Index connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Index query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// Vector dimensionality does not match the stored vectors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The collection holds no records
    #[error("Collection '{0}' is empty; run ingestion first")]
    EmptyCollection(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors produced by an embedding provider
#[derive(Error, Debug)]
pub enum EmbedError {
    /// The provider could not be reached or rejected the request
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The provider answered with something that is not a vector
    #[error("Embedding response malformed: {0}")]
    Malformed(String),

    /// The provider returned an empty vector
    #[error("Embedding provider returned an empty vector")]
    Empty,
}
