//! SurrealDB Handle - Connection and Schema
//!
//! Manages the connection used by the exemplar index. Supports in-memory
//! (`mem://`), embedded on-disk (`surrealkv://<path>`) and remote (`ws://`,
//! `wss://`) endpoints through the `any` engine.

use crate::error::StoreError;
use crate::storage_traits::StoreResult;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

/// Default on-disk location of the embedded index.
pub const DEFAULT_INDEX_PATH: &str = ".examforge/index";

/// Default collection name for ingested exam questions.
pub const DEFAULT_COLLECTION: &str = "exam_questions";

/// Connection configuration for the exemplar index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Endpoint URL understood by the SurrealDB `any` engine
    pub url: String,
    /// Namespace (default: "examforge")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Logical collection (default: "exam_questions")
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: format!("surrealkv://{}", DEFAULT_INDEX_PATH),
            namespace: "examforge".to_string(),
            database: "main".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl IndexConfig {
    /// In-memory configuration (tests, dry runs)
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            ..Self::default()
        }
    }

    /// Set custom collection
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - EXAMFORGE_INDEX_URL (optional, wins over the path)
    /// - EXAMFORGE_INDEX_PATH (optional, default: ".examforge/index")
    /// - EXAMFORGE_NAMESPACE (optional, default: "examforge")
    /// - EXAMFORGE_DATABASE (optional, default: "main")
    /// - EXAMFORGE_COLLECTION (optional, default: "exam_questions")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let url = match std::env::var("EXAMFORGE_INDEX_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => match std::env::var("EXAMFORGE_INDEX_PATH") {
                Ok(path) if !path.trim().is_empty() => format!("surrealkv://{}", path.trim()),
                _ => defaults.url,
            },
        };

        Self {
            url,
            namespace: std::env::var("EXAMFORGE_NAMESPACE").unwrap_or(defaults.namespace),
            database: std::env::var("EXAMFORGE_DATABASE").unwrap_or(defaults.database),
            collection: std::env::var("EXAMFORGE_COLLECTION").unwrap_or(defaults.collection),
        }
    }
}

/// SurrealDB connection handle for the exemplar index
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

impl SurrealHandle {
    /// Connect to an in-memory database and set up schema
    #[instrument(skip_all)]
    pub async fn setup_db() -> StoreResult<Self> {
        Self::connect(&IndexConfig::in_memory()).await
    }

    /// Connect using the given configuration and set up schema
    #[instrument(skip(config), fields(url = %config.url, namespace = %config.namespace))]
    pub async fn connect(config: &IndexConfig) -> StoreResult<Self> {
        info!("Connecting to exemplar index");

        let db = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;

        info!("Exemplar index connected and schema initialized");
        Ok(handle)
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> StoreResult<()> {
        debug!("Initializing exemplar schema");

        let schema = r#"
            -- Exemplars table (vector + document + flat metadata)
            DEFINE TABLE IF NOT EXISTS exemplars SCHEMAFULL;
            DEFINE FIELD IF NOT EXISTS collection ON exemplars TYPE string;
            DEFINE FIELD IF NOT EXISTS exemplar_id ON exemplars TYPE string;
            DEFINE FIELD IF NOT EXISTS section ON exemplars TYPE string;
            DEFINE FIELD IF NOT EXISTS document ON exemplars TYPE string;
            DEFINE FIELD IF NOT EXISTS document_digest ON exemplars TYPE string;
            DEFINE FIELD IF NOT EXISTS embedding ON exemplars TYPE array<float>;
            DEFINE FIELD IF NOT EXISTS metadata ON exemplars FLEXIBLE TYPE object;
            DEFINE FIELD IF NOT EXISTS created_at ON exemplars TYPE datetime;
            DEFINE INDEX IF NOT EXISTS idx_exemplar_id ON exemplars FIELDS collection, exemplar_id UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_exemplar_section ON exemplars FIELDS collection, section;
        "#;

        self.db
            .query(schema)
            .await
            .and_then(|response| response.check())
            .map_err(|e| StoreError::SchemaSetup(e.to_string()))?;

        debug!("Schema initialized successfully");
        Ok(())
    }

    /// Underlying client
    pub(crate) fn db(&self) -> &Surreal<Any> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_config() {
        let config = IndexConfig::in_memory().with_collection("demo");
        assert_eq!(config.url, "mem://");
        assert_eq!(config.collection, "demo");
        assert_eq!(config.namespace, "examforge");
    }

    #[test]
    fn test_default_config_is_on_disk() {
        let config = IndexConfig::default();
        assert!(config.url.starts_with("surrealkv://"));
        assert_eq!(config.collection, DEFAULT_COLLECTION);
    }

    #[tokio::test]
    async fn test_surreal_connection_and_schema_creation() {
        let handle = SurrealHandle::setup_db().await;
        assert!(handle.is_ok());
    }
}
