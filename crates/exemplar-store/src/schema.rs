//! Schema definitions for the exemplar index
//!
//! Maps index records onto the SurrealDB document layer and provides tolerant
//! accessors for the flat metadata maps (values may be stored either as
//! strings or as native JSON numbers).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{IndexRecord, Metadata};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Exemplar row as stored in the `exemplars` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemplarRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    /// Logical collection the row belongs to
    pub collection: String,
    /// Caller-chosen stable id
    pub exemplar_id: String,
    /// Section copied out of metadata so the filter can run server-side
    pub section: String,
    /// Embedded document text
    pub document: String,
    /// SHA-256 of `document`
    pub document_digest: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Flat metadata
    pub metadata: serde_json::Value,
    /// Insert timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ExemplarRow {
    /// Build a row from an index record
    pub fn from_record(collection: &str, record: IndexRecord) -> Self {
        let digest = record.document_digest();
        let section = metadata_str(&record.metadata, "section")
            .unwrap_or("Unknown")
            .to_string();
        ExemplarRow {
            id: None,
            collection: collection.to_string(),
            exemplar_id: record.id,
            section,
            document: record.document,
            document_digest: digest.as_str().to_string(),
            embedding: record.embedding,
            metadata: serde_json::Value::Object(record.metadata),
            created_at: Utc::now(),
        }
    }

    /// Metadata as a map (non-object metadata reads as empty)
    pub fn metadata_map(&self) -> Metadata {
        match &self.metadata {
            serde_json::Value::Object(map) => map.clone(),
            _ => Metadata::new(),
        }
    }
}

/// Read a metadata value as a string slice.
pub fn metadata_str<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(|v| v.as_str())
}

/// Read a metadata value as `f64`, accepting numbers and numeric strings.
pub fn metadata_f64(metadata: &Metadata, key: &str) -> Option<f64> {
    match metadata.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a metadata value as `u32`, accepting integers and integer strings.
pub fn metadata_u32(metadata: &Metadata, key: &str) -> Option<u32> {
    match metadata.get(key)? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
