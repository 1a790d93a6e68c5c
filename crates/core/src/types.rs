//! Record item value types
//!
//! The remote store holds versioned items. Each item is identified by an
//! [`ItemKey`] (opaque ID plus a version stamp that changes on every remote
//! update), carries an [`ItemType`] descriptor, and optionally a typed data
//! payload. The version stamp drives cache invalidation: a local item whose
//! stamp no longer matches the requested key is treated as absent, not stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one record item: opaque ID plus version stamp
///
/// Two keys are equal when both ID and version stamp match.
/// `is_version` is the weaker check used for cache validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    /// Opaque item identifier, stable across versions
    pub id: String,
    /// Version stamp, reissued by the service on every update
    pub version: String,
}

impl ItemKey {
    /// Create a key from an existing ID and version stamp
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Create a key for a locally authored item
    ///
    /// The service will reissue the version stamp when the item is uploaded.
    pub fn new_random() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            version: Uuid::new_v4().to_string(),
        }
    }

    /// Weak version check: an absent (empty) requested version matches any
    /// stored stamp; otherwise the stamps must be equal.
    ///
    /// IDs are not compared here; callers look items up by ID first.
    pub fn is_version(&self, version: &str) -> bool {
        version.is_empty() || self.version == version
    }

    /// Full key equality: same ID and same version stamp
    pub fn equals_key(&self, other: &ItemKey) -> bool {
        self.id == other.id && self.version == other.version
    }
}

/// Type descriptor for an item's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemType {
    /// Type-version identifier (schema type + version)
    pub id: String,
    /// Human-readable type name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Schema version label, if the service reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ItemType {
    /// Create a descriptor from a type-version identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            version: None,
        }
    }
}

/// Typed payload attached to an item during deserialization
///
/// The payload is kept as a JSON document; schema-aware layers above this
/// crate interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedData {
    /// Type-version identifier of the payload
    pub type_id: String,
    /// The payload document
    pub value: serde_json::Value,
}

impl TypedData {
    /// Create a typed payload
    pub fn new(type_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            type_id: type_id.into(),
            value,
        }
    }
}

/// Full persisted representation of one record item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordItem {
    /// Item identity
    pub key: ItemKey,
    /// Type descriptor
    pub item_type: ItemType,
    /// When the underlying observation took effect, if dated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    /// Typed payload, present iff one was attached during deserialization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TypedData>,
}

impl RecordItem {
    /// Create an item with a typed payload
    pub fn new(key: ItemKey, item_type: ItemType, data: TypedData) -> Self {
        Self {
            key,
            item_type,
            effective_date: None,
            data: Some(data),
        }
    }

    /// True iff a typed payload was attached
    pub fn has_typed_data(&self) -> bool {
        self.data.is_some()
    }

    /// Borrow the typed payload, if attached
    pub fn typed_data(&self) -> Option<&TypedData> {
        self.data.as_ref()
    }

    /// Take the typed payload out of the item
    pub fn into_typed_data(self) -> Option<TypedData> {
        self.data
    }
}

/// Key/date entry returned by a remote key listing
///
/// These are the raw rows a view synchronization turns into view keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingItem {
    /// Identity of the listed item
    pub key: ItemKey,
    /// Effective date reported by the listing, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
}
