//! Item query model
//!
//! A query names the items it wants either explicitly (by key, used by batch
//! downloads) or by filter (used by view synchronization), and declares which
//! sections of each item to fetch plus which type-versions are acceptable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ItemKey;

/// Which sections of an item a fetch should return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSections {
    /// Core metadata plus typed data (the default fetch)
    #[default]
    Standard,
    /// Core metadata only
    Core,
    /// Everything, including blob references
    All,
}

/// Predicate over items for listings and view synchronization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Restrict to these type-version identifiers; empty means any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_ids: Vec<String>,
    /// Lower bound (inclusive) on effective date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date_min: Option<DateTime<Utc>>,
    /// Upper bound (inclusive) on effective date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date_max: Option<DateTime<Utc>>,
}

impl ItemFilter {
    /// Filter matching items of one type-version
    pub fn for_type(type_id: impl Into<String>) -> Self {
        Self {
            type_ids: vec![type_id.into()],
            ..Self::default()
        }
    }
}

/// A saved or ad-hoc item query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemQuery {
    /// Optional query name; views default their name from this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Explicit keys to fetch; used by batch downloads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<ItemKey>,
    /// Filters applied by key/date listings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<ItemFilter>,
    /// Sections to fetch
    #[serde(default)]
    pub sections: ItemSections,
    /// Acceptable type-version identifiers; empty means any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_versions: Vec<String>,
    /// Cap on listing size, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

impl ItemQuery {
    /// Query for exactly the given keys
    pub fn for_keys(keys: impl IntoIterator<Item = ItemKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Query by filter, named so a view built on it has a name
    pub fn filtered(name: impl Into<String>, filter: ItemFilter) -> Self {
        Self {
            name: Some(name.into()),
            filters: vec![filter],
            ..Self::default()
        }
    }
}
