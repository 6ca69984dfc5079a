//! # Event Rows
//!
//! Flattened records produced from result pages. Rows are plain values:
//! cloned freely, never shared mutably.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribute bag keyed by dotted attribute name.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// One event: its timestamp and its flattened attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub timestamp: DateTime<Utc>,
    pub attributes: Attributes,
}

impl EventRow {
    pub fn new(timestamp: DateTime<Utc>, attributes: Attributes) -> Self {
        Self {
            timestamp,
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// The attribute as a string, if present and a string.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_str())
    }
}

/// A recommendation event joined with the blockers recorded when its
/// optimization started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRow {
    #[serde(flatten)]
    pub event: EventRow,
    pub blocker_attributes: Attributes,
    pub blockers_present: bool,
    /// Blocker identifiers, deduplicated, in first-seen order.
    pub blockers: Vec<String>,
}

impl RecommendationRow {
    /// A recommendation with no blocker context.
    pub fn unblocked(event: EventRow) -> Self {
        Self {
            event,
            blocker_attributes: Attributes::new(),
            blockers_present: false,
            blockers: Vec::new(),
        }
    }
}

/// Output envelope: the rows plus their count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemList<'a, T> {
    pub items: &'a [T],
    pub total: usize,
}

impl<'a, T> ItemList<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            total: items.len(),
        }
    }
}
