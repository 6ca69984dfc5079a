//! # Result Sets
//!
//! The shape of what the query service hands back. One [`QueryResponse`]
//! carries a main [`DataSet`] (a table of [`Cell`]s) plus row-level errors.
//! Each dataset may carry named continuation [`Links`]; their contents are
//! owned by the service and treated as opaque cursors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link followed to fetch the next page of a bounded query.
pub const NEXT: &str = "next";

/// Link polled for newly arrived rows after the bounded pages run out.
pub const FOLLOW: &str = "follow";

/// An opaque continuation reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link(String);

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Named continuation links attached to a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(BTreeMap<String, Link>);

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, link: Link) {
        self.0.insert(name.into(), link);
    }

    pub fn get(&self, name: &str) -> Option<&Link> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Link)> for Links {
    fn from_iter<I: IntoIterator<Item = (N, Link)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, l)| (n.into(), l)).collect())
    }
}

/// One cell of a result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Attribute bag: key/value pairs in the order the service returned them.
    Complex(Vec<(String, serde_json::Value)>),
    /// A nested table with its own links.
    #[serde(rename = "dataset")]
    DataSet(Box<DataSet>),
}

impl Cell {
    /// Short name used in shape-violation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Complex(_) => "complex",
            Self::DataSet(_) => "dataset",
        }
    }
}

/// A table of rows plus the links that continue it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub name: String,
    #[serde(default)]
    pub data: Vec<Vec<Cell>>,
    #[serde(default)]
    pub links: Links,
}

impl DataSet {
    pub fn new(name: impl Into<String>, data: Vec<Vec<Cell>>, links: Links) -> Self {
        Self {
            name: name.into(),
            data,
            links,
        }
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    pub fn has_link(&self, name: &str) -> bool {
        self.links.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A row-level error reported alongside otherwise usable data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

/// One response from the query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub errors: Vec<ResponseError>,
    #[serde(default)]
    pub main: Option<DataSet>,
}

impl QueryResponse {
    pub fn with_main(main: DataSet) -> Self {
        Self {
            errors: Vec::new(),
            main: Some(main),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ResponseError] {
        &self.errors
    }

    pub fn main(&self) -> Option<&DataSet> {
        self.main.as_ref()
    }

    pub fn into_main(self) -> Option<DataSet> {
        self.main
    }
}
