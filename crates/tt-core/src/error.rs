//! # Errors
//!
//! Only fatal conditions live here. Soft conditions (partial results, missing
//! entities, join misses) are logged where they happen and never surface as
//! an [`Error`].

use std::fmt;

use thiserror::Error;

/// Failure type used at the query-client boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// Where in a result set a shape violation was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Dataset name as reported by the service, or a local label.
    pub dataset: String,
    /// 1-based page (or follow poll) number.
    pub page: Option<usize>,
    /// 0-based row index within the page.
    pub row: Option<usize>,
}

impl Location {
    pub fn dataset(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            page: None,
            row: None,
        }
    }

    pub fn page(dataset: impl Into<String>, page: usize) -> Self {
        Self {
            page: Some(page),
            ..Self::dataset(dataset)
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(page) = self.page {
            write!(f, "page {} ", page)?;
        }
        write!(f, "dataset `{}`", self.dataset)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The query client could not execute or continue a query.
    #[error("{context}: {source}")]
    RemoteQuery {
        context: String,
        #[source]
        source: BoxError,
    },

    /// A page, row or attribute did not have the expected shape.
    #[error("unexpected data shape in {location}: {detail}")]
    DataShape { location: Location, detail: String },
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn remote_query(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::RemoteQuery {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn data_shape(location: Location, detail: impl Into<String>) -> Self {
        Self::DataShape {
            location,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::page("events", 2).with_row(7);
        assert_eq!(loc.to_string(), "page 2 dataset `events` row 7");
        assert_eq!(Location::dataset("recommendations").to_string(), "dataset `recommendations`");
    }

    #[test]
    fn test_data_shape_message_names_location() {
        let err = Error::data_shape(Location::page("main", 3), "first row has no columns");
        assert_eq!(
            err.to_string(),
            "unexpected data shape in page 3 dataset `main`: first row has no columns"
        );
    }

    #[test]
    fn test_remote_query_keeps_source() {
        let err = Error::remote_query("page 2 events continuation", "connection reset");
        assert_eq!(err.to_string(), "page 2 events continuation: connection reset");
        assert!(std::error::Error::source(&err).is_some());
    }
}
