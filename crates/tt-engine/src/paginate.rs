//! # Paginator
//!
//! Opens a query and walks its `"next"` links until a page comes back
//! without one. Each round trip strictly advances: the link of the page just
//! received is the only one ever followed, so a bounded query costs exactly
//! `1 + links` requests.

use tracing::warn;

use tt_core::dataset::NEXT;
use tt_core::{Cell, DataSet, Error, Location, QueryDocument, Result};

use crate::client::{report_partial, QueryClient};

/// How the row table sits inside a response's main dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageShape {
    /// Event queries: the first cell of the first row is the event table.
    Nested,
    /// Entity lookups: the main dataset is the table.
    Flat,
}

/// Whether to follow `"next"` links at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Exhaust,
    /// Capped or follow requests: only the first page is aggregated.
    FirstPage,
}

impl Pagination {
    pub fn for_request(capped: bool, follow: bool) -> Self {
        if capped || follow {
            Self::FirstPage
        } else {
            Self::Exhaust
        }
    }
}

/// Rows gathered across pages plus the last page received.
#[derive(Debug)]
pub struct Paged<T> {
    pub rows: Vec<T>,
    /// Handle for any further continuation (the follow loop starts here).
    pub last_page: DataSet,
    pub pages: usize,
}

impl PageShape {
    /// Pick the row table out of `main`, received as page `page`.
    pub fn table(self, main: DataSet, page: usize) -> Result<DataSet> {
        match self {
            Self::Flat => Ok(main),
            Self::Nested => {
                let location = || Location::page(&main.name, page);
                let first_row = main
                    .data
                    .first()
                    .ok_or_else(|| Error::data_shape(location(), "main dataset has no rows"))?;
                match first_row.first() {
                    Some(Cell::DataSet(table)) => Ok((**table).clone()),
                    Some(other) => Err(Error::data_shape(
                        location(),
                        format!(
                            "first row first column expected dataset, found {}",
                            other.type_name()
                        ),
                    )),
                    None => Err(Error::data_shape(location(), "first row has no columns")),
                }
            }
        }
    }
}

/// Execute `query` and return its first row table.
///
/// `Ok(None)` means the service returned nothing to page through: no main
/// dataset, or for nested pages a main dataset with no rows.
pub async fn open(
    client: &dyn QueryClient,
    query: &QueryDocument,
    label: &str,
    shape: PageShape,
) -> Result<Option<DataSet>> {
    tracing::debug!("executing {} query:\n{}", label, query);
    let resp = client
        .execute_query(query)
        .await
        .map_err(|source| Error::remote_query(format!("{} query", label), source))?;
    report_partial(&resp, label, 1);

    let Some(main) = resp.into_main() else {
        return Ok(None);
    };
    if shape == PageShape::Nested && main.is_empty() {
        return Ok(None);
    }
    shape.table(main, 1).map(Some)
}

/// Extract `first` and every page after it reachable through `"next"`.
pub async fn paginate<T, F>(
    client: &dyn QueryClient,
    first: DataSet,
    label: &str,
    shape: PageShape,
    mode: Pagination,
    mut extract: F,
) -> Result<Paged<T>>
where
    F: FnMut(&DataSet, usize) -> Result<Vec<T>>,
{
    let mut rows = extract(&first, 1)?;
    let mut current = first;
    let mut page = 1;

    if mode == Pagination::Exhaust {
        while current.has_link(NEXT) {
            page += 1;
            let resp = client.continue_query(&current, NEXT).await.map_err(|source| {
                Error::remote_query(format!("page {} {} continuation", page, label), source)
            })?;
            report_partial(&resp, label, page);

            let Some(main) = resp.into_main() else {
                warn!(
                    "{} continuation (page {}) has no main data; returned data may be incomplete",
                    label, page
                );
                break;
            };
            let next = shape.table(main, page)?;
            rows.extend(extract(&next, page)?);
            current = next;
        }
    }

    Ok(Paged {
        rows,
        last_page: current,
        pages: page,
    })
}
