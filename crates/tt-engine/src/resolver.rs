//! # Entity Resolver
//!
//! Looks up the optimizer ids whose optimization entity matches the
//! requested namespace/workload (and cluster). An empty answer is a normal
//! outcome: nothing matched, so the caller has nothing to query.

use tt_core::{Cell, DataSet, Error, FilterCriteria, Location, Result};

use crate::client::QueryClient;
use crate::paginate::{open, paginate, PageShape, Pagination};
use crate::template::{render, OptimizerScope, Template};

const LABEL: &str = "optimization entity";

/// All optimizer ids matching the criteria, across every page.
///
/// Fails with [`Error::InvalidArgument`] (before any request) when neither
/// namespace nor workload is set.
pub async fn resolve_optimizer_ids(
    client: &dyn QueryClient,
    criteria: &FilterCriteria,
) -> Result<Vec<String>> {
    let query = render(Template::EntityLookup, criteria, &OptimizerScope::Unscoped)?;

    let Some(first) = open(client, &query, LABEL, PageShape::Flat).await? else {
        return Ok(Vec::new());
    };
    let paged = paginate(
        client,
        first,
        LABEL,
        PageShape::Flat,
        Pagination::Exhaust,
        optimizer_ids,
    )
    .await?;

    tracing::debug!(
        "resolved {} optimizer ids over {} page(s)",
        paged.rows.len(),
        paged.pages
    );
    Ok(paged.rows)
}

fn optimizer_ids(table: &DataSet, page: usize) -> Result<Vec<String>> {
    table
        .data
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let location = || Location::page(&table.name, page).with_row(index);
            match row.first() {
                Some(Cell::String(id)) => Ok(id.clone()),
                Some(other) => Err(Error::data_shape(
                    location(),
                    format!("optimizer id expected string, found {}", other.type_name()),
                )),
                None => Err(Error::data_shape(location(), "row has no columns")),
            }
        })
        .collect()
}
