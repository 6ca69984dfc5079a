//! # Listing — the two request flows
//!
//! ```text
//!   validate ─▶ scope ─▶ render ─▶ open ─▶ paginate ─┬─▶ Listing::Rows (events)
//!                 │                  │               └─▶ join blockers ─▶ Listing::Rows
//!                 └▶ NoEntities      └▶ NoResults
//! ```
//!
//! Everything here is sequential: one round trip at a time.

use tracing::info;

use tt_core::{DataSet, EventRow, FilterCriteria, RecommendationRow, Result};

use crate::blockers::{fetch_blockers, join};
use crate::client::QueryClient;
use crate::extract::extract_events;
use crate::paginate::{open, paginate, PageShape, Pagination};
use crate::resolver::resolve_optimizer_ids;
use crate::template::{render, OptimizerScope, Template};

/// Outcome of one listing request.
#[derive(Debug)]
pub enum Listing<T> {
    /// Namespace/workload matched no optimization entity; no main query ran.
    NoEntities,
    /// The main query returned nothing.
    NoResults,
    Rows {
        rows: Vec<T>,
        /// Last page received; the follower starts from its `"follow"` link.
        last_page: DataSet,
    },
}

impl<T> Listing<T> {
    pub fn rows(&self) -> &[T] {
        match self {
            Self::Rows { rows, .. } => rows,
            Self::NoEntities | Self::NoResults => &[],
        }
    }

    pub fn total(&self) -> usize {
        self.rows().len()
    }
}

/// Event log for `criteria`. With `follow`, only the first page is
/// aggregated and the returned page is where the follower picks up.
pub async fn list_events(
    client: &dyn QueryClient,
    criteria: &FilterCriteria,
    follow: bool,
) -> Result<Listing<EventRow>> {
    criteria.validate()?;
    let Some(scope) = resolve_scope(client, criteria).await? else {
        return Ok(Listing::NoEntities);
    };

    let query = render(Template::EventLog, criteria, &scope)?;
    let Some(first) = open(client, &query, "events", PageShape::Nested).await? else {
        return Ok(Listing::NoResults);
    };
    let paged = paginate(
        client,
        first,
        "events",
        PageShape::Nested,
        Pagination::for_request(criteria.result_cap.is_some(), follow),
        extract_events,
    )
    .await?;

    info!("fetched {} event(s) over {} page(s)", paged.rows.len(), paged.pages);
    Ok(Listing::Rows {
        rows: paged.rows,
        last_page: paged.last_page,
    })
}

/// Recommendations for `criteria`, each joined with the blockers ignored by
/// its optimization run.
pub async fn list_recommendations(
    client: &dyn QueryClient,
    criteria: &FilterCriteria,
) -> Result<Listing<RecommendationRow>> {
    criteria.validate()?;
    let Some(scope) = resolve_scope(client, criteria).await? else {
        return Ok(Listing::NoEntities);
    };

    let query = render(Template::Recommendations, criteria, &scope)?;
    let Some(first) = open(client, &query, "recommendations", PageShape::Nested).await? else {
        return Ok(Listing::NoResults);
    };
    let paged = paginate(
        client,
        first,
        "recommendations",
        PageShape::Nested,
        Pagination::for_request(criteria.result_cap.is_some(), false),
        extract_events,
    )
    .await?;
    if paged.rows.is_empty() {
        return Ok(Listing::NoResults);
    }

    let lookup = fetch_blockers(client, criteria, &scope).await?;
    info!(
        "joining {} recommendation(s) against {} optimization run(s)",
        paged.rows.len(),
        lookup.len()
    );
    Ok(Listing::Rows {
        rows: join(paged.rows, &lookup)?,
        last_page: paged.last_page,
    })
}

/// `None` when entity lookup was needed and found nothing.
async fn resolve_scope(
    client: &dyn QueryClient,
    criteria: &FilterCriteria,
) -> Result<Option<OptimizerScope>> {
    if !criteria.scopes_by_entity() {
        return Ok(Some(OptimizerScope::from_criteria(criteria)));
    }
    let ids = resolve_optimizer_ids(client, criteria).await?;
    if ids.is_empty() {
        info!("no optimization entities matched the given criteria");
        return Ok(None);
    }
    Ok(Some(OptimizerScope::AnyOf(ids)))
}
