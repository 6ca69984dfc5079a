//! # Testing Helpers
//!
//! [`ScriptedClient`] replays queued responses and records every request,
//! so tests can assert on rendered documents and exact round-trip counts.
//! The page builders produce responses in the shape the service uses.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

use tt_core::attrs;
use tt_core::{BoxError, Cell, DataSet, Link, Links, QueryDocument, QueryResponse, ResponseError};

use crate::client::QueryClient;

/// A request seen by [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute(String),
    Continue { link: String, href: Option<String> },
}

type Scripted = Result<QueryResponse, String>;

#[derive(Default)]
pub struct ScriptedClient {
    executions: Mutex<VecDeque<Scripted>>,
    continuations: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(Instant, Call)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response to the next `execute_query`.
    pub fn push_execute(&self, resp: QueryResponse) {
        lock(&self.executions).push_back(Ok(resp));
    }

    pub fn push_execute_error(&self, message: &str) {
        lock(&self.executions).push_back(Err(message.to_string()));
    }

    /// Queue the response to the next `continue_query`, whatever the link.
    pub fn push_continue(&self, resp: QueryResponse) {
        lock(&self.continuations).push_back(Ok(resp));
    }

    pub fn push_continue_error(&self, message: &str) {
        lock(&self.continuations).push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).iter().map(|(_, c)| c.clone()).collect()
    }

    /// Every request made, executions and continuations alike.
    pub fn round_trips(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Texts of all executed documents, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|(_, c)| match c {
                Call::Execute(q) => Some(q.clone()),
                Call::Continue { .. } => None,
            })
            .collect()
    }

    /// Hrefs followed through `link`, in order.
    pub fn continuation_hrefs(&self, link: &str) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|(_, c)| match c {
                Call::Continue { link: l, href } if l == link => href.clone(),
                _ => None,
            })
            .collect()
    }

    /// When each continuation through `link` was issued.
    pub fn continuation_times(&self, link: &str) -> Vec<Instant> {
        lock(&self.calls)
            .iter()
            .filter_map(|(at, c)| match c {
                Call::Continue { link: l, .. } if l == link => Some(*at),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push((Instant::now(), call));
    }
}

#[async_trait::async_trait]
impl QueryClient for ScriptedClient {
    async fn execute_query(&self, query: &QueryDocument) -> Result<QueryResponse, BoxError> {
        self.record(Call::Execute(query.as_str().to_string()));
        next(&self.executions)
    }

    async fn continue_query(&self, page: &DataSet, link: &str) -> Result<QueryResponse, BoxError> {
        self.record(Call::Continue {
            link: link.to_string(),
            href: page.link(link).map(|l| l.as_str().to_string()),
        });
        next(&self.continuations)
    }
}

fn next(queue: &Mutex<VecDeque<Scripted>>) -> Result<QueryResponse, BoxError> {
    match lock(queue).pop_front() {
        Some(Ok(resp)) => Ok(resp),
        Some(Err(message)) => Err(message.into()),
        None => Err("no scripted response left".into()),
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Page builders
// =============================================================================

/// Fixed base instant; `minute` offsets keep timestamps distinct.
pub fn at_minute(minute: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_714_557_600, 0).unwrap_or_default() + Duration::minutes(minute)
}

/// Attribute-bag cell from string pairs.
pub fn bag(pairs: &[(&str, &str)]) -> Cell {
    Cell::Complex(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
            .collect(),
    )
}

/// One event row for optimizer `optimizer_id` at [`at_minute`]`(minute)`.
pub fn event(optimizer_id: &str, minute: i64) -> Vec<Cell> {
    event_with(
        &[
            (attrs::OPTIMIZER_ID, optimizer_id),
            (attrs::EVENT_TYPE, "optimize:stage_started"),
        ],
        minute,
    )
}

pub fn event_with(pairs: &[(&str, &str)], minute: i64) -> Vec<Cell> {
    vec![bag(pairs), Cell::Timestamp(at_minute(minute))]
}

/// An event-query response, with a `"next"` link when `next` is given.
pub fn event_page(rows: Vec<Vec<Cell>>, next: Option<&str>) -> QueryResponse {
    let links: Vec<(&str, &str)> = next.map(|href| ("next", href)).into_iter().collect();
    event_page_with_links(rows, &links)
}

/// An event-query response whose event table carries `links`.
pub fn event_page_with_links(rows: Vec<Vec<Cell>>, links: &[(&str, &str)]) -> QueryResponse {
    let links: Links = links.iter().map(|(n, h)| (*n, Link::new(*h))).collect();
    let table = DataSet::new("events", rows, links);
    QueryResponse::with_main(DataSet::new(
        "main",
        vec![vec![Cell::DataSet(Box::new(table))]],
        Links::new(),
    ))
}

/// An entity-lookup response listing `ids`.
pub fn entity_page(ids: &[&str], next: Option<&str>) -> QueryResponse {
    let rows = ids.iter().map(|id| vec![Cell::String(id.to_string())]).collect();
    let links: Links = next.map(|href| ("next", Link::new(href))).into_iter().collect();
    QueryResponse::with_main(DataSet::new("optimizations", rows, links))
}

/// `resp` with row-level errors reported next to its data.
pub fn with_errors(mut resp: QueryResponse, errors: &[(&str, &str)]) -> QueryResponse {
    resp.errors = errors
        .iter()
        .map(|(title, detail)| ResponseError {
            title: title.to_string(),
            detail: detail.to_string(),
        })
        .collect();
    resp
}
