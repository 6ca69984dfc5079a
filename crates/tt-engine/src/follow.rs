//! # Follower — Live Tail over the `"follow"` Link
//!
//! After the initial rows are delivered, the follower keeps polling the
//! `"follow"` link of the last page:
//!
//! ```text
//!   Idle ──▶ Polling ──(rows)──▶ Delivered ──▶ Polling      (no delay)
//!               │
//!               └──(no rows)──▶ Waiting ──(interval)──▶ Polling
//!
//!   any state ──(cancel)──▶ Terminated
//! ```
//!
//! Each poll runs in a background task that hands its result back through a
//! single-slot channel. The foreground waits on either that result or the
//! cancellation token, and only dispatches the next poll after consuming the
//! previous result, so at most one poll is ever in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tt_core::dataset::FOLLOW;
use tt_core::{DataSet, Error, EventRow, Result};

use crate::client::{report_partial, QueryClient};
use crate::extract::extract_events;
use crate::paginate::PageShape;

pub const DEFAULT_FOLLOW_INTERVAL: Duration = Duration::from_secs(60);

const LABEL: &str = "follow";

/// Outcome of one poll.
struct Poll {
    page: DataSet,
    rows: Vec<EventRow>,
}

impl Poll {
    /// An empty poll means the cursor is drained for now.
    fn exhausted(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct Follower {
    client: Arc<dyn QueryClient>,
    interval: Duration,
}

impl Follower {
    pub fn new(client: Arc<dyn QueryClient>, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Poll from `last_page` until `cancel` fires or a poll fails.
    ///
    /// Non-empty batches are handed to `sink` as they arrive. Cancellation
    /// ends the loop with `Ok(())`; a poll already on the wire is left to
    /// finish and its result is dropped.
    pub async fn run<S>(&self, last_page: DataSet, cancel: CancellationToken, mut sink: S) -> Result<()>
    where
        S: FnMut(Vec<EventRow>),
    {
        let mut page = last_page;
        let mut exhausted = false;
        let mut poll_number = 0usize;

        loop {
            poll_number += 1;
            let pending = self.dispatch(page, exhausted, poll_number, cancel.clone());

            let polled = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("follow cancelled after {} poll(s)", poll_number - 1);
                    return Ok(());
                }
                polled = pending => polled,
            };
            let Some(poll) = received(polled, cancel.is_cancelled())? else {
                debug!("follow cancelled after {} poll(s)", poll_number - 1);
                return Ok(());
            };

            exhausted = poll.exhausted();
            if !exhausted {
                debug!("follow poll {} returned {} new row(s)", poll_number, poll.rows.len());
                sink(poll.rows);
            }
            page = poll.page;
        }
    }

    /// Start one poll in the background, after the interval if the cursor
    /// was drained last time.
    fn dispatch(
        &self,
        page: DataSet,
        wait_first: bool,
        poll_number: usize,
        cancel: CancellationToken,
    ) -> oneshot::Receiver<Result<Poll>> {
        let (tx, rx) = oneshot::channel();
        let client = Arc::clone(&self.client);
        let interval = self.interval;

        tokio::spawn(async move {
            if wait_first {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            let result = poll_follow(client.as_ref(), page, poll_number).await;
            // The foreground may have been cancelled meanwhile.
            let _ = tx.send(result);
        });

        rx
    }
}

/// Result handed back by a poll task. `None` when the task stopped on
/// cancellation without sending anything.
fn received(
    polled: std::result::Result<Result<Poll>, oneshot::error::RecvError>,
    cancelled: bool,
) -> Result<Option<Poll>> {
    match polled {
        Ok(poll) => poll.map(Some),
        Err(_) if cancelled => Ok(None),
        Err(source) => Err(Error::remote_query("follow poll task ended without a result", source)),
    }
}

async fn poll_follow(client: &dyn QueryClient, page: DataSet, poll_number: usize) -> Result<Poll> {
    let resp = client
        .continue_query(&page, FOLLOW)
        .await
        .map_err(|source| Error::remote_query(format!("follow poll {} continuation", poll_number), source))?;
    report_partial(&resp, LABEL, poll_number);

    let main = resp.into_main().ok_or_else(|| {
        Error::data_shape(
            tt_core::Location::page(&page.name, poll_number),
            "follow response has no main dataset",
        )
    })?;
    let table = PageShape::Nested.table(main, poll_number)?;
    let rows = extract_events(&table, poll_number)?;

    Ok(Poll { page: table, rows })
}
