//! # Query Client Seam
//!
//! The engine never talks to the network itself. Everything goes through
//! [`QueryClient`], implemented over HTTP by the CLI and by
//! [`ScriptedClient`](crate::testing::ScriptedClient) in tests.

use tt_core::{BoxError, DataSet, QueryDocument, QueryResponse};

/// Executes query documents and follows continuation links.
#[async_trait::async_trait]
pub trait QueryClient: Send + Sync {
    /// Run a freshly rendered query.
    async fn execute_query(&self, query: &QueryDocument) -> Result<QueryResponse, BoxError>;

    /// Follow the named link (`"next"` or `"follow"`) of a page.
    async fn continue_query(&self, page: &DataSet, link: &str) -> Result<QueryResponse, BoxError>;
}

/// Log row-level errors the service reported next to usable data.
pub(crate) fn report_partial(resp: &QueryResponse, label: &str, page: usize) {
    if !resp.has_errors() {
        return;
    }
    tracing::warn!(
        "{} query (page {}) reported errors; returned data may be incomplete",
        label,
        page
    );
    for e in resp.errors() {
        tracing::warn!("{}: {}", e.title, e.detail);
    }
}
