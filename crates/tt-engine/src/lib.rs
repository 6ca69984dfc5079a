//! # tt-engine — Query construction, pagination, follow and correlation
//!
//! The engine turns [`FilterCriteria`](tt_core::FilterCriteria) into query
//! documents, walks paginated result sets through a [`QueryClient`], tails
//! new events, and joins recommendations with their blocker context.
//!
//! - [`template`] — the filter compiler.
//! - [`resolver`] — namespace/workload to optimizer-id lookup.
//! - [`extract`] — result table to [`EventRow`](tt_core::EventRow).
//! - [`paginate`] — `"next"` link walking.
//! - [`follow`] — `"follow"` link polling with cancellation.
//! - [`blockers`] — recommendation/blocker join.
//! - [`listing`] — the two request flows built from the above.

pub mod blockers;
pub mod client;
pub mod extract;
pub mod follow;
pub mod listing;
pub mod paginate;
pub mod resolver;
pub mod template;
pub mod testing;

pub use client::QueryClient;
pub use follow::Follower;
pub use listing::{list_events, list_recommendations, Listing};
pub use template::{OptimizerScope, Template};
