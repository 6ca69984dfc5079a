//! # tt-core — The shared vocabulary of tunetail
//!
//! Types passed between the query engine and the command line:
//!
//! - [`FilterCriteria`] — what the caller asked for.
//! - [`QueryDocument`] — the rendered query text sent to the service.
//! - [`QueryResponse`] / [`DataSet`] / [`Cell`] — one page of a remote result set.
//! - [`EventRow`] / [`RecommendationRow`] — the flattened, typed output.
//! - [`Error`] — the fatal half of the error taxonomy.

pub mod criteria;
pub mod dataset;
pub mod error;
pub mod row;

pub use criteria::{FilterCriteria, QueryDocument};
pub use dataset::{Cell, DataSet, Link, Links, QueryResponse, ResponseError};
pub use error::{BoxError, Error, Location, Result};
pub use row::{Attributes, EventRow, ItemList, RecommendationRow};

/// Well-known attribute names carried by optimizer events and entities.
pub mod attrs {
    pub const OPTIMIZER_ID: &str = "optimize.optimization.optimizer_id";
    pub const OPTIMIZATION_NUM: &str = "optimize.optimization.num";
    pub const EVENT_TYPE: &str = "appd.event.type";
    pub const RECOMMENDATION_STATE: &str = "optimize.recommendation.state";
    pub const RECOMMENDATION_CPU: &str = "optimize.recommendation.settings.cpu";
    pub const RECOMMENDATION_MEMORY: &str = "optimize.recommendation.settings.memory";
    pub const IGNORED_BLOCKERS_PREFIX: &str = "optimize.ignored_blockers";
    pub const CLUSTER_ID: &str = "k8s.cluster.id";
    pub const NAMESPACE: &str = "k8s.namespace.name";
    pub const WORKLOAD_NAME: &str = "k8s.workload.name";
}
