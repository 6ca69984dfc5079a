//! # Filter Criteria
//!
//! Everything a caller can constrain a request by. The command line keeps the
//! optimizer id apart from cluster/namespace/workload; this type tolerates any
//! combination and leaves precedence to the query compiler.

use std::fmt;

use crate::error::{Error, Result};

/// Largest result cap the service accepts.
pub const MAX_RESULT_CAP: u32 = 1000;

/// Solution whose types qualify every event name.
pub const DEFAULT_SOLUTION: &str = "optimize";

/// Event types fetched when the caller does not pick any.
pub const DEFAULT_EVENTS: &[&str] = &[
    "optimization_baselined",
    "optimization_started",
    "optimization_ended",
    "stage_started",
    "stage_ended",
    "experiment_started",
    "experiment_ended",
    "experiment_deployment_started",
    "experiment_deployment_completed",
    "experiment_measurement_started",
    "experiment_measurement_completed",
    "experiment_described",
    "recommendation_identified",
    "recommendation_verified",
    "recommendation_invalidated",
];

/// Appended to the selection when progress events are requested.
pub const PROGRESS_EVENTS: &[&str] = &[
    "optimization_progress",
    "stage_progress",
    "experiment_progress",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub cluster_id: Option<String>,
    pub namespace: Option<String>,
    pub workload_name: Option<String>,
    pub optimizer_id: Option<String>,
    /// Relative or absolute start, passed through verbatim.
    pub since: Option<String>,
    /// Relative or absolute end, passed through verbatim.
    pub until: Option<String>,
    pub result_cap: Option<u32>,
    /// Unqualified event names; `None` selects [`DEFAULT_EVENTS`].
    pub event_types: Option<Vec<String>>,
    pub include_progress: bool,
    pub include_invalidated: bool,
    pub solution_name: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            cluster_id: None,
            namespace: None,
            workload_name: None,
            optimizer_id: None,
            since: None,
            until: None,
            result_cap: None,
            event_types: None,
            include_progress: false,
            include_invalidated: false,
            solution_name: DEFAULT_SOLUTION.to_string(),
        }
    }
}

impl FilterCriteria {
    pub fn cluster_id(&self) -> Option<&str> {
        present(&self.cluster_id)
    }

    pub fn namespace(&self) -> Option<&str> {
        present(&self.namespace)
    }

    pub fn workload_name(&self) -> Option<&str> {
        present(&self.workload_name)
    }

    pub fn optimizer_id(&self) -> Option<&str> {
        present(&self.optimizer_id)
    }

    pub fn since(&self) -> Option<&str> {
        present(&self.since)
    }

    pub fn until(&self) -> Option<&str> {
        present(&self.until)
    }

    /// True when optimizers must be looked up by namespace/workload first.
    pub fn scopes_by_entity(&self) -> bool {
        self.optimizer_id().is_none() && (self.namespace().is_some() || self.workload_name().is_some())
    }

    /// Checks the parts that can be rejected without talking to the service.
    pub fn validate(&self) -> Result<()> {
        match self.result_cap {
            Some(cap) if cap > MAX_RESULT_CAP => Err(Error::invalid_argument(format!(
                "result cap {} exceeds the maximum of {}",
                cap, MAX_RESULT_CAP
            ))),
            _ => Ok(()),
        }
    }

    /// Selected event names in request order, progress events last.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match &self.event_types {
            Some(list) => list.clone(),
            None => DEFAULT_EVENTS.iter().map(|e| e.to_string()).collect(),
        };
        if self.include_progress {
            names.extend(PROGRESS_EVENTS.iter().map(|e| e.to_string()));
        }
        names
    }

    /// `<solution>:<event>`
    pub fn qualify(&self, event: &str) -> String {
        format!("{}:{}", self.solution_name, event)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A fully rendered query. Never parsed again on this side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryDocument(String);

impl QueryDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
