//! # Filter Compiler
//!
//! Renders [`FilterCriteria`] into query text. Rendering is a pure function
//! of its inputs: identical criteria always give byte-identical documents.
//!
//! ```text
//! SINCE -7d
//! FETCH events(
//!         optimize:stage_started,
//!         optimize:stage_ended
//!     )
//!     [attributes(k8s.cluster.id) = "c-1" && attributes(optimize.optimization.optimizer_id) IN ["a", "b"]]
//!     {attributes, timestamp}
//! LIMITS events.count(10)
//! ORDER events.asc()
//! ```

use std::fmt::Write as _;

use tt_core::attrs;
use tt_core::{Error, FilterCriteria, QueryDocument, Result};

const RECOMMENDATION_EVENTS: &[&str] = &["recommendation_verified"];
const RECOMMENDATION_EVENTS_WITH_INVALIDATED: &[&str] = &[
    "recommendation_identified",
    "recommendation_invalidated",
    "recommendation_verified",
];
const OPTIMIZATION_STARTED: &str = "optimization_started";

/// Which optimizers a main query is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizerScope {
    /// No optimizer restriction (cluster filter may still apply).
    Unscoped,
    /// One explicit optimizer id; other scoping criteria are ignored.
    Exact(String),
    /// Optimizer ids resolved from namespace/workload.
    AnyOf(Vec<String>),
}

impl OptimizerScope {
    /// Scope implied by the criteria alone, before any entity lookup.
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        match criteria.optimizer_id() {
            Some(id) => Self::Exact(id.to_string()),
            None => Self::Unscoped,
        }
    }
}

/// The four query shapes the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Event log over the selected event types, optionally capped.
    EventLog,
    /// Recommendation events, optionally capped.
    Recommendations,
    /// Optimization-started events carrying blocker context; never capped.
    OptimizationStarted,
    /// Optimizer ids from the optimization entity catalog.
    EntityLookup,
}

/// Render `template` for `criteria` restricted to `scope`.
///
/// Fails with [`Error::InvalidArgument`] when the result cap is too large or
/// an entity lookup has neither namespace nor workload to filter on.
pub fn render(
    template: Template,
    criteria: &FilterCriteria,
    scope: &OptimizerScope,
) -> Result<QueryDocument> {
    criteria.validate()?;

    let text = match template {
        Template::EventLog => render_fetch(
            criteria,
            &criteria.event_names(),
            &main_predicate(criteria, scope),
            criteria.result_cap,
        ),
        Template::Recommendations => {
            let events = if criteria.include_invalidated {
                RECOMMENDATION_EVENTS_WITH_INVALIDATED
            } else {
                RECOMMENDATION_EVENTS
            };
            let events: Vec<String> = events.iter().map(|e| e.to_string()).collect();
            render_fetch(
                criteria,
                &events,
                &main_predicate(criteria, scope),
                criteria.result_cap,
            )
        }
        Template::OptimizationStarted => render_fetch(
            criteria,
            &[OPTIMIZATION_STARTED.to_string()],
            &main_predicate(criteria, scope),
            None,
        ),
        Template::EntityLookup => render_entity_lookup(criteria)?,
    };

    Ok(QueryDocument::new(text))
}

/// Predicate for event queries: cluster first, then optimizer scope.
pub fn main_predicate(criteria: &FilterCriteria, scope: &OptimizerScope) -> String {
    let mut clauses = Vec::with_capacity(2);
    match scope {
        OptimizerScope::Exact(id) => {
            clauses.push(equals(attrs::OPTIMIZER_ID, id));
        }
        OptimizerScope::AnyOf(ids) => {
            if let Some(cluster) = criteria.cluster_id() {
                clauses.push(equals(attrs::CLUSTER_ID, cluster));
            }
            clauses.push(one_of(attrs::OPTIMIZER_ID, ids));
        }
        OptimizerScope::Unscoped => {
            if let Some(cluster) = criteria.cluster_id() {
                clauses.push(equals(attrs::CLUSTER_ID, cluster));
            }
        }
    }
    clauses.join(" && ")
}

/// Predicate for the entity catalog lookup.
fn entity_predicate(criteria: &FilterCriteria) -> Result<String> {
    let mut clauses = Vec::with_capacity(3);
    if let Some(ns) = criteria.namespace() {
        clauses.push(equals(&quote(attrs::NAMESPACE), ns));
    }
    if let Some(wl) = criteria.workload_name() {
        clauses.push(equals(&quote(attrs::WORKLOAD_NAME), wl));
    }
    if clauses.is_empty() {
        return Err(Error::invalid_argument(
            "optimizer lookup needs a namespace or workload name to filter on",
        ));
    }
    if let Some(cluster) = criteria.cluster_id() {
        clauses.push(equals(&quote(attrs::CLUSTER_ID), cluster));
    }
    Ok(clauses.join(" && "))
}

fn render_fetch(
    criteria: &FilterCriteria,
    events: &[String],
    filter: &str,
    limit: Option<u32>,
) -> String {
    let qualified: Vec<String> = events.iter().map(|e| criteria.qualify(e)).collect();

    let mut out = String::new();
    write_window(&mut out, criteria);
    let _ = writeln!(out, "FETCH events(");
    let _ = writeln!(out, "\t\t{}", qualified.join(",\n\t\t"));
    let _ = writeln!(out, "\t)");
    if !filter.is_empty() {
        let _ = writeln!(out, "\t[{}]", filter);
    }
    let _ = writeln!(out, "\t{{attributes, timestamp}}");
    if let Some(n) = limit {
        let _ = writeln!(out, "LIMITS events.count({})", n);
    }
    let _ = writeln!(out, "ORDER events.asc()");
    out
}

fn render_entity_lookup(criteria: &FilterCriteria) -> Result<String> {
    let filter = entity_predicate(criteria)?;

    let mut out = String::new();
    write_window(&mut out, criteria);
    let _ = writeln!(out, "FETCH attributes({})", attrs::OPTIMIZER_ID);
    let _ = writeln!(
        out,
        "FROM entities({}:optimization)[{}]",
        criteria.solution_name, filter
    );
    Ok(out)
}

fn write_window(out: &mut String, criteria: &FilterCriteria) {
    if let Some(since) = criteria.since() {
        let _ = writeln!(out, "SINCE {}", since);
    }
    if let Some(until) = criteria.until() {
        let _ = writeln!(out, "UNTIL {}", until);
    }
}

fn equals(attribute: &str, value: &str) -> String {
    format!("attributes({}) = {}", attribute, quote(value))
}

fn one_of(attribute: &str, values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("attributes({}) IN [{}]", attribute, quoted.join(", "))
}

/// Double-quoted string literal with `"` and `\` escaped.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> FilterCriteria {
        FilterCriteria {
            since: Some("-7d".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_event_log_full_document() {
        let c = FilterCriteria {
            cluster_id: Some("c-1".into()),
            until: Some("2023-07-31".into()),
            event_types: Some(vec!["stage_started".into(), "stage_ended".into()]),
            result_cap: Some(5),
            ..criteria()
        };
        let doc = render(Template::EventLog, &c, &OptimizerScope::Unscoped).unwrap();
        assert_eq!(
            doc.as_str(),
            "SINCE -7d\n\
             UNTIL 2023-07-31\n\
             FETCH events(\n\
             \t\toptimize:stage_started,\n\
             \t\toptimize:stage_ended\n\
             \t)\n\
             \t[attributes(k8s.cluster.id) = \"c-1\"]\n\
             \t{attributes, timestamp}\n\
             LIMITS events.count(5)\n\
             ORDER events.asc()\n"
        );
    }

    #[test]
    fn test_no_filter_no_window_no_limits() {
        let c = FilterCriteria {
            event_types: Some(vec!["stage_started".into()]),
            ..Default::default()
        };
        let doc = render(Template::EventLog, &c, &OptimizerScope::Unscoped).unwrap();
        assert_eq!(
            doc.as_str(),
            "FETCH events(\n\t\toptimize:stage_started\n\t)\n\t{attributes, timestamp}\nORDER events.asc()\n"
        );
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let c = FilterCriteria {
            namespace: Some("payments".into()),
            include_progress: true,
            ..criteria()
        };
        let scope = OptimizerScope::AnyOf(vec!["payments-api-111".into(), "payments-db-222".into()]);
        let a = render(Template::EventLog, &c, &scope).unwrap();
        let b = render(Template::EventLog, &c.clone(), &scope.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cap_over_limit_fails() {
        let c = FilterCriteria {
            result_cap: Some(1001),
            ..criteria()
        };
        let err = render(Template::Recommendations, &c, &OptimizerScope::Unscoped).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_exact_optimizer_ignores_cluster() {
        let c = FilterCriteria {
            cluster_id: Some("c-1".into()),
            optimizer_id: Some("ns-wl-abc".into()),
            ..criteria()
        };
        let scope = OptimizerScope::from_criteria(&c);
        assert_eq!(
            main_predicate(&c, &scope),
            "attributes(optimize.optimization.optimizer_id) = \"ns-wl-abc\""
        );
    }

    #[test]
    fn test_resolved_ids_become_membership_clause() {
        let c = FilterCriteria {
            cluster_id: Some("c-1".into()),
            namespace: Some("payments".into()),
            ..criteria()
        };
        let scope = OptimizerScope::AnyOf(vec!["a".into(), "b".into()]);
        assert_eq!(
            main_predicate(&c, &scope),
            "attributes(k8s.cluster.id) = \"c-1\" && attributes(optimize.optimization.optimizer_id) IN [\"a\", \"b\"]"
        );
    }

    #[test]
    fn test_recommendation_event_sets() {
        let c = criteria();
        let doc = render(Template::Recommendations, &c, &OptimizerScope::Unscoped).unwrap();
        assert!(doc.as_str().contains("FETCH events(\n\t\toptimize:recommendation_verified\n\t)"));

        let c = FilterCriteria {
            include_invalidated: true,
            ..criteria()
        };
        let doc = render(Template::Recommendations, &c, &OptimizerScope::Unscoped).unwrap();
        assert!(doc.as_str().contains(
            "\t\toptimize:recommendation_identified,\n\t\toptimize:recommendation_invalidated,\n\t\toptimize:recommendation_verified\n"
        ));
    }

    #[test]
    fn test_optimization_started_is_never_capped() {
        let c = FilterCriteria {
            result_cap: Some(1),
            optimizer_id: Some("ns-wl-abc".into()),
            ..criteria()
        };
        let doc = render(Template::OptimizationStarted, &c, &OptimizerScope::from_criteria(&c)).unwrap();
        assert!(doc.as_str().contains("optimize:optimization_started"));
        assert!(!doc.as_str().contains("LIMITS"));
    }

    #[test]
    fn test_entity_lookup_document() {
        let c = FilterCriteria {
            namespace: Some("payments".into()),
            workload_name: Some("api".into()),
            cluster_id: Some("c-1".into()),
            solution_name: "optimize-dev".into(),
            ..criteria()
        };
        let doc = render(Template::EntityLookup, &c, &OptimizerScope::Unscoped).unwrap();
        assert_eq!(
            doc.as_str(),
            "SINCE -7d\n\
             FETCH attributes(optimize.optimization.optimizer_id)\n\
             FROM entities(optimize-dev:optimization)[attributes(\"k8s.namespace.name\") = \"payments\" && attributes(\"k8s.workload.name\") = \"api\" && attributes(\"k8s.cluster.id\") = \"c-1\"]\n"
        );
    }

    #[test]
    fn test_entity_lookup_requires_namespace_or_workload() {
        let c = FilterCriteria {
            cluster_id: Some("c-1".into()),
            ..criteria()
        };
        let err = render(Template::EntityLookup, &c, &OptimizerScope::Unscoped).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
