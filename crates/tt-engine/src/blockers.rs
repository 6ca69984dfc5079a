//! # Blocker Joiner
//!
//! Recommendations do not carry the blockers that were ignored while they
//! were produced; those live on the `optimization_started` event of the same
//! optimization run. The joiner queries those events, keys their
//! `optimize.ignored_blockers.*` attributes by `"<optimizer_id>-<num>"`, and
//! merges them into each recommendation with the same key.

use std::collections::HashMap;

use tracing::warn;

use tt_core::attrs;
use tt_core::{
    Attributes, Error, EventRow, FilterCriteria, Location, RecommendationRow, Result,
};

use crate::client::QueryClient;
use crate::extract::extract_events;
use crate::paginate::{open, paginate, PageShape, Pagination};
use crate::template::{render, OptimizerScope, Template};

const LABEL: &str = "optimization_started";

/// Blocker attributes per composite key. Built per request, then dropped.
#[derive(Debug, Default)]
pub struct BlockerLookup {
    entries: HashMap<String, Attributes>,
}

impl BlockerLookup {
    /// Group started events by composite key, keeping blocker attributes only.
    /// A later event with the same key replaces an earlier one.
    pub fn from_started_events(rows: &[EventRow]) -> Result<Self> {
        let mut entries = HashMap::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let key = composite_key(row, || Location::dataset(LABEL).with_row(index))?;
            let blockers: Attributes = row
                .attributes
                .iter()
                .filter(|(name, _)| name.starts_with(attrs::IGNORED_BLOCKERS_PREFIX))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            entries.insert(key, blockers);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&Attributes> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `"<optimizer_id>-<optimization_num>"`; both attributes must be strings.
pub fn composite_key(row: &EventRow, location: impl Fn() -> Location) -> Result<String> {
    Ok(format!(
        "{}-{}",
        key_part(row, attrs::OPTIMIZER_ID, &location)?,
        key_part(row, attrs::OPTIMIZATION_NUM, &location)?
    ))
}

fn key_part<'a>(row: &'a EventRow, name: &str, location: &impl Fn() -> Location) -> Result<&'a str> {
    match row.attribute(name) {
        Some(serde_json::Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(Error::data_shape(
            location(),
            format!("attribute {} expected string, found {}", name, json_type(other)),
        )),
        None => Err(Error::data_shape(
            location(),
            format!("missing attribute {}", name),
        )),
    }
}

/// Blocker id from `optimize.ignored_blockers.<id>.<field>`, i.e. the
/// second-to-last segment, for names of more than three segments.
pub fn blocker_id(attribute: &str) -> Option<&str> {
    let segments: Vec<&str> = attribute.split('.').collect();
    if segments.len() > 3 {
        Some(segments[segments.len() - 2])
    } else {
        None
    }
}

/// Merge blocker context into every recommendation, in row order.
pub fn join(rows: Vec<EventRow>, lookup: &BlockerLookup) -> Result<Vec<RecommendationRow>> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let key = composite_key(&row, || Location::dataset("recommendations").with_row(index))?;
            let Some(blockers) = lookup.get(&key) else {
                warn!(
                    "no optimization_started event found for recommendation {}; assuming no blockers",
                    key
                );
                return Ok(RecommendationRow::unblocked(row));
            };

            let mut joined = RecommendationRow::unblocked(row);
            for (name, value) in blockers {
                joined.blocker_attributes.insert(name.clone(), value.clone());
                if name.contains("principal") {
                    continue;
                }
                if let Some(id) = blocker_id(name) {
                    if !joined.blockers.iter().any(|b| b == id) {
                        joined.blockers.push(id.to_string());
                    }
                }
            }
            joined.blockers_present = !joined.blockers.is_empty();
            Ok(joined)
        })
        .collect()
}

/// Query started events for the same window and scope and build the lookup.
pub async fn fetch_blockers(
    client: &dyn QueryClient,
    criteria: &FilterCriteria,
    scope: &OptimizerScope,
) -> Result<BlockerLookup> {
    let query = render(Template::OptimizationStarted, criteria, scope)?;
    let Some(first) = open(client, &query, LABEL, PageShape::Nested).await? else {
        warn!("no optimization_started events found; recommendations will carry no blockers");
        return Ok(BlockerLookup::default());
    };
    let paged = paginate(
        client,
        first,
        LABEL,
        PageShape::Nested,
        Pagination::Exhaust,
        extract_events,
    )
    .await?;
    BlockerLookup::from_started_events(&paged.rows)
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at_minute, event_page, event_with, ScriptedClient};

    fn row(pairs: &[(&str, serde_json::Value)]) -> EventRow {
        EventRow::new(
            at_minute(0),
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        )
    }

    fn recommendation(optimizer_id: &str, num: &str) -> EventRow {
        row(&[
            (attrs::OPTIMIZER_ID, optimizer_id.into()),
            (attrs::OPTIMIZATION_NUM, num.into()),
            (attrs::RECOMMENDATION_STATE, "verified".into()),
        ])
    }

    #[test]
    fn test_composite_key() {
        let key = composite_key(&recommendation("ns-wl-abc", "3"), || Location::dataset("t")).unwrap();
        assert_eq!(key, "ns-wl-abc-3");
    }

    #[test]
    fn test_composite_key_requires_string_num() {
        let r = row(&[
            (attrs::OPTIMIZER_ID, "ns-wl-abc".into()),
            (attrs::OPTIMIZATION_NUM, serde_json::json!(3)),
        ]);
        let err = composite_key(&r, || Location::dataset("recommendations").with_row(4)).unwrap_err();
        match err {
            Error::DataShape { location, detail } => {
                assert_eq!(location.row, Some(4));
                assert!(detail.contains("found number"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_principal_attributes_do_not_name_blockers() {
        let started = row(&[
            (attrs::OPTIMIZER_ID, "ns-wl-abc".into()),
            (attrs::OPTIMIZATION_NUM, "3".into()),
            ("optimize.ignored_blockers.cpu-limit.principal", "alice".into()),
            ("optimize.ignored_blockers.mem-limit.principal", "bob".into()),
            ("optimize.ignored_blockers.mem-limit.reason", "approved".into()),
            ("optimize.optimization.state", "running".into()),
        ]);
        let lookup = BlockerLookup::from_started_events(&[started]).unwrap();
        let joined = join(vec![recommendation("ns-wl-abc", "3")], &lookup).unwrap();

        let r = &joined[0];
        assert_eq!(r.blocker_attributes.len(), 3);
        assert!(r
            .blocker_attributes
            .contains_key("optimize.ignored_blockers.cpu-limit.principal"));
        assert_eq!(r.blockers, vec!["mem-limit"]);
        assert!(r.blockers_present);
    }

    #[test]
    fn test_reason_attribute_names_blocker_once() {
        let started = row(&[
            (attrs::OPTIMIZER_ID, "ns-wl-abc".into()),
            (attrs::OPTIMIZATION_NUM, "3".into()),
            ("optimize.ignored_blockers.cpu-limit.reason", "manual".into()),
            ("optimize.ignored_blockers.cpu-limit.timestamp", "2024-01-01".into()),
            ("optimize.ignored_blockers.cpu", "x".into()),
        ]);
        let lookup = BlockerLookup::from_started_events(&[started]).unwrap();
        let joined = join(vec![recommendation("ns-wl-abc", "3")], &lookup).unwrap();
        assert_eq!(joined[0].blockers, vec!["cpu-limit"]);
    }

    #[test]
    fn test_principal_only_means_no_blockers() {
        let started = row(&[
            (attrs::OPTIMIZER_ID, "ns-wl-abc".into()),
            (attrs::OPTIMIZATION_NUM, "3".into()),
            ("optimize.ignored_blockers.cpu-limit.principal", "alice".into()),
        ]);
        let lookup = BlockerLookup::from_started_events(&[started]).unwrap();
        let joined = join(vec![recommendation("ns-wl-abc", "3")], &lookup).unwrap();
        assert!(joined[0].blockers.is_empty());
        assert!(!joined[0].blockers_present);
        assert_eq!(joined[0].blocker_attributes.len(), 1);
    }

    #[test]
    fn test_join_miss_is_soft() {
        let lookup = BlockerLookup::default();
        let joined = join(vec![recommendation("ns-wl-abc", "7")], &lookup).unwrap();
        assert_eq!(joined.len(), 1);
        assert!(!joined[0].blockers_present);
        assert!(joined[0].blocker_attributes.is_empty());
    }

    #[test]
    fn test_recommendation_without_key_is_fatal() {
        let r = row(&[(attrs::OPTIMIZER_ID, "ns-wl-abc".into())]);
        let err = join(vec![r], &BlockerLookup::default()).unwrap_err();
        assert!(matches!(err, Error::DataShape { .. }));
    }

    #[test]
    fn test_blocker_id_segments() {
        assert_eq!(blocker_id("optimize.ignored_blockers.cpu-limit.reason"), Some("cpu-limit"));
        assert_eq!(blocker_id("optimize.ignored_blockers.cpu-limit"), None);
    }

    #[tokio::test]
    async fn test_fetch_blockers_paginates_and_keys() {
        let client = ScriptedClient::new();
        client.push_execute(event_page(
            vec![event_with(
                &[
                    (attrs::OPTIMIZER_ID, "ns-wl-abc"),
                    (attrs::OPTIMIZATION_NUM, "1"),
                    ("optimize.ignored_blockers.hpa.reason", "scaling"),
                ],
                0,
            )],
            Some("/s/2"),
        ));
        client.push_continue(event_page(
            vec![event_with(
                &[
                    (attrs::OPTIMIZER_ID, "ns-wl-abc"),
                    (attrs::OPTIMIZATION_NUM, "2"),
                ],
                5,
            )],
            None,
        ));

        let criteria = FilterCriteria {
            optimizer_id: Some("ns-wl-abc".into()),
            result_cap: Some(1),
            ..Default::default()
        };
        let lookup = fetch_blockers(&client, &criteria, &OptimizerScope::from_criteria(&criteria))
            .await
            .unwrap();
        assert_eq!(lookup.len(), 2);
        assert!(lookup.get("ns-wl-abc-1").unwrap().contains_key("optimize.ignored_blockers.hpa.reason"));
        assert!(lookup.get("ns-wl-abc-2").unwrap().is_empty());
        assert_eq!(client.round_trips(), 2);
    }
}
