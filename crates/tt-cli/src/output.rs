//! # Output
//!
//! Table or JSON rendering of event and recommendation rows. Follow
//! increments are rendered as bare rows so they read as a continuation of
//! the first table.

use clap::ValueEnum;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use tt_core::{attrs, EventRow, ItemList, RecommendationRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Rows that know how to lay themselves out as a table line.
pub trait Tabular {
    const HEADER: &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

impl Tabular for EventRow {
    const HEADER: &'static [&'static str] = &["OptimizerId", "EventType", "Timestamp"];

    fn cells(&self) -> Vec<String> {
        vec![
            text(self, attrs::OPTIMIZER_ID),
            text(self, attrs::EVENT_TYPE),
            self.timestamp.to_rfc3339(),
        ]
    }
}

impl Tabular for RecommendationRow {
    const HEADER: &'static [&'static str] = &[
        "OptimizerId",
        "State",
        "CPUcores",
        "MemoryGiB",
        "Blockers",
        "Timestamp",
    ];

    fn cells(&self) -> Vec<String> {
        let blockers = if self.blockers_present {
            self.blockers.join(", ")
        } else {
            "none".to_string()
        };
        vec![
            text(&self.event, attrs::OPTIMIZER_ID),
            text(&self.event, attrs::RECOMMENDATION_STATE),
            text(&self.event, attrs::RECOMMENDATION_CPU),
            text(&self.event, attrs::RECOMMENDATION_MEMORY),
            blockers,
            self.event.timestamp.to_rfc3339(),
        ]
    }
}

/// Attribute as display text; strings unquoted, absent as empty.
fn text(row: &EventRow, name: &str) -> String {
    match row.attribute(name) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Render `rows`; `header` is false for follow increments.
pub fn render<T>(rows: &[T], format: OutputFormat, header: bool) -> Result<String, serde_json::Error>
where
    T: Tabular + Serialize,
{
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&ItemList::new(rows)),
        OutputFormat::Table => {
            let mut builder = Builder::default();
            if header {
                builder.push_record(T::HEADER.iter().map(|h| h.to_string()));
            }
            for row in rows {
                builder.push_record(row.cells());
            }
            let mut table = builder.build();
            table.with(Style::blank());
            Ok(table.to_string())
        }
    }
}
