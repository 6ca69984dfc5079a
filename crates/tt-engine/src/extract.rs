//! # Result Extractor
//!
//! Converts one event table into [`EventRow`]s. Every row must be
//! `[attribute bag, timestamp, ...]`; anything else is a shape error.

use chrono::{DateTime, Utc};

use tt_core::{Attributes, Cell, DataSet, Error, EventRow, Location, Result};

/// Extract the event rows of `table`, which arrived as page `page`.
pub fn extract_events(table: &DataSet, page: usize) -> Result<Vec<EventRow>> {
    let mut rows = Vec::with_capacity(table.data.len());
    for (index, row) in table.data.iter().enumerate() {
        let location = || Location::page(&table.name, page).with_row(index);
        if row.len() < 2 {
            return Err(Error::data_shape(
                location(),
                format!("expected at least 2 columns, found {}", row.len()),
            ));
        }
        let attributes = attribute_bag(&row[0]).map_err(|detail| Error::data_shape(location(), detail))?;
        let timestamp = timestamp(&row[1]).map_err(|detail| Error::data_shape(location(), detail))?;
        rows.push(EventRow::new(timestamp, attributes));
    }
    Ok(rows)
}

/// Flatten a complex cell. Later duplicate keys overwrite earlier ones.
fn attribute_bag(cell: &Cell) -> std::result::Result<Attributes, String> {
    match cell {
        Cell::Complex(pairs) => Ok(pairs.iter().cloned().collect()),
        other => Err(format!(
            "column 0 expected complex attributes, found {}",
            other.type_name()
        )),
    }
}

fn timestamp(cell: &Cell) -> std::result::Result<DateTime<Utc>, String> {
    match cell {
        Cell::Timestamp(ts) => Ok(*ts),
        other => Err(format!(
            "column 1 expected timestamp, found {}",
            other.type_name()
        )),
    }
}
