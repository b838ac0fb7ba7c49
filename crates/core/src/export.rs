//! CSV export of the current derived view.
//!
//! Export always takes the records exactly as the view shows them (same filters, same
//! order) together with a fixed per-domain column schema.

use crate::error::{CabinetError, CabinetResult};
use serde::Serialize;

/// One exported column: a header and how to render the cell.
pub struct Column<R> {
    pub header: &'static str,
    pub value: fn(&R) -> String,
}

impl<R> Column<R> {
    pub const fn new(header: &'static str, value: fn(&R) -> String) -> Self {
        Self { header, value }
    }
}

/// Renders `records` as RFC 4180 CSV with a header row and CRLF line endings.
pub fn to_csv<R>(records: &[&R], columns: &[Column<R>]) -> String {
    let mut out = String::new();
    push_row(&mut out, columns.iter().map(|c| c.header.to_string()));
    for record in records {
        push_row(&mut out, columns.iter().map(|c| (c.value)(record)));
    }
    out
}

/// Renders `records` as a pretty JSON array.
pub fn to_json<R: Serialize>(records: &[&R]) -> CabinetResult<String> {
    serde_json::to_string_pretty(records).map_err(CabinetError::Serialization)
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let row: Vec<String> = cells.map(|c| escape(&c)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
