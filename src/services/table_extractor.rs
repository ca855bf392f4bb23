//! Stream-style table detection over extracted page text.
//!
//! A line counts as a row when it splits into at least two cells on a tab or a
//! run of two or more spaces. Consecutive rows with the same cell count form a
//! table. Tables are serialized as row-oriented JSON records keyed by column
//! index, e.g. `[{"0":"Item","1":"Qty"},{"0":"Bolt","1":"4"}]`.

use serde_json::{Map, Value};
use tracing::{debug, warn};

const MIN_TABLE_ROWS: usize = 2;
const MIN_COLUMNS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct TableExtractor;

impl TableExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Detects tables on each page, in page order.
    pub fn extract_tables<S: AsRef<str>>(&self, pages: &[S]) -> Vec<String> {
        let mut tables = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            for rows in detect_tables(page.as_ref()) {
                match rows_to_records(&rows) {
                    Ok(json) => tables.push(json),
                    Err(e) => warn!(page = index + 1, error = %e, "Failed to serialize table"),
                }
            }
        }
        debug!(count = tables.len(), "Table detection finished");
        tables
    }
}

fn detect_tables(text: &str) -> Vec<Vec<Vec<String>>> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        match split_cells(line) {
            Some(cells) if current.first().map_or(true, |first| first.len() == cells.len()) => {
                current.push(cells);
            }
            Some(cells) => {
                flush(&mut tables, &mut current);
                current.push(cells);
            }
            None => flush(&mut tables, &mut current),
        }
    }
    flush(&mut tables, &mut current);
    tables
}

fn flush(tables: &mut Vec<Vec<Vec<String>>>, current: &mut Vec<Vec<String>>) {
    if current.len() >= MIN_TABLE_ROWS {
        tables.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

fn split_cells(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut pending_spaces = 0;

    for ch in line.chars() {
        match ch {
            '\t' => {
                push_cell(&mut cells, &mut cell);
                pending_spaces = 0;
            }
            ' ' => pending_spaces += 1,
            _ => {
                if pending_spaces >= 2 {
                    push_cell(&mut cells, &mut cell);
                } else if pending_spaces == 1 {
                    cell.push(' ');
                }
                pending_spaces = 0;
                cell.push(ch);
            }
        }
    }
    push_cell(&mut cells, &mut cell);

    if cells.len() >= MIN_COLUMNS {
        Some(cells)
    } else {
        None
    }
}

fn push_cell(cells: &mut Vec<String>, cell: &mut String) {
    let value = cell.trim();
    if !value.is_empty() {
        cells.push(value.to_string());
    }
    cell.clear();
}

fn rows_to_records(rows: &[Vec<String>]) -> serde_json::Result<String> {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let record: Map<String, Value> = row
                .iter()
                .enumerate()
                .map(|(column, value)| (column.to_string(), Value::String(value.clone())))
                .collect();
            Value::Object(record)
        })
        .collect();
    serde_json::to_string(&records)
}
