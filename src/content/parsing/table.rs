//! Table grid extraction
//!
//! Rows and cells are found anywhere below the table node, so tables survive
//! wrapper elements that differ between schema versions.

use std::collections::HashSet;

use log::debug;

use super::super::models::TableGrid;
use super::super::tree::{ContentNode, MarkupNode};
use super::text::clean_text;

const COLSPAN_ATTRS: [&str; 5] = ["colspan", "COLSPAN", "Colspan", "colSpan", "columnSpan"];

/// Largest column span honoured; bigger values are clamped to it
pub const MAX_COLUMN_SPAN: usize = 64;

/// Number of leading cells that identify a row for deduplication
const SIGNATURE_CELLS: usize = 3;

/// Extract a deduplicated, rectangular grid from a table node
pub fn extract_table(node: &ContentNode) -> Option<TableGrid> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for row in node.find_all_local("Row") {
        let mut cells = Vec::new();
        for cell in row.find_all_local("Cell") {
            cells.push(cell_text(cell));
            let span = column_span(cell);
            cells.extend(std::iter::repeat_n(String::new(), span - 1));
        }

        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        if !seen.insert(row_signature(&cells)) {
            debug!("dropping duplicate table row: {:?}", row_signature(&cells));
            continue;
        }
        rows.push(cells);
    }

    if rows.is_empty() {
        return None;
    }
    Some(TableGrid::new(rows))
}

/// First cells of a row joined by `|`
pub fn row_signature(cells: &[String]) -> String {
    cells
        .iter()
        .take(SIGNATURE_CELLS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("|")
}

fn cell_text(cell: &ContentNode) -> String {
    let mut values: Vec<String> = Vec::new();
    for t in cell.find_all_local("T") {
        push_distinct(&mut values, clean_text(&t.full_text()));
    }

    if values.is_empty() {
        for fragment in cell.text_fragments() {
            push_distinct(&mut values, clean_text(fragment));
        }
    }

    values.join(" ")
}

fn push_distinct(values: &mut Vec<String>, value: String) {
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}

fn column_span(cell: &ContentNode) -> usize {
    COLSPAN_ATTRS
        .iter()
        .find_map(|key| cell.attr(key))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|span| *span >= 1)
        .map(|span| {
            if span > MAX_COLUMN_SPAN {
                debug!("clamping column span {span} to {MAX_COLUMN_SPAN}");
            }
            span.min(MAX_COLUMN_SPAN)
        })
        .unwrap_or(1)
}
