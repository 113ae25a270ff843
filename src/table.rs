//! Table renderer
//!
//! Row 0 is always the header row. A cell renders only the direct runs of
//! its own content items; nested child lists and tables inside a cell are not
//! visited.

use crate::inline::render_run;
use crate::model::{Cell, Table};

/// Line-break marker placed between the runs of a cell
const CELL_BREAK: &str = "<br>";

/// Render a table into canonical row/cell markup
pub fn render_table(table: &Table) -> String {
    if table.rows.is_empty() {
        return String::new();
    }

    let mut output = String::from("<table>");
    for (index, row) in table.rows.iter().enumerate() {
        let tag = if index == 0 { "th" } else { "td" };

        output.push_str("<tr>");
        for cell in &row.cells {
            output.push('<');
            output.push_str(tag);
            output.push('>');
            output.push_str(&render_cell(cell));
            output.push_str("</");
            output.push_str(tag);
            output.push('>');
        }
        output.push_str("</tr>");
    }
    output.push_str("</table>");

    output
}

fn render_cell(cell: &Cell) -> String {
    cell.children
        .iter()
        .flat_map(|item| item.runs.iter())
        .map(render_run)
        .collect::<Vec<_>>()
        .join(CELL_BREAK)
}
