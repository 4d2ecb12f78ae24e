// crates/ilwe-core/src/runtime/table.rs
// ============================================================================
// Module: Grid Tables
// Description: Plain-text grid rendering for result tables.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Renders rows of cells as a boxed grid with a `=` rule under the header.

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders `rows` under `headers` as a grid table.
///
/// Rows shorter than the header are padded with empty cells.
#[must_use]
pub fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate().take(widths.len()) {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&rule(&widths, '-'));
    out.push_str(&line(&widths, headers.iter().map(|header| (*header).to_string())));
    out.push_str(&rule(&widths, '='));
    for row in rows {
        let cells = (0 .. widths.len()).map(|index| row.get(index).cloned().unwrap_or_default());
        out.push_str(&line(&widths, cells));
        out.push_str(&rule(&widths, '-'));
    }
    out
}

/// Renders a horizontal rule.
fn rule(widths: &[usize], fill: char) -> String {
    let mut out = String::from("+");
    for width in widths {
        out.extend(std::iter::repeat_n(fill, width + 2));
        out.push('+');
    }
    out.push('\n');
    out
}

/// Renders one row of left-aligned cells.
fn line(widths: &[usize], cells: impl Iterator<Item = String>) -> String {
    let mut out = String::from("|");
    for (width, cell) in widths.iter().zip(cells) {
        let pad = width.saturating_sub(cell.chars().count());
        out.push(' ');
        out.push_str(&cell);
        out.extend(std::iter::repeat_n(' ', pad + 1));
        out.push('|');
    }
    out.push('\n');
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::render_grid;

    #[test]
    fn grid_pads_cells_to_column_width() {
        let table = render_grid(&["a", "bb"], &[vec!["long".to_string(), "x".to_string()]]);
        let expected = "+------+----+\n| a    | bb |\n+======+====+\n| long | x  |\n+------+----+\n";
        assert_eq!(table, expected);
    }
}
