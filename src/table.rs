//! Markdown table rendering of the used part of a document.

use std::io::Write;

use cellgrid_core::{CellPos, Document};

/// Bounding box of all cells with a non-empty display, as
/// `(min_row, min_col, max_row, max_col)`.
fn used_bounds(doc: &Document) -> Option<(usize, usize, usize, usize)> {
    doc.grid
        .iter()
        .filter(|entry| !entry.display_value.is_empty())
        .map(|entry| *entry.key())
        .fold(None, |acc, pos| {
            Some(match acc {
                None => (pos.row, pos.col, pos.row, pos.col),
                Some((r0, c0, r1, c1)) => {
                    (r0.min(pos.row), c0.min(pos.col), r1.max(pos.row), c1.max(pos.col))
                }
            })
        })
}

pub fn write_markdown(out: &mut impl Write, doc: &Document) -> std::io::Result<()> {
    let Some((min_row, min_col, max_row, max_col)) = used_bounds(doc) else {
        writeln!(out, "*Empty spreadsheet*")?;
        return Ok(());
    };

    write!(out, "|   |")?;
    for col in min_col..=max_col {
        write!(out, " {} |", CellPos::col_to_letters(col))?;
    }
    writeln!(out)?;

    write!(out, "|---|")?;
    for _ in min_col..=max_col {
        write!(out, "---|")?;
    }
    writeln!(out)?;

    for row in min_row..=max_row {
        write!(out, "| {} |", row + 1)?;
        for col in min_col..=max_col {
            let display = doc.display(CellPos::new(row, col));
            write!(out, " {} |", escape_markdown(&display))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_used_range_only() {
        let mut doc = Document::default();
        doc.set_cell(CellPos::new(1, 1), 1);
        doc.set_cell(CellPos::new(2, 2), "a|b");

        let mut out = Vec::new();
        write_markdown(&mut out, &doc).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "|   | B | C |\n|---|---|---|\n| 2 | 1 |  |\n| 3 |  | a\\|b |\n"
        );
    }

    #[test]
    fn test_empty_document() {
        let mut out = Vec::new();
        write_markdown(&mut out, &Document::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "*Empty spreadsheet*\n");
    }
}
