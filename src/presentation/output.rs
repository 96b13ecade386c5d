//! Rendering of a settled grid for the terminal or for other tools.

use std::io::Write;

use clap::ValueEnum;

use crate::domain::{Grid, column_to_letters};
use crate::infrastructure::{FileRepository, InfrastructureResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text with column letters and row numbers.
    #[default]
    Table,
    /// Cell values only.
    Csv,
    /// Both matrices, reloadable with `recalc`.
    Json,
}

/// Renders the grid's values as an aligned text table.
pub fn render_table(grid: &Grid) -> String {
    let label_width = grid.rows.to_string().len();
    let letters: Vec<String> = (0..grid.cols).map(column_to_letters).collect();
    let widths: Vec<usize> = (0..grid.cols)
        .map(|col| {
            (0..grid.rows)
                .map(|row| grid.value(row, col).chars().count())
                .chain(std::iter::once(letters[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(grid.rows + 1);
    lines.push(table_line(" ", label_width, letters.iter().map(String::as_str), &widths));
    for row in 0..grid.rows {
        let label = (row + 1).to_string();
        let cells = (0..grid.cols).map(|col| grid.value(row, col));
        lines.push(table_line(&label, label_width, cells, &widths));
    }

    let mut table = lines.join("\n");
    table.push('\n');
    table
}

fn table_line<'a>(
    label: &str,
    label_width: usize,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> String {
    let mut line = format!("{label:>label_width$}");
    for (cell, &width) in cells.zip(widths) {
        line.push_str("  ");
        line.push_str(&format!("{cell:<width$}"));
    }
    line.trim_end().to_string()
}

/// Writes the grid in the requested format.
pub fn write_grid<W: Write>(
    grid: &Grid,
    format: OutputFormat,
    mut writer: W,
) -> InfrastructureResult<()> {
    match format {
        OutputFormat::Table => writer.write_all(render_table(grid).as_bytes())?,
        OutputFormat::Csv => FileRepository::write_csv(grid, writer)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, grid)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}
