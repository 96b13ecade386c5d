//! Command-line host for the engine.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::output::{OutputFormat, write_grid};
use crate::application::Workbook;
use crate::domain::CellRef;
use crate::infrastructure::{EngineConfig, FileRepository};

#[derive(Debug, Parser)]
#[command(name = "gridcalc", version, about = "Evaluate and recalculate spreadsheet formulas.")]
pub struct Args {
    /// Engine configuration file (TOML).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate one formula, optionally against a sheet.
    Eval {
        /// Formula text, e.g. `=SUM(A1:B2)/2`.
        formula: String,

        /// Sheet to read cell values from (CSV or saved JSON grid).
        #[arg(long, value_name = "FILE")]
        sheet: Option<PathBuf>,
    },

    /// Report whether each text would be accepted as a formula.
    Check {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Recalculate a sheet and print the settled values.
    Recalc {
        /// Sheet to recalculate (CSV or saved JSON grid).
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write to this file instead of stdout.
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Runs a parsed command, writing results to `out`.
pub fn run<W: Write>(args: Args, out: &mut W) -> Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match args.command {
        Command::Eval { formula, sheet } => {
            let mut workbook = match sheet {
                Some(path) => load_workbook(&path, &config)?,
                None => Workbook::new(1, 1, config.bounds, config.evaluator())?,
            };
            workbook.settle();
            writeln!(out, "{}", workbook.evaluate(&formula))?;
        }
        Command::Check { texts } => {
            let evaluator = config.evaluator();
            for text in texts {
                let verdict = if !evaluator.is_valid_formula(&text) {
                    "invalid"
                } else if evaluator.is_visual_formula(&text) {
                    "visual"
                } else {
                    "valid"
                };
                writeln!(out, "{verdict}\t{text}")?;
            }
        }
        Command::Recalc {
            file,
            format,
            output,
        } => {
            let mut workbook = load_workbook(&file, &config)?;
            if let Some(report) = workbook.settle() {
                tracing::info!(
                    passes = report.passes,
                    cells_changed = report.cells_changed,
                    converged = report.converged,
                    "recalculated {}",
                    file.display()
                );
            }

            match output {
                Some(path) => {
                    let target = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_grid(workbook.grid(), format, BufWriter::new(target))?;
                }
                None => write_grid(workbook.grid(), format, &mut *out)?,
            }
        }
    }

    Ok(())
}

/// Loads a sheet into a workbook, gating every formula on the way in.
///
/// Files ending in `.json` are saved grids; anything else is read as CSV and
/// clipped to the configured bounds.
pub fn load_workbook(path: &Path, config: &EngineConfig) -> Result<Workbook> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let grid = FileRepository::load_grid(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        return Ok(Workbook::from_grid(grid, config.bounds, config.evaluator())?);
    }

    let rows = FileRepository::read_csv(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let bounds = config.bounds;
    let height = rows.len().min(bounds.max_rows).max(1);
    let width = rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .min(bounds.max_cols)
        .max(1);

    let mut workbook = Workbook::new(height, width, bounds, config.evaluator())?;
    let summary = workbook.import_rows(CellRef::new(0, 0), &rows);
    if summary.dropped > 0 {
        tracing::warn!(
            dropped = summary.dropped,
            max_rows = bounds.max_rows,
            max_cols = bounds.max_cols,
            "sheet exceeds the grid bounds, extra cells were dropped"
        );
    }
    if summary.rejected_formulas > 0 {
        tracing::debug!(
            rejected = summary.rejected_formulas,
            "formulas failing the gate were kept as text"
        );
    }

    Ok(workbook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn run_args(argv: &[&str]) -> String {
        let args = Args::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        run(args, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_eval_without_sheet() {
        assert_eq!(run_args(&["gridcalc", "eval", "=(1+2)*3"]), "9\n");
        assert_eq!(run_args(&["gridcalc", "eval", "=1/0"]), "#DIV/0!\n");
        assert_eq!(run_args(&["gridcalc", "eval", "=B1"]), "#REF!\n");
    }

    #[test]
    fn test_eval_with_sheet() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("sheet.csv");
        std::fs::write(&sheet, "1,2\n=A1+B1,\n").unwrap();

        let output = run_args(&[
            "gridcalc",
            "eval",
            "=SUM(A1:B2)",
            "--sheet",
            sheet.to_str().unwrap(),
        ]);
        assert_eq!(output, "6\n");
    }

    #[test]
    fn test_check_verdicts() {
        let output = run_args(&["gridcalc", "check", "=A1+1", "=1+*2", "=PROGRESS(5)", "plain"]);
        assert_eq!(
            output,
            "valid\t=A1+1\ninvalid\t=1+*2\nvisual\t=PROGRESS(5)\ninvalid\tplain\n"
        );
    }

    #[test]
    fn test_check_requires_text() {
        assert!(Args::try_parse_from(["gridcalc", "check"]).is_err());
    }

    #[test]
    fn test_recalc_csv_table() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("sheet.csv");
        std::fs::write(&sheet, "=B1*2,5\n=A1/0,=AVG(A1:B1)\n").unwrap();

        let output = run_args(&["gridcalc", "recalc", sheet.to_str().unwrap()]);
        assert_eq!(output, "   A        B\n1  10       5\n2  #DIV/0!  7.5\n");
    }

    #[test]
    fn test_recalc_to_json_file_and_back() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("sheet.csv");
        let saved = dir.path().join("saved.json");
        std::fs::write(&sheet, "3,=A1*A1\n").unwrap();

        run_args(&[
            "gridcalc",
            "recalc",
            sheet.to_str().unwrap(),
            "--format",
            "json",
            "--output",
            saved.to_str().unwrap(),
        ]);
        let grid = FileRepository::load_grid(&saved).unwrap();
        assert_eq!(grid.value(0, 1), "9");
        assert_eq!(grid.formula(0, 1), "=A1*A1");

        let output = run_args(&["gridcalc", "recalc", saved.to_str().unwrap(), "--format", "csv"]);
        assert_eq!(output, "3,9\n");
    }

    #[test]
    fn test_recalc_clips_to_configured_bounds() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("sheet.csv");
        let config = dir.path().join("gridcalc.toml");
        std::fs::write(&sheet, "1,2,3\n4,5,6\n7,8,9\n").unwrap();
        std::fs::write(&config, "[bounds]\nmax_rows = 2\nmax_cols = 2\n").unwrap();

        let output = run_args(&[
            "gridcalc",
            "--config",
            config.to_str().unwrap(),
            "recalc",
            sheet.to_str().unwrap(),
            "--format",
            "csv",
        ]);
        assert_eq!(output, "1,2\n4,5\n");
    }

    #[test]
    fn test_recalc_missing_file_fails() {
        let args = Args::try_parse_from(["gridcalc", "recalc", "/nonexistent/sheet.csv"]).unwrap();
        let mut out = Vec::new();
        assert!(run(args, &mut out).is_err());
    }
}
