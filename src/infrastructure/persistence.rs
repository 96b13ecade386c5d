use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use super::error::InfrastructureResult;
use crate::domain::Grid;

/// Reads and writes grids on disk.
///
/// CSV carries raw cell text only, so formulas travel as their `=` source and
/// are re-gated on import. JSON carries both matrices of a [`Grid`].
pub struct FileRepository;

impl FileRepository {
    /// Reads a CSV file into rows of raw cell text. Rows may differ in length.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> InfrastructureResult<Vec<Vec<String>>> {
        let file = File::open(path)?;
        Self::parse_csv(file)
    }

    pub fn parse_csv<R: Read>(reader: R) -> InfrastructureResult<Vec<Vec<String>>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    /// Writes the grid's values as CSV.
    pub fn write_csv<W: Write>(grid: &Grid, writer: W) -> InfrastructureResult<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        for row in &grid.data {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn export_csv<P: AsRef<Path>>(grid: &Grid, path: P) -> InfrastructureResult<()> {
        let file = File::create(path)?;
        Self::write_csv(grid, file)
    }

    pub fn save_grid<P: AsRef<Path>>(grid: &Grid, path: P) -> InfrastructureResult<()> {
        let json = serde_json::to_string_pretty(grid)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a grid saved with [`FileRepository::save_grid`].
    ///
    /// The grid is returned as stored; callers adopt it through
    /// `Workbook::from_grid` so its formulas are gated.
    pub fn load_grid<P: AsRef<Path>>(path: P) -> InfrastructureResult<Grid> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GridBounds;
    use crate::infrastructure::InfrastructureError;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample_grid() -> Grid {
        let mut grid = Grid::new(2, 2, &GridBounds::default()).unwrap();
        grid.set_value(0, 0, "1".to_string()).unwrap();
        grid.set_value(0, 1, "2, with comma".to_string()).unwrap();
        grid.set_value(1, 0, "3".to_string()).unwrap();
        grid.set_formula(1, 0, "=A1+2".to_string()).unwrap();
        grid
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        let rows = FileRepository::parse_csv("1,2,3\n=A1+B1\n\"a,b\",c\n".as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["1".to_string(), "2".to_string(), "3".to_string()],
                vec!["=A1+B1".to_string()],
                vec!["a,b".to_string(), "c".to_string()],
            ]
        );
    }

    #[test]
    fn test_write_csv_values() {
        let mut out = Vec::new();
        FileRepository::write_csv(&sample_grid(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1,\"2, with comma\"\n3,\n");
    }

    #[test]
    fn test_csv_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.csv");

        FileRepository::export_csv(&sample_grid(), &path).unwrap();
        let rows = FileRepository::read_csv(&path).unwrap();

        assert_eq!(rows, sample_grid().data);
    }

    #[test]
    fn test_save_and_load_grid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let grid = sample_grid();

        FileRepository::save_grid(&grid, &path).unwrap();
        let loaded = FileRepository::load_grid(&path).unwrap();

        assert_eq!(loaded, grid);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let result = FileRepository::load_grid(&path);
        assert!(matches!(result, Err(InfrastructureError::Json(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let result = FileRepository::read_csv("/nonexistent/grid.csv");
        assert!(matches!(result, Err(InfrastructureError::Io(_))));
    }
}
