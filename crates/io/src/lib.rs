//! Workspace persistence.
//!
//! A workspace file stores only current cell contents as raw text, never
//! edit history. Loading replays each raw string through `Sheet::set_value`,
//! so formulas re-parse on the way in.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gridlet_engine::sheet::Sheet;

#[derive(Debug)]
pub enum IoError {
    Io(std::io::Error),
    Format(serde_json::Error),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::Io(e) => write!(f, "i/o error: {}", e),
            IoError::Format(e) => write!(f, "workspace format error: {}", e),
        }
    }
}

impl std::error::Error for IoError {}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Io(e)
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Format(e)
    }
}

/// On-disk workspace document.
#[derive(Serialize, Deserialize)]
struct WorkspaceDoc {
    name: String,
    rows: usize,
    cols: usize,
    cells: Vec<CellEntry>,
}

#[derive(Serialize, Deserialize)]
struct CellEntry {
    row: usize,
    col: usize,
    raw: String,
}

pub fn save(sheet: &Sheet, path: &Path) -> Result<(), IoError> {
    let mut cells: Vec<CellEntry> = sheet
        .cells_iter()
        .map(|((row, col), value)| CellEntry {
            row,
            col,
            raw: value.raw_display(),
        })
        .filter(|entry| !entry.raw.is_empty())
        .collect();
    // Stable file ordering, so saves diff cleanly
    cells.sort_by_key(|entry| (entry.row, entry.col));

    let doc = WorkspaceDoc {
        name: sheet.name.clone(),
        rows: sheet.rows,
        cols: sheet.cols,
        cells,
    };
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Sheet, IoError> {
    let json = fs::read_to_string(path)?;
    let doc: WorkspaceDoc = serde_json::from_str(&json)?;

    let mut sheet = Sheet::new(doc.rows.max(1), doc.cols.max(1));
    sheet.name = doc.name;
    for entry in doc.cells {
        sheet.set_value(entry.row, entry.col, &entry.raw);
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work.gridlet");

        let mut sheet = Sheet::new(20, 10);
        sheet.name = "budget".to_string();
        sheet.set_value(0, 0, "10");
        sheet.set_value(1, 0, "rent");
        sheet.set_value(2, 0, "=A1*12");

        save(&sheet, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.name, "budget");
        assert_eq!(loaded.rows, 20);
        assert_eq!(loaded.cols, 10);
        assert_eq!(loaded.get_raw(0, 0), "10");
        assert_eq!(loaded.get_raw(1, 0), "rent");
        assert_eq!(loaded.get_raw(2, 0), "=A1*12");
        // Formulas re-parse and evaluate after load
        assert_eq!(loaded.get_display(2, 0), "120");
    }

    #[test]
    fn test_save_skips_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.gridlet");

        let mut sheet = Sheet::new(20, 10);
        sheet.set_value(3, 3, "x");
        save(&sheet, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.cell_count(), 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/nope.gridlet")).unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }

    #[test]
    fn test_load_bad_json_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gridlet");
        fs::write(&path, "not json").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, IoError::Format(_)));
    }
}
