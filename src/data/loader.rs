use std::path::Path;

use super::model::{CellValue, Table};
use super::xlsx::Workbook;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – a converted table (no header row is assumed)
/// * `.xlsx` – read the first worksheet directly, skipping conversion
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" => Workbook::open(path)?.first_sheet(),
        // Anything else is read as delimited text.
        _ => load_csv(path),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Rows may differ in width; every field is type-inferred independently.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    log::debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(Table::new(rows))
}
