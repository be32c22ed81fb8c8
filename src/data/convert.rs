use std::path::{Path, PathBuf};

use super::model::Table;
use super::xlsx::Workbook;
use crate::error::Result;

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub sheet_name: Option<String>,
    pub rows: usize,
    pub columns: usize,
    pub output: PathBuf,
}

/// The converted table sits next to its spreadsheet: same base name, `.csv`.
pub fn converted_path(spreadsheet: &Path) -> PathBuf {
    spreadsheet.with_extension("csv")
}

/// Convert the first worksheet of `xlsx` into a CSV file at `csv_path`.
pub fn convert_workbook(xlsx: &Path, csv_path: &Path) -> Result<ConversionSummary> {
    let mut workbook = Workbook::open(xlsx)?;
    let sheet_name = workbook.sheets()?.into_iter().next().map(|s| s.name);
    let table = workbook.first_sheet()?;
    if table.is_empty() {
        log::warn!("{}: first worksheet is empty", xlsx.display());
    }

    write_table(&table, csv_path)?;
    log::info!(
        "Converted {} ({} rows x {} columns) -> {}",
        xlsx.display(),
        table.len(),
        table.width(),
        csv_path.display()
    );

    Ok(ConversionSummary {
        sheet_name,
        rows: table.len(),
        columns: table.width(),
        output: csv_path.to_path_buf(),
    })
}

/// Write a table as CSV, one record per row, in row and column order.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut padded = table.clone();
    padded.pad_to_width();

    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    for row in &padded.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_table;
    use crate::data::model::CellValue;
    use crate::data::xlsx::tests::write_fixture;
    use crate::error::Error;

    #[test]
    fn converted_path_keeps_base_name() {
        assert_eq!(
            converted_path(Path::new("raw-data/hstpov2.xlsx")),
            PathBuf::from("raw-data/hstpov2.csv")
        );
    }

    #[test]
    fn conversion_preserves_order_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("hstpov2.xlsx");
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2"><v>1980</v></c><c r="B2"><v>13</v></c></row>
<row r="3"><c r="A3"><v>1990</v></c><c r="B3"><v>13.5</v></c></row>
<row r="4"><c r="A4"><v>2000</v></c><c r="B4"><v>11.3</v></c></row>
</sheetData></worksheet>"#;
        write_fixture(&xlsx, sheet, &["Year", "Percent, below poverty"]);

        let csv_path = converted_path(&xlsx);
        let summary = convert_workbook(&xlsx, &csv_path).unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.columns, 2);
        assert_eq!(summary.sheet_name.as_deref(), Some("Table"));

        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(
            text,
            "Year,\"Percent, below poverty\"\n1980,13\n1990,13.5\n2000,11.3\n"
        );

        let table = load_table(&csv_path).unwrap();
        // Header excluded, N data rows in yields N data rows out.
        assert_eq!(table.len() - 1, 3);
        assert_eq!(table.rows[1], vec![CellValue::Number(1980.0), CellValue::Number(13.0)]);
        assert_eq!(table.rows[3][1], CellValue::Number(11.3));
        assert_eq!(table.rows[0][1], CellValue::Text("Percent, below poverty".into()));
    }

    #[test]
    fn numeric_looking_text_is_reinferred_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("text.xlsx");
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
</sheetData></worksheet>"#;
        write_fixture(&xlsx, sheet, &["1980", "true", "2013 (38)"]);

        let direct = Workbook::open(&xlsx).unwrap().first_sheet().unwrap();
        assert_eq!(direct.rows[0][0], CellValue::Text("1980".into()));

        let csv_path = converted_path(&xlsx);
        convert_workbook(&xlsx, &csv_path).unwrap();
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap(), "1980,true,2013 (38)\n");

        let table = load_table(&csv_path).unwrap();
        assert_eq!(
            table.rows[0],
            vec![
                CellValue::Number(1980.0),
                CellValue::Bool(true),
                CellValue::Text("2013 (38)".into()),
            ]
        );
        // Both forms read the same where it matters.
        assert_eq!(table.rows[0][0].text(), direct.rows[0][0].text());
    }

    #[test]
    fn empty_sheet_converts_to_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("blank.xlsx");
        write_fixture(&xlsx, "<worksheet><sheetData/></worksheet>", &[]);
        let csv_path = converted_path(&xlsx);

        let summary = convert_workbook(&xlsx, &csv_path).unwrap();
        assert_eq!((summary.rows, summary.columns), (0, 0));
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap(), "");
    }

    #[test]
    fn gap_rows_survive_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("gaps.xlsx");
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>title</t></is></c></row>
<row r="3"><c r="B3"><v>2</v></c></row>
</sheetData></worksheet>"#;
        write_fixture(&xlsx, sheet, &[]);
        let csv_path = dir.path().join("gaps.csv");
        convert_workbook(&xlsx, &csv_path).unwrap();

        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(text, "title,\n,\n,2\n");
    }

    #[test]
    fn unreadable_spreadsheet_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("broken.xlsx");
        std::fs::write(&xlsx, b"not a zip").unwrap();
        let csv_path = converted_path(&xlsx);

        let err = convert_workbook(&xlsx, &csv_path).unwrap_err();
        assert!(matches!(err, Error::FileFormat { .. }));
        assert!(!csv_path.exists());
    }
}
