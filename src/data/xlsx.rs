//! Minimal OOXML (`.xlsx`) reader.
//!
//! Only what the converter needs: locate the first worksheet through the
//! workbook relationships, resolve the shared strings table, and turn the
//! `<sheetData>` cells into a [`Table`]. Styles are not read, so date cells
//! come out as their serial numbers.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use super::model::{CellValue, Table};
use crate::error::{Error, Result};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const FALLBACK_SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Sheet limits of the file format (column `XFD`, row 1048576).
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

/// Largest used range materialised as a dense table.
const MAX_CELLS: usize = 4_000_000;

/// Sheet entry from `xl/workbook.xml`.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetInfo {
    pub name: String,
    pub relationship_id: Option<String>,
}

pub struct Workbook {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl Workbook {
    /// Open a workbook. A missing file is [`Error::FileNotFound`]; anything
    /// that is not a zip container is [`Error::FileFormat`].
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;
        let archive = ZipArchive::new(file).map_err(|e| Error::format(path, e))?;
        let mut workbook = Workbook {
            path: path.to_path_buf(),
            archive,
        };
        if workbook.read_part(WORKBOOK_PART)?.is_none() {
            return Err(Error::format(path, "missing xl/workbook.xml"));
        }
        Ok(workbook)
    }

    /// Sheets in workbook order.
    pub fn sheets(&mut self) -> Result<Vec<SheetInfo>> {
        let xml = self
            .read_part(WORKBOOK_PART)?
            .ok_or_else(|| Error::format(&self.path, "missing xl/workbook.xml"))?;
        parse_sheet_list(&xml).map_err(|reason| Error::format(&self.path, reason))
    }

    /// Read the first worksheet into a rectangular table.
    pub fn first_sheet(&mut self) -> Result<Table> {
        let part = self.first_sheet_part()?;
        log::debug!("{}: reading worksheet part {part}", self.path.display());

        let sheet_xml = self
            .read_part(&part)?
            .ok_or_else(|| Error::format(&self.path, format!("missing worksheet part {part}")))?;

        let shared = match self.read_part(SHARED_STRINGS_PART)? {
            Some(xml) => {
                parse_shared_strings(&xml).map_err(|reason| Error::format(&self.path, reason))?
            }
            None => Vec::new(),
        };

        parse_worksheet(&sheet_xml, &shared).map_err(|reason| Error::format(&self.path, reason))
    }

    fn first_sheet_part(&mut self) -> Result<String> {
        let first = self.sheets()?.into_iter().next();
        let Some(rel_id) = first.and_then(|s| s.relationship_id) else {
            return Ok(FALLBACK_SHEET_PART.to_string());
        };
        let Some(rels) = self.read_part(WORKBOOK_RELS_PART)? else {
            return Ok(FALLBACK_SHEET_PART.to_string());
        };
        let target = parse_relationship_target(&rels, &rel_id)
            .map_err(|reason| Error::format(&self.path, reason))?;
        Ok(target
            .map(|t| resolve_target(&t))
            .unwrap_or_else(|| FALLBACK_SHEET_PART.to_string()))
    }

    /// Read a part of the package as UTF-8. `Ok(None)` when the part is absent.
    fn read_part(&mut self, name: &str) -> Result<Option<String>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(Error::format(&self.path, e)),
        };
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| Error::format(&self.path, format!("reading {name}: {e}")))?;
        Ok(Some(text))
    }
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

// ---------------------------------------------------------------------------
// Part parsers. They return plain String reasons; the caller attaches the
// file path.
// ---------------------------------------------------------------------------

type PartResult<T> = std::result::Result<T, String>;

fn attr(e: &BytesStart<'_>, name: &[u8]) -> PartResult<Option<String>> {
    let attribute = e.try_get_attribute(name).map_err(|e| e.to_string())?;
    Ok(attribute.map(|a| String::from_utf8_lossy(&a.value).into_owned()))
}

/// Resolve `&amp;`-style and numeric character references inside text.
fn push_reference(out: &mut String, r: &BytesRef<'_>) -> PartResult<()> {
    if let Some(ch) = r.resolve_char_ref().map_err(|e| e.to_string())? {
        out.push(ch);
        return Ok(());
    }
    let name = r.decode().map_err(|e| e.to_string())?;
    match quick_xml::escape::resolve_predefined_entity(&name) {
        Some(resolved) => out.push_str(resolved),
        None => return Err(format!("unknown entity &{name};")),
    }
    Ok(())
}

fn parse_sheet_list(xml: &str) -> PartResult<Vec<SheetInfo>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name")?.unwrap_or_default();
                let relationship_id = attr(&e, b"r:id")?;
                sheets.push(SheetInfo {
                    name,
                    relationship_id,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn parse_relationship_target(xml: &str, rel_id: &str) -> PartResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr(&e, b"Id")?.as_deref() == Some(rel_id) {
                    return attr(&e, b"Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Parse `xl/sharedStrings.xml`. Rich-text runs are concatenated; phonetic
/// runs (`<rPh>`) are skipped.
fn parse_shared_strings(xml: &str) -> PartResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.decode().map_err(|e| e.to_string())?);
                }
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(s) = current.as_mut() {
                    push_reference(s, &r)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Column letters of a cell reference ("AB12") to a zero-based index.
pub fn column_index(reference: &str) -> PartResult<usize> {
    let letters: &str = reference
        .split(|c: char| c.is_ascii_digit())
        .next()
        .unwrap_or("");
    if letters.is_empty() {
        return Err(format!("invalid cell reference: {reference}"));
    }
    let mut col = 0usize;
    for byte in letters.bytes() {
        if !byte.is_ascii_alphabetic() {
            return Err(format!("invalid column in reference: {reference}"));
        }
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add((byte.to_ascii_uppercase() - b'A' + 1) as usize))
            .filter(|c| *c <= MAX_COLUMNS)
            .ok_or_else(|| format!("column out of range in {reference}"))?;
    }
    Ok(col - 1)
}

/// Cell being assembled while its children are read.
#[derive(Default)]
struct PendingCell {
    row: usize,
    col: usize,
    kind: Option<String>,
    value: Option<String>,
    inline: Option<String>,
}

impl PendingCell {
    fn resolve(self, shared: &[String]) -> PartResult<CellValue> {
        let value = match self.kind.as_deref() {
            Some("s") => {
                let raw = self.value.unwrap_or_default();
                let idx: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad shared string index '{raw}'"))?;
                let s = shared
                    .get(idx)
                    .ok_or_else(|| format!("shared string index {idx} out of range"))?;
                CellValue::Text(s.clone())
            }
            Some("inlineStr") => CellValue::Text(self.inline.unwrap_or_default()),
            Some("b") => CellValue::Bool(self.value.as_deref().map(str::trim) == Some("1")),
            // Formula string results, error codes and ISO dates stay textual.
            Some("str") | Some("e") | Some("d") => CellValue::Text(self.value.unwrap_or_default()),
            _ => match self.value {
                None => CellValue::Empty,
                Some(raw) => {
                    let v: f64 = raw
                        .trim()
                        .parse()
                        .map_err(|_| format!("numeric cell holds '{raw}'"))?;
                    CellValue::Number(v)
                }
            },
        };
        Ok(match value {
            CellValue::Text(s) if s.is_empty() => CellValue::Empty,
            other => other,
        })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum TextTarget {
    None,
    Value,
    Inline,
}

/// Parse a worksheet part into a table padded to its used width. Rows absent
/// from the XML become empty rows so positions are preserved.
fn parse_worksheet(xml: &str, shared: &[String]) -> PartResult<Table> {
    let mut reader = Reader::from_str(xml);
    let mut cells: Vec<(usize, usize, CellValue)> = Vec::new();

    let mut next_row = 0usize;
    let mut current_row = 0usize;
    let mut next_col = 0usize;
    let mut pending: Option<PendingCell> = None;
    let mut target = TextTarget::None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_index(&e, next_row)?;
                    next_row = current_row + 1;
                    next_col = 0;
                }
                b"c" => pending = Some(start_cell(&e, current_row, &mut next_col)?),
                b"v" => target = TextTarget::Value,
                b"t" if pending.is_some() => target = TextTarget::Inline,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_index(&e, next_row)?;
                    next_row = current_row + 1;
                }
                b"c" => {
                    // Styled but valueless cell; it still claims its column.
                    start_cell(&e, current_row, &mut next_col)?;
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(cell) = pending.take() {
                        let (row, col) = (cell.row, cell.col);
                        let value = cell.resolve(shared)?;
                        if value != CellValue::Empty {
                            cells.push((row, col, value));
                        }
                    }
                }
                b"v" | b"t" => target = TextTarget::None,
                _ => {}
            },
            Event::Text(t) => {
                if let Some(cell) = pending.as_mut() {
                    let text = t.decode().map_err(|e| e.to_string())?;
                    append_text(cell, target, &text);
                }
            }
            Event::GeneralRef(r) => {
                if let Some(cell) = pending.as_mut() {
                    let mut text = String::new();
                    push_reference(&mut text, &r)?;
                    append_text(cell, target, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let height = cells.iter().map(|(r, _, _)| r + 1).max().unwrap_or(0);
    let width = cells.iter().map(|(_, c, _)| c + 1).max().unwrap_or(0);
    if height.saturating_mul(width) > MAX_CELLS {
        return Err(format!("used range too large ({height} rows x {width} columns)"));
    }
    let mut rows = vec![vec![CellValue::Empty; width]; height];
    for (row, col, value) in cells {
        rows[row][col] = value;
    }
    Ok(Table::new(rows))
}

fn append_text(cell: &mut PendingCell, target: TextTarget, text: &str) {
    let slot = match target {
        TextTarget::Value => &mut cell.value,
        TextTarget::Inline => &mut cell.inline,
        TextTarget::None => return,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

fn row_index(e: &BytesStart<'_>, fallback: usize) -> PartResult<usize> {
    match attr(e, b"r")? {
        Some(r) => {
            let n: usize = r.trim().parse().map_err(|_| format!("bad row number '{r}'"))?;
            if n == 0 || n > MAX_ROWS {
                return Err(format!("row number {n} out of range"));
            }
            Ok(n - 1)
        }
        None => Ok(fallback),
    }
}

fn start_cell(e: &BytesStart<'_>, row: usize, next_col: &mut usize) -> PartResult<PendingCell> {
    let col = match attr(e, b"r")? {
        Some(reference) => column_index(&reference)?,
        None => *next_col,
    };
    *next_col = col + 1;
    Ok(PendingCell {
        row,
        col,
        kind: attr(e, b"t")?,
        ..Default::default()
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    /// Write a minimal workbook whose first sheet is `sheet_xml`.
    pub(crate) fn write_fixture(path: &Path, sheet_xml: &str, shared: &[&str]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let opts = SimpleFileOptions::default();

        let parts: Vec<(&str, String)> = vec![
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Table" sheetId="1" r:id="rId3"/><sheet name="Notes" sheetId="2" r:id="rId4"/></sheets>
</workbook>"#
                    .to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId4" Type="worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="worksheet" Target="worksheets/data.xml"/>
</Relationships>"#
                    .to_string(),
            ),
            ("xl/worksheets/data.xml", sheet_xml.to_string()),
            (
                "xl/worksheets/sheet2.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>wrong sheet</t></is></c></row></sheetData></worksheet>"#
                    .to_string(),
            ),
        ];
        for (name, body) in parts {
            zip.start_file(name, opts).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        if !shared.is_empty() {
            let mut sst = String::from("<sst>");
            for s in shared {
                sst.push_str(&format!("<si><t>{s}</t></si>"));
            }
            sst.push_str("</sst>");
            zip.start_file("xl/sharedStrings.xml", opts).unwrap();
            zip.write_all(sst.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn column_letters_map_to_indices() {
        assert_eq!(column_index("A1").unwrap(), 0);
        assert_eq!(column_index("Z9").unwrap(), 25);
        assert_eq!(column_index("AA10").unwrap(), 26);
        assert!(column_index("12").is_err());
    }

    #[test]
    fn columns_past_the_sheet_limit_are_rejected() {
        assert_eq!(column_index("XFD1").unwrap(), 16_383);
        let err = column_index("XFE1").unwrap_err();
        assert_eq!(err, "column out of range in XFE1");
        assert!(column_index("ZZZZZZZZZZZZZZZ1").is_err());
    }

    #[test]
    fn overlong_reference_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.xlsx");
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="ZZZZZZZZZZZZZZZ1"><v>1</v></c></row></sheetData></worksheet>"#;
        write_fixture(&path, sheet, &[]);
        let err = Workbook::open(&path).unwrap().first_sheet().err().unwrap();
        assert!(matches!(err, Error::FileFormat { .. }));
    }

    #[test]
    fn row_past_the_sheet_limit_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tall.xlsx");
        let sheet = r#"<worksheet><sheetData><row r="1048577"><c><v>1</v></c></row></sheetData></worksheet>"#;
        write_fixture(&path, sheet, &[]);
        let err = Workbook::open(&path).unwrap().first_sheet().err().unwrap();
        assert!(matches!(err, Error::FileFormat { .. }));
    }

    #[test]
    fn stray_far_corner_cell_is_rejected_before_allocating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corner.xlsx");
        let sheet = r#"<worksheet><sheetData><row r="1048576"><c r="XFD1048576"><v>1</v></c></row></sheetData></worksheet>"#;
        write_fixture(&path, sheet, &[]);
        match Workbook::open(&path).unwrap().first_sheet() {
            Err(Error::FileFormat { reason, .. }) => assert!(reason.contains("used range too large")),
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn shared_strings_join_rich_text_runs() {
        let xml = r#"<sst><si><t>plain</t></si><si><r><t>rich </t></r><r><t>text</t></r><rPh><t>skip</t></rPh></si><si/><si><t>a &amp; b</t></si></sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["plain", "rich text", "", "a & b"]);
    }

    #[test]
    fn reads_first_sheet_through_relationships() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>inline</t></is></c></row>
<row r="3"><c r="A3"><v>1980</v></c><c r="B3"><v>13</v></c><c r="C3" t="b"><v>1</v></c></row>
</sheetData></worksheet>"#;
        write_fixture(&path, sheet, &["Year"]);

        let mut wb = Workbook::open(&path).unwrap();
        assert_eq!(wb.sheets().unwrap()[0].name, "Table");
        let table = wb.first_sheet().unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec![CellValue::Text("Year".into()), CellValue::Empty, CellValue::Text("inline".into())],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
                vec![CellValue::Number(1980.0), CellValue::Number(13.0), CellValue::Bool(true)],
            ]
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workbook::open(&dir.path().join("absent.xlsx")).err().unwrap();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn non_zip_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.xlsx");
        std::fs::write(&path, "Year,Percent\n1980,13.0\n").unwrap();
        let err = Workbook::open(&path).err().unwrap();
        assert!(matches!(err, Error::FileFormat { .. }));
    }

    #[test]
    fn out_of_range_shared_string_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>7</v></c></row></sheetData></worksheet>"#;
        write_fixture(&path, sheet, &["only"]);
        let err = Workbook::open(&path).unwrap().first_sheet().err().unwrap();
        assert!(matches!(err, Error::FileFormat { .. }));
    }
}
