use super::model::{CellValue, Point, Series, Table};
use crate::config::{ColumnLayout, HeaderScope, ValueColumn};
use crate::error::{Error, Result, ShapeError};

/// Years a period token may name.
const PERIOD_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

// ---------------------------------------------------------------------------
// Series extraction: ColumnLayout + Table → Series
// ---------------------------------------------------------------------------

/// Pull the (period, value) series out of a converted table.
///
/// Row handling:
/// * rows before the header (and `skip_after_header` rows after it) are ignored
/// * a row is a data row when it is wide enough for the layout and its
///   period cell is non-empty
/// * a period cell mentioning a section break ends extraction
/// * the period is the first whitespace-separated token, e.g. `2017 (21)`;
///   rows whose token is not an all-digit year up to 9999 are skipped
/// * blank, `N` and `NA` values are skipped
/// * an empty row after data has been collected ends the section
///
/// Tables listed newest-first are reversed to chronological order.
pub fn extract_series(table: &Table, layout: &ColumnLayout, label: &str) -> Result<Series> {
    let start = data_start(table, layout).map_err(|reason| Error::shape(label, reason))?;

    let needed = layout.required_width();
    let widest = table.rows.iter().skip(start).map(Vec::len).max().unwrap_or(0);
    if widest < needed {
        return Err(Error::shape(label, ShapeError::MissingColumns { needed, widest }));
    }

    let mut points = Vec::new();
    for row in &table.rows[start..] {
        let period_cell = row.get(layout.period_column).map(CellValue::text);
        let period_text = period_cell.as_deref().unwrap_or("").trim();

        if row.len() >= needed && !period_text.is_empty() {
            if layout
                .section_breaks
                .iter()
                .any(|b| period_text.contains(b.as_str()))
            {
                log::debug!("{label}: section break at '{period_text}'");
                break;
            }
            let Some(period) = parse_period(period_text) else {
                continue;
            };
            match row_value(row, layout.value) {
                Ok(Some(value)) => points.push(Point { period, value }),
                Ok(None) => {}
                Err(raw) => log::warn!("{label}: skipping {period}, value '{raw}' is not a number"),
            }
        } else if row.first().map_or(true, CellValue::is_empty) && !points.is_empty() {
            break;
        }
    }

    if points.is_empty() {
        return Err(Error::shape(label, ShapeError::NoDataPoints));
    }

    let newest_first = points.first().map(|p| p.period) > points.last().map(|p| p.period);
    if newest_first {
        points.reverse();
    }

    log::debug!("{label}: extracted {} points", points.len());
    Ok(Series {
        label: label.to_string(),
        points,
    })
}

/// Index of the first row that may hold data.
fn data_start(table: &Table, layout: &ColumnLayout) -> std::result::Result<usize, ShapeError> {
    let Some(header) = &layout.header else {
        return Ok(0);
    };
    let header_row = table
        .rows
        .iter()
        .position(|row| match header.scope {
            HeaderScope::FirstCell => row.first().is_some_and(|c| header.matches(&c.text())),
            HeaderScope::AnyCell => row.iter().any(|c| header.matches(&c.text())),
        })
        .ok_or_else(|| ShapeError::HeaderNotFound(header.indicator.clone()))?;
    Ok((header_row + 1 + layout.skip_after_header).min(table.len()))
}

fn parse_period(text: &str) -> Option<i32> {
    let token = text.split_whitespace().next()?;
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().filter(|year| PERIOD_RANGE.contains(year))
}

/// `Ok(None)` for missing values; `Err(raw)` for values that fail to parse.
fn parse_value(cell: &CellValue) -> std::result::Result<Option<f64>, String> {
    if let Some(v) = cell.as_f64() {
        return Ok(Some(v));
    }
    let raw = cell.text();
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '%').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("n") || cleaned.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    cleaned.parse::<f64>().map(Some).map_err(|_| raw.into_owned())
}

fn row_value(row: &[CellValue], value: ValueColumn) -> std::result::Result<Option<f64>, String> {
    match value {
        ValueColumn::Column(c) => row.get(c).map_or(Ok(None), parse_value),
        ValueColumn::Mean { first, last } => {
            let mut sum = 0.0;
            let mut count = 0usize;
            for cell in row.iter().take(last + 1).skip(first) {
                if let Some(v) = parse_value(cell)? {
                    sum += v;
                    count += 1;
                }
            }
            Ok((count > 0).then(|| sum / count as f64))
        }
    }
}
