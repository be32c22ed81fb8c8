use std::borrow::Cow;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a converted worksheet
// ---------------------------------------------------------------------------

/// A dynamically-typed spreadsheet cell.
///
/// CSV carries no types, so a converted table is re-inferred field by field:
/// numbers come back as numbers, and text reading as a number or boolean
/// (a text cell holding `1980`) comes back as one too.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            // `{}` on f64 is the shortest representation that parses back
            // to the same bits, and drops the fraction of integral values.
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Bool(true) => write!(f, "TRUE"),
            CellValue::Bool(false) => write!(f, "FALSE"),
        }
    }
}

impl CellValue {
    /// Infer the type of a field read back from a converted table.
    pub fn infer(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(v) = s.parse::<f64>() {
            if v.is_finite() {
                return CellValue::Number(v);
            }
        }
        if s.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        CellValue::Text(s.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// The cell as it reads in a table, borrowing where possible.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Empty => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the first worksheet of a spreadsheet, row by row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Table { rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Pad every row with empty cells up to the table width.
    pub fn pad_to_width(&mut self) {
        let width = self.width();
        for row in &mut self.rows {
            row.resize(width, CellValue::Empty);
        }
    }
}

// ---------------------------------------------------------------------------
// Series – what a chart plots
// ---------------------------------------------------------------------------

/// One plotted observation: a year and its metric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub period: i32,
    pub value: f64,
}

/// A time series extracted from a converted table, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<Point>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inclusive (min, max) of the periods. `None` when empty.
    pub fn period_range(&self) -> Option<(i32, i32)> {
        let min = self.points.iter().map(|p| p.period).min()?;
        let max = self.points.iter().map(|p| p.period).max()?;
        Some((min, max))
    }

    /// Inclusive (min, max) of the values. `None` when empty.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let min = self.points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let max = self
            .points
            .iter()
            .map(|p| p.value)
            .fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}
