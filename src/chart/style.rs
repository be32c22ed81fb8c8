use serde::{Deserialize, Serialize};

/// Presentation of one dataset's charts. Only the annotated chart shows the
/// text and highlight fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    pub title: String,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    pub y_label: String,
    /// File name without extension; the annotated chart appends `_annotated`.
    pub output_base: String,
    /// Major y tick interval. A "nice" step is computed when unset.
    #[serde(default)]
    pub y_tick_step: Option<f64>,
    #[serde(default)]
    pub source_caption: Option<String>,
    #[serde(default = "reagan_terms")]
    pub highlights: Vec<HighlightSpan>,
}

fn default_x_label() -> String {
    "Year".to_string()
}

/// A shaded period interval, drawn from `start` to `end + 1` so the last
/// year is covered in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightSpan {
    pub label: String,
    pub start: i32,
    pub end: i32,
    /// `#rrggbb`; a palette colour is picked when absent.
    #[serde(default)]
    pub color: Option<String>,
}

/// Reagan's two terms. The second is cut at 1988: the presidency ended in
/// January 1989, too early to count for that year.
pub fn reagan_terms() -> Vec<HighlightSpan> {
    vec![
        HighlightSpan {
            label: "Reagan 1st Term (1981-1984)".into(),
            start: 1981,
            end: 1984,
            color: Some("#FFB347".into()),
        },
        HighlightSpan {
            label: "Reagan 2nd Term (1985-1988)".into(),
            start: 1985,
            end: 1988,
            color: Some("#ADD8E6".into()),
        },
    ]
}
