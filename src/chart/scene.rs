use super::style::ChartStyle;
use super::svg::{Anchor, SvgDocument, SvgElement};
use crate::color::{span_color, to_hex};
use crate::data::model::Series;
use crate::error::ShapeError;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

pub const WIDTH: f64 = 1400.0;
pub const HEIGHT: f64 = 700.0;

const MARGIN_LEFT: f64 = 100.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 70.0;
const MARGIN_BOTTOM: f64 = 110.0;

const X_TICK_EVERY: i32 = 5;
const MAX_Y_TICKS: f64 = 40.0;
const SPAN_OPACITY: f64 = 0.6;
const SERIES_COLOR: &str = "#000000";
const GRID_COLOR: &str = "#D0D0D0";

/// Plot area in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Frame {
    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// A shaded interval clipped to the x range, in data units.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSpan {
    pub label: String,
    pub from: f64,
    pub to: f64,
    pub color: String,
}

// ---------------------------------------------------------------------------
// ChartScene – everything needed to draw one chart
// ---------------------------------------------------------------------------

/// One chart of a series, annotated or plain. The geometry (frame, ranges,
/// ticks, point positions) depends only on the series and the style, never
/// on the annotation flag.
#[derive(Debug, Clone)]
pub struct ChartScene {
    pub annotate: bool,
    pub frame: Frame,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub x_ticks: Vec<i32>,
    pub y_ticks: Vec<f64>,
    points: Vec<(f64, f64)>,
    spans: Vec<VisibleSpan>,
    style: ChartStyle,
}

impl ChartScene {
    /// Lay out a chart. Rejects series that cannot be plotted.
    pub fn build(series: &Series, style: &ChartStyle, annotate: bool) -> Result<Self, ShapeError> {
        if series.is_empty() {
            return Err(ShapeError::NoDataPoints);
        }
        if let Some(bad) = series.points.iter().find(|p| !p.value.is_finite()) {
            return Err(ShapeError::NonFiniteValue(bad.period));
        }
        let (min_period, max_period) = series.period_range().ok_or(ShapeError::NoDataPoints)?;
        let (min_value, max_value) = series.value_range().ok_or(ShapeError::NoDataPoints)?;

        let x_start = min_period.saturating_sub(min_period.rem_euclid(X_TICK_EVERY));
        let mut x_end =
            max_period.saturating_add((X_TICK_EVERY - max_period.rem_euclid(X_TICK_EVERY)) % X_TICK_EVERY);
        if x_end <= x_start {
            x_end = x_start.saturating_add(X_TICK_EVERY);
        }
        let x_ticks: Vec<i32> = (x_start..=x_end).step_by(X_TICK_EVERY as usize).collect();

        let step = y_step(style.y_tick_step, min_value, max_value);
        let mut y_min = (min_value / step).floor() * step;
        let mut y_max = (max_value / step).ceil() * step;
        if y_max - y_min < step {
            y_min -= step;
            y_max += step;
        }
        let n_y = ((y_max - y_min) / step).round() as usize;
        let y_ticks: Vec<f64> = (0..=n_y).map(|i| y_min + i as f64 * step).collect();

        let x_range = (x_start as f64, x_end as f64);
        let spans = style
            .highlights
            .iter()
            .enumerate()
            .filter_map(|(i, span)| {
                let from = (span.start as f64).max(x_range.0);
                let to = (span.end as f64 + 1.0).min(x_range.1);
                (to > from).then(|| VisibleSpan {
                    label: span.label.clone(),
                    from,
                    to,
                    color: to_hex(span_color(span.color.as_deref(), i, style.highlights.len())),
                })
            })
            .collect();

        Ok(ChartScene {
            annotate,
            frame: Frame {
                left: MARGIN_LEFT,
                top: MARGIN_TOP,
                right: WIDTH - MARGIN_RIGHT,
                bottom: HEIGHT - MARGIN_BOTTOM,
            },
            x_range,
            y_range: (y_min, y_max),
            x_ticks,
            y_ticks,
            points: series
                .points
                .iter()
                .map(|p| (p.period as f64, p.value))
                .collect(),
            spans,
            style: style.clone(),
        })
    }

    /// The plotted (x, y) sequence in data units, in series order.
    pub fn data_points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Highlight spans shown on this chart; none when not annotated.
    pub fn visible_spans(&self) -> &[VisibleSpan] {
        if self.annotate {
            &self.spans
        } else {
            &[]
        }
    }

    fn px(&self, x: f64) -> f64 {
        let (lo, hi) = self.x_range;
        self.frame.left + (x - lo) / (hi - lo) * self.frame.width()
    }

    fn py(&self, y: f64) -> f64 {
        let (lo, hi) = self.y_range;
        self.frame.bottom - (y - lo) / (hi - lo) * self.frame.height()
    }

    /// Point positions in pixels.
    pub fn pixel_points(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|&(x, y)| (self.px(x), self.py(y))).collect()
    }

    pub fn to_svg(&self) -> SvgDocument {
        let mut doc = SvgDocument::new(WIDTH, HEIGHT);
        let f = self.frame;

        doc.add(SvgElement::Rect {
            x: 0.0,
            y: 0.0,
            width: WIDTH,
            height: HEIGHT,
            fill: "#FFFFFF".into(),
            fill_opacity: 1.0,
            stroke: None,
        });

        for span in self.visible_spans() {
            let (x0, x1) = (self.px(span.from), self.px(span.to));
            doc.add(SvgElement::Rect {
                x: x0,
                y: f.top,
                width: x1 - x0,
                height: f.height(),
                fill: span.color.clone(),
                fill_opacity: SPAN_OPACITY,
                stroke: None,
            });
        }

        self.add_grid(&mut doc);

        doc.add(SvgElement::Rect {
            x: f.left,
            y: f.top,
            width: f.width(),
            height: f.height(),
            fill: "none".into(),
            fill_opacity: 1.0,
            stroke: Some(SERIES_COLOR.into()),
        });

        let pixels = self.pixel_points();
        doc.add(SvgElement::Polyline {
            class: "series",
            points: pixels.clone(),
            stroke: SERIES_COLOR.into(),
            width: 2.0,
        });
        for &(cx, cy) in &pixels {
            doc.add(SvgElement::Circle {
                class: "marker",
                cx,
                cy,
                r: 4.0,
                fill: SERIES_COLOR.into(),
            });
        }

        if self.annotate {
            self.add_annotations(&mut doc);
        }
        doc
    }

    fn add_grid(&self, doc: &mut SvgDocument) {
        let f = self.frame;
        for &year in &self.x_ticks {
            let x = self.px(year as f64);
            doc.add(grid_line(x, f.top, x, f.bottom));
            doc.add(tick_line(x, f.bottom, x, f.bottom + 6.0));
        }
        for &v in &self.y_ticks {
            let y = self.py(v);
            doc.add(grid_line(f.left, y, f.right, y));
            doc.add(tick_line(f.left - 6.0, y, f.left, y));
        }
    }

    fn add_annotations(&self, doc: &mut SvgDocument) {
        let f = self.frame;
        let style = &self.style;

        doc.add(text(WIDTH / 2.0, MARGIN_TOP / 2.0 + 6.0, &style.title, 20.0, Anchor::Middle, true));

        for &year in &self.x_ticks {
            let x = self.px(year as f64);
            doc.add(SvgElement::Text {
                x,
                y: f.bottom + 22.0,
                content: year.to_string(),
                size: 12.0,
                anchor: Anchor::End,
                bold: false,
                rotate: Some(-45.0),
            });
        }
        for &v in &self.y_ticks {
            doc.add(text(f.left - 10.0, self.py(v) + 4.0, &format_tick(v), 12.0, Anchor::End, false));
        }

        doc.add(text(
            (f.left + f.right) / 2.0,
            f.bottom + 62.0,
            &style.x_label,
            14.0,
            Anchor::Middle,
            false,
        ));
        let y_mid = (f.top + f.bottom) / 2.0;
        doc.add(SvgElement::Text {
            x: 30.0,
            y: y_mid,
            content: style.y_label.clone(),
            size: 14.0,
            anchor: Anchor::Middle,
            bold: false,
            rotate: Some(-90.0),
        });

        for idx in self.labelled_points() {
            let (x, y) = self.points[idx];
            doc.add(text(
                self.px(x),
                self.py(y) - 10.0,
                &format!("{} ({})", format_tick(y), x),
                11.0,
                Anchor::Middle,
                false,
            ));
        }

        self.add_legend(doc);

        if let Some(caption) = &style.source_caption {
            doc.add(text(f.left, HEIGHT - 12.0, caption, 11.0, Anchor::Start, false));
        }
    }

    fn add_legend(&self, doc: &mut SvgDocument) {
        let spans = self.visible_spans();
        if spans.is_empty() {
            return;
        }
        let f = self.frame;
        let row_height = 22.0;
        let box_width = 260.0;
        let x = f.right - box_width - 10.0;
        let y = f.top + 10.0;

        doc.add(SvgElement::Rect {
            x,
            y,
            width: box_width,
            height: row_height * spans.len() as f64 + 10.0,
            fill: "#FFFFFF".into(),
            fill_opacity: 0.85,
            stroke: Some(GRID_COLOR.into()),
        });
        for (i, span) in spans.iter().enumerate() {
            let row_y = y + 5.0 + i as f64 * row_height;
            doc.add(SvgElement::Rect {
                x: x + 8.0,
                y: row_y + 4.0,
                width: 24.0,
                height: 14.0,
                fill: span.color.clone(),
                fill_opacity: SPAN_OPACITY,
                stroke: None,
            });
            doc.add(text(x + 40.0, row_y + 16.0, &span.label, 12.0, Anchor::Start, false));
        }
    }

    /// First, last, lowest and highest points, each labelled once.
    fn labelled_points(&self) -> Vec<usize> {
        let n = self.points.len();
        let mut min_idx = 0;
        let mut max_idx = 0;
        for (i, &(_, y)) in self.points.iter().enumerate() {
            if y < self.points[min_idx].1 {
                min_idx = i;
            }
            if y > self.points[max_idx].1 {
                max_idx = i;
            }
        }
        let mut picked = vec![0, n - 1, min_idx, max_idx];
        picked.sort_unstable();
        picked.dedup();
        picked
    }
}

fn y_step(configured: Option<f64>, min: f64, max: f64) -> f64 {
    let span = (max - min).abs();
    if let Some(step) = configured.filter(|s| s.is_finite() && *s > 0.0) {
        if span / step <= MAX_Y_TICKS {
            return step;
        }
    }
    let raw = if span > 0.0 { span / 8.0 } else { max.abs().max(1.0) / 4.0 };
    nice_step(raw)
}

/// Round a raw interval up to 1, 2 or 5 times a power of ten.
pub fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn format_tick(v: f64) -> String {
    let rounded = (v * 1e6).round() / 1e6;
    format!("{rounded}")
}

fn grid_line(x1: f64, y1: f64, x2: f64, y2: f64) -> SvgElement {
    SvgElement::Line {
        x1,
        y1,
        x2,
        y2,
        stroke: GRID_COLOR.into(),
        width: 1.0,
        dash: Some("4 3".into()),
    }
}

fn tick_line(x1: f64, y1: f64, x2: f64, y2: f64) -> SvgElement {
    SvgElement::Line {
        x1,
        y1,
        x2,
        y2,
        stroke: SERIES_COLOR.into(),
        width: 1.0,
        dash: None,
    }
}

fn text(x: f64, y: f64, content: &str, size: f64, anchor: Anchor, bold: bool) -> SvgElement {
    SvgElement::Text {
        x,
        y,
        content: content.to_string(),
        size,
        anchor,
        bold,
        rotate: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::style::{reagan_terms, HighlightSpan};
    use crate::data::model::Point;

    fn style() -> ChartStyle {
        ChartStyle {
            title: "Percent of People Below Poverty".into(),
            x_label: "Year".into(),
            y_label: "Percent (%)".into(),
            output_base: "poverty".into(),
            y_tick_step: Some(2.0),
            source_caption: Some("Source: Census".into()),
            highlights: reagan_terms(),
        }
    }

    fn series() -> Series {
        Series {
            label: "example".into(),
            points: vec![
                Point { period: 1980, value: 13.0 },
                Point { period: 1990, value: 13.5 },
                Point { period: 2000, value: 11.3 },
            ],
        }
    }

    #[test]
    fn annotated_and_plain_share_points() {
        let plain = ChartScene::build(&series(), &style(), false).unwrap();
        let annotated = ChartScene::build(&series(), &style(), true).unwrap();
        assert_eq!(plain.data_points(), annotated.data_points());
        assert_eq!(plain.pixel_points(), annotated.pixel_points());
        assert_eq!(
            plain.data_points(),
            &[(1980.0, 13.0), (1990.0, 13.5), (2000.0, 11.3)]
        );
    }

    #[test]
    fn axes_follow_tick_steps() {
        let scene = ChartScene::build(&series(), &style(), false).unwrap();
        assert_eq!(scene.x_ticks, vec![1980, 1985, 1990, 1995, 2000]);
        assert_eq!(scene.y_range, (10.0, 14.0));
        assert_eq!(scene.y_ticks, vec![10.0, 12.0, 14.0]);
    }

    #[test]
    fn x_range_is_aligned_to_five_years() {
        let s = Series {
            label: "s".into(),
            points: vec![Point { period: 1959, value: 22.4 }, Point { period: 2023, value: 11.1 }],
        };
        let scene = ChartScene::build(&s, &style(), true).unwrap();
        assert_eq!(scene.x_range, (1955.0, 2025.0));
    }

    #[test]
    fn spans_only_on_annotated_charts() {
        let plain = ChartScene::build(&series(), &style(), false).unwrap();
        let annotated = ChartScene::build(&series(), &style(), true).unwrap();
        assert!(plain.visible_spans().is_empty());
        let spans = annotated.visible_spans();
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].from, spans[0].to), (1981.0, 1985.0));
        assert_eq!((spans[1].from, spans[1].to), (1985.0, 1989.0));
        assert_eq!(spans[0].color, "#FFB347");
    }

    #[test]
    fn plain_svg_has_no_text() {
        let plain = ChartScene::build(&series(), &style(), false).unwrap().to_svg().build();
        let annotated = ChartScene::build(&series(), &style(), true).unwrap().to_svg().build();
        assert!(!plain.contains("<text"));
        assert!(annotated.contains("Percent of People Below Poverty"));
        assert!(annotated.contains("Source: Census"));
        assert!(annotated.contains("Reagan 1st Term (1981-1984)"));
    }

    #[test]
    fn empty_and_non_finite_series_are_rejected() {
        let empty = Series { label: "e".into(), points: Vec::new() };
        assert_eq!(
            ChartScene::build(&empty, &style(), true).unwrap_err(),
            ShapeError::NoDataPoints
        );
        let bad = Series {
            label: "b".into(),
            points: vec![Point { period: 1980, value: f64::NAN }],
        };
        assert_eq!(
            ChartScene::build(&bad, &style(), false).unwrap_err(),
            ShapeError::NonFiniteValue(1980)
        );
    }

    #[test]
    fn large_values_get_a_computed_step() {
        let s = Series {
            label: "counts".into(),
            points: vec![Point { period: 1980, value: 29_272.0 }, Point { period: 1990, value: 33_585.0 }],
        };
        let scene = ChartScene::build(&s, &style(), false).unwrap();
        assert!(scene.y_ticks.len() <= 12);
        assert_eq!(nice_step(539.0), 1000.0);
        assert_eq!(nice_step(3.0), 5.0);
        assert_eq!(nice_step(12.0), 20.0);
    }

    #[test]
    fn extreme_periods_do_not_overflow() {
        let mut style = style();
        style.highlights.push(HighlightSpan {
            label: "open ended".into(),
            start: 2000,
            end: i32::MAX,
            color: None,
        });
        let s = Series {
            label: "edge".into(),
            points: vec![Point { period: i32::MAX, value: 1.0 }],
        };
        let scene = ChartScene::build(&s, &style, true).unwrap();
        assert_eq!(scene.x_range.1, i32::MAX as f64);
        assert_eq!(scene.visible_spans().len(), 1);
    }
}
