// SVG document generation for chart scenes

use quick_xml::escape::escape;

/// Horizontal alignment of a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// SVG elements used by charts
#[derive(Debug, Clone, PartialEq)]
pub enum SvgElement {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
        fill_opacity: f64,
        stroke: Option<String>,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: String,
        width: f64,
        dash: Option<String>,
    },
    Polyline {
        class: &'static str,
        points: Vec<(f64, f64)>,
        stroke: String,
        width: f64,
    },
    Circle {
        class: &'static str,
        cx: f64,
        cy: f64,
        r: f64,
        fill: String,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        size: f64,
        anchor: Anchor,
        bold: bool,
        /// Rotation in degrees around (x, y).
        rotate: Option<f64>,
    },
}

/// Coordinates are written with two decimals so identical geometry always
/// serialises identically.
fn num(v: f64) -> String {
    format!("{v:.2}")
}

impl SvgElement {
    /// Convert to SVG element string
    pub fn to_svg(&self) -> String {
        match self {
            Self::Rect {
                x,
                y,
                width,
                height,
                fill,
                fill_opacity,
                stroke,
            } => {
                let stroke = match stroke {
                    Some(s) => format!(r#" stroke="{}""#, escape(s.as_str())),
                    None => String::new(),
                };
                format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" fill-opacity="{}"{stroke}/>"#,
                    num(*x),
                    num(*y),
                    num(*width),
                    num(*height),
                    escape(fill.as_str()),
                    fill_opacity
                )
            }
            Self::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
                width,
                dash,
            } => {
                let dash = match dash {
                    Some(d) => format!(r#" stroke-dasharray="{}""#, escape(d.as_str())),
                    None => String::new(),
                };
                format!(
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"{dash}/>"#,
                    num(*x1),
                    num(*y1),
                    num(*x2),
                    num(*y2),
                    escape(stroke.as_str()),
                    width
                )
            }
            Self::Polyline {
                class,
                points,
                stroke,
                width,
            } => {
                let points: Vec<String> = points
                    .iter()
                    .map(|(x, y)| format!("{},{}", num(*x), num(*y)))
                    .collect();
                format!(
                    r#"<polyline class="{class}" points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linejoin="round"/>"#,
                    points.join(" "),
                    escape(stroke.as_str()),
                    width
                )
            }
            Self::Circle {
                class,
                cx,
                cy,
                r,
                fill,
            } => format!(
                r#"<circle class="{class}" cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                num(*cx),
                num(*cy),
                r,
                escape(fill.as_str())
            ),
            Self::Text {
                x,
                y,
                content,
                size,
                anchor,
                bold,
                rotate,
            } => {
                let weight = if *bold { r#" font-weight="bold""# } else { "" };
                let transform = match rotate {
                    Some(deg) => format!(r#" transform="rotate({deg} {} {})""#, num(*x), num(*y)),
                    None => String::new(),
                };
                format!(
                    r#"<text x="{}" y="{}" font-family="sans-serif" font-size="{size}" text-anchor="{}"{weight}{transform}>{}</text>"#,
                    num(*x),
                    num(*y),
                    anchor.as_str(),
                    escape(content.as_str())
                )
            }
        }
    }
}

/// SVG document builder
#[derive(Debug, Clone)]
pub struct SvgDocument {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<SvgElement>,
}

impl SvgDocument {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    pub fn add(&mut self, element: SvgElement) {
        self.elements.push(element);
    }

    /// Generate complete SVG document
    pub fn build(&self) -> String {
        let mut svg = String::new();
        svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        svg.push('\n');
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        ));
        svg.push('\n');
        for element in &self.elements {
            svg.push_str("  ");
            svg.push_str(&element.to_svg());
            svg.push('\n');
        }
        svg.push_str("</svg>\n");
        svg
    }
}
