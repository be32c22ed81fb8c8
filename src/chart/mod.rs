/// Chart layer: layout of a series into a scene, and SVG output.
///
/// Every series is rendered twice, plain and annotated. Both scenes are laid
/// out before anything is written, so a series that cannot be charted
/// leaves no files behind.
pub mod scene;
pub mod style;
pub mod svg;

use std::path::{Path, PathBuf};

use scene::ChartScene;
use style::ChartStyle;

use crate::data::model::Series;
use crate::error::{Error, Result};

/// The two files produced for one series.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPair {
    pub plain: PathBuf,
    pub annotated: PathBuf,
}

/// `<dir>/<base>.svg` and `<dir>/<base>_annotated.svg`.
pub fn chart_paths(out_dir: &Path, base: &str) -> ChartPair {
    ChartPair {
        plain: out_dir.join(format!("{base}.svg")),
        annotated: out_dir.join(format!("{base}_annotated.svg")),
    }
}

/// Render the plain and annotated charts of `series` into `out_dir`.
pub fn render_pair(series: &Series, style: &ChartStyle, out_dir: &Path) -> Result<ChartPair> {
    let plain = ChartScene::build(series, style, false).map_err(|r| Error::shape(&series.label, r))?;
    let annotated =
        ChartScene::build(series, style, true).map_err(|r| Error::shape(&series.label, r))?;

    let paths = chart_paths(out_dir, &style.output_base);
    std::fs::create_dir_all(out_dir)?;
    std::fs::write(&paths.plain, plain.to_svg().build())?;
    log::info!("Plot saved: {}", paths.plain.display());
    std::fs::write(&paths.annotated, annotated.to_svg().build())?;
    log::info!("Plot saved: {}", paths.annotated.display());

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::style::reagan_terms;
    use crate::data::model::Point;
    use crate::error::ShapeError;

    fn style() -> ChartStyle {
        ChartStyle {
            title: "Example".into(),
            x_label: "Year".into(),
            y_label: "Percent (%)".into(),
            output_base: "example_plot".into(),
            y_tick_step: None,
            source_caption: None,
            highlights: reagan_terms(),
        }
    }

    /// The `points` attribute of the series polyline.
    fn polyline_points(svg: &str) -> String {
        let start = svg.find(r#"class="series" points=""#).unwrap() + r#"class="series" points=""#.len();
        let end = svg[start..].find('"').unwrap();
        svg[start..start + end].to_string()
    }

    #[test]
    fn writes_both_charts_with_identical_series() {
        let dir = tempfile::tempdir().unwrap();
        let series = Series {
            label: "example".into(),
            points: vec![
                Point { period: 1980, value: 13.0 },
                Point { period: 1990, value: 13.5 },
                Point { period: 2000, value: 11.3 },
            ],
        };
        let out = dir.path().join("output");
        let pair = render_pair(&series, &style(), &out).unwrap();
        assert_eq!(pair, chart_paths(&out, "example_plot"));

        let plain = std::fs::read_to_string(&pair.plain).unwrap();
        let annotated = std::fs::read_to_string(&pair.annotated).unwrap();
        let plain_points = polyline_points(&plain);
        assert_eq!(plain_points, polyline_points(&annotated));
        assert_eq!(plain_points.split(' ').count(), 3);
        assert_eq!(plain.matches(r#"class="marker""#).count(), 3);
        assert_eq!(annotated.matches(r#"class="marker""#).count(), 3);
    }

    #[test]
    fn invalid_series_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let series = Series {
            label: "broken".into(),
            points: Vec::new(),
        };
        let out = dir.path().join("output");
        let err = render_pair(&series, &style(), &out).unwrap_err();
        assert!(matches!(
            err,
            Error::DataShape {
                reason: ShapeError::NoDataPoints,
                ..
            }
        ));
        assert!(!out.exists());
    }
}
