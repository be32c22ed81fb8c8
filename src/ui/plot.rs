use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints, Points, Polygon};

use crate::chart::scene::ChartScene;
use crate::color::{parse_hex, to_color32};
use crate::state::AppState;

const SPAN_ALPHA: f32 = 0.6;

// ---------------------------------------------------------------------------
// Series plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected series in the central panel. Geometry comes from the
/// same scene the SVG charts use.
pub fn series_plot(ui: &mut Ui, state: &AppState) {
    let Some(current) = state.current() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a converted table to preview it  (File → Open…)");
        });
        return;
    };

    let style = &current.dataset.chart;
    let scene = match ChartScene::build(&current.series, style, state.annotate) {
        Ok(scene) => scene,
        Err(e) => {
            ui.label(RichText::new(format!("Cannot chart {}: {e}", current.dataset.name)).color(Color32::RED));
            return;
        }
    };

    if state.annotate {
        ui.vertical_centered(|ui: &mut Ui| ui.heading(&style.title));
    }

    let (y_min, y_max) = scene.y_range;
    let mut plot = Plot::new("series_plot")
        .include_x(scene.x_range.0)
        .include_x(scene.x_range.1)
        .include_y(y_min)
        .include_y(y_max)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if state.annotate {
        plot = plot
            .legend(Legend::default())
            .x_axis_label(style.x_label.clone())
            .y_axis_label(style.y_label.clone());
    }

    let caption_height = if state.annotate && style.source_caption.is_some() { 24.0 } else { 0.0 };
    plot.height(ui.available_height() - caption_height)
        .show(ui, |plot_ui| {
            for span in scene.visible_spans() {
                let color = parse_hex(&span.color)
                    .map(|c| to_color32(c, SPAN_ALPHA))
                    .unwrap_or(Color32::LIGHT_GRAY);
                let corners: PlotPoints = vec![
                    [span.from, y_min],
                    [span.to, y_min],
                    [span.to, y_max],
                    [span.from, y_max],
                ]
                .into();
                plot_ui.polygon(Polygon::new(corners).fill_color(color).name(&span.label));
            }

            let points: PlotPoints = scene.data_points().iter().map(|&(x, y)| [x, y]).collect();
            plot_ui.line(Line::new(points).color(Color32::BLACK).width(2.0));

            if state.show_markers {
                let markers: PlotPoints =
                    scene.data_points().iter().map(|&(x, y)| [x, y]).collect();
                plot_ui.points(Points::new(markers).radius(3.0).color(Color32::BLACK));
            }
        });

    if state.annotate {
        if let Some(caption) = &style.source_caption {
            ui.label(RichText::new(caption).small());
        }
    }
}
