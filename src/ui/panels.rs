use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – dataset list and display options
// ---------------------------------------------------------------------------

/// Render the left dataset panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Datasets");
    ui.separator();

    if state.loaded.is_empty() {
        ui.label("No converted tables found.");
        ui.label(RichText::new("Run the workflow first, or open a CSV file.").small());
    }

    let mut clicked = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .max_height(ui.available_height() - 90.0)
        .show(ui, |ui: &mut Ui| {
            for (i, entry) in state.loaded.iter().enumerate() {
                let label = format!("{}  ({} points)", entry.dataset.name, entry.series.len());
                if ui
                    .selectable_label(state.selected == Some(i), label)
                    .on_hover_text(entry.source.display().to_string())
                    .clicked()
                {
                    clicked = Some(i);
                }
            }
        });
    if clicked.is_some() {
        state.selected = clicked;
    }

    ui.separator();
    ui.strong("Display");
    ui.checkbox(&mut state.annotate, "Annotations");
    ui.checkbox(&mut state.show_markers, "Point markers");

    if let Some(current) = state.current() {
        if let Some(page) = &current.dataset.source_page {
            ui.hyperlink_to("Source page", page);
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(current) = state.current() {
            if let Some((first, last)) = current.series.period_range() {
                ui.label(format!(
                    "{}: {} points, {first}–{last}",
                    current.dataset.name,
                    current.series.len()
                ));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open converted table")
        .set_directory(&state.config.raw_dir)
        .add_filter("Supported files", &["csv", "xlsx"])
        .add_filter("CSV", &["csv"])
        .add_filter("Excel workbook", &["xlsx"])
        .pick_file();

    if let Some(path) = file {
        if let Err(e) = state.open_table(&path) {
            log::error!("Failed to load file: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}
