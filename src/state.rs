use std::path::{Path, PathBuf};

use crate::chart::style::{reagan_terms, ChartStyle};
use crate::config::{ColumnLayout, Config, DatasetConfig};
use crate::data::model::Series;
use crate::error::Result;
use crate::workflow::load_series;

// ---------------------------------------------------------------------------
// Preview state
// ---------------------------------------------------------------------------

/// A series loaded for preview together with the dataset that shaped it.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub dataset: DatasetConfig,
    pub series: Series,
    pub source: PathBuf,
}

/// The full preview state, independent of rendering.
pub struct AppState {
    pub config: Config,

    /// Series available in the side panel, in load order.
    pub loaded: Vec<LoadedSeries>,

    /// Index into `loaded` of the series on screen.
    pub selected: Option<usize>,

    /// Show title, highlight spans, legend and caption.
    pub annotate: bool,

    pub show_markers: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            loaded: Vec::new(),
            selected: None,
            annotate: true,
            show_markers: true,
            status_message: None,
        }
    }

    /// Load every configured dataset whose converted table already exists.
    pub fn load_configured(&mut self) {
        let datasets = self.config.datasets.clone();
        for dataset in datasets {
            let table = dataset.table_path(&self.config.raw_dir);
            if !table.exists() {
                log::debug!("{}: no converted table at {}", dataset.name, table.display());
                continue;
            }
            match load_series(&dataset, &table) {
                Ok(series) => self.insert(LoadedSeries {
                    dataset,
                    series,
                    source: table,
                }),
                Err(e) => {
                    log::warn!("{}: {e}", dataset.name);
                    self.status_message = Some(format!("Error: {e}"));
                }
            }
        }
        // Start on the first configured dataset rather than the last loaded.
        if !self.loaded.is_empty() {
            self.selected = Some(0);
        }
    }

    /// Load a table picked by the user. The layout comes from the configured
    /// dataset with the same file stem, else the generic two-column layout.
    pub fn open_table(&mut self, path: &Path) -> Result<()> {
        let dataset = self
            .config
            .dataset_for_table(path)
            .cloned()
            .unwrap_or_else(|| generic_dataset(path));
        let series = load_series(&dataset, path)?;
        log::info!("Loaded {} points from {}", series.len(), path.display());
        self.insert(LoadedSeries {
            dataset,
            series,
            source: path.to_path_buf(),
        });
        self.status_message = None;
        Ok(())
    }

    /// Add or replace (by dataset name) and select the entry.
    fn insert(&mut self, entry: LoadedSeries) {
        let existing = self
            .loaded
            .iter()
            .position(|l| l.dataset.name == entry.dataset.name);
        let idx = match existing {
            Some(i) => {
                self.loaded[i] = entry;
                i
            }
            None => {
                self.loaded.push(entry);
                self.loaded.len() - 1
            }
        };
        self.selected = Some(idx);
    }

    pub fn select_by_name(&mut self, name: &str) -> bool {
        match self.loaded.iter().position(|l| l.dataset.name == name) {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<&LoadedSeries> {
        self.selected.and_then(|i| self.loaded.get(i))
    }
}

fn generic_dataset(path: &Path) -> DatasetConfig {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    DatasetConfig {
        name: stem.clone(),
        spreadsheet: format!("{stem}.xlsx"),
        download_url: None,
        source_page: None,
        layout: ColumnLayout::generic(),
        chart: ChartStyle {
            title: stem.clone(),
            x_label: "Year".into(),
            y_label: "Value".into(),
            output_base: stem,
            y_tick_step: None,
            source_caption: None,
            highlights: reagan_terms(),
        },
    }
}
