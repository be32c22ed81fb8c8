use std::path::{Path, PathBuf};

use reqwest::blocking::Client;

use crate::chart::{render_pair, ChartPair};
use crate::config::{Config, DatasetConfig};
use crate::data::convert::convert_workbook;
use crate::data::extract::extract_series;
use crate::data::loader::load_table;
use crate::data::model::Series;
use crate::error::Result;
use crate::fetch::ensure_spreadsheet;

/// Artifacts produced for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReport {
    pub name: String,
    pub spreadsheet: PathBuf,
    pub table: PathBuf,
    pub points: usize,
    pub charts: ChartPair,
}

/// Fetch, convert and render every configured dataset, in order. The first
/// failure ends the run.
pub fn run(config: &Config, client: Option<&Client>) -> Result<Vec<DatasetReport>> {
    let mut reports = Vec::with_capacity(config.datasets.len());
    for dataset in &config.datasets {
        log::info!("Processing {}", dataset.name);
        let spreadsheet = ensure_spreadsheet(dataset, &config.raw_dir, client)?;
        let table = dataset.table_path(&config.raw_dir);
        convert_workbook(&spreadsheet, &table)?;

        let series = load_series(dataset, &table)?;
        let charts = render_pair(&series, &dataset.chart, &config.output_dir)?;

        reports.push(DatasetReport {
            name: dataset.name.clone(),
            spreadsheet,
            table,
            points: series.len(),
            charts,
        });
    }
    Ok(reports)
}

/// Load a converted table and extract the dataset's series from it.
pub fn load_series(dataset: &DatasetConfig, table: &Path) -> Result<Series> {
    let table = load_table(table)?;
    extract_series(&table, &dataset.layout, &dataset.name)
}

/// Render one already-converted table.
pub fn render_table(dataset: &DatasetConfig, table: &Path, out_dir: &Path) -> Result<ChartPair> {
    let series = load_series(dataset, table)?;
    render_pair(&series, &dataset.chart, out_dir)
}
