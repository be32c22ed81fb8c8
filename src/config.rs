use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chart::style::{reagan_terms, ChartStyle};
use crate::color::parse_hex;
use crate::data::convert::converted_path;
use crate::error::{Error, Result};

const CENSUS_CAPTION: &str =
    "Source: U.S. Census Bureau, Current Population Survey, Annual Social and Economic Supplements";
const CENSUS_PAGE: &str =
    "https://www.census.gov/data/tables/time-series/demo/income-poverty/historical-poverty-people.html";
const CENSUS_TABLES: &str =
    "https://www2.census.gov/programs-surveys/cps/tables/time-series/historical-poverty-people";
const BLS_PAGE: &str = "https://data.bls.gov/timeseries/LNS14000000";

/// Rows whose period cell mentions one of these start another demographic
/// section of the Census tables.
pub const DEFAULT_SECTION_BREAKS: [&str; 6] = [
    "White Alone",
    "Black Alone",
    "Asian Alone",
    "American Indian",
    "Hispanic",
    "Two or More",
];

// ---------------------------------------------------------------------------
// Column layout: where the series lives inside a converted table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderScope {
    /// Only the first cell of a row is searched.
    #[default]
    FirstCell,
    /// Any cell of a row may contain the indicator.
    AnyCell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderMatch {
    pub indicator: String,
    #[serde(default)]
    pub scope: HeaderScope,
    /// Require the whole (trimmed) cell to equal the indicator.
    #[serde(default)]
    pub exact: bool,
}

impl HeaderMatch {
    pub fn matches(&self, cell: &str) -> bool {
        if self.exact {
            cell.trim() == self.indicator
        } else {
            cell.contains(&self.indicator)
        }
    }
}

/// Which cells hold the metric value of a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueColumn {
    Column(usize),
    /// Mean of the numeric cells in `first..=last` (monthly columns).
    Mean { first: usize, last: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Row that precedes the data. `None` means data may start on row 0.
    #[serde(default)]
    pub header: Option<HeaderMatch>,
    /// Rows skipped after the header row before data is read.
    #[serde(default)]
    pub skip_after_header: usize,
    #[serde(default)]
    pub period_column: usize,
    pub value: ValueColumn,
    #[serde(default = "default_section_breaks")]
    pub section_breaks: Vec<String>,
}

fn default_section_breaks() -> Vec<String> {
    DEFAULT_SECTION_BREAKS.iter().map(|s| s.to_string()).collect()
}

impl ColumnLayout {
    /// Period in column 0, value in column 1, no header search.
    pub fn generic() -> Self {
        ColumnLayout {
            header: None,
            skip_after_header: 0,
            period_column: 0,
            value: ValueColumn::Column(1),
            section_breaks: Vec::new(),
        }
    }

    /// Number of columns a row needs before it can be a data row.
    pub fn required_width(&self) -> usize {
        let value_max = match self.value {
            ValueColumn::Column(c) => c,
            ValueColumn::Mean { last, .. } => last,
        };
        self.period_column.max(value_max) + 1
    }
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// File name of the spreadsheet inside the raw data directory.
    pub spreadsheet: String,
    /// Direct download link. Absent when the source only offers an
    /// interactive export.
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub source_page: Option<String>,
    pub layout: ColumnLayout,
    pub chart: ChartStyle,
}

impl DatasetConfig {
    pub fn spreadsheet_path(&self, raw_dir: &Path) -> PathBuf {
        raw_dir.join(&self.spreadsheet)
    }

    pub fn table_path(&self, raw_dir: &Path) -> PathBuf {
        converted_path(&self.spreadsheet_path(raw_dir))
    }

    /// Stem shared by the spreadsheet and its converted table.
    pub fn file_stem(&self) -> &str {
        Path::new(&self.spreadsheet)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.spreadsheet)
    }
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
    pub datasets: Vec<DatasetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            raw_dir: PathBuf::from("raw-data"),
            output_dir: PathBuf::from("output"),
            datasets: builtin_datasets(),
        }
    }
}

impl Config {
    /// Read a JSON configuration file. Missing fields take the built-in
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(Error::Config("no datasets configured".into()));
        }
        let mut names = BTreeSet::new();
        let mut outputs = BTreeSet::new();
        for ds in &self.datasets {
            if !names.insert(ds.name.as_str()) {
                return Err(Error::Config(format!("duplicate dataset name '{}'", ds.name)));
            }
            if !outputs.insert(ds.chart.output_base.as_str()) {
                return Err(Error::Config(format!(
                    "dataset '{}' reuses chart name '{}'",
                    ds.name, ds.chart.output_base
                )));
            }
            if let ValueColumn::Mean { first, last } = ds.layout.value {
                if first > last {
                    return Err(Error::Config(format!(
                        "dataset '{}': mean columns {first}..={last} are reversed",
                        ds.name
                    )));
                }
            }
            for span in &ds.chart.highlights {
                if span.start > span.end {
                    return Err(Error::Config(format!(
                        "dataset '{}': highlight '{}' ends before it starts",
                        ds.name, span.label
                    )));
                }
                if let Some(color) = span.color.as_deref().filter(|c| parse_hex(c).is_none()) {
                    return Err(Error::Config(format!(
                        "dataset '{}': '{color}' is not a #rrggbb colour",
                        ds.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Find the dataset whose converted table has this file stem.
    pub fn dataset_for_table(&self, table: &Path) -> Option<&DatasetConfig> {
        let stem = table.file_stem()?.to_str()?;
        self.datasets.iter().find(|d| d.file_stem() == stem)
    }
}

fn builtin_datasets() -> Vec<DatasetConfig> {
    vec![
        DatasetConfig {
            name: "poverty-table-2".into(),
            spreadsheet: "hstpov2.xlsx".into(),
            download_url: Some(format!("{CENSUS_TABLES}/hstpov2.xlsx")),
            source_page: Some(CENSUS_PAGE.into()),
            layout: ColumnLayout {
                header: Some(HeaderMatch {
                    indicator: "All Races".into(),
                    scope: HeaderScope::FirstCell,
                    exact: false,
                }),
                skip_after_header: 2,
                period_column: 0,
                // Column 2 is the count below poverty, column 3 the percent.
                value: ValueColumn::Column(3),
                section_breaks: default_section_breaks(),
            },
            chart: ChartStyle {
                title: "Percent of People Below Poverty in the US (All Races)".into(),
                x_label: "Year".into(),
                y_label: "Percent (%)".into(),
                output_base: "poverty_percent_plot".into(),
                y_tick_step: Some(2.0),
                source_caption: Some(CENSUS_CAPTION.into()),
                highlights: reagan_terms(),
            },
        },
        DatasetConfig {
            name: "poverty-table-6".into(),
            spreadsheet: "hstpov6.xlsx".into(),
            download_url: Some(format!("{CENSUS_TABLES}/hstpov6.xlsx")),
            source_page: Some(CENSUS_PAGE.into()),
            layout: ColumnLayout {
                header: Some(HeaderMatch {
                    indicator: "Below 1.25".into(),
                    scope: HeaderScope::AnyCell,
                    exact: false,
                }),
                skip_after_header: 0,
                period_column: 0,
                value: ValueColumn::Column(5),
                section_breaks: default_section_breaks(),
            },
            chart: ChartStyle {
                title: "Percent of People Below 1.25 of Poverty Level in the US (All Races)".into(),
                x_label: "Year".into(),
                y_label: "Percent (%) Below 1.25 of Poverty Level".into(),
                output_base: "poverty_below_125_plot".into(),
                y_tick_step: Some(2.0),
                source_caption: Some(CENSUS_CAPTION.into()),
                highlights: reagan_terms(),
            },
        },
        DatasetConfig {
            name: "unemployment-series".into(),
            spreadsheet: "SeriesReport-20250522085516_7ebf1b.xlsx".into(),
            // The BLS report is generated on demand from the series page.
            download_url: None,
            source_page: Some(BLS_PAGE.into()),
            layout: ColumnLayout {
                header: Some(HeaderMatch {
                    indicator: "Year".into(),
                    scope: HeaderScope::FirstCell,
                    exact: true,
                }),
                skip_after_header: 0,
                period_column: 0,
                value: ValueColumn::Mean { first: 1, last: 12 },
                section_breaks: Vec::new(),
            },
            chart: ChartStyle {
                title: "Unemployment Rate in the US (Annual Average of Monthly Rates)".into(),
                x_label: "Year".into(),
                y_label: "Unemployment Rate (%)".into(),
                output_base: "unemployment_rate_plot".into(),
                y_tick_step: Some(1.0),
                source_caption: Some(
                    "Source: U.S. Bureau of Labor Statistics, Current Population Survey (LNS14000000)"
                        .into(),
                ),
                highlights: reagan_terms(),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.datasets.len(), 3);
        assert_eq!(
            config.datasets[0].table_path(&config.raw_dir),
            PathBuf::from("raw-data/hstpov2.csv")
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "output_dir": "charts" }"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("charts"));
        assert_eq!(config.raw_dir, PathBuf::from("raw-data"));
        assert_eq!(config.datasets.len(), 3);
    }

    #[test]
    fn layouts_deserialize_from_json() {
        let layout: ColumnLayout = serde_json::from_str(
            r#"{ "header": { "indicator": "Year", "exact": true }, "value": { "mean": { "first": 1, "last": 12 } } }"#,
        )
        .unwrap();
        assert_eq!(layout.required_width(), 13);
        assert_eq!(layout.section_breaks.len(), DEFAULT_SECTION_BREAKS.len());
        assert_eq!(layout.header.unwrap().scope, HeaderScope::FirstCell);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut config = Config::default();
        config.datasets[1].name = config.datasets[0].name.clone();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn lookup_by_table_stem() {
        let config = Config::default();
        let ds = config.dataset_for_table(Path::new("/tmp/x/hstpov6.csv")).unwrap();
        assert_eq!(ds.name, "poverty-table-6");
        assert!(config.dataset_for_table(Path::new("other.csv")).is_none());
    }
}
