mod app;
mod chart;
mod color;
mod config;
mod data;
mod error;
mod fetch;
mod state;
mod ui;
mod workflow;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use config::Config;
use state::AppState;

/// Fetch, convert and chart historical US poverty and unemployment tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file (built-in datasets when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the spreadsheets and converted tables
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Directory the charts are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Never download; missing spreadsheets are an error
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, convert and render every dataset (the default)
    Run,
    /// Convert the first worksheet of a spreadsheet to CSV
    Convert {
        xlsx: PathBuf,
        /// Output file (defaults to the same base name with .csv)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Render the plain and annotated charts of a converted table
    Render {
        table: PathBuf,
        /// Dataset whose layout and chart style apply
        #[arg(short, long)]
        dataset: String,
    },
    /// Open an interactive preview window
    Preview {
        /// Dataset selected on start
        #[arg(short, long)]
        dataset: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = args.raw_dir {
        config.raw_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let client = if args.offline {
                None
            } else {
                Some(fetch::http_client().context("building HTTP client")?)
            };
            let reports = workflow::run(&config, client.as_ref()).context("workflow aborted")?;
            log::info!(
                "All requested plots created and saved ({} datasets)",
                reports.len()
            );
        }
        Command::Convert { xlsx, out } => {
            let out = out.unwrap_or_else(|| data::convert::converted_path(&xlsx));
            data::convert::convert_workbook(&xlsx, &out)
                .with_context(|| format!("converting {}", xlsx.display()))?;
        }
        Command::Render { table, dataset } => {
            let ds = config
                .dataset(&dataset)
                .with_context(|| format!("unknown dataset '{dataset}'"))?;
            workflow::render_table(ds, &table, &config.output_dir)
                .with_context(|| format!("rendering {}", table.display()))?;
        }
        Command::Preview { dataset } => {
            let mut state = AppState::new(config);
            state.load_configured();
            if let Some(name) = dataset {
                if !state.select_by_name(&name) {
                    log::warn!("dataset '{name}' has no converted table to preview");
                }
            }
            app::run_preview(state).map_err(|e| anyhow::anyhow!("preview window failed: {e}"))?;
        }
    }

    Ok(())
}
