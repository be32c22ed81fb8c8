use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::DatasetConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("econ-charts/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(60);

pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| Error::Http {
            url: String::new(),
            reason: e.to_string(),
        })
}

/// Make sure the dataset's spreadsheet exists locally and return its path.
///
/// A present file is used as is. A missing one is downloaded when the
/// dataset has a direct link and a client is given; otherwise the run stops
/// with [`Error::FileNotFound`].
pub fn ensure_spreadsheet(
    dataset: &DatasetConfig,
    raw_dir: &Path,
    client: Option<&Client>,
) -> Result<PathBuf> {
    let path = dataset.spreadsheet_path(raw_dir);
    if path.exists() {
        log::debug!("{}: using local {}", dataset.name, path.display());
        return Ok(path);
    }

    match (dataset.download_url.as_deref(), client) {
        (Some(url), Some(client)) => {
            download(client, url, &path)?;
            Ok(path)
        }
        _ => {
            if let Some(page) = &dataset.source_page {
                log::error!(
                    "{}: {} is missing; export it from {page}",
                    dataset.name,
                    path.display()
                );
            }
            Err(Error::FileNotFound { path })
        }
    }
}

/// GET `url` into `dest`. The body goes to a temporary file next to `dest`
/// and is renamed into place once complete.
pub fn download(client: &Client, url: &str, dest: &Path) -> Result<()> {
    log::info!("Downloading {url}");
    let http_err = |reason: String| Error::Http {
        url: url.to_string(),
        reason,
    };

    let response = client.get(url).send().map_err(|e| http_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(http_err(format!("HTTP {status}")));
    }
    let body = response.bytes().map_err(|e| http_err(e.to_string()))?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let partial = dest.with_extension("part");
    {
        let mut file = std::fs::File::create(&partial)?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    std::fs::rename(&partial, dest)?;
    log::info!("Saved {} ({} bytes)", dest.display(), body.len());
    Ok(())
}
