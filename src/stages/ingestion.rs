//! Data ingestion: fetch the dataset archive and unpack it.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

use crate::common::file_size_kb;
use crate::config::DataIngestionConfig;
use crate::ui;

/// Where the archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Http(Url),
    Local(PathBuf),
}

impl DataSource {
    /// `http(s)://` downloads, `file://` and plain paths copy.
    pub fn parse(source: &str) -> Result<Self> {
        match Url::parse(source) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::Local)
                    .map_err(|_| anyhow::anyhow!("Invalid file URL: {}", source)),
                scheme if scheme.len() == 1 => Ok(Self::Local(PathBuf::from(source))),
                scheme => anyhow::bail!("Unsupported source URL scheme '{}': {}", scheme, source),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::Local(PathBuf::from(source))),
            Err(e) => Err(e).with_context(|| format!("Invalid source URL: {}", source)),
        }
    }
}

/// What the stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOutcome {
    /// False when the archive was already present and reused
    pub downloaded: bool,
    pub archive_size_kb: u64,
    pub extracted_entries: usize,
}

impl fmt::Display for IngestionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} archive ({} KB), extracted {} entries",
            if self.downloaded { "downloaded" } else { "reused" },
            self.archive_size_kb,
            self.extracted_entries
        )
    }
}

pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<IngestionOutcome> {
        let downloaded = self.download()?;
        let extracted_entries = self.extract()?;

        Ok(IngestionOutcome {
            downloaded,
            archive_size_kb: file_size_kb(&self.config.local_data_file)?,
            extracted_entries,
        })
    }

    /// Fetch the archive unless it already exists. Returns whether it was fetched.
    pub fn download(&self) -> Result<bool> {
        let target = &self.config.local_data_file;
        if target.exists() {
            tracing::info!(
                "File already exists of size: {} KB",
                file_size_kb(target)?
            );
            return Ok(false);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // An interrupted transfer leaves only the `.part` file behind.
        let partial = partial_path(target);
        match DataSource::parse(&self.config.source_url)? {
            DataSource::Http(url) => download_http(&url, &partial)?,
            DataSource::Local(path) => {
                fs::copy(&path, &partial)
                    .with_context(|| format!("Failed to copy {}", path.display()))?;
            }
        }
        fs::rename(&partial, target)
            .with_context(|| format!("Failed to move download into {}", target.display()))?;

        tracing::info!(
            "{} downloaded to {}",
            self.config.source_url,
            target.display()
        );
        Ok(true)
    }

    /// Unpack the archive into `unzip_dir`. Returns the number of entries.
    pub fn extract(&self) -> Result<usize> {
        let unzip_dir = &self.config.unzip_dir;
        fs::create_dir_all(unzip_dir)
            .with_context(|| format!("Failed to create {}", unzip_dir.display()))?;

        let archive_path = &self.config.local_data_file;
        let file = File::open(archive_path)
            .with_context(|| format!("Failed to open {}", archive_path.display()))?;
        let mut archive = zip::ZipArchive::new(file)
            .with_context(|| format!("{} is not a zip archive", archive_path.display()))?;

        let entries = archive.len();
        archive
            .extract(unzip_dir)
            .with_context(|| format!("Failed to extract into {}", unzip_dir.display()))?;

        tracing::info!(
            "Extracted {} entries from {} into {}",
            entries,
            archive_path.display(),
            unzip_dir.display()
        );
        Ok(entries)
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn download_http(url: &Url, target: &Path) -> Result<()> {
    let response = ureq::get(url.as_str())
        .call()
        .with_context(|| format!("Failed to download {}", url))?;

    let total = response
        .header("Content-Length")
        .and_then(|len| len.parse::<u64>().ok());

    let pb = match total {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                    .context("Invalid progress template")?
                    .progress_chars("=>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    if ui::is_quiet() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_message("downloading");

    let mut reader = pb.wrap_read(response.into_reader());
    let mut file =
        File::create(target).with_context(|| format!("Failed to create {}", target.display()))?;
    io::copy(&mut reader, &mut file).with_context(|| format!("Failed to download {}", url))?;
    pb.finish_and_clear();

    Ok(())
}
