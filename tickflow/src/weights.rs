//! Model weights checks and provisioning.
//!
//! Nodes that need weight files keep them under `<root>/weights`, where `root`
//! is the base path injected into their config. A node checks for its files
//! with [`has_weights`] and fetches missing ones through a
//! [`WeightsDownloader`] via [`ensure_weights`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Directory under a node's root that holds weight files.
pub const WEIGHTS_DIR: &str = "weights";

/// Errors raised while checking or provisioning weights.
#[derive(Debug, Error)]
pub enum WeightsError {
    /// Filesystem failure.
    #[error("weights IO error at {}: {source}", .path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The download itself failed.
    #[error("failed to download weights from {url}: {message}")]
    Download {
        /// Where the weights were fetched from.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// Files are still absent after a download.
    #[error("weight files missing after download: {}", .paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    Missing {
        /// The absent files.
        paths: Vec<PathBuf>,
    },

    /// A file's SHA-256 digest does not match.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        /// The offending file.
        path: PathBuf,
        /// The expected digest, hex encoded.
        expected: String,
        /// The actual digest, hex encoded.
        actual: String,
    },
}

impl WeightsError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Where a node's weights come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightsDescriptor {
    /// Base URL; each file is fetched from `<url>/<file>`.
    pub url: String,
    /// Files relative to the weights directory.
    pub files: Vec<String>,
    /// Optional SHA-256 digests, keyed by file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sha256: BTreeMap<String, String>,
}

impl WeightsDescriptor {
    /// Creates a descriptor without checksums.
    #[must_use]
    pub fn new(url: impl Into<String>, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            url: url.into(),
            files: files.into_iter().map(Into::into).collect(),
            sha256: BTreeMap::new(),
        }
    }

    /// Adds a checksum for one file.
    #[must_use]
    pub fn with_checksum(mut self, file: impl Into<String>, sha256: impl Into<String>) -> Self {
        self.sha256.insert(file.into(), sha256.into());
        self
    }
}

/// Fetches weight files into a directory.
#[cfg_attr(test, mockall::automock)]
pub trait WeightsDownloader: Send + Sync {
    /// Downloads every file in `descriptor` into `weights_dir`.
    ///
    /// # Errors
    ///
    /// Returns `Download` or `Io` on failure.
    fn download(&self, weights_dir: &Path, descriptor: &WeightsDescriptor) -> Result<(), WeightsError>;
}

/// Returns the weights directory for `root`.
#[must_use]
pub fn weights_dir(root: &Path) -> PathBuf {
    root.join(WEIGHTS_DIR)
}

/// Checks whether every path exists under `<root>/weights`.
///
/// When the weights directory is absent it is created and the check fails.
///
/// # Errors
///
/// Returns `Io` if the directory cannot be created.
pub fn has_weights<S: AsRef<str>>(root: &Path, paths: &[S]) -> Result<bool, WeightsError> {
    let dir = weights_dir(root);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| WeightsError::io(&dir, e))?;
        return Ok(false);
    }
    Ok(paths.iter().all(|p| dir.join(p.as_ref()).exists()))
}

/// Makes sure the described weights are present, downloading them if needed.
///
/// Returns the weights directory.
///
/// # Errors
///
/// Returns the downloader's error, `Missing` if files are still absent
/// afterwards, or `ChecksumMismatch`.
pub fn ensure_weights(
    root: &Path,
    descriptor: &WeightsDescriptor,
    downloader: &dyn WeightsDownloader,
) -> Result<PathBuf, WeightsError> {
    let dir = weights_dir(root);

    if has_weights(root, &descriptor.files)? {
        info!(dir = %dir.display(), "Weights found");
    } else {
        warn!(url = %descriptor.url, "No weights detected. Proceeding to download...");
        downloader.download(&dir, descriptor)?;

        let missing: Vec<PathBuf> = descriptor
            .files
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| !p.exists())
            .collect();
        if !missing.is_empty() {
            return Err(WeightsError::Missing { paths: missing });
        }
        info!(dir = %dir.display(), "Weights downloaded");
    }

    for (file, expected) in &descriptor.sha256 {
        verify_checksum(&dir.join(file), expected)?;
    }
    Ok(dir)
}

/// Verifies a file's SHA-256 digest.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, `ChecksumMismatch` otherwise.
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), WeightsError> {
    let bytes = std::fs::read(path).map_err(|e| WeightsError::io(path, e))?;
    let actual = hex::encode(Sha256::digest(&bytes));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(WeightsError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Downloads weights over HTTP with a blocking client.
#[cfg(feature = "download")]
#[derive(Debug, Clone, Default)]
pub struct HttpWeightsDownloader {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "download")]
impl HttpWeightsDownloader {
    /// Creates a downloader with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "download")]
impl WeightsDownloader for HttpWeightsDownloader {
    fn download(&self, weights_dir: &Path, descriptor: &WeightsDescriptor) -> Result<(), WeightsError> {
        let base = descriptor.url.trim_end_matches('/');
        for file in &descriptor.files {
            let url = format!("{base}/{file}");
            let download_error = |message: String| WeightsError::Download {
                url: url.clone(),
                message,
            };

            let bytes = self
                .client
                .get(&url)
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .and_then(reqwest::blocking::Response::bytes)
                .map_err(|e| download_error(e.to_string()))?;

            let target = weights_dir.join(file);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| WeightsError::io(parent, e))?;
            }
            std::fs::write(&target, &bytes).map_err(|e| WeightsError::io(&target, e))?;
            info!(file = %file, bytes = bytes.len(), "Downloaded weight file");
        }
        Ok(())
    }
}
