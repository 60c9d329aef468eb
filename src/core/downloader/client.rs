use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

/// Concurrent, SHA-1 validated downloader.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads.
    concurrency: usize,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: 8,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    // ── Single file download ────────────────────────────

    /// Download a single file to `dest`, optionally validating SHA-1.
    ///
    /// Creates parent directories as needed. Nothing is written when the
    /// hash does not match.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;

        if let Some(expected) = sha1_expected {
            let actual = sha1_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        // Drop the handle before returning.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            file.write_all(&bytes)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
        }

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// Returns the list of files that failed (if any).
    pub async fn download_batch(
        &self,
        entries: Vec<DownloadEntry>,
    ) -> Vec<(DownloadEntry, LauncherError)> {
        info!(
            "Starting batch download: {} files, concurrency={}",
            entries.len(),
            self.concurrency
        );

        let results: Vec<_> = stream::iter(entries)
            .map(|entry| async move {
                let result = self
                    .download_file(&entry.url, &entry.dest, entry.sha1.as_deref())
                    .await;
                (entry, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(entry, result)| match result {
                Ok(()) => None,
                Err(e) => Some((entry, e)),
            })
            .collect()
    }

    /// Like [`Downloader::download_batch`], but any failure fails the whole batch.
    pub async fn download_all(&self, entries: Vec<DownloadEntry>) -> LauncherResult<()> {
        let mut failures = self.download_batch(entries).await;
        if failures.is_empty() {
            return Ok(());
        }

        for (entry, err) in &failures {
            warn!("Download of {} failed: {}", entry.url, err);
        }
        let (_, first) = failures.swap_remove(0);
        Err(first)
    }
}

fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
