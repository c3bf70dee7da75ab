//! Track downloads
//!
//! One transfer per call: fetch the stream URL, write `<dir>/<id>.mp4`, then
//! record the file through [`QueueStore::set_item_local_uri`]. No
//! scheduling, retry or progress reporting.

use crate::error::DownloadError;
use crate::store::QueueStore;
use futures_util::StreamExt;
use mume_core::Track;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Extension downloaded files are saved with
pub const DOWNLOAD_EXTENSION: &str = "mp4";

#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
    dir: PathBuf,
    store: QueueStore,
}

impl Downloader {
    pub fn new(store: QueueStore, dir: impl Into<PathBuf>) -> Self {
        Self::with_client(store, dir, Client::new())
    }

    pub fn with_client(store: QueueStore, dir: impl Into<PathBuf>, http: Client) -> Self {
        Self {
            http,
            dir: dir.into(),
            store,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a track's file is written
    pub fn destination(&self, id: &str) -> Result<PathBuf, DownloadError> {
        let usable = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if !usable {
            return Err(DownloadError::InvalidTrackId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.{DOWNLOAD_EXTENSION}")))
    }

    /// Local file of a queued track, if it has one
    pub fn local_path(&self, id: &str) -> Option<String> {
        self.store.find(id).and_then(|track| track.local_uri)
    }

    /// Download a track's stream and record the file
    pub async fn download(&self, track: &Track) -> Result<PathBuf, DownloadError> {
        if track.stream_url.is_empty() {
            return Err(DownloadError::MissingSource(track.id.clone()));
        }
        self.download_url(&track.id, &track.stream_url).await
    }

    /// Download `url` as the file for track `id` and record it
    pub async fn download_url(&self, id: &str, url: &str) -> Result<PathBuf, DownloadError> {
        let dest = self.destination(id)?;
        debug!(track_id = %id, url = %url, dest = %dest.display(), "Downloading track");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let partial = dest.with_extension(format!("{DOWNLOAD_EXTENSION}.part"));
        let written = match write_body(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    debug!(path = %partial.display(), error = %cleanup, "Partial file not removed");
                }
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, &dest).await?;

        let path = dest.to_string_lossy().into_owned();
        self.store.set_item_local_uri(id, &path);

        info!(track_id = %id, dest = %dest.display(), size = written, "Track downloaded");
        Ok(dest)
    }

    /// Run a download in the background
    ///
    /// Failures are logged; the result is also available from the handle.
    pub fn spawn(&self, track: Track) -> JoinHandle<Result<PathBuf, DownloadError>> {
        let downloader = self.clone();
        tokio::spawn(async move {
            let result = downloader.download(&track).await;
            if let Err(e) = &result {
                warn!(track_id = %track.id, error = %e, "Download failed");
            }
            result
        })
    }
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
    let mut file = File::create(path).await?;
    let mut written: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
