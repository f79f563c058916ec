//! Concurrent image download engine
//!
//! Each pending submission is resolved and transferred by its own task.
//! A semaphore caps the number of transfers in flight; submission page
//! fetches additionally go through the shared rate limiter.

use crate::crawler::{LinkRole, PageFetcher, PendingImage, RateLimiter};
use crate::download::filename::target_filename;
use crate::download::timestamp::{apply_timestamp, recover_timestamp};
use crate::download::DownloadOutcome;
use crate::storage::{Ledger, LedgerEntry};
use crate::url::natural_cmp;
use crate::MirrorError;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT_ENCODING, CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Suffix of in-progress transfers
const PARTIAL_SUFFIX: &str = ".download";

/// Tally of one download batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub already_present: usize,
    pub no_download_link: usize,
    pub failed: usize,
    /// Body bytes written to disk
    pub bytes: u64,
}

impl DownloadReport {
    fn tally(&mut self, result: &Result<DownloadOutcome, MirrorError>) {
        match result {
            Ok(DownloadOutcome::Downloaded { bytes, .. }) => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            Ok(DownloadOutcome::AlreadyPresent { .. }) => self.already_present += 1,
            Ok(DownloadOutcome::NoDownloadLink) => self.no_download_link += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Downloads the images behind pending submission pages
///
/// Cloning is cheap: every field is shared.
#[derive(Clone)]
pub struct DownloadWorkerPool {
    client: Client,
    fetcher: Arc<dyn PageFetcher>,
    ledger: Arc<dyn Ledger>,
    rate_limiter: Arc<RateLimiter>,
    download_dir: PathBuf,
    permits: Arc<Semaphore>,
}

impl DownloadWorkerPool {
    pub fn new(
        client: Client,
        fetcher: Arc<dyn PageFetcher>,
        ledger: Arc<dyn Ledger>,
        rate_limiter: Arc<RateLimiter>,
        download_dir: PathBuf,
        max_concurrent: usize,
    ) -> Self {
        Self {
            client,
            fetcher,
            ledger,
            rate_limiter,
            download_dir,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Downloads every item and waits for all of them
    ///
    /// Items are dispatched in natural page-key order. A failing item is
    /// logged and counted; it never stops its siblings.
    pub async fn run(&self, mut items: Vec<PendingImage>) -> Result<DownloadReport, MirrorError> {
        let mut report = DownloadReport::default();
        if items.is_empty() {
            return Ok(report);
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;
        items.sort_by(|a, b| natural_cmp(&a.page_key, &b.page_key));

        let mut tasks = JoinSet::new();
        for item in items {
            match self.ledger.is_downloaded(&item.page_key) {
                Ok(true) => {
                    tracing::debug!("{} was recorded meanwhile, skipping", item.page_key);
                    continue;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    "Ledger lookup failed for {}: {} -- downloading anyway",
                    item.page_key,
                    e
                ),
            }

            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let pool = self.clone();
            tasks.spawn(async move {
                let result = pool.process(&item).await;
                drop(permit);
                (item, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((item, result)) => {
                    match &result {
                        Ok(DownloadOutcome::Downloaded { filename, bytes }) => {
                            tracing::info!("Saved {} ({} bytes)", filename, bytes);
                        }
                        Ok(DownloadOutcome::AlreadyPresent { filename }) => {
                            tracing::info!("{} is already downloaded", filename);
                        }
                        Ok(DownloadOutcome::NoDownloadLink) => {}
                        Err(e) => tracing::error!("Download of {} failed: {}", item.submission_url, e),
                    }
                    report.tally(&result);
                }
                Err(e) => {
                    tracing::error!("Download task aborted: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Resolves, verifies and stores the image of one submission page
    pub async fn process(&self, item: &PendingImage) -> Result<DownloadOutcome, MirrorError> {
        self.rate_limiter.acquire().await;
        let page = self.fetcher.fetch(&item.submission_url).await?;
        if !page.is_ok() {
            return Err(MirrorError::HttpStatus {
                url: item.submission_url.to_string(),
                status: page.status,
            });
        }

        let Some(link) = page.first_link(LinkRole::Download) else {
            tracing::info!(
                "No download link on {} (page title is {})",
                item.submission_url,
                page.title_or_default()
            );
            return Ok(DownloadOutcome::NoDownloadLink);
        };
        let image_url = link.url.clone();
        let filename = target_filename(&image_url, &item.artist)?;
        let final_path = self.download_dir.join(&filename);

        let head = self.send(self.client.head(image_url.clone()), &image_url).await?;
        let expected = content_length(head.headers());
        let head_modified = last_modified(head.headers());

        match expected {
            Some(expected) => {
                if file_size(&final_path).await == Some(expected) {
                    self.finalize(item, &image_url, &filename, &final_path, head_modified)
                        .await;
                    return Ok(DownloadOutcome::AlreadyPresent { filename });
                }
            }
            None => tracing::warn!("No Content-Length for {}, size cannot be verified", image_url),
        }

        tracing::debug!("Downloading {} to {}", image_url, final_path.display());
        let response = self.send(self.client.get(image_url.clone()), &image_url).await?;
        let get_modified = last_modified(response.headers());
        let bytes = self
            .transfer(response, &image_url, &filename, &final_path, expected)
            .await?;

        self.finalize(
            item,
            &image_url,
            &filename,
            &final_path,
            get_modified.or(head_modified),
        )
        .await;
        Ok(DownloadOutcome::Downloaded { filename, bytes })
    }

    /// Sends an image request, requiring a success status
    ///
    /// Images are requested without content coding so the byte count on disk
    /// can be checked against `Content-Length`.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<Response, MirrorError> {
        let response = request
            .header(ACCEPT_ENCODING, "identity")
            .send()
            .await
            .map_err(|source| MirrorError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    /// Streams the body to `<name>.download`, verifies it, and renames it into place
    async fn transfer(
        &self,
        response: Response,
        url: &Url,
        filename: &str,
        final_path: &Path,
        expected: Option<u64>,
    ) -> Result<u64, MirrorError> {
        let partial_path = self
            .download_dir
            .join(format!("{}{}", filename, PARTIAL_SUFFIX));

        let written = match write_body(response, url, &partial_path).await {
            Ok(written) => written,
            Err(e) => {
                remove_partial(&partial_path).await;
                return Err(e);
            }
        };

        if let Some(expected) = expected {
            if written != expected {
                remove_partial(&partial_path).await;
                return Err(MirrorError::SizeMismatch {
                    url: url.to_string(),
                    expected,
                    actual: written,
                });
            }
        }

        if let Err(e) = tokio::fs::rename(&partial_path, final_path).await {
            remove_partial(&partial_path).await;
            return Err(e.into());
        }
        Ok(written)
    }

    /// Fixes the mtime of a stored file and records it in the ledger
    ///
    /// Both are blocking calls, so they run on the blocking thread pool.
    async fn finalize(
        &self,
        item: &PendingImage,
        image_url: &Url,
        filename: &str,
        path: &Path,
        upstream_modified: Option<DateTime<Utc>>,
    ) {
        let recovered = recover_timestamp(filename, Utc::now());
        let entry = LedgerEntry {
            page_key: item.page_key.clone(),
            image_url: image_url.to_string(),
            last_modified: upstream_modified.or(recovered),
            filename: filename.to_string(),
        };
        let ledger = Arc::clone(&self.ledger);
        let path = path.to_path_buf();

        let finished = tokio::task::spawn_blocking(move || {
            if let Some(timestamp) = recovered {
                if let Err(e) = apply_timestamp(&path, timestamp) {
                    tracing::warn!("Couldn't set mtime of {}: {}", path.display(), e);
                }
            }
            if let Err(e) = ledger.record(&entry) {
                tracing::error!(
                    "Couldn't record {} in the ledger: {} (will be re-verified next run)",
                    entry.page_key,
                    e
                );
            }
        })
        .await;

        if let Err(e) = finished {
            tracing::error!("Finalizing {} aborted: {}", item.page_key, e);
        }
    }
}

async fn write_body(mut response: Response, url: &Url, path: &Path) -> Result<u64, MirrorError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await.map_err(|source| MirrorError::Http {
        url: url.to_string(),
        source,
    })? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Couldn't remove {}: {}", path.display(), e);
        }
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.is_file().then(|| metadata.len())
}

/// Reads `Content-Length` straight from the headers
fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Parses an HTTP-date `Last-Modified` header
fn last_modified(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(LAST_MODIFIED)?.to_str().ok()?;
    match DateTime::parse_from_rfc2822(value.trim()) {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!("Unparseable Last-Modified {:?}: {}", value, e);
            None
        }
    }
}
