// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::http::{Credentials, HttpClient};
use crate::podcast::Episode;
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::filename::episode_filename;

/// Identifies a download for progress reporting
#[derive(Debug, Clone)]
pub struct DownloadContext {
    /// 1-based episode number within its podcast
    pub episode_number: usize,
    /// Position of this download in the current batch
    pub batch_index: usize,
    /// Number of downloads in the current batch
    pub batch_size: usize,
}

/// Outcome of a finished download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub bytes_downloaded: u64,
}

/// Download an episode into `output_dir`.
///
/// Refuses to touch an existing file of the same name. The body is streamed
/// into a `.partial` file that is renamed once complete and removed if the
/// download fails.
pub async fn download_episode<C: HttpClient + ?Sized>(
    client: &C,
    episode: &Episode,
    output_dir: &Path,
    credentials: Option<&Credentials>,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<DownloadResult, DownloadError> {
    let output_path = output_dir.join(episode_filename(episode));
    let result = fetch_to_file(
        client,
        episode,
        &output_path,
        credentials,
        context,
        reporter,
    )
    .await;

    match &result {
        Ok(done) => reporter.report(ProgressEvent::DownloadCompleted {
            episode_title: episode.title.clone(),
            bytes_downloaded: done.bytes_downloaded,
        }),
        Err(e) => reporter.report(ProgressEvent::DownloadFailed {
            episode_title: episode.title.clone(),
            error: e.to_string(),
        }),
    }

    result
}

async fn fetch_to_file<C: HttpClient + ?Sized>(
    client: &C,
    episode: &Episode,
    output_path: &Path,
    credentials: Option<&Credentials>,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<DownloadResult, DownloadError> {
    if !episode.has_media() {
        return Err(DownloadError::NoMedia {
            title: episode.title.clone(),
        });
    }

    if output_path.exists() {
        return Err(DownloadError::AlreadyExists {
            path: output_path.to_path_buf(),
        });
    }

    let url = episode.url.as_str();

    // Feeds often announce a wrong length, the server knows better
    let announced_length = match client.head(url, credentials).await {
        Ok(head) if head.status == 200 => head.content_length,
        Ok(head) => {
            tracing::debug!(url, status = head.status, "HEAD request rejected");
            None
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "HEAD request failed");
            None
        }
    };

    let response = client
        .get_stream(url, credentials)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status != 200 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let total_bytes = announced_length
        .or(response.content_length)
        .or((episode.length > 0).then_some(episode.length));

    reporter.report(ProgressEvent::DownloadStarting {
        episode_title: episode.title.clone(),
        episode_number: context.episode_number,
        batch_index: context.batch_index,
        batch_size: context.batch_size,
        content_length: total_bytes,
    });

    if let Some(dir) = output_path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DownloadError::DirectoryCreateFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
    }

    let partial_path = partial_path_for(output_path);
    let mut file = File::create(&partial_path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: partial_path.clone(),
            source: e,
        })?;

    let streamed = stream_body(response.body, &mut file, url, &partial_path, |bytes| {
        reporter.report(ProgressEvent::DownloadProgress {
            episode_title: episode.title.clone(),
            bytes_downloaded: bytes,
            total_bytes,
        });
    })
    .await;
    drop(file);

    let bytes_downloaded = match streamed {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&partial_path, output_path).await {
        let _ = tokio::fs::remove_file(&partial_path).await;
        return Err(DownloadError::FileWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        });
    }

    tracing::info!(
        path = %output_path.display(),
        bytes = bytes_downloaded,
        "Episode downloaded"
    );

    Ok(DownloadResult {
        path: output_path.to_path_buf(),
        bytes_downloaded,
    })
}

async fn stream_body(
    mut stream: crate::http::ByteStream,
    file: &mut File,
    url: &str,
    path: &Path,
    mut on_progress: impl FnMut(u64),
) -> Result<u64, DownloadError> {
    let mut bytes_downloaded: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;
        on_progress(bytes_downloaded);
    }

    // Ensure all data is flushed to disk
    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(bytes_downloaded)
}

fn partial_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
