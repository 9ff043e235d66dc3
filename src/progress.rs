// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// Events emitted while syncing feeds and downloading episodes
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A podcast's feed is being fetched
    SyncStarted { podcast_id: u32, podcast_name: String },

    /// A podcast's feed was fetched and cached
    SyncCompleted {
        podcast_id: u32,
        podcast_name: String,
        episode_count: usize,
    },

    /// A podcast could not be synced; its previous cache is untouched
    SyncFailed {
        podcast_id: u32,
        podcast_name: String,
        error: String,
    },

    /// A podcast was not synced because the batch was cancelled
    SyncCancelled { podcast_id: u32, podcast_name: String },

    /// Every podcast of a sync batch has finished
    BatchCompleted {
        synced_count: usize,
        failed_count: usize,
        cancelled_count: usize,
    },

    /// A download is starting
    DownloadStarting {
        episode_title: String,
        /// 1-based episode number within its podcast
        episode_number: usize,
        /// Index of this download in the current batch
        batch_index: usize,
        /// Total number of downloads in the current batch
        batch_size: usize,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        episode_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A download completed successfully
    DownloadCompleted {
        episode_title: String,
        bytes_downloaded: u64,
    },

    /// A download failed
    DownloadFailed { episode_title: String, error: String },
}

/// Trait for reporting progress events.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
