// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or decoding RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Access denied to feed {url} (HTTP {status})")]
    AccessDenied { url: String, status: u16 },

    #[error("Feed not found at {url}")]
    NotFound { url: String },

    #[error("Request for feed {url} failed with HTTP {status}")]
    RequestFailed { url: String, status: u16 },

    #[error("Feed {url} returned no content")]
    EmptyFeed { url: String },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),
}

/// Errors from the on-disk episode cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to write episode cache {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode episode cache: {0}")]
    EncodeFailed(#[from] bincode::Error),

    /// Missing, unreadable and corrupt caches all end up here
    #[error("Could not read episode cache {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Episode '{title}' has no enclosure (audio file)")]
    NoMedia { title: String },

    #[error("File {path} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// True for failures of the local filesystem rather than the network
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists { .. }
                | Self::DirectoryCreateFailed { .. }
                | Self::FileCreateFailed { .. }
                | Self::FileWriteFailed { .. }
        )
    }
}

/// Errors in an episode selection expression such as `1-30,!15`
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RangeError {
    #[error("Range '{0}' must have the format start-end")]
    MalformedRange(String),

    #[error("Invalid episode number '{token}': {reason}")]
    InvalidNumber { token: String, reason: String },

    #[error("Episode {number} does not exist, the last episode is {max}")]
    OutOfBounds { number: usize, max: usize },
}

/// Errors while loading configuration or resolving podcasts in it
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file {0} does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No configuration directory could be determined")]
    NoConfigDir,

    #[error("No podcast matches '{0}'")]
    NoMatch(String),

    #[error("'{term}' matches several podcasts ({}), please be more specific", matches.join(", "))]
    Ambiguous { term: String, matches: Vec<String> },
}

/// Errors that can occur when scanning a podcast directory for downloads
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors for syncing a single podcast
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
