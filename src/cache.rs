// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::podcast::Episode;

/// Name of the cache file inside a podcast directory
pub const CACHE_FILENAME: &str = ".feed";

/// Path of the cache file for a podcast directory
pub fn cache_path(podcast_dir: &Path) -> PathBuf {
    podcast_dir.join(CACHE_FILENAME)
}

/// Replace the cached episode list of a podcast.
///
/// The list is written to a `.partial` sibling first and renamed over the
/// old cache, so readers see either the previous snapshot or the new one.
pub fn store(podcast_dir: &Path, episodes: &[Episode]) -> Result<(), CacheError> {
    let encoded = bincode::serialize(episodes)?;

    std::fs::create_dir_all(podcast_dir).map_err(|e| CacheError::WriteFailed {
        path: podcast_dir.to_path_buf(),
        source: e,
    })?;

    let path = cache_path(podcast_dir);
    let partial_path = podcast_dir.join(format!("{CACHE_FILENAME}.partial"));

    std::fs::write(&partial_path, encoded).map_err(|e| CacheError::WriteFailed {
        path: partial_path.clone(),
        source: e,
    })?;

    std::fs::rename(&partial_path, &path).map_err(|e| {
        let _ = std::fs::remove_file(&partial_path);
        CacheError::WriteFailed { path, source: e }
    })
}

/// Read the cached episode list of a podcast
pub fn load(podcast_dir: &Path) -> Result<Vec<Episode>, CacheError> {
    let path = cache_path(podcast_dir);

    let bytes = std::fs::read(&path).map_err(|e| CacheError::Unreadable {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    bincode::deserialize(&bytes).map_err(|e| CacheError::Unreadable {
        path,
        reason: e.to_string(),
    })
}
