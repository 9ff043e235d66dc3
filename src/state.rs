// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::Path;

use crate::cache::CACHE_FILENAME;
use crate::error::StateError;

/// Names of the finished episode files in a podcast directory.
///
/// The episode cache and `.partial` leftovers of interrupted downloads are
/// not episodes and are left out. A directory that does not exist yet simply
/// has no downloads.
pub fn scan_downloads(podcast_dir: &Path) -> Result<HashSet<String>, StateError> {
    let mut downloaded = HashSet::new();

    if !podcast_dir.exists() {
        return Ok(downloaded);
    }

    let entries = std::fs::read_dir(podcast_dir).map_err(|e| StateError::ReadDirectoryFailed {
        path: podcast_dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| StateError::ReadDirectoryFailed {
            path: podcast_dir.to_path_buf(),
            source: e,
        })?;

        let filename = entry.file_name().to_string_lossy().to_string();
        if filename.starts_with(CACHE_FILENAME) || filename.ends_with(".partial") {
            continue;
        }

        if entry.file_type().is_ok_and(|t| t.is_file()) {
            downloaded.insert(filename);
        }
    }

    Ok(downloaded)
}
