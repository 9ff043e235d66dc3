// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

use crate::podcast::Episode;

/// Maximum length for a generated filename stem
const MAX_NAME_LENGTH: usize = 100;

/// Extension used when the URL does not name a file
const FALLBACK_EXTENSION: &str = "mp3";

/// Check if a character is allowed in filenames (whitelist approach)
fn is_valid_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ')
}

/// Local filename for an episode.
///
/// Uses the last path segment of the download URL, so the same episode always
/// maps to the same file and query strings such as tracking parameters are
/// dropped. When the URL has no usable segment the title is used instead.
pub fn episode_filename(episode: &Episode) -> String {
    if let Some(name) = filename_from_url(&episode.url) {
        return name;
    }

    let title = sanitize(&episode.title);
    let stem = if title.is_empty() { "episode" } else { &title };
    format!("{stem}.{FALLBACK_EXTENSION}")
}

/// Sanitized last path segment of a URL, if it has one
pub fn filename_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())?;

    let decoded = urlencoding::decode(segment).unwrap_or(std::borrow::Cow::Borrowed(segment));

    Some(sanitize(&decoded)).filter(|name| !name.is_empty())
}

/// Sanitize a string for use as a filename using whitelist approach
fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if is_valid_filename_char(c) { c } else { '-' })
        .collect();

    // Collapse multiple spaces/dashes into single dash
    let collapsed = collapse_separators(&sanitized);

    // Leading dots would make hidden files and could shadow the cache
    let trimmed = collapsed.trim_matches(|c: char| c == '-' || c.is_whitespace());
    let trimmed = trimmed.trim_start_matches('.');

    if trimmed.len() > MAX_NAME_LENGTH {
        truncate_keeping_extension(trimmed, MAX_NAME_LENGTH)
    } else {
        trimmed.to_string()
    }
}

/// Collapse multiple spaces and dashes into single dashes
fn collapse_separators(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_separator = false;

    for c in s.chars() {
        if c == '-' || c.is_whitespace() {
            if !last_was_separator {
                result.push('-');
                last_was_separator = true;
            }
        } else {
            result.push(c);
            last_was_separator = false;
        }
    }

    result
}

/// Truncate a sanitized (ASCII only) name, keeping a short extension intact
fn truncate_keeping_extension(s: &str, max_len: usize) -> String {
    let (stem, extension) = match s.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 5 => (stem, Some(ext)),
        _ => (s, None),
    };

    let budget = max_len.saturating_sub(extension.map_or(0, |ext| ext.len() + 1));
    let stem = stem[..budget.min(stem.len())].trim_end_matches('-');

    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}
