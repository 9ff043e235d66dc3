// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use indicatif::HumanBytes;
use serde::{Deserialize, Serialize};

use crate::cache;
use crate::config::PodcastConfig;
use crate::episode::episode_filename;
use crate::error::CacheError;
use crate::feed::FeedItem;
use crate::http::Credentials;

/// Widest title shown in episode listings
const TITLE_LENGTH: usize = 60;

/// A configured podcast and, once synced or loaded, its episodes
#[derive(Debug, Clone)]
pub struct Podcast {
    pub id: u32,
    pub name: String,
    pub feed: String,
    pub path: PathBuf,
    pub credentials: Option<Credentials>,
    /// Oldest first; episode N is `episodes[N - 1]`
    pub episodes: Vec<Episode>,
}

/// One downloadable episode as cached on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    /// Publish date as written in the feed
    pub date: String,
    pub url: String,
    /// Size announced by the feed, 0 if unknown
    pub length: u64,
}

impl Episode {
    /// False for feed items that came without an enclosure
    pub fn has_media(&self) -> bool {
        !self.url.is_empty()
    }
}

impl From<FeedItem> for Episode {
    fn from(item: FeedItem) -> Self {
        Self {
            title: item.title,
            date: item.pub_date,
            url: item.enclosure.url,
            length: item.enclosure.length,
        }
    }
}

impl From<&PodcastConfig> for Podcast {
    fn from(config: &PodcastConfig) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            feed: config.feed.clone(),
            path: config.path.clone(),
            credentials: config.credentials(),
            episodes: Vec::new(),
        }
    }
}

impl Podcast {
    /// Replace the episodes with the ones cached by the last sync
    pub fn load(&mut self) -> Result<(), CacheError> {
        self.episodes = cache::load(&self.path)?;
        Ok(())
    }

    /// Look up an episode by its 1-based number
    pub fn episode(&self, number: usize) -> Option<&Episode> {
        number
            .checked_sub(1)
            .and_then(|index| self.episodes.get(index))
    }

    /// Number of the newest episode, if there are any
    pub fn latest(&self) -> Option<usize> {
        (!self.episodes.is_empty()).then_some(self.episodes.len())
    }

    /// A table of the episodes, marking the ones found in `downloaded`
    pub fn listing<'a>(&'a self, downloaded: &'a HashSet<String>) -> EpisodeListing<'a> {
        EpisodeListing {
            podcast: self,
            downloaded,
        }
    }
}

/// Display adapter rendering the episode table of a podcast
pub struct EpisodeListing<'a> {
    podcast: &'a Podcast,
    downloaded: &'a HashSet<String>,
}

impl fmt::Display for EpisodeListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let podcast = self.podcast;
        writeln!(f, "{} [id: {}]", podcast.name, podcast.id)?;
        writeln!(f, "Feed: {}", podcast.feed)?;
        writeln!(f, "Path: {}", podcast.path.display())?;
        writeln!(f)?;

        let width = podcast.episodes.len().to_string().len().max(1);
        writeln!(
            f,
            "{:>width$}  {:<TITLE_LENGTH$}  {:>10}  {:<31}  Downloaded",
            "#", "Title", "Size", "Published"
        )?;

        for (index, episode) in podcast.episodes.iter().enumerate() {
            let size = if episode.length > 0 {
                HumanBytes(episode.length).to_string()
            } else {
                "-".to_string()
            };
            let downloaded = self.downloaded.contains(&episode_filename(episode));

            writeln!(
                f,
                "{:>width$}  {:<TITLE_LENGTH$}  {:>10}  {:<31}  {}",
                index + 1,
                truncate_title(&episode.title, TITLE_LENGTH),
                size,
                episode.date,
                if downloaded { "yes" } else { "no" }
            )?;
        }

        Ok(())
    }
}

/// Shorten a title to `max_len` characters, ending it with "..."
pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
