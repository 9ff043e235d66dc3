// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::http::Credentials;

/// File name of the configuration inside the user's config directory
const CONFIG_FILENAME: &str = "pcd";

fn default_concurrency() -> usize {
    4
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    60
}

/// User configuration, loaded once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Maximum number of feeds synced at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default)]
    pub podcasts: Vec<PodcastConfig>,
}

/// One `podcasts` entry of the configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PodcastConfig {
    pub id: u32,
    pub name: String,
    pub feed: String,
    pub path: PathBuf,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl PodcastConfig {
    /// Basic auth credentials, if both parts are configured
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials::new(&self.username, &self.password)).filter(Credentials::is_complete)
    }
}

impl Config {
    /// Default location, e.g. `~/.config/pcd`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load and validate the configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::ParseFailed { source, .. } => ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        tracing::debug!(
            path = %path.display(),
            podcasts = config.podcasts.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseFailed {
                path: PathBuf::new(),
                source: e,
            })?;

        for podcast in &mut config.podcasts {
            podcast.path = expand_home(&podcast.path);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for podcast in &self.podcasts {
            if !ids.insert(podcast.id) {
                return Err(ConfigError::Invalid(format!(
                    "podcast id {} is used more than once",
                    podcast.id
                )));
            }
            if podcast.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "podcast {} has no name",
                    podcast.id
                )));
            }
            if podcast.feed.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "podcast '{}' has no feed",
                    podcast.name
                )));
            }
            if podcast.path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "podcast '{}' has no path",
                    podcast.name
                )));
            }
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Find a podcast by numeric ID or by a case-insensitive name fragment.
    ///
    /// A fragment matching more than one podcast is an error.
    pub fn find_podcast(&self, term: &str) -> Result<&PodcastConfig, ConfigError> {
        if let Ok(id) = term.trim().parse::<u32>() {
            return self
                .podcasts
                .iter()
                .find(|p| p.id == id)
                .ok_or_else(|| ConfigError::NoMatch(term.to_string()));
        }

        let needle = term.to_lowercase();
        let matches: Vec<&PodcastConfig> = self
            .podcasts
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect();

        match matches[..] {
            [podcast] => Ok(podcast),
            [] => Err(ConfigError::NoMatch(term.to_string())),
            _ => Err(ConfigError::Ambiguous {
                term: term.to_string(),
                matches: matches.iter().map(|p| p.name.clone()).collect(),
            }),
        }
    }
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
podcasts:
  - id: 1
    name: GNU World Order
    feed: https://example.com/gnu.xml
    path: /tmp/podcasts/gnu
  - id: 2
    name: Linux Outlaws
    feed: https://example.com/outlaws.xml
    path: /tmp/podcasts/outlaws
    username: user
    password: secret
  - id: 3
    name: Linux Voice
    feed: https://example.com/voice.xml
    path: /tmp/podcasts/voice
    username: user
"#;

    #[test]
    fn parses_podcasts_with_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.podcasts.len(), 3);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(60));
        assert_eq!(config.podcasts[0].path, PathBuf::from("/tmp/podcasts/gnu"));
    }

    #[test]
    fn credentials_require_both_parts() {
        let config = Config::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.podcasts[0].credentials(), None);
        assert_eq!(
            config.podcasts[1].credentials(),
            Some(Credentials::new("user", "secret"))
        );
        assert_eq!(config.podcasts[2].credentials(), None);
    }

    #[test]
    fn finds_podcast_by_id() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.find_podcast("2").unwrap().name, "Linux Outlaws");
    }

    #[test]
    fn finds_podcast_by_name_fragment() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.find_podcast("gnu").unwrap().id, 1);
        assert_eq!(config.find_podcast("OUTLAW").unwrap().id, 2);
    }

    #[test]
    fn ambiguous_fragment_is_an_error() {
        let config = Config::from_yaml(SAMPLE).unwrap();

        match config.find_podcast("linux") {
            Err(ConfigError::Ambiguous { matches, .. }) => {
                assert_eq!(matches, ["Linux Outlaws", "Linux Voice"]);
            }
            other => panic!("Expected ambiguous match, got {other:?}"),
        }
    }

    #[test]
    fn unknown_podcast_is_an_error() {
        let config = Config::from_yaml(SAMPLE).unwrap();

        assert!(matches!(
            config.find_podcast("99"),
            Err(ConfigError::NoMatch(_))
        ));
        assert!(matches!(
            config.find_podcast("nothing like it"),
            Err(ConfigError::NoMatch(_))
        ));
    }

    #[test]
    fn expands_home_directory() {
        let config = Config::from_yaml(
            "podcasts:\n  - id: 1\n    name: a\n    feed: https://example.com\n    path: ~/podcasts/a\n",
        )
        .unwrap();

        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.podcasts[0].path, home.join("podcasts/a"));
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = Config::from_yaml(
            r#"
podcasts:
  - { id: 1, name: a, feed: "https://example.com/a", path: /tmp/a }
  - { id: 1, name: b, feed: "https://example.com/b", path: /tmp/b }
"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let result = Config::from_yaml("concurrency: 0\npodcasts: []\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_missing_fields() {
        let result = Config::from_yaml("podcasts:\n  - id: 1\n    name: a\n");
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::load(&dir.path().join("pcd"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pcd");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.podcasts.len(), 3);
    }

    #[test]
    fn load_reports_path_of_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pcd");
        std::fs::write(&path, "podcasts: [").unwrap();

        match Config::load(&path) {
            Err(ConfigError::ParseFailed { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected parse failure, got {other:?}"),
        }
    }
}
