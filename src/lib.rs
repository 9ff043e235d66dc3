pub mod cache;
pub mod config;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod podcast;
pub mod progress;
pub mod range;
pub mod state;
pub mod sync;

// Re-export main types for convenience
pub use config::{Config, PodcastConfig};
pub use episode::{DownloadContext, DownloadResult, download_episode, episode_filename};
pub use error::{
    CacheError, ConfigError, DownloadError, FeedError, RangeError, StateError, SyncError,
};
pub use feed::{Enclosure, Feed, FeedItem, fetch_feed, parse_feed};
pub use http::{Credentials, HttpClient, HttpResponse, ReqwestClient};
pub use podcast::{Episode, Podcast};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use range::parse_range;
pub use state::scan_downloads;
pub use sync::{SyncOptions, SyncResult, sync_all, sync_podcast};
