mod download;
mod filename;

pub use download::{DownloadContext, DownloadResult, download_episode};
pub use filename::{episode_filename, filename_from_url};
