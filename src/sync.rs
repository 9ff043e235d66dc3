// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::cache;
use crate::error::SyncError;
use crate::feed::fetch_feed;
use crate::http::HttpClient;
use crate::podcast::{Episode, Podcast};
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Options for syncing many podcasts at once
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum number of feeds fetched at the same time
    pub max_concurrent: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Result of a sync batch
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Number of podcasts whose cache was replaced
    pub synced: usize,
    /// Number of podcasts that failed
    pub failed: usize,
    /// Number of podcasts skipped or interrupted by cancellation
    pub cancelled: usize,
    /// Details of failed podcasts (name, error message)
    pub failed_podcasts: Vec<(String, String)>,
}

/// Fetch a podcast's feed and replace its cached episode list.
///
/// The cache is only written once the whole feed has been fetched, decoded
/// and sorted, so a failure leaves the previous snapshot in place.
pub async fn sync_podcast<C: HttpClient + ?Sized>(
    client: &C,
    podcast: &mut Podcast,
) -> Result<usize, SyncError> {
    let feed = fetch_feed(client, &podcast.feed, podcast.credentials.as_ref()).await?;
    tracing::debug!(
        podcast = %podcast.name,
        title = %feed.title,
        items = feed.items.len(),
        "Feed decoded"
    );

    let episodes: Vec<Episode> = feed.items.into_iter().map(Episode::from).collect();
    cache::store(&podcast.path, &episodes)?;

    podcast.episodes = episodes;
    Ok(podcast.episodes.len())
}

enum Outcome {
    Synced(usize),
    Failed(SyncError),
    Cancelled,
}

/// Sync every podcast, at most `max_concurrent` at a time.
///
/// A failing podcast is reported and skipped; it never stops the others.
/// Cancelling `cancel` stops podcasts that are in flight and skips the ones
/// that have not started, leaving their caches untouched.
pub async fn sync_all<C: HttpClient + Clone + 'static>(
    client: &C,
    podcasts: Vec<Podcast>,
    options: &SyncOptions,
    reporter: SharedProgressReporter,
    cancel: CancellationToken,
) -> SyncResult {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(podcasts.len());
    let mut result = SyncResult::default();

    for mut podcast in podcasts {
        // Acquire a permit BEFORE spawning so podcasts start in config order
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            reporter.report(ProgressEvent::SyncCancelled {
                podcast_id: podcast.id,
                podcast_name: podcast.name.clone(),
            });
            result.cancelled += 1;
            continue;
        };

        let client = client.clone();
        let reporter = reporter.clone();
        let cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            reporter.report(ProgressEvent::SyncStarted {
                podcast_id: podcast.id,
                podcast_name: podcast.name.clone(),
            });
            tracing::info!(podcast = %podcast.name, id = podcast.id, "Syncing");

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Outcome::Cancelled,
                synced = sync_podcast(&client, &mut podcast) => match synced {
                    Ok(count) => Outcome::Synced(count),
                    Err(e) => Outcome::Failed(e),
                },
            };

            // Release the permit so the next podcast can start
            drop(permit);

            match &outcome {
                Outcome::Synced(count) => {
                    tracing::info!(podcast = %podcast.name, episodes = count, "Synced");
                    reporter.report(ProgressEvent::SyncCompleted {
                        podcast_id: podcast.id,
                        podcast_name: podcast.name.clone(),
                        episode_count: *count,
                    });
                }
                Outcome::Failed(e) => {
                    tracing::warn!(podcast = %podcast.name, error = %e, "Could not sync podcast");
                    reporter.report(ProgressEvent::SyncFailed {
                        podcast_id: podcast.id,
                        podcast_name: podcast.name.clone(),
                        error: e.to_string(),
                    });
                }
                Outcome::Cancelled => {
                    tracing::info!(podcast = %podcast.name, "Sync cancelled");
                    reporter.report(ProgressEvent::SyncCancelled {
                        podcast_id: podcast.id,
                        podcast_name: podcast.name.clone(),
                    });
                }
            }

            (podcast.name, outcome)
        });

        handles.push(handle);
    }

    // Wait for all syncs to complete
    for handle in handles {
        match handle.await {
            Ok((_, Outcome::Synced(_))) => result.synced += 1,
            Ok((name, Outcome::Failed(e))) => {
                result.failed += 1;
                result.failed_podcasts.push((name, e.to_string()));
            }
            Ok((_, Outcome::Cancelled)) => result.cancelled += 1,
            Err(e) => {
                tracing::error!(error = %e, "Sync task panicked");
                result.failed += 1;
                result.failed_podcasts.push(("<unknown>".to_string(), e.to_string()));
            }
        }
    }

    reporter.report(ProgressEvent::BatchCompleted {
        synced_count: result.synced,
        failed_count: result.failed,
        cancelled_count: result.cancelled,
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use tempfile::tempdir;
    use tokio::sync::Notify;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::{CacheError, FeedError};
    use crate::http::{BytesResponse, Credentials, HeadResponse, HttpResponse, ReqwestClient};
    use crate::progress::NoopReporter;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast</description>
    <item>
      <title>Episode 2</title>
      <enclosure url="https://example.com/ep2.mp3" length="2048" type="audio/mpeg"/>
      <pubDate>Thu, 29 Dec 2016 16:01:07 +0000</pubDate>
    </item>
    <item>
      <title>Episode 1</title>
      <enclosure url="https://example.com/ep1.mp3" length="1024" type="audio/mpeg"/>
      <pubDate>Thu, 21 Dec 2016 16:01:07 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    /// Serves the sample feed, or a 404 for URLs containing "missing"
    #[derive(Clone, Default)]
    struct MockHttpClient {
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(
            &self,
            url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<BytesResponse, reqwest::Error> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("missing") {
                Ok(BytesResponse {
                    status: 404,
                    body: Bytes::new(),
                })
            } else {
                Ok(BytesResponse {
                    status: 200,
                    body: Bytes::from(SAMPLE_FEED),
                })
            }
        }

        async fn get_stream(
            &self,
            _url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<HttpResponse, reqwest::Error> {
            unreachable!("syncing never streams")
        }

        async fn head(
            &self,
            _url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<HeadResponse, reqwest::Error> {
            unreachable!("syncing never sends HEAD")
        }
    }

    /// Never answers, but tells the test once a request is waiting
    #[derive(Clone, Default)]
    struct HangingClient {
        started: Arc<Notify>,
    }

    #[async_trait]
    impl HttpClient for HangingClient {
        async fn get_bytes(
            &self,
            _url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<BytesResponse, reqwest::Error> {
            self.started.notify_one();
            futures::future::pending().await
        }

        async fn get_stream(
            &self,
            _url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<HttpResponse, reqwest::Error> {
            futures::future::pending().await
        }

        async fn head(
            &self,
            _url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<HeadResponse, reqwest::Error> {
            futures::future::pending().await
        }
    }

    fn make_podcast(id: u32, feed: &str, root: &Path) -> Podcast {
        Podcast {
            id,
            name: format!("podcast-{id}"),
            feed: feed.to_string(),
            path: root.join(format!("podcast-{id}")),
            credentials: None,
            episodes: vec![],
        }
    }

    #[tokio::test]
    async fn sync_podcast_caches_sorted_episodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_FEED))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let mut podcast = make_podcast(1, &server.uri(), dir.path());

        let count = sync_podcast(&ReqwestClient::new(), &mut podcast)
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(podcast.episodes[0].title, "Episode 1");
        assert_eq!(podcast.episodes[1].title, "Episode 2");

        let mut reloaded = make_podcast(1, &server.uri(), dir.path());
        reloaded.load().unwrap();
        assert_eq!(reloaded.episodes, podcast.episodes);
    }

    #[tokio::test]
    async fn sync_podcast_maps_feed_errors() {
        let dir = tempdir().unwrap();
        let mut podcast = make_podcast(1, "https://example.com/missing.xml", dir.path());

        let err = sync_podcast(&MockHttpClient::default(), &mut podcast)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Feed(FeedError::NotFound { .. })));
        assert!(!cache::cache_path(&podcast.path).exists());
    }

    #[tokio::test]
    async fn sync_podcast_reports_unwritable_path() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut podcast = make_podcast(1, "https://example.com/feed.xml", &blocker);
        let err = sync_podcast(&MockHttpClient::default(), &mut podcast)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Cache(CacheError::WriteFailed { .. })));
        assert!(podcast.episodes.is_empty());
    }

    #[tokio::test]
    async fn failed_sync_keeps_previous_cache() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default();

        let mut podcast = make_podcast(1, "https://example.com/feed.xml", dir.path());
        sync_podcast(&client, &mut podcast).await.unwrap();

        podcast.feed = "https://example.com/missing.xml".to_string();
        assert!(sync_podcast(&client, &mut podcast).await.is_err());

        assert_eq!(cache::load(&podcast.path).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sync_all_skips_failures() {
        let dir = tempdir().unwrap();
        let podcasts = vec![
            make_podcast(1, "https://example.com/one.xml", dir.path()),
            make_podcast(2, "https://example.com/missing.xml", dir.path()),
            make_podcast(3, "https://example.com/three.xml", dir.path()),
        ];

        let result = sync_all(
            &MockHttpClient::default(),
            podcasts,
            &SyncOptions::default(),
            NoopReporter::shared(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(result.synced, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.cancelled, 0);
        assert_eq!(result.failed_podcasts[0].0, "podcast-2");

        assert!(cache::cache_path(&dir.path().join("podcast-1")).exists());
        assert!(!cache::cache_path(&dir.path().join("podcast-2")).exists());
        assert!(cache::cache_path(&dir.path().join("podcast-3")).exists());
    }

    #[tokio::test]
    async fn sync_all_bounds_concurrency() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default();
        let podcasts = (1..=8)
            .map(|id| make_podcast(id, "https://example.com/feed.xml", dir.path()))
            .collect();

        let result = sync_all(
            &client,
            podcasts,
            &SyncOptions { max_concurrent: 2 },
            NoopReporter::shared(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(result.synced, 8);
        let max = client.max_in_flight.load(Ordering::SeqCst);
        assert!((1..=2).contains(&max), "saw {max} concurrent syncs");
    }

    #[tokio::test]
    async fn cancelled_batch_syncs_nothing() {
        let dir = tempdir().unwrap();
        let podcasts = vec![
            make_podcast(1, "https://example.com/one.xml", dir.path()),
            make_podcast(2, "https://example.com/two.xml", dir.path()),
        ];

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = sync_all(
            &MockHttpClient::default(),
            podcasts,
            &SyncOptions::default(),
            NoopReporter::shared(),
            cancel,
        )
        .await;

        assert_eq!(result.synced, 0);
        assert_eq!(result.cancelled, 2);
        assert!(!dir.path().join("podcast-1").exists());
    }

    #[tokio::test]
    async fn cancel_interrupts_stuck_sync() {
        let dir = tempdir().unwrap();
        let client = HangingClient::default();
        let started = client.started.clone();
        let cancel = CancellationToken::new();

        let podcasts = vec![make_podcast(1, "https://example.com/slow.xml", dir.path())];
        let batch = {
            let cancel = cancel.clone();
            let client = client.clone();
            tokio::spawn(async move {
                sync_all(
                    &client,
                    podcasts,
                    &SyncOptions::default(),
                    NoopReporter::shared(),
                    cancel,
                )
                .await
            })
        };

        started.notified().await;
        cancel.cancel();

        let result = batch.await.unwrap();
        assert_eq!(result.cancelled, 1);
        assert_eq!(result.synced, 0);
    }
}
