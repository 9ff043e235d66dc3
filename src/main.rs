use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pcd::podcast::truncate_title;
use pcd::{
    Config, DownloadContext, DownloadError, NoopReporter, Podcast, ProgressEvent,
    ProgressReporter, ReqwestClient, SharedProgressReporter, SyncOptions, download_episode,
    episode_filename, parse_range, scan_downloads, sync_all,
};

// Emoji with fallback for terminals without Unicode support
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static SKIPPED: Emoji<'_, '_> = Emoji("⏭️  ", "[-] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// CLI podcatcher: sync your feeds, list and download episodes
#[derive(Parser, Debug)]
#[command(name = "pcd")]
#[command(version)]
#[command(about = "CLI podcatcher (podcast client)")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (default: <config dir>/pcd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every configured feed and refresh the episode lists
    #[command(visible_alias = "s")]
    Sync,

    /// Download episodes of a podcast
    ///
    /// Episodes are numbered as shown by `pcd ls <podcast>`, oldest first.
    /// Without a selection the latest episode is downloaded. Selections can
    /// combine numbers, ranges and exclusions, e.g. '1-30,40-47,!15,!17,102'.
    /// Quote the selection so the shell leaves '!' alone.
    #[command(visible_alias = "d")]
    Download {
        /// Podcast ID or part of its name
        podcast: String,

        /// Episodes to download, e.g. '20-30,!25'
        episodes: Option<String>,
    },

    /// List the episodes of a podcast, or all configured podcasts
    #[command(visible_alias = "ls")]
    List {
        /// Podcast ID or part of its name
        podcast: Option<String>,
    },

    /// Download the latest episode of every podcast
    #[command(name = "download-latest", visible_alias = "dl")]
    DownloadLatest,

    /// Print where an episode is stored
    #[command(visible_alias = "g")]
    Get {
        /// Podcast ID or part of its name
        podcast: String,

        /// Episode number (default: latest)
        episode: Option<usize>,
    },
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);

        Self {
            multi,
            main_bar,
            download_bar: Mutex::new(None),
        }
    }

    fn start_download_bar(&self, length: Option<u64>, message: String) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{binary_bytes_per_sec}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(length.unwrap_or(0)));
        bar.set_style(style);
        bar.set_message(message);
        *self.download_bar.lock().unwrap() = Some(bar.clone());
        bar
    }

    fn take_download_bar(&self) -> Option<ProgressBar> {
        self.download_bar.lock().unwrap().take()
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::SyncStarted { podcast_name, .. } => {
                self.main_bar
                    .enable_steady_tick(std::time::Duration::from_millis(100));
                self.main_bar
                    .set_message(format!("{SEARCH}Syncing {}", podcast_name.cyan()));
            }

            ProgressEvent::SyncCompleted {
                podcast_id,
                podcast_name,
                episode_count,
            } => {
                self.println(format!(
                    "{SUCCESS}{} [id: {}] • {} episodes",
                    podcast_name.bold().green(),
                    podcast_id,
                    episode_count.to_string().cyan()
                ));
            }

            ProgressEvent::SyncFailed {
                podcast_id,
                podcast_name,
                error,
            } => {
                self.println(format!(
                    "{FAILURE}{} [id: {}] - {}",
                    podcast_name.red(),
                    podcast_id,
                    error.red()
                ));
            }

            ProgressEvent::SyncCancelled { podcast_name, .. } => {
                self.println(format!("{SKIPPED}{} - cancelled", podcast_name.yellow()));
            }

            ProgressEvent::BatchCompleted {
                synced_count,
                failed_count,
                cancelled_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} synced, {} failed, {} cancelled",
                    "Sync complete:".bold().green(),
                    synced_count.to_string().green().bold(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    },
                    cancelled_count.to_string().yellow()
                );
            }

            ProgressEvent::DownloadStarting {
                episode_title,
                episode_number,
                batch_index,
                batch_size,
                content_length,
            } => {
                self.start_download_bar(
                    content_length,
                    format!(
                        "[{}/{}] #{} {}",
                        (batch_index + 1).to_string().cyan(),
                        batch_size.to_string().cyan(),
                        episode_number,
                        truncate_title(&episode_title, 40)
                    ),
                );
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                }
            }

            ProgressEvent::DownloadCompleted { episode_title, .. } => {
                if let Some(bar) = self.take_download_bar() {
                    bar.finish_and_clear();
                }
                self.println(format!(
                    "{SUCCESS}{}",
                    truncate_title(&episode_title, 60).green()
                ));
            }

            ProgressEvent::DownloadFailed {
                episode_title,
                error,
            } => {
                if let Some(bar) = self.take_download_bar() {
                    bar.finish_and_clear();
                }
                self.println(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&episode_title, 40).red(),
                    error.red()
                ));
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pcd=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve a podcast from the configuration and load its cached episodes
fn load_podcast(config: &Config, term: &str) -> Result<Podcast> {
    let mut podcast = Podcast::from(config.find_podcast(term)?);
    podcast.load().with_context(|| {
        format!(
            "Could not load podcast '{}', try running `pcd sync` again",
            podcast.name
        )
    })?;
    Ok(podcast)
}

async fn run_sync(
    config: &Config,
    client: &ReqwestClient,
    reporter: SharedProgressReporter,
    quiet: bool,
) -> Result<()> {
    let podcasts: Vec<Podcast> = config.podcasts.iter().map(Podcast::from).collect();
    let options = SyncOptions {
        max_concurrent: config.concurrency,
    };

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling sync");
                cancel.cancel();
            }
        })
    };

    let result = sync_all(client, podcasts, &options, reporter, cancel).await;
    interrupt.abort();

    if quiet {
        for (name, error) in &result.failed_podcasts {
            eprintln!("{CROSS}{name}: {error}");
        }
    }

    if result.synced == 0 && result.failed > 0 {
        bail!("None of the {} podcasts could be synced", result.failed);
    }
    Ok(())
}

async fn run_download(
    config: &Config,
    client: &ReqwestClient,
    reporter: &SharedProgressReporter,
    term: &str,
    selection: Option<&str>,
) -> Result<()> {
    let podcast = load_podcast(config, term)?;

    let numbers = match selection {
        Some(selection) => parse_range(selection, podcast.episodes.len())
            .with_context(|| format!("Could not parse episode selection '{selection}'"))?,
        None => vec![
            podcast
                .latest()
                .with_context(|| format!("'{}' has no episodes", podcast.name))?,
        ],
    };

    if numbers.is_empty() {
        tracing::warn!("Episode selection is empty, nothing to download");
        return Ok(());
    }

    if let Some(&bad) = numbers.iter().find(|&&n| podcast.episode(n).is_none()) {
        bail!(
            "There is no episode {bad}, '{}' has episodes 1 to {}",
            podcast.name,
            podcast.episodes.len()
        );
    }

    for (batch_index, &number) in numbers.iter().enumerate() {
        let Some(episode) = podcast.episode(number) else {
            continue;
        };
        let context = DownloadContext {
            episode_number: number,
            batch_index,
            batch_size: numbers.len(),
        };

        download_episode(
            client,
            episode,
            &podcast.path,
            podcast.credentials.as_ref(),
            &context,
            reporter,
        )
        .await
        .with_context(|| {
            format!(
                "Could not download episode {number} of '{}': {}",
                podcast.name, episode.title
            )
        })?;
    }

    Ok(())
}

async fn run_download_latest(
    config: &Config,
    client: &ReqwestClient,
    reporter: &SharedProgressReporter,
) -> Result<()> {
    let total = config.podcasts.len();
    let mut failed = 0;

    for (batch_index, podcast_config) in config.podcasts.iter().enumerate() {
        let mut podcast = Podcast::from(podcast_config);
        if let Err(e) = podcast.load() {
            tracing::warn!(podcast = %podcast.name, error = %e, "Could not load podcast");
            failed += 1;
            continue;
        }

        let Some(number) = podcast.latest() else {
            tracing::info!(podcast = %podcast.name, "No episodes");
            continue;
        };
        let Some(episode) = podcast.episode(number) else {
            continue;
        };

        let context = DownloadContext {
            episode_number: number,
            batch_index,
            batch_size: total,
        };

        match download_episode(
            client,
            episode,
            &podcast.path,
            podcast.credentials.as_ref(),
            &context,
            reporter,
        )
        .await
        {
            Ok(_) => {}
            Err(DownloadError::AlreadyExists { path }) => {
                tracing::info!(
                    podcast = %podcast.name,
                    path = %path.display(),
                    "Latest episode already downloaded"
                );
            }
            Err(e) => {
                tracing::warn!(
                    podcast = %podcast.name,
                    error = %e,
                    "Could not download latest episode"
                );
                failed += 1;
            }
        }
    }

    if failed > 0 && failed == total {
        bail!("No podcast could be handled");
    }
    Ok(())
}

fn run_list(config: &Config, term: Option<&str>) -> Result<()> {
    if let Some(term) = term {
        let podcast = load_podcast(config, term)?;
        let downloaded = scan_downloads(&podcast.path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not check for downloaded episodes");
            Default::default()
        });
        print!("{}", podcast.listing(&downloaded));
        return Ok(());
    }

    println!("{}", "List of podcasts from your configuration:".bold());
    for podcast_config in &config.podcasts {
        let mut podcast = Podcast::from(podcast_config);
        let episodes = match podcast.load() {
            Ok(()) => format!("{} episodes", podcast.episodes.len()).cyan(),
            Err(e) => {
                tracing::debug!(podcast = %podcast.name, error = %e, "No cached episodes");
                "not synced".yellow()
            }
        };
        println!(
            "\t{:>3} - {:<40} ({})",
            podcast.id,
            podcast.name.bold(),
            episodes
        );
    }
    Ok(())
}

fn run_get(config: &Config, term: &str, number: Option<usize>) -> Result<()> {
    let podcast = load_podcast(config, term)?;
    let number = match number {
        Some(n) => n,
        None => podcast
            .latest()
            .with_context(|| format!("'{}' has no episodes", podcast.name))?,
    };

    let episode = podcast.episode(number).with_context(|| {
        format!(
            "There is no episode {number}, '{}' has episodes 1 to {}",
            podcast.name,
            podcast.episodes.len()
        )
    })?;

    if !episode.has_media() {
        bail!(
            "Episode {number} of '{}' has no audio file: {}",
            podcast.name,
            episode.title
        );
    }

    println!("{}", podcast.path.join(episode_filename(episode)).display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let client = ReqwestClient::with_timeouts(config.connect_timeout(), config.read_timeout())
        .context("Failed to create HTTP client")?;

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    match args.command {
        Command::Sync => run_sync(&config, &client, reporter, args.quiet).await,
        Command::Download { podcast, episodes } => {
            run_download(&config, &client, &reporter, &podcast, episodes.as_deref()).await
        }
        Command::DownloadLatest => run_download_latest(&config, &client, &reporter).await,
        Command::List { podcast } => run_list(&config, podcast.as_deref()),
        Command::Get { podcast, episode } => run_get(&config, &podcast, episode),
    }
}
