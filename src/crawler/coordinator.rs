//! Mirror coordinator - run orchestration logic
//!
//! This module ties the pieces of a run together, including:
//! - Opening the ledger and the cookie store
//! - Establishing a logged-in session
//! - Walking every enabled listing of every artist
//! - Handing the merged pending set to the download stage

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, HttpPageFetcher, PageFetcher};
use crate::crawler::frontier::{FrontierCrawler, ListingKind, PendingSet};
use crate::crawler::parser::LinkRules;
use crate::crawler::rate_limiter::RateLimiter;
use crate::download::DownloadWorkerPool;
use crate::output::RunStatistics;
use crate::session::{ensure_logged_in, Session};
use crate::storage::{open_ledger, Ledger};
use crate::url::sort_naturally;
use crate::MirrorError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Main mirror coordinator structure
///
/// Owns everything a run shares: the HTTP client, the page fetcher, the
/// ledger and the rate limiter. Nothing is global, so several coordinators
/// can coexist.
pub struct Coordinator {
    config: Arc<Config>,
    base_url: Url,
    client: Client,
    fetcher: Arc<dyn PageFetcher>,
    ledger: Arc<dyn Ledger>,
    rate_limiter: Arc<RateLimiter>,
    session: Option<Session>,
}

impl Coordinator {
    /// Creates a coordinator from already-built collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `client` - HTTP client used for image transfers
    /// * `fetcher` - Page fetcher used for listing and submission pages
    /// * `ledger` - The download ledger
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(MirrorError)` - The configured base URL is invalid
    pub fn new(
        config: Config,
        client: Client,
        fetcher: Arc<dyn PageFetcher>,
        ledger: Arc<dyn Ledger>,
    ) -> Result<Self, MirrorError> {
        let base_url = Url::parse(&config.site.base_url)?;
        let rate_limiter = Arc::new(RateLimiter::new(config.crawler.requests_per_second));

        Ok(Self {
            config: Arc::new(config),
            base_url,
            client,
            fetcher,
            ledger,
            rate_limiter,
            session: None,
        })
    }

    /// Builds a coordinator with a persistent session and a logged-in client
    ///
    /// Failing to open the ledger, to write the cookie file, or to log in
    /// aborts before any crawling happens.
    pub async fn from_config(config: Config) -> Result<Self, MirrorError> {
        std::fs::create_dir_all(&config.paths.config_directory)?;

        let ledger_path = config.ledger_path();
        tracing::info!("Opening ledger {}", ledger_path.display());
        let ledger = open_ledger(&ledger_path)?;

        let base_url = Url::parse(&config.site.base_url)?;
        let session = Session::open(&config.cookie_path(), base_url.clone())?;
        tracing::debug!("Using cookie file {}", session.cookie_path().display());

        let client = build_http_client(&config.site, session.jar())?;
        let fetcher = Arc::new(HttpPageFetcher::new(
            client.clone(),
            LinkRules::from_site(&config.site),
        ));

        let mut coordinator = Self::new(config, client, fetcher, Arc::new(ledger))?;
        ensure_logged_in(
            &coordinator.client,
            coordinator.fetcher.as_ref(),
            &coordinator.rate_limiter,
            &coordinator.base_url,
            coordinator.config.credentials.as_ref(),
        )
        .await?;
        session.save()?;
        coordinator.session = Some(session);

        Ok(coordinator)
    }

    /// Runs one mirror pass over `artists`
    ///
    /// Artists are walked in natural order; the pending sets of every artist
    /// and listing kind are merged before any download starts.
    pub async fn run(&self, artists: &[String]) -> Result<RunStatistics, MirrorError> {
        let start = Instant::now();
        let mut stats = RunStatistics::default();

        let mut artists = artists.to_vec();
        sort_naturally(&mut artists);
        artists.dedup();

        let kinds = ListingKind::enabled(&self.config.crawler);
        if kinds.is_empty() {
            tracing::warn!("No listing kind is enabled, nothing to scan");
        }

        let crawler = FrontierCrawler::new(
            self.fetcher.as_ref(),
            self.ledger.as_ref(),
            &self.rate_limiter,
            &self.config.site,
            &self.base_url,
            self.config.crawler.fast_scan,
        );

        let mut pending = PendingSet::new();
        for artist in &artists {
            stats.artists += 1;
            for kind in &kinds {
                let report = crawler.crawl(artist, *kind, &mut pending).await;
                stats.listing_pages += report.pages_fetched;
            }
        }

        stats.queued = pending.len();
        tracing::info!("Found {} new submissions", pending.len());

        let pool = DownloadWorkerPool::new(
            self.client.clone(),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.ledger),
            Arc::clone(&self.rate_limiter),
            self.config.paths.download_directory.clone(),
            self.config.crawler.max_concurrent_downloads as usize,
        );
        let report = pool.run(pending.into_values().collect()).await?;
        stats.absorb(&report);

        if let Some(session) = &self.session {
            if let Err(e) = session.save() {
                tracing::warn!("Couldn't save cookies: {}", e);
            }
        }

        stats.elapsed = start.elapsed();
        stats.log_summary();
        Ok(stats)
    }
}
