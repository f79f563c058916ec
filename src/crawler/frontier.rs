//! Paginated listing walk for one artist and listing kind
//!
//! The walk is strictly sequential: the "next" link of a listing page is only
//! known once that page has been fetched. Every fetch goes through the shared
//! rate limiter.

use crate::config::{CrawlerConfig, SiteConfig};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::LinkRole;
use crate::crawler::rate_limiter::RateLimiter;
use crate::storage::Ledger;
use crate::url::{page_key, resolve_against};
use std::collections::{HashMap, HashSet};
use std::fmt;
use url::Url;

/// The listings an artist has on the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListingKind {
    Gallery,
    Favorites,
    Scraps,
}

impl ListingKind {
    /// Path segment of this listing on the site
    pub fn segment<'a>(&self, site: &'a SiteConfig) -> &'a str {
        match self {
            Self::Gallery => &site.gallery_path,
            Self::Favorites => &site.favorites_path,
            Self::Scraps => &site.scraps_path,
        }
    }

    /// The listing kinds enabled in the crawler configuration, in crawl order
    pub fn enabled(config: &CrawlerConfig) -> Vec<ListingKind> {
        [
            (Self::Gallery, config.gallery),
            (Self::Favorites, config.favorites),
            (Self::Scraps, config.scraps),
        ]
        .into_iter()
        .filter_map(|(kind, enabled)| enabled.then_some(kind))
        .collect()
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gallery => "gallery",
            Self::Favorites => "favorites",
            Self::Scraps => "scraps",
        };
        f.write_str(name)
    }
}

/// A submission page waiting for the download stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    /// Canonical ledger key of the submission page
    pub page_key: String,
    /// Artist whose listing linked the page
    pub artist: String,
    /// Absolute URL of the submission page
    pub submission_url: Url,
}

/// Pending submission pages keyed by page key, merged across listings
pub type PendingSet = HashMap<String, PendingImage>;

/// In-progress pagination state for one artist and listing kind
#[derive(Debug)]
struct CrawlFrontier {
    /// Next listing page to fetch, `None` once exhausted
    next_url: Option<Url>,
    /// New submission links seen on the most recently fetched page
    new_on_last_page: usize,
    /// Listing pages already fetched, to stop on pagination cycles
    visited: HashSet<String>,
}

impl CrawlFrontier {
    fn new(start: Url) -> Self {
        Self {
            next_url: Some(start),
            new_on_last_page: 0,
            visited: HashSet::new(),
        }
    }
}

/// Outcome of one listing walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierReport {
    /// Listing pages fetched successfully
    pub pages_fetched: usize,
    /// Submission pages added to the pending set
    pub new_links: usize,
}

/// Walks listing pages and collects submission pages missing from the ledger
pub struct FrontierCrawler<'a> {
    fetcher: &'a dyn PageFetcher,
    ledger: &'a dyn Ledger,
    rate_limiter: &'a RateLimiter,
    site: &'a SiteConfig,
    base_url: &'a Url,
    fast_scan: bool,
}

impl<'a> FrontierCrawler<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        ledger: &'a dyn Ledger,
        rate_limiter: &'a RateLimiter,
        site: &'a SiteConfig,
        base_url: &'a Url,
        fast_scan: bool,
    ) -> Self {
        Self {
            fetcher,
            ledger,
            rate_limiter,
            site,
            base_url,
            fast_scan,
        }
    }

    /// First listing page of `artist` for `kind`, e.g. `<base>/gallery/<artist>/`
    pub fn first_listing_url(&self, artist: &str, kind: ListingKind) -> Url {
        resolve_against(self.base_url, &[kind.segment(self.site), artist])
    }

    /// Walks the `kind` listing of `artist`, adding new submission pages to `pending`
    pub async fn crawl(
        &self,
        artist: &str,
        kind: ListingKind,
        pending: &mut PendingSet,
    ) -> FrontierReport {
        let start = self.first_listing_url(artist, kind);
        tracing::info!("Scanning {}'s {} for links...", artist, kind);
        self.crawl_from(start, artist, pending).await
    }

    /// Walks a listing starting at `start`
    ///
    /// The walk ends when a page has no "next" link, when a fetch fails, or,
    /// with fast scan enabled, when a page yields no new submission links.
    pub async fn crawl_from(
        &self,
        start: Url,
        artist: &str,
        pending: &mut PendingSet,
    ) -> FrontierReport {
        let mut frontier = CrawlFrontier::new(start);
        let mut report = FrontierReport::default();

        while let Some(url) = frontier.next_url.take() {
            if !frontier.visited.insert(url.as_str().to_string()) {
                tracing::warn!("Listing page {} was already visited -- stopping", url);
                break;
            }

            self.rate_limiter.acquire().await;
            let page = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Couldn't get page {}: {} -- stopping", url, e);
                    break;
                }
            };

            if !page.is_ok() {
                tracing::warn!(
                    "Couldn't get page {}: HTTP {} -- stopping",
                    url,
                    page.status
                );
                break;
            }
            report.pages_fetched += 1;

            let mut valid = 0;
            frontier.new_on_last_page = 0;
            for link in page.links_with_role(LinkRole::Submission) {
                valid += 1;
                let key = page_key(&link.url);
                if self.is_recorded(&key) {
                    continue;
                }

                // Pending from another listing still counts as new for this walk
                frontier.new_on_last_page += 1;
                pending.entry(key.clone()).or_insert_with(|| {
                    let mut submission_url = link.url.clone();
                    submission_url.set_fragment(None);
                    PendingImage {
                        page_key: key,
                        artist: artist.to_string(),
                        submission_url,
                    }
                });
            }
            report.new_links += frontier.new_on_last_page;

            if valid == 0 {
                tracing::info!(
                    "Page {} does not have submission links (page title is {})",
                    url,
                    page.title_or_default()
                );
            }
            tracing::info!(
                "Page #{}: got {} valid and {} new links",
                report.pages_fetched,
                valid,
                frontier.new_on_last_page
            );

            if self.fast_scan && frontier.new_on_last_page == 0 {
                tracing::info!("No more new links found");
                break;
            }

            frontier.next_url = page
                .first_link(LinkRole::NextPage)
                .map(|link| link.url.clone());
        }

        report
    }

    /// Checks the ledger, treating a query failure as "not downloaded"
    fn is_recorded(&self, key: &str) -> bool {
        match self.ledger.is_downloaded(key) {
            Ok(downloaded) => downloaded,
            Err(e) => {
                tracing::warn!("Ledger lookup failed for {}: {} -- will re-check", key, e);
                false
            }
        }
    }
}
