//! Crawler module for listing traversal and page fetching
//!
//! This module contains the discovery half of the mirror, including:
//! - HTTP fetching through the `PageFetcher` seam
//! - HTML parsing and link classification
//! - Request rate limiting
//! - Paginated listing walks and overall run coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod rate_limiter;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchedPage, HttpPageFetcher, PageFetcher, PAGE_TIMEOUT};
pub use frontier::{FrontierCrawler, FrontierReport, ListingKind, PendingImage, PendingSet};
pub use parser::{parse_page, LinkRole, LinkRules, PageLink, ParsedPage};
pub use rate_limiter::RateLimiter;

use crate::config::Config;
use crate::output::RunStatistics;
use crate::MirrorError;

/// Runs a complete mirror pass for the given artists
///
/// This is the main entry point for a run. It will:
/// 1. Open the ledger and the cookie store
/// 2. Build the HTTP client and make sure the session is logged in
/// 3. Walk every enabled listing of every artist
/// 4. Download everything not yet in the ledger
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `artists` - Artist names as they appear in listing URLs
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Run completed; per-item failures are counted, not raised
/// * `Err(MirrorError)` - Setup failed
pub async fn run_mirror(config: Config, artists: &[String]) -> Result<RunStatistics, MirrorError> {
    let coordinator = Coordinator::from_config(config).await?;
    coordinator.run(artists).await
}
