//! HTTP fetcher implementation
//!
//! This module handles page requests for the crawler, including:
//! - Building the shared HTTP client with the site's user agent and cookie jar
//! - The `PageFetcher` seam the crawler and downloader fetch pages through
//! - The reqwest-backed implementation that parses fetched HTML into typed links

use crate::config::SiteConfig;
use crate::crawler::parser::{parse_page, LinkRole, LinkRules, PageLink};
use crate::MirrorError;
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A fetched page as seen by the crawl core
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code of the final response
    pub status: u16,

    /// Typed links extracted from the body (empty for non-200 responses)
    pub links: Vec<PageLink>,

    /// Page title, if any
    pub title: Option<String>,
}

impl FetchedPage {
    /// Returns true if the page was fetched with HTTP 200
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }

    /// Iterates over links with the given role
    pub fn links_with_role(&self, role: LinkRole) -> impl Iterator<Item = &PageLink> {
        self.links.iter().filter(move |link| link.role == role)
    }

    /// Returns the first link with the given role
    pub fn first_link(&self, role: LinkRole) -> Option<&PageLink> {
        self.links_with_role(role).next()
    }

    /// Title for log messages
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("<untitled>")
    }
}

/// Fetches a page and extracts its typed links
///
/// Transport failures are errors; HTTP error statuses are reported through
/// [`FetchedPage::status`] and left for the caller to judge.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, MirrorError>;
}

/// Whole-request timeout for HTML pages and the login form
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds an HTTP client with proper configuration
///
/// The client carries only a connect timeout. Image bodies may stream for
/// as long as the server keeps sending; page requests add [`PAGE_TIMEOUT`].
///
/// # Arguments
///
/// * `site` - The site configuration supplying the user agent
/// * `jar` - The cookie jar shared by every request of the session
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use gallery_mirror::config::SiteConfig;
/// use gallery_mirror::crawler::build_http_client;
/// use reqwest::cookie::Jar;
/// use std::sync::Arc;
///
/// let client = build_http_client(&SiteConfig::default(), Arc::new(Jar::default())).unwrap();
/// ```
pub fn build_http_client(site: &SiteConfig, jar: Arc<Jar>) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(site.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .cookie_provider(jar)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    rules: LinkRules,
    timeout: Duration,
}

impl HttpPageFetcher {
    /// Creates a fetcher classifying links with `rules`
    pub fn new(client: Client, rules: LinkRules) -> Self {
        Self {
            client,
            rules,
            timeout: PAGE_TIMEOUT,
        }
    }

    /// Overrides the per-page timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, MirrorError> {
        tracing::debug!("Opening {}", url);

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| MirrorError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!("Got HTTP {} for {}", status.as_u16(), url);
            return Ok(FetchedPage {
                status: status.as_u16(),
                links: Vec::new(),
                title: None,
            });
        }

        // Relative links resolve against the post-redirect URL
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|source| MirrorError::Http {
            url: url.to_string(),
            source,
        })?;

        let parsed = parse_page(&body, &final_url, &self.rules);
        Ok(FetchedPage {
            status: status.as_u16(),
            links: parsed.links,
            title: parsed.title,
        })
    }
}
