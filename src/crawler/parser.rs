//! HTML parser for extracting typed links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links, each classified by the role it plays on the site
//! - Page title

use crate::config::SiteConfig;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// The role a link plays for the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRole {
    /// Points at a submission page
    Submission,
    /// The pagination "next" link of a listing
    NextPage,
    /// The direct image download on a submission page
    Download,
    /// Leads to the site's login page
    Login,
    /// Anything else
    Other,
}

/// A link extracted from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Visible link text, whitespace-collapsed
    pub text: String,
    /// Absolute link target
    pub url: Url,
    /// Path component of `url`
    pub path: String,
    /// Declared role of the link
    pub role: LinkRole,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All links found on the page, in document order
    pub links: Vec<PageLink>,
}

/// Site-specific rules that assign a role to each link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRules {
    /// Path prefix of submission pages
    pub submission_prefix: String,
    /// Exact text of the pagination "next" link
    pub next_page_label: String,
    /// Exact text of the download link
    pub download_label: String,
}

impl LinkRules {
    /// Builds the rules from the site configuration
    pub fn from_site(site: &SiteConfig) -> Self {
        Self {
            submission_prefix: site.submission_prefix.clone(),
            next_page_label: collapse_whitespace(&site.next_page_label),
            download_label: collapse_whitespace(&site.download_label),
        }
    }

    /// Classifies a link by its text and resolved URL
    ///
    /// Text labels win over path rules: a "Next" link into a listing is
    /// pagination even if the listing path happens to match the submission
    /// prefix.
    pub fn classify(&self, text: &str, url: &Url) -> LinkRole {
        if text == self.next_page_label {
            LinkRole::NextPage
        } else if text == self.download_label {
            LinkRole::Download
        } else if url.path().starts_with(&self.submission_prefix) {
            LinkRole::Submission
        } else if url.path().contains("/login") {
            LinkRole::Login
        } else {
            LinkRole::Other
        }
    }
}

impl Default for LinkRules {
    fn default() -> Self {
        Self::from_site(&SiteConfig::default())
    }
}

/// Parses HTML content and extracts typed links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Non-HTTP(S) URLs after resolution
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
/// * `rules` - Site rules used to classify each link
///
/// # Example
///
/// ```
/// use gallery_mirror::crawler::{parse_page, LinkRole, LinkRules};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/view/1/">Art</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/gallery/foo/").unwrap();
/// let parsed = parse_page(html, &base_url, &LinkRules::default());
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].role, LinkRole::Submission);
/// ```
pub fn parse_page(html: &str, base_url: &Url, rules: &LinkRules) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url, rules),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url, rules: &LinkRules) -> Vec<PageLink> {
    let mut links = Vec::new();

    let a_selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return links,
    };

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, base_url) else {
            continue;
        };

        let text = link_text(&element);
        let role = rules.classify(&text, &url);
        links.push(PageLink {
            path: url.path().to_string(),
            text,
            url,
            role,
        });
    }

    links
}

/// Visible text of a link, falling back to the anchor's `title` attribute
fn link_text(element: &ElementRef<'_>) -> String {
    let text = collapse_whitespace(&element.text().collect::<String>());
    if !text.is_empty() {
        return text;
    }

    element
        .value()
        .attr("title")
        .map(collapse_whitespace)
        .unwrap_or_default()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Same page anchors
    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Collapses all whitespace runs into single spaces and trims the ends
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
