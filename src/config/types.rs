use serde::Deserialize;
use std::path::PathBuf;

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Name of the SQLite ledger inside the config directory
pub const LEDGER_FILE_NAME: &str = "downloaded.sqlite";

const PROGRAM_DIR_NAME: &str = "gallery-mirror";
const PICTURES_DIR_NAME: &str = "GalleryMirror";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_8_3) AppleWebKit/536.28.10 (KHTML, like Gecko) Version/6.0.3 Safari/536.28.10";

/// Main configuration structure for Gallery-Mirror
///
/// Every section is optional in the file; missing keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub credentials: Option<Credentials>,
    pub paths: PathsConfig,
}

/// Describes the gallery site being mirrored
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root URL of the site, also used for the login check
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing path segment for an artist's gallery
    #[serde(rename = "gallery-path")]
    pub gallery_path: String,

    /// Listing path segment for an artist's favorites
    #[serde(rename = "favorites-path")]
    pub favorites_path: String,

    /// Listing path segment for an artist's scraps
    #[serde(rename = "scraps-path")]
    pub scraps_path: String,

    /// Path prefix identifying submission pages
    #[serde(rename = "submission-prefix")]
    pub submission_prefix: String,

    /// Exact text of the pagination "next" link
    #[serde(rename = "next-page-label")]
    pub next_page_label: String,

    /// Exact text of the download link on a submission page
    #[serde(rename = "download-label")]
    pub download_label: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.furaffinity.net/".to_string(),
            gallery_path: "gallery".to_string(),
            favorites_path: "favorites".to_string(),
            scraps_path: "scraps".to_string(),
            submission_prefix: "/view/".to_string(),
            next_page_label: "Next".to_string(),
            download_label: "Download".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum page fetches per second
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: u32,

    /// Maximum number of image transfers in flight
    #[serde(rename = "max-concurrent-downloads")]
    pub max_concurrent_downloads: u32,

    /// Stop paginating once a listing page yields nothing new
    #[serde(rename = "fast-scan")]
    pub fast_scan: bool,

    /// Include the artist's gallery
    pub gallery: bool,

    /// Include the artist's favorites
    pub favorites: bool,

    /// Include the artist's scraps
    pub scraps: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 3,
            max_concurrent_downloads: 4,
            fast_scan: true,
            gallery: true,
            favorites: false,
            scraps: false,
        }
    }
}

/// Site login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Local directories used by a run
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Directory holding config.toml, the ledger and the cookie file.
    /// Never read from the file itself.
    #[serde(skip, default = "default_config_directory")]
    pub config_directory: PathBuf,

    /// Directory receiving downloaded images
    #[serde(rename = "download-directory", default = "default_download_directory")]
    pub download_directory: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_directory: default_config_directory(),
            download_directory: default_download_directory(),
        }
    }
}

impl Config {
    /// Path of the SQLite ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.paths.config_directory.join(LEDGER_FILE_NAME)
    }

    /// Path of the cookie file, scoped to the configured user when there is one
    pub fn cookie_path(&self) -> PathBuf {
        let name = match &self.credentials {
            Some(creds) if !creds.username.is_empty() => format!("cookies.{}.txt", creds.username),
            _ => "cookies.txt".to_string(),
        };
        self.paths.config_directory.join(name)
    }
}

/// Returns the platform config directory joined with `gallery-mirror`
///
/// That is `$XDG_CONFIG_HOME` or `~/.config` on Linux and
/// `~/Library/Application Support` on macOS.
pub fn default_config_directory() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROGRAM_DIR_NAME)
}

/// Returns the user's pictures directory joined with `GalleryMirror`
pub fn default_download_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PICTURES_DIR_NAME)
}
