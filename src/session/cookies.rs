//! Netscape cookie file persistence
//!
//! Each non-comment line holds seven tab-separated fields:
//! `domain  include-subdomains  path  secure  expires  name  value`.

use crate::MirrorError;
use reqwest::cookie::{CookieStore, Jar};
use std::path::Path;
use url::Url;

const HEADER: &str = "# Netscape HTTP Cookie File\n";

/// Prefix curl puts on the domain of HttpOnly cookies
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One parsed cookie file line
#[derive(Debug, Clone, PartialEq, Eq)]
struct CookieLine {
    domain: String,
    include_subdomains: bool,
    path: String,
    secure: bool,
    expires: i64,
    name: String,
    value: String,
}

impl CookieLine {
    fn parse(line: &str) -> Option<Self> {
        let line = line.strip_prefix(HTTP_ONLY_PREFIX).unwrap_or(line);
        if line.trim().is_empty() || line.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return None;
        }

        Some(Self {
            domain: fields[0].trim().to_string(),
            include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            expires: fields[4].trim().parse().ok()?,
            name: fields[5].to_string(),
            value: fields[6].trim_end_matches(['\r', '\n']).to_string(),
        })
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires != 0 && self.expires < now
    }

    /// `Set-Cookie` form of the line, plus the URL it is set for
    fn to_set_cookie(&self, scheme: &str) -> Option<(String, Url)> {
        let host = self.domain.trim_start_matches('.');
        if host.is_empty() {
            return None;
        }
        let url = Url::parse(&format!("{}://{}{}", scheme, host, self.path)).ok()?;

        let mut cookie = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            cookie.push_str("; Domain=");
            cookie.push_str(host);
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        Some((cookie, url))
    }
}

/// Loads the cookies stored at `path` into `jar`
///
/// Malformed and expired lines are skipped. Returns the number of cookies added.
pub fn load_cookies(path: &Path, jar: &Jar, base_url: &Url) -> Result<usize, MirrorError> {
    let content = std::fs::read_to_string(path).map_err(|e| MirrorError::CookieStore {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let now = chrono::Utc::now().timestamp();
    let mut loaded = 0;
    for line in content.lines() {
        let Some(cookie) = CookieLine::parse(line) else {
            continue;
        };
        if cookie.is_expired(now) {
            tracing::debug!("Skipping expired cookie {}", cookie.name);
            continue;
        }
        if let Some((set_cookie, url)) = cookie.to_set_cookie(base_url.scheme()) {
            jar.add_cookie_str(&set_cookie, &url);
            loaded += 1;
        }
    }

    tracing::debug!("Loaded {} cookies from {}", loaded, path.display());
    Ok(loaded)
}

/// Writes the cookies `jar` would send to `base_url` to `path`
///
/// The jar does not expose expiry times, so cookies are written as session
/// cookies scoped to the base URL's host.
pub fn save_cookies(path: &Path, jar: &Jar, base_url: &Url) -> Result<usize, MirrorError> {
    let host = base_url.host_str().unwrap_or_default();
    let secure = if base_url.scheme() == "https" { "TRUE" } else { "FALSE" };

    let mut content = String::from(HEADER);
    let mut saved = 0;
    if let Some(header) = jar.cookies(base_url) {
        let pairs = header.to_str().unwrap_or_default();
        for pair in pairs.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            content.push_str(&format!(
                "{}\tFALSE\t/\t{}\t0\t{}\t{}\n",
                host, secure, name, value
            ));
            saved += 1;
        }
    }

    std::fs::write(path, content).map_err(|e| MirrorError::CookieStore {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(saved)
}
