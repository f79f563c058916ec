//! Authenticated session state
//!
//! This module handles:
//! - Persisting the cookie jar between runs
//! - Logging in when the site reports a logged-out session

mod cookies;
mod login;

pub use cookies::{load_cookies, save_cookies};
pub use login::{ensure_logged_in, find_login_form, LoginForm};

use crate::MirrorError;
use reqwest::cookie::Jar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// A cookie jar bound to its file on disk
#[derive(Debug)]
pub struct Session {
    jar: Arc<Jar>,
    cookie_path: PathBuf,
    base_url: Url,
}

impl Session {
    /// Opens the cookie file at `cookie_path`, creating it if missing
    ///
    /// An unreadable cookie file only costs the stored login. Failing to
    /// write it back is an error: nothing obtained during the run could be
    /// kept.
    pub fn open(cookie_path: &Path, base_url: Url) -> Result<Self, MirrorError> {
        let jar = Arc::new(Jar::default());

        if cookie_path.exists() {
            if let Err(e) = load_cookies(cookie_path, &jar, &base_url) {
                tracing::warn!("Ignoring cookie file: {}", e);
            }
        }

        let session = Self {
            jar,
            cookie_path: cookie_path.to_path_buf(),
            base_url,
        };
        session.save()?;
        Ok(session)
    }

    /// The jar to install in the HTTP client
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    pub fn cookie_path(&self) -> &Path {
        &self.cookie_path
    }

    /// Writes the jar back to the cookie file
    pub fn save(&self) -> Result<(), MirrorError> {
        let saved = save_cookies(&self.cookie_path, &self.jar, &self.base_url)?;
        tracing::debug!("Saved {} cookies to {}", saved, self.cookie_path.display());
        Ok(())
    }
}
