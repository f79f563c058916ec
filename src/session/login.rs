//! Site login
//!
//! The session counts as logged in when the site's front page shows no link
//! to the login page.

use crate::config::Credentials;
use crate::crawler::{LinkRole, PageFetcher, RateLimiter, PAGE_TIMEOUT};
use crate::MirrorError;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

/// Form field carrying the user name
const USER_FIELD: &str = "name";

/// Form field carrying the password
const PASSWORD_FIELD: &str = "pass";

/// A login form ready to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Absolute submission URL
    pub action: Url,
    /// Hidden inputs carried over from the page, in document order
    pub hidden_fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Every field to POST, credentials last
    fn fields(&self, credentials: &Credentials) -> Vec<(String, String)> {
        let mut fields = self.hidden_fields.clone();
        fields.push((USER_FIELD.to_string(), credentials.username.clone()));
        fields.push((PASSWORD_FIELD.to_string(), credentials.password.clone()));
        fields
    }
}

/// Finds the first form whose action points at a login endpoint
pub fn find_login_form(html: &str, page_url: &Url) -> Option<LoginForm> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse("form[action]").ok()?;
    let hidden_selector = Selector::parse(r#"input[type="hidden"][name]"#).ok()?;

    document.select(&form_selector).find_map(|form| {
        let action = form.value().attr("action")?;
        if !action.contains("/login") {
            return None;
        }

        let hidden_fields = form
            .select(&hidden_selector)
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        Some(LoginForm {
            action: page_url.join(action).ok()?,
            hidden_fields,
        })
    })
}

/// Makes sure the session behind `client` is logged in
///
/// Does nothing when the front page has no login link. Otherwise submits
/// the login form with `credentials` and checks the front page again.
/// Every failure is fatal for the run.
pub async fn ensure_logged_in(
    client: &Client,
    fetcher: &dyn PageFetcher,
    rate_limiter: &RateLimiter,
    base_url: &Url,
    credentials: Option<&Credentials>,
) -> Result<(), MirrorError> {
    let Some(login_url) = login_link(fetcher, rate_limiter, base_url).await? else {
        tracing::debug!("Already logged in");
        return Ok(());
    };

    let credentials = credentials.ok_or_else(|| {
        MirrorError::Session("not logged in and no credentials are configured".to_string())
    })?;
    tracing::info!("Logging in as {}", credentials.username);

    rate_limiter.acquire().await;
    let response = client
        .get(login_url.clone())
        .timeout(PAGE_TIMEOUT)
        .send()
        .await
        .map_err(|source| MirrorError::Http {
            url: login_url.to_string(),
            source,
        })?;
    if !response.status().is_success() {
        return Err(MirrorError::HttpStatus {
            url: login_url.to_string(),
            status: response.status().as_u16(),
        });
    }
    let page_url = response.url().clone();
    let html = response.text().await?;

    let form = find_login_form(&html, &page_url).ok_or_else(|| {
        MirrorError::Session(format!("no login form found on {}", page_url))
    })?;

    rate_limiter.acquire().await;
    let response = client
        .post(form.action.clone())
        .form(&form.fields(credentials))
        .timeout(PAGE_TIMEOUT)
        .send()
        .await
        .map_err(|source| MirrorError::Http {
            url: form.action.to_string(),
            source,
        })?;
    tracing::debug!("Login form answered with HTTP {}", response.status().as_u16());

    if login_link(fetcher, rate_limiter, base_url).await?.is_some() {
        return Err(MirrorError::Session(format!(
            "login as {} failed",
            credentials.username
        )));
    }

    tracing::info!("Logged in as {}", credentials.username);
    Ok(())
}

/// Fetches the front page and returns its login link, if any
async fn login_link(
    fetcher: &dyn PageFetcher,
    rate_limiter: &RateLimiter,
    base_url: &Url,
) -> Result<Option<Url>, MirrorError> {
    rate_limiter.acquire().await;
    let page = fetcher.fetch(base_url).await?;
    if !page.is_ok() {
        return Err(MirrorError::HttpStatus {
            url: base_url.to_string(),
            status: page.status,
        });
    }
    Ok(page.first_link(LinkRole::Login).map(|link| link.url.clone()))
}
