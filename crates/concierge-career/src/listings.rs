//! Job listing sources.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use concierge_core::error::ConciergeError;

/// An open position scraped from a careers page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub location: String,
    pub link: String,
}

/// Source of current job listings for a tenant.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_jobs(&self) -> Result<Vec<JobListing>, ConciergeError>;
}

/// Scrapes a careers page over HTTP.
///
/// Listings are anchors carrying the `job-listing` class, with the
/// location in a `data-location` attribute:
/// `<a class="job-listing" href="/careers/x" data-location="Remote">Title</a>`
pub struct HttpJobSource {
    client: reqwest::Client,
    url: String,
}

impl HttpJobSource {
    pub fn new(url: impl Into<String>) -> Result<Self, ConciergeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConciergeError::Provider(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl JobSource for HttpJobSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobListing>, ConciergeError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ConciergeError::Provider(format!("careers page fetch: {}", e)))?;

        if !response.status().is_success() {
            return Err(ConciergeError::Provider(format!(
                "careers page returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ConciergeError::Provider(format!("careers page body: {}", e)))?;

        let jobs = parse_listings(&body, &self.url);
        debug!(url = %self.url, count = jobs.len(), "fetched job listings");
        Ok(jobs)
    }
}

/// Extract listings from careers page HTML. Unrecognized markup yields
/// an empty list rather than an error.
pub fn parse_listings(html: &str, base_url: &str) -> Vec<JobListing> {
    static ANCHOR_RE: OnceLock<Regex> = OnceLock::new();
    static HREF_RE: OnceLock<Regex> = OnceLock::new();
    static LOCATION_RE: OnceLock<Regex> = OnceLock::new();

    let anchor_re = ANCHOR_RE.get_or_init(|| {
        Regex::new(r#"<a\b([^>]*class="[^"]*job-listing[^"]*"[^>]*)>([^<]*)</a>"#).unwrap()
    });
    let href_re = HREF_RE.get_or_init(|| Regex::new(r#"href="([^"]*)""#).unwrap());
    let location_re =
        LOCATION_RE.get_or_init(|| Regex::new(r#"data-location="([^"]*)""#).unwrap());

    anchor_re
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = cap.get(1)?.as_str();
            let title = cap.get(2)?.as_str().trim();
            if title.is_empty() {
                return None;
            }
            let href = href_re.captures(attrs)?.get(1)?.as_str();
            let location = location_re
                .captures(attrs)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            Some(JobListing {
                title: title.to_string(),
                location,
                link: resolve_link(base_url, href),
            })
        })
        .collect()
}

/// Join a possibly relative href against the page URL's origin.
fn resolve_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let origin = base_url
        .find("://")
        .and_then(|scheme_end| {
            base_url[scheme_end + 3..]
                .find('/')
                .map(|path_start| &base_url[..scheme_end + 3 + path_start])
        })
        .unwrap_or(base_url.trim_end_matches('/'));
    format!("{}/{}", origin.trim_end_matches('/'), href.trim_start_matches('/'))
}

/// Fixed set of listings for tests, with optional failure injection.
pub struct MockJobSource {
    jobs: Vec<JobListing>,
    fail: bool,
}

impl MockJobSource {
    pub fn new(jobs: Vec<JobListing>) -> Self {
        Self { jobs, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            jobs: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl JobSource for MockJobSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobListing>, ConciergeError> {
        if self.fail {
            return Err(ConciergeError::Provider("simulated fetch failure".into()));
        }
        Ok(self.jobs.clone())
    }
}
