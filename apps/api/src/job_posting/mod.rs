// src/job_posting/mod.rs
//! Job-posting fetch — pulls the description text out of a LinkedIn job page.
//!
//! The returned text is treated exactly like a pasted job description.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{redirect, Client, Url};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{info, warn};

pub mod handlers;

const MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Tried in order; LinkedIn renames these classes from time to time.
const DESCRIPTION_SELECTORS: &[&str] = &[
    "div.description__text",
    "section.show-more-less-html",
    ".show-more-less-html__markup",
    ".jobs-description__container",
    ".jobs-box__html-content",
];

#[derive(Debug, Error)]
pub enum JobPostingError {
    #[error("not a LinkedIn job URL: {0}")]
    InvalidUrl(String),

    #[error("failed to fetch job posting: {0}")]
    Fetch(String),

    #[error("job description not found on the page; paste it manually instead")]
    NotFound,
}

pub struct JobPostingFetcher {
    client: Client,
}

impl JobPostingFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(linkedin_only_redirects())
            .build()
            .context("Failed to create HTTP client for job postings")?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<String, JobPostingError> {
        let url = validate_job_url(url)?;
        info!("Fetching job post: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| JobPostingError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JobPostingError::Fetch(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| JobPostingError::Fetch(e.to_string()))?;

        match extract_description(&html) {
            Some(text) => {
                info!("Extracted job description ({} chars)", text.len());
                Ok(text)
            }
            None => {
                warn!("No job description container matched; page structure may have changed");
                Err(JobPostingError::NotFound)
            }
        }
    }
}

/// Accepts only `https?://*.linkedin.com/jobs/view/...` URLs.
pub fn validate_job_url(raw: &str) -> Result<Url, JobPostingError> {
    let invalid = || JobPostingError::InvalidUrl(raw.to_string());
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;

    if is_linkedin_url(&url) && url.path().starts_with("/jobs/view/") {
        Ok(url)
    } else {
        Err(invalid())
    }
}

/// http(s) on `linkedin.com` or one of its subdomains.
fn is_linkedin_url(url: &Url) -> bool {
    let host_ok = url
        .host_str()
        .map(|h| h == "linkedin.com" || h.ends_with(".linkedin.com"))
        .unwrap_or(false);
    host_ok && matches!(url.scheme(), "http" | "https")
}

/// Follows redirects only while they stay on LinkedIn. A redirect elsewhere
/// is not followed, so the fetch fails on the 3xx status.
fn linkedin_only_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if is_linkedin_url(attempt.url()) {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// Finds the first matching description container and returns its text
/// nodes, trimmed and joined by newlines.
pub fn extract_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    DESCRIPTION_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            let element = document.select(&selector).next()?;
            let text = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            (!text.is_empty()).then_some(text)
        })
}
