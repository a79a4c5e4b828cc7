//! Error handling for the application

use thiserror::Error;

/// Aggregator (opportunity feed) errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Aggregator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Aggregator returned status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Invalid aggregator response: {0}")]
    Schema(String),
}

/// Provider-level APR errors
#[derive(Error, Debug)]
pub enum AprError {
    #[error("APR source request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("APR source returned status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Invalid APR source response: {0}")]
    Schema(String),

    #[error("APR source not configured: {0}")]
    NotConfigured(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),
}

/// Per-address scrape errors
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {secs}s while {step}")]
    Timeout { step: &'static str, secs: u64 },

    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    #[error("Page probe failed: {0}")]
    Probe(String),

    #[error("Cannot parse APR text {0:?}")]
    Parse(String),

    #[error("Browser shutdown failed: {0}")]
    Shutdown(String),
}
