//! Client configuration.
//!
//! Resolved once when the client is built. `from_env` honors
//! `STUDY_API_BASE_URL` and `STUDY_API_TIMEOUT_MS`; anything unset or
//! unparseable keeps its default.

use std::time::Duration;

use crate::upload::UploadCategory;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const BASE_URL_ENV: &str = "STUDY_API_BASE_URL";
pub const TIMEOUT_ENV: &str = "STUDY_API_TIMEOUT_MS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const VIDEO_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const DOCUMENT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    /// Applies to every call without an explicit or category timeout.
    pub timeout: Duration,
    pub video_upload_timeout: Duration,
    pub document_upload_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            video_upload_timeout: VIDEO_UPLOAD_TIMEOUT,
            document_upload_timeout: DOCUMENT_UPLOAD_TIMEOUT,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            Some(url) => Self::new(url.trim()),
            None => Self::default(),
        };
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.timeout = Duration::from_millis(ms),
                _ => tracing::warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout for an upload of the given category. Images and covers use the
    /// ordinary timeout.
    pub fn upload_timeout(&self, category: UploadCategory) -> Duration {
        match category {
            UploadCategory::Video => self.video_upload_timeout,
            UploadCategory::Document => self.document_upload_timeout,
            UploadCategory::Image | UploadCategory::Cover => self.timeout,
        }
    }
}
