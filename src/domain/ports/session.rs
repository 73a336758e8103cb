//! Browser-like automation sessions.
//!
//! A [`BrowserSession`] is one open, exclusive automation context: it keeps
//! cookies between requests and presents a single identity to the target.
//! Workers obtain sessions from a [`SessionLauncher`] and own at most one
//! at a time.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SessionError(pub String);

/// Identity a session presents to the target surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: String,
    pub accept_language: String,
}

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.0.0",
];

const LANGUAGES: &[&str] = &["en-US,en;q=0.9", "en-GB,en;q=0.8", "en-US,en;q=0.8,de;q=0.5"];

impl Fingerprint {
    /// Pick a plausible desktop browser identity.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            user_agent: USER_AGENTS
                .choose(&mut rng)
                .copied()
                .unwrap_or(USER_AGENTS[0])
                .to_string(),
            accept_language: LANGUAGES
                .choose(&mut rng)
                .copied()
                .unwrap_or(LANGUAGES[0])
                .to_string(),
        }
    }
}

/// A page as the session saw it after redirects.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        serde_json::from_str(&self.body)
            .map_err(|e| SessionError(format!("unexpected payload from {}: {e}", self.url)))
    }
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn fingerprint(&self) -> &Fingerprint;

    async fn get(&self, url: &str) -> Result<PageResponse, SessionError>;

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<PageResponse, SessionError>;

    /// Release the underlying resource. Called exactly once by the owner.
    async fn close(&self) -> Result<(), SessionError>;
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, fingerprint: Fingerprint) -> Result<Box<dyn BrowserSession>, SessionError>;
}
