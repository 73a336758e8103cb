//! Concrete automation workers and the session slot they share.
//!
//! [`SessionSlot`] is the only place a worker's session lives. It
//! serializes lifecycle calls for one worker, bounds every unit of work
//! with a timeout, and releases the session on fatal failures so a
//! failed unit never leaks an open session.

mod cache;
pub mod market_scanner;
pub mod research;
pub mod social;

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

pub(crate) use cache::FallbackCache;

use crate::domain::error::WorkerError;
use crate::domain::ports::automation_worker::{StartOutcome, StopOutcome};
use crate::domain::ports::session::{BrowserSession, Fingerprint, SessionError, SessionLauncher};
use crate::domain::values::worker_id::WorkerId;

pub struct SessionSlot {
    worker: WorkerId,
    launcher: Arc<dyn SessionLauncher>,
    session: Mutex<Option<Box<dyn BrowserSession>>>,
    unit_timeout: Duration,
}

impl SessionSlot {
    pub fn new(worker: WorkerId, launcher: Arc<dyn SessionLauncher>, unit_timeout: Duration) -> Self {
        Self {
            worker,
            launcher,
            session: Mutex::new(None),
            unit_timeout,
        }
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Launch a session and navigate to `landing_url`. A session that
    /// cannot reach its landing page is closed again and the slot stays
    /// empty, so the caller may retry later.
    pub async fn open(&self, landing_url: &str) -> Result<StartOutcome, WorkerError> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            tracing::debug!(worker = %self.worker, "session already active");
            return Ok(StartOutcome::AlreadyActive);
        }

        let fingerprint = Fingerprint::random();
        let session = self
            .launcher
            .launch(fingerprint)
            .await
            .map_err(|e| self.unavailable(e))?;

        let reason = match session.get(landing_url).await {
            Ok(page) if page.is_success() => None,
            Ok(page) => Some(format!("{landing_url} returned {}", page.status)),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = reason {
            release(self.worker, session).await;
            tracing::warn!(worker = %self.worker, %reason, "could not open session");
            return Err(WorkerError::Unavailable {
                worker: self.worker,
                reason,
            });
        }

        tracing::info!(
            worker = %self.worker,
            user_agent = %session.fingerprint().user_agent,
            "session opened"
        );
        *slot = Some(session);
        Ok(StartOutcome::Started)
    }

    pub async fn close(&self) -> StopOutcome {
        let mut slot = self.session.lock().await;
        match slot.take() {
            Some(session) => {
                release(self.worker, session).await;
                tracing::info!(worker = %self.worker, "session closed");
                StopOutcome::Stopped
            }
            None => StopOutcome::AlreadyInactive,
        }
    }

    /// Run one unit of work against the open session.
    ///
    /// The slot stays locked for the duration, so a concurrent `close`
    /// waits for the unit (at most `unit_timeout`). Timeouts and fatal
    /// errors release the session before returning.
    pub async fn run<T, F>(&self, work: F) -> Result<T, WorkerError>
    where
        T: Send,
        F: for<'s> FnOnce(&'s dyn BrowserSession) -> BoxFuture<'s, Result<T, WorkerError>>,
    {
        let mut slot = self.session.lock().await;
        let result = match slot.as_deref() {
            None => return Err(WorkerError::NotStarted { worker: self.worker }),
            Some(session) => match tokio::time::timeout(self.unit_timeout, work(session)).await {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Timeout {
                    worker: self.worker,
                    seconds: self.unit_timeout.as_secs(),
                }),
            },
        };

        if let Err(e) = &result {
            if e.is_fatal() {
                if let Some(session) = slot.take() {
                    tracing::warn!(worker = %self.worker, error = %e, "releasing session after failure");
                    release(self.worker, session).await;
                }
            }
        }
        result
    }

    fn unavailable(&self, e: SessionError) -> WorkerError {
        WorkerError::Unavailable {
            worker: self.worker,
            reason: e.to_string(),
        }
    }
}

/// Close a session, logging instead of propagating release errors.
async fn release(worker: WorkerId, session: Box<dyn BrowserSession>) {
    if let Err(e) = session.close().await {
        tracing::warn!(%worker, error = %e, "session release reported an error");
    }
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Build a URL with one encoded query parameter.
pub(crate) fn endpoint_with_query(
    worker: WorkerId,
    base_url: &str,
    path: &str,
    key: &str,
    value: &str,
) -> Result<String, WorkerError> {
    reqwest::Url::parse_with_params(&endpoint(base_url, path), &[(key, value)])
        .map(|u| u.to_string())
        .map_err(|e| WorkerError::Failed {
            worker,
            reason: format!("invalid url {base_url}: {e}"),
        })
}

pub(crate) fn session_failure(worker: WorkerId, e: SessionError) -> WorkerError {
    WorkerError::Failed {
        worker,
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(endpoint("https://a.test/", "/login"), "https://a.test/login");
        assert_eq!(endpoint("https://a.test", "api/x"), "https://a.test/api/x");
    }

    #[test]
    fn test_endpoint_with_query_encodes() {
        let url = endpoint_with_query(WorkerId::Research, "https://r.test", "search", "q", "rust async")
            .unwrap();
        assert_eq!(url, "https://r.test/search?q=rust+async");
    }
}
