use crate::domain::ports::session::{
    BrowserSession, Fingerprint, PageResponse, SessionError, SessionLauncher,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;

/// Launches cookie-holding HTTP sessions that present a browser identity.
pub struct HttpSessionLauncher {
    request_timeout: Duration,
}

impl HttpSessionLauncher {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for HttpSessionLauncher {
    fn default() -> Self {
        Self::new(Duration::from_secs(20))
    }
}

#[async_trait]
impl SessionLauncher for HttpSessionLauncher {
    async fn launch(&self, fingerprint: Fingerprint) -> Result<Box<dyn BrowserSession>, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&fingerprint.accept_language)
                .map_err(|e| SessionError(format!("invalid accept-language: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .user_agent(fingerprint.user_agent.clone())
            .default_headers(headers)
            .cookie_store(true)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| SessionError(format!("failed to open session: {e}")))?;

        Ok(Box::new(HttpSession {
            client,
            fingerprint,
        }))
    }
}

pub struct HttpSession {
    client: reqwest::Client,
    fingerprint: Fingerprint,
}

impl HttpSession {
    async fn into_page(resp: reqwest::Response) -> Result<PageResponse, SessionError> {
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| SessionError(format!("failed to read {url}: {e}")))?;
        Ok(PageResponse { status, url, body })
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    async fn get(&self, url: &str) -> Result<PageResponse, SessionError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SessionError(format!("GET {url} failed: {e}")))?;
        Self::into_page(resp).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<PageResponse, SessionError> {
        let resp = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| SessionError(format!("POST {url} failed: {e}")))?;
        Self::into_page(resp).await
    }

    async fn close(&self) -> Result<(), SessionError> {
        // Connections and cookies go away with the client.
        Ok(())
    }
}
