use super::{endpoint, session_failure, SessionSlot};
use crate::domain::error::WorkerError;
use crate::domain::ports::automation_worker::{
    AutomationWorker, LoginOutcome, StartOutcome, StopOutcome, UnitOutput, UnitReport, WorkRequest,
};
use crate::domain::ports::session::{BrowserSession, PageResponse, SessionLauncher};
use crate::domain::values::worker_id::WorkerId;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const WORKER: WorkerId = WorkerId::Social;

/// Markers of an interactive verification screen in the final URL or body.
const CHALLENGE_MARKERS: &[&str] = &["checkpoint", "challenge", "two_factor", "captcha", "verify"];

#[derive(Debug, Clone)]
pub struct SocialCredentials {
    pub username: String,
    pub password: String,
}

/// Keeps an authenticated session open against the social platform.
pub struct SocialWorker {
    slot: SessionSlot,
    ctx: Arc<SocialContext>,
}

struct SocialContext {
    base_url: String,
    credentials: Option<SocialCredentials>,
}

/// How the platform answered a login attempt.
#[derive(Debug, PartialEq, Eq)]
enum LoginVerdict {
    Authenticated,
    Challenge(String),
    Rejected(String),
    Broken(String),
}

fn classify_login(page: &PageResponse) -> LoginVerdict {
    let url = page.url.to_lowercase();
    if let Some(marker) = CHALLENGE_MARKERS.iter().find(|m| url.contains(*m)) {
        return LoginVerdict::Challenge(format!("redirected to a {marker} screen"));
    }
    let body = page.body.to_lowercase();
    if let Some(marker) = CHALLENGE_MARKERS.iter().find(|m| body.contains(*m)) {
        return LoginVerdict::Challenge(format!("page asks for {marker}"));
    }

    match page.status {
        401 | 403 => LoginVerdict::Rejected(format!("login refused with {}", page.status)),
        s if (200..300).contains(&s) => {
            if url.contains("/login") {
                LoginVerdict::Rejected("credentials not accepted".to_string())
            } else {
                LoginVerdict::Authenticated
            }
        }
        s => LoginVerdict::Broken(format!("login returned {s}")),
    }
}

impl SocialWorker {
    pub fn new(
        base_url: String,
        credentials: Option<SocialCredentials>,
        launcher: Arc<dyn SessionLauncher>,
        unit_timeout: Duration,
    ) -> Self {
        Self {
            slot: SessionSlot::new(WORKER, launcher, unit_timeout),
            ctx: Arc::new(SocialContext {
                base_url,
                credentials,
            }),
        }
    }

    pub async fn authenticate(&self) -> Result<LoginOutcome, WorkerError> {
        let ctx = Arc::clone(&self.ctx);
        self.slot
            .run(move |session| Box::pin(log_in(session, ctx)))
            .await
    }
}

async fn log_in(session: &dyn BrowserSession, ctx: Arc<SocialContext>) -> Result<LoginOutcome, WorkerError> {
    let creds = ctx.credentials.as_ref().ok_or_else(|| WorkerError::Rejected {
        worker: WORKER,
        reason: "no credentials configured".to_string(),
    })?;

    let form = vec![
        ("username".to_string(), creds.username.clone()),
        ("password".to_string(), creds.password.clone()),
    ];
    let page = session
        .post_form(&endpoint(&ctx.base_url, "login"), &form)
        .await
        .map_err(|e| session_failure(WORKER, e))?;

    match classify_login(&page) {
        LoginVerdict::Authenticated => {
            tracing::info!(worker = %WORKER, account = %creds.username, "authenticated");
            Ok(LoginOutcome {
                account: creds.username.clone(),
                landing_url: page.url,
            })
        }
        LoginVerdict::Challenge(reason) => {
            tracing::warn!(worker = %WORKER, %reason, "login stopped at verification screen");
            Err(WorkerError::NeedsIntervention {
                worker: WORKER,
                reason,
            })
        }
        LoginVerdict::Rejected(reason) => Err(WorkerError::Rejected {
            worker: WORKER,
            reason,
        }),
        LoginVerdict::Broken(reason) => Err(WorkerError::Failed {
            worker: WORKER,
            reason,
        }),
    }
}

#[async_trait]
impl AutomationWorker for SocialWorker {
    fn id(&self) -> WorkerId {
        WORKER
    }

    async fn is_active(&self) -> bool {
        self.slot.is_active().await
    }

    async fn start(&self) -> Result<StartOutcome, WorkerError> {
        self.slot.open(&endpoint(&self.ctx.base_url, "login")).await
    }

    async fn run_unit(&self, request: WorkRequest) -> Result<UnitReport, WorkerError> {
        match request {
            WorkRequest::Authenticate => Ok(UnitReport {
                worker: WORKER,
                output: UnitOutput::Login(self.authenticate().await?),
            }),
            other => Err(WorkerError::UnsupportedRequest {
                worker: WORKER,
                request: other.label().to_string(),
            }),
        }
    }

    async fn stop(&self) -> StopOutcome {
        self.slot.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: u16, url: &str, body: &str) -> PageResponse {
        PageResponse {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    #[test]
    fn test_classify_success_redirect() {
        let verdict = classify_login(&page(200, "https://social.test/feed", "<html>feed</html>"));
        assert_eq!(verdict, LoginVerdict::Authenticated);
    }

    #[test]
    fn test_classify_checkpoint_redirect() {
        let verdict = classify_login(&page(200, "https://social.test/checkpoint/123", ""));
        assert!(matches!(verdict, LoginVerdict::Challenge(_)));
    }

    #[test]
    fn test_classify_captcha_in_body() {
        let verdict = classify_login(&page(200, "https://social.test/home", "Please solve the CAPTCHA"));
        assert!(matches!(verdict, LoginVerdict::Challenge(_)));
    }

    #[test]
    fn test_classify_still_on_login_page() {
        let verdict = classify_login(&page(200, "https://social.test/login", "wrong password"));
        assert!(matches!(verdict, LoginVerdict::Rejected(_)));
    }

    #[test]
    fn test_classify_forbidden_and_server_error() {
        assert!(matches!(
            classify_login(&page(403, "https://social.test/session", "")),
            LoginVerdict::Rejected(_)
        ));
        assert!(matches!(
            classify_login(&page(502, "https://social.test/session", "")),
            LoginVerdict::Broken(_)
        ));
    }
}
