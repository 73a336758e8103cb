//! Shared test helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use productpilot::config::PilotConfig;
use productpilot::domain::entities::product::Product;
use productpilot::domain::error::DomainError;
use productpilot::domain::ports::notification_sink::{Notification, NotificationSink};
use productpilot::domain::ports::session::{
    BrowserSession, Fingerprint, PageResponse, SessionError, SessionLauncher,
};
use productpilot::domain::ports::strategy_advisor::{StrategyAdvisor, StrategyPlan};
use productpilot::infrastructure::strategy::noop::NoopAdvisor;
use productpilot::ProductPilot;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MARKET_URL: &str = "http://market.test";
pub const SOCIAL_URL: &str = "http://social.test";
pub const RESEARCH_URL: &str = "http://research.test";

pub const LISTING_TWO_COURSES: &str =
    r#"{"results":[{"id":101,"title":"Rust for Beginners"},{"id":"202","title":"Async Rust","url":"http://market.test/c/202"}]}"#;
pub const SEARCH_RESULTS: &str =
    r#"{"results":[{"title":"Why Rust","url":"http://research.test/a","snippet":"memory safety"}]}"#;

struct Route {
    method: Option<&'static str>,
    pattern: String,
    status: u16,
    final_url: Option<String>,
    body: String,
    delay: Option<Duration>,
}

#[derive(Default)]
struct FakeState {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<String>>,
    launched: AtomicUsize,
    closed: AtomicUsize,
    fail_launch: AtomicBool,
}

impl FakeState {
    async fn respond(&self, method: &'static str, url: &str) -> PageResponse {
        self.requests.lock().unwrap().push(format!("{method} {url}"));
        let hit = {
            let routes = self.routes.lock().unwrap();
            routes
                .iter()
                .rev()
                .find(|r| r.method.map_or(true, |m| m == method) && url.contains(&r.pattern))
                .map(|r| (r.status, r.final_url.clone(), r.body.clone(), r.delay))
        };
        match hit {
            Some((status, final_url, body, delay)) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                PageResponse {
                    status,
                    url: final_url.unwrap_or_else(|| url.to_string()),
                    body,
                }
            }
            None => PageResponse {
                status: 200,
                url: url.to_string(),
                body: "{}".to_string(),
            },
        }
    }
}

/// Scripted stand-in for a browser. Unrouted URLs answer 200 with `{}`.
/// The most recently added matching route wins.
#[derive(Default)]
pub struct FakeLauncher {
    state: Arc<FakeState>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Marketplace with two courses and a research surface with one hit.
    pub fn marketplace() -> Arc<Self> {
        let launcher = Self::new();
        launcher.route("market.test/api/courses", 200, LISTING_TWO_COURSES);
        launcher.route("research.test/search", 200, SEARCH_RESULTS);
        launcher
    }

    pub fn route(&self, pattern: &str, status: u16, body: &str) {
        self.push(None, pattern, status, None, body, None);
    }

    pub fn route_post(&self, pattern: &str, status: u16, final_url: &str, body: &str) {
        self.push(Some("POST"), pattern, status, Some(final_url.to_string()), body, None);
    }

    pub fn route_slow(&self, pattern: &str, delay: Duration) {
        self.push(None, pattern, 200, None, "{}", Some(delay));
    }

    fn push(
        &self,
        method: Option<&'static str>,
        pattern: &str,
        status: u16,
        final_url: Option<String>,
        body: &str,
        delay: Option<Duration>,
    ) {
        self.state.routes.lock().unwrap().push(Route {
            method,
            pattern: pattern.to_string(),
            status,
            final_url,
            body: body.to_string(),
            delay,
        });
    }

    pub fn fail_launches(&self, fail: bool) {
        self.state.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn launched(&self) -> usize {
        self.state.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.launched() - self.closed()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Position of the first request containing `needle`.
    pub fn first_request(&self, needle: &str) -> Option<usize> {
        self.requests().iter().position(|r| r.contains(needle))
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, fingerprint: Fingerprint) -> Result<Box<dyn BrowserSession>, SessionError> {
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(SessionError("browser binary not found".into()));
        }
        self.state.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            fingerprint,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    fingerprint: Fingerprint,
    state: Arc<FakeState>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    async fn get(&self, url: &str) -> Result<PageResponse, SessionError> {
        Ok(self.state.respond("GET", url).await)
    }

    async fn post_form(&self, url: &str, _form: &[(String, String)]) -> Result<PageResponse, SessionError> {
        Ok(self.state.respond("POST", url).await)
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Notification sink that keeps everything it is handed.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    pub fn events(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.event.clone())
            .collect()
    }

    pub fn last(&self, event: &str) -> Option<Notification> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|n| n.event == event)
            .cloned()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DomainError> {
        self.delivered.lock().unwrap().push(notification.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Notification("sink offline".into()));
        }
        Ok(())
    }
}

/// Advisor that refuses every product.
pub struct FailingAdvisor;

#[async_trait]
impl StrategyAdvisor for FailingAdvisor {
    fn name(&self) -> &str {
        "failing"
    }

    async fn advise(&self, product: &Product) -> Result<StrategyPlan, DomainError> {
        Err(DomainError::Strategy(format!("model unavailable for {}", product.id)))
    }
}

pub struct Harness {
    pub pilot: ProductPilot,
    pub launcher: Arc<FakeLauncher>,
    pub sink: Arc<RecordingSink>,
}

pub fn test_config() -> PilotConfig {
    let mut config = PilotConfig {
        db_path: ":memory:".to_string(),
        market_url: MARKET_URL.to_string(),
        social_url: SOCIAL_URL.to_string(),
        research_url: RESEARCH_URL.to_string(),
        social_username: Some("pilot".to_string()),
        social_password: Some("hunter2".to_string()),
        unit_timeout: Duration::from_secs(2),
        ..PilotConfig::default()
    };
    config.routine.niche = "programming".to_string();
    config
}

pub fn setup() -> Harness {
    setup_with(|_| {})
}

pub fn setup_with(adjust: impl FnOnce(&mut PilotConfig)) -> Harness {
    setup_full(adjust, Arc::new(NoopAdvisor), RecordingSink::new())
}

pub fn setup_full(
    adjust: impl FnOnce(&mut PilotConfig),
    advisor: Arc<dyn StrategyAdvisor>,
    sink: Arc<RecordingSink>,
) -> Harness {
    let mut config = test_config();
    adjust(&mut config);
    let launcher = FakeLauncher::marketplace();
    let pilot = ProductPilot::with_providers(&config, launcher.clone(), sink.clone(), advisor).unwrap();
    Harness {
        pilot,
        launcher,
        sink,
    }
}
