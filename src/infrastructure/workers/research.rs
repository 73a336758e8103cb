use super::{endpoint, endpoint_with_query, session_failure, FallbackCache, SessionSlot};
use crate::domain::error::WorkerError;
use crate::domain::ports::automation_worker::{
    AutomationWorker, Finding, ResearchOutcome, StartOutcome, StopOutcome, UnitOutput, UnitReport,
    WorkRequest,
};
use crate::domain::ports::session::{BrowserSession, SessionLauncher};
use crate::domain::values::worker_id::WorkerId;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const WORKER: WorkerId = WorkerId::Research;
const MAX_FINDINGS: usize = 10;
const MAX_CACHED_TOPICS: usize = 64;

/// Pulls reference material for a topic from a knowledge source. One open
/// session serves every topic until the worker is stopped.
pub struct ResearchWorker {
    slot: SessionSlot,
    ctx: Arc<ResearchContext>,
}

struct ResearchContext {
    base_url: String,
    cache: FallbackCache<Vec<Finding>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    snippet: String,
}

impl ResearchWorker {
    pub fn new(base_url: String, launcher: Arc<dyn SessionLauncher>, unit_timeout: Duration) -> Self {
        Self {
            slot: SessionSlot::new(WORKER, launcher, unit_timeout),
            ctx: Arc::new(ResearchContext {
                base_url,
                cache: FallbackCache::new(MAX_CACHED_TOPICS),
            }),
        }
    }

    pub async fn research(&self, topic: String) -> Result<ResearchOutcome, WorkerError> {
        let ctx = Arc::clone(&self.ctx);
        self.slot
            .run(move |session| Box::pin(search_topic(session, ctx, topic)))
            .await
    }
}

async fn search_topic(
    session: &dyn BrowserSession,
    ctx: Arc<ResearchContext>,
    topic: String,
) -> Result<ResearchOutcome, WorkerError> {
    let url = endpoint_with_query(WORKER, &ctx.base_url, "search", "q", &topic)?;
    let page = session.get(&url).await.map_err(|e| session_failure(WORKER, e))?;
    if !page.is_success() {
        return Err(WorkerError::Failed {
            worker: WORKER,
            reason: format!("search returned {}", page.status),
        });
    }
    let response: SearchResponse = page.json().map_err(|e| session_failure(WORKER, e))?;

    let live: Vec<Finding> = response
        .results
        .into_iter()
        .take(MAX_FINDINGS)
        .map(|hit| Finding {
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
        })
        .collect();

    if !live.is_empty() {
        ctx.cache.put(&topic, live.clone());
        tracing::info!(worker = %WORKER, %topic, findings = live.len(), "research finished");
        return Ok(ResearchOutcome {
            topic,
            findings: live,
            used_fallback: false,
        });
    }

    let findings = ctx.cache.get(&topic).unwrap_or_else(|| synthetic_findings(&topic));
    tracing::warn!(worker = %WORKER, %topic, "no live results, using fallback findings");
    Ok(ResearchOutcome {
        topic,
        findings,
        used_fallback: true,
    })
}

fn synthetic_findings(topic: &str) -> Vec<Finding> {
    vec![Finding {
        title: format!("{topic}: overview"),
        url: None,
        snippet: format!("No live material found for '{topic}'. Revisit on the next run."),
    }]
}

#[async_trait]
impl AutomationWorker for ResearchWorker {
    fn id(&self) -> WorkerId {
        WORKER
    }

    async fn is_active(&self) -> bool {
        self.slot.is_active().await
    }

    async fn start(&self) -> Result<StartOutcome, WorkerError> {
        self.slot.open(&endpoint(&self.ctx.base_url, "/")).await
    }

    async fn run_unit(&self, request: WorkRequest) -> Result<UnitReport, WorkerError> {
        match request {
            WorkRequest::Research { topic } => Ok(UnitReport {
                worker: WORKER,
                output: UnitOutput::Research(self.research(topic).await?),
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
