use super::{endpoint, endpoint_with_query, session_failure, FallbackCache, SessionSlot};
use crate::domain::entities::product::Product;
use crate::domain::error::WorkerError;
use crate::domain::ports::automation_worker::{
    AutomationWorker, Candidate, ScanOutcome, StartOutcome, StopOutcome, UnitOutput, UnitReport,
    WorkRequest,
};
use crate::domain::ports::product_ledger::ProductLedger;
use crate::domain::ports::session::{BrowserSession, SessionLauncher};
use crate::domain::values::worker_id::WorkerId;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const WORKER: WorkerId = WorkerId::MarketScanner;
/// Synthetic candidates produced when the live surface and cache are both empty.
const SYNTHETIC_CANDIDATES: usize = 3;
const MAX_CACHED_NICHES: usize = 32;

/// Discovers candidate products on the course marketplace and records new
/// ones in the ledger.
pub struct MarketScanner {
    slot: SessionSlot,
    ctx: Arc<ScanContext>,
}

struct ScanContext {
    base_url: String,
    ledger: Arc<dyn ProductLedger>,
    /// Last non-empty listing per niche.
    cache: FallbackCache<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    results: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    id: ListingId,
    title: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingId::Number(n) => write!(f, "{n}"),
            ListingId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl MarketScanner {
    pub fn new(
        base_url: String,
        ledger: Arc<dyn ProductLedger>,
        launcher: Arc<dyn SessionLauncher>,
        unit_timeout: Duration,
    ) -> Self {
        Self {
            slot: SessionSlot::new(WORKER, launcher, unit_timeout),
            ctx: Arc::new(ScanContext {
                base_url,
                ledger,
                cache: FallbackCache::new(MAX_CACHED_NICHES),
            }),
        }
    }

    pub async fn scan(&self, niche: String) -> Result<ScanOutcome, WorkerError> {
        let ctx = Arc::clone(&self.ctx);
        self.slot
            .run(move |session| Box::pin(scan_niche(session, ctx, niche)))
            .await
    }
}

async fn scan_niche(
    session: &dyn BrowserSession,
    ctx: Arc<ScanContext>,
    niche: String,
) -> Result<ScanOutcome, WorkerError> {
    let url = endpoint_with_query(WORKER, &ctx.base_url, "api/courses", "search", &niche)?;
    let page = session.get(&url).await.map_err(|e| session_failure(WORKER, e))?;
    if !page.is_success() {
        return Err(WorkerError::Failed {
            worker: WORKER,
            reason: format!("listing returned {}", page.status),
        });
    }
    let listing: ListingResponse = page.json().map_err(|e| session_failure(WORKER, e))?;

    let live: Vec<Candidate> = listing
        .results
        .into_iter()
        .map(|l| Candidate {
            id: l.id.to_string(),
            name: l.title,
            niche: niche.clone(),
            url: l.url,
        })
        .collect();

    let (candidates, used_fallback, persist) = if !live.is_empty() {
        ctx.cache.put(&niche, live.clone());
        (live, false, true)
    } else {
        match ctx.cache.get(&niche) {
            Some(cached) => {
                tracing::warn!(worker = %WORKER, %niche, "empty listing, using cached candidates");
                (cached, true, true)
            }
            None => {
                tracing::warn!(worker = %WORKER, %niche, "empty listing, using synthetic candidates");
                (synthetic_candidates(&niche), true, false)
            }
        }
    };

    let mut new_products = Vec::new();
    if persist {
        for candidate in &candidates {
            let product = Product::discovered(
                candidate.id.clone(),
                candidate.name.clone(),
                candidate.niche.clone(),
                candidate.url.clone(),
            );
            let inserted = ctx
                .ledger
                .insert_if_new(&product)
                .await
                .map_err(|e| WorkerError::Failed {
                    worker: WORKER,
                    reason: format!("ledger write failed: {e}"),
                })?;
            if inserted {
                new_products.push(candidate.id.clone());
            }
        }
    }

    tracing::info!(
        worker = %WORKER,
        %niche,
        candidates = candidates.len(),
        new = new_products.len(),
        used_fallback,
        "scan finished"
    );

    Ok(ScanOutcome {
        niche,
        candidates,
        new_products,
        used_fallback,
    })
}

/// Placeholder candidates that keep the pipeline moving. Never persisted.
fn synthetic_candidates(niche: &str) -> Vec<Candidate> {
    let slug = niche.to_lowercase().replace(' ', "-");
    (1..=SYNTHETIC_CANDIDATES)
        .map(|i| Candidate {
            id: format!("synthetic-{slug}-{i}"),
            name: format!("{niche} starter course #{i}"),
            niche: niche.to_string(),
            url: None,
        })
        .collect()
}

#[async_trait]
impl AutomationWorker for MarketScanner {
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
            WorkRequest::Scan { niche } => Ok(UnitReport {
                worker: WORKER,
                output: UnitOutput::Scan(self.scan(niche).await?),
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
