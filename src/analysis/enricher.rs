//! Off-tick root-cause enrichment
//!
//! Each incident is analysed on its own tokio task. Results come back over
//! an mpsc channel and are attached to alerts when the driver drains it.
//! A slow or failing LLM degrades to the rule-based text; a task that dies
//! before reporting simply leaves its alerts without analysis.

use ahash::AHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::alerts::ConflictEngine;
use crate::core::types::RobotId;

use super::client::RcaClient;
use super::context::IncidentContext;
use super::rca;

/// Default bound on a single LLM call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Drains a finished analysis survives while waiting for its alert
const PENDING_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisSource {
    Llm,
    RuleBased,
}

#[derive(Debug, Clone)]
pub struct Enrichment {
    pub robot_id: RobotId,
    pub text: String,
    pub source: AnalysisSource,
}

pub struct Enricher {
    client: Option<Arc<RcaClient>>,
    timeout: Duration,
    tx: mpsc::Sender<Enrichment>,
    rx: mpsc::Receiver<Enrichment>,
    /// Last incident analysed per robot, cleared when the robot recovers
    analyzed: AHashMap<RobotId, String>,
    /// Finished analyses whose alert has not been admitted yet
    pending: Vec<(Enrichment, u32)>,
}

impl Enricher {
    pub fn new(client: Option<RcaClient>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            client: client.map(Arc::new),
            timeout: DEFAULT_TIMEOUT,
            tx,
            rx,
            analyzed: AHashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn analysis for an incident unless it was already analysed
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, ctx: IncidentContext) -> bool {
        let key = ctx.incident_key();
        if self.analyzed.get(&ctx.robot_id) == Some(&key) {
            return false;
        }
        self.analyzed.insert(ctx.robot_id.clone(), key);
        let client = self.client.clone();
        let timeout = self.timeout;
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let enrichment = analyse(client.as_deref(), &ctx, timeout).await;
            if tx.send(enrichment).await.is_err() {
                tracing::debug!("Enrichment receiver dropped for {}", ctx.robot_id);
            }
        });
        true
    }

    /// Attach every finished analysis to matching alerts
    ///
    /// Returns how many alerts received text.
    pub fn drain(&mut self, engine: &mut ConflictEngine) -> usize {
        while let Ok(done) = self.rx.try_recv() {
            self.pending.push((done, 0));
        }

        let mut attached = 0;
        let mut still_pending = Vec::new();
        for (enrichment, attempts) in self.pending.drain(..) {
            let n = engine.attach_analysis(&enrichment.robot_id, &enrichment.text);
            if n > 0 {
                tracing::info!(
                    "Attached {:?} analysis for {} to {} alert(s)",
                    enrichment.source,
                    enrichment.robot_id,
                    n
                );
                attached += n;
            } else if attempts + 1 < PENDING_ATTEMPTS {
                still_pending.push((enrichment, attempts + 1));
            } else {
                tracing::debug!("No alert for {} analysis, discarding", enrichment.robot_id);
            }
        }
        self.pending = still_pending;
        attached
    }

    /// Drop the dedup entry for a robot that left the error state
    pub fn forget(&mut self, robot_id: &RobotId) {
        self.analyzed.remove(robot_id);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn analyzed_len(&self) -> usize {
        self.analyzed.len()
    }
}

async fn analyse(
    client: Option<&RcaClient>,
    ctx: &IncidentContext,
    timeout: Duration,
) -> Enrichment {
    let Some(client) = client else {
        return fallback(ctx);
    };

    match tokio::time::timeout(timeout, client.analyse(ctx)).await {
        Ok(Ok(text)) => Enrichment {
            robot_id: ctx.robot_id.clone(),
            text,
            source: AnalysisSource::Llm,
        },
        Ok(Err(e)) => {
            tracing::warn!("LLM analysis failed for {}: {}", ctx.robot_id, e);
            fallback(ctx)
        }
        Err(_) => {
            tracing::warn!("LLM analysis for {} timed out after {:?}", ctx.robot_id, timeout);
            fallback(ctx)
        }
    }
}

fn fallback(ctx: &IncidentContext) -> Enrichment {
    Enrichment {
        robot_id: ctx.robot_id.clone(),
        text: rca::rule_based(ctx),
        source: AnalysisSource::RuleBased,
    }
}
