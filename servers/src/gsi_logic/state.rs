use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::warn;

use crate::gsi_logic::engine::ColorEngine;
use crate::gsi_logic::error::GsiError;
use crate::gsi_logic::model::{Cue, IssuedDecision, Snapshot};

struct Inner {
    engine: ColorEngine,
    issued: u64,
    last: Option<IssuedDecision>,
}

/// Shared between request handlers. Evaluation is serialized by one mutex;
/// the output task is handed the newest numbered decision.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<Inner>>,
    secret: Arc<str>,
    output: watch::Sender<Option<IssuedDecision>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionView {
    pub id: u64,
    pub cue: Cue,
    pub color: String,
    pub flash_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub ts: String,
    pub last_health: i64,
    pub last_kill_count: i64,
    pub decisions_issued: u64,
    pub last_decision: Option<DecisionView>,
}

impl AppState {
    pub fn new(
        engine: ColorEngine,
        secret: impl Into<Arc<str>>,
        output: watch::Sender<Option<IssuedDecision>>,
    ) -> Self {
        AppState {
            inner: Arc::new(Mutex::new(Inner {
                engine,
                issued: 0,
                last: None,
            })),
            secret: secret.into(),
            output,
        }
    }

    pub fn authorize(&self, credential: &str) -> Result<(), GsiError> {
        if credential != &*self.secret {
            return Err(GsiError::Unauthorized {
                token: credential.to_string(),
            });
        }
        Ok(())
    }

    /// Checks the credential, resolves the snapshot and hands the decision
    /// to the output task. A rejected credential touches nothing.
    pub async fn submit(
        &self,
        snapshot: &Snapshot,
        credential: &str,
    ) -> Result<IssuedDecision, GsiError> {
        self.authorize(credential)?;

        let mut inner = self.inner.lock().await;
        let decision = inner.engine.resolve(snapshot);
        inner.issued += 1;
        let issued = IssuedDecision {
            id: inner.issued,
            decision,
        };
        inner.last = Some(issued);

        // published under the lock so the channel never goes back to an older id
        if self.output.send(Some(issued)).is_err() {
            warn!(id = issued.id, "Lighting output is not running, decision dropped");
        }
        Ok(issued)
    }

    pub async fn status(&self) -> StatusResponse {
        let inner = self.inner.lock().await;
        let tracker = inner.engine.tracker();
        StatusResponse {
            ts: Utc::now().to_rfc3339(),
            last_health: tracker.last_health(),
            last_kill_count: tracker.last_kill_count(),
            decisions_issued: inner.issued,
            last_decision: inner.last.map(|issued| DecisionView {
                id: issued.id,
                cue: issued.decision.cue,
                color: issued.decision.color.to_string(),
                flash_seconds: issued.decision.flash.map(|d| d.as_secs_f64()),
            }),
        }
    }
}
