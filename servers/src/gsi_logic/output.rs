//! Device-output task: applies decisions to the lighting driver and owns the
//! single pending revert-to-idle.
//!
//! Decisions arrive through a `watch` channel, so a slow driver only ever
//! sees the newest one; anything issued while a write was in flight is
//! coalesced away.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, trace};

use crate::gsi_logic::error::GsiError;
use crate::gsi_logic::model::{IssuedDecision, Rgb};

/// "Set every controllable device to one color."
#[async_trait]
pub trait LightingDriver: Send {
    async fn set_all(&mut self, color: Rgb) -> Result<(), GsiError>;

    fn device_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy)]
struct PendingRevert {
    id: u64,
    deadline: Instant,
}

async fn revert_due(pending: Option<&PendingRevert>) {
    match pending {
        Some(p) => sleep_until(p.deadline).await,
        None => std::future::pending().await,
    }
}

async fn apply<D: LightingDriver>(driver: &mut D, color: Rgb, shown: &mut Option<Rgb>) {
    match driver.set_all(color).await {
        Ok(()) => {
            *shown = Some(color);
        }
        Err(e) => {
            *shown = None;
            error!(error = %e, color = %color, "Failed to update lighting devices");
        }
    }
}

/// Runs until the shutdown signal fires or the sender is gone, then puts
/// the devices back to `idle`.
pub async fn run<D: LightingDriver>(
    mut driver: D,
    idle: Rgb,
    mut decisions: watch::Receiver<Option<IssuedDecision>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut shown: Option<Rgb> = None;
    let mut pending: Option<PendingRevert> = None;
    let mut last_id = 0u64;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Lighting output received shutdown signal");
                break;
            }
            changed = decisions.changed() => {
                if changed.is_err() {
                    info!("Decision channel closed");
                    break;
                }
                let Some(issued) = *decisions.borrow_and_update() else {
                    continue;
                };
                if issued.id <= last_id {
                    continue;
                }
                if issued.id > last_id + 1 {
                    debug!(skipped = issued.id - last_id - 1, id = issued.id, "Coalesced stale decisions");
                }
                last_id = issued.id;

                if let Some(p) = pending.take() {
                    debug!(cancelled = p.id, by = issued.id, "Pending revert superseded");
                }

                let decision = issued.decision;
                if decision.flash.is_none() && shown == Some(decision.color) {
                    trace!(id = issued.id, color = %decision.color, "Color already shown");
                    continue;
                }

                debug!(id = issued.id, cue = ?decision.cue, color = %decision.color, "Applying decision");
                apply(&mut driver, decision.color, &mut shown).await;
                if let Some(hold) = decision.flash {
                    pending = Some(PendingRevert {
                        id: issued.id,
                        deadline: Instant::now() + hold,
                    });
                }
            }
            _ = revert_due(pending.as_ref()) => {
                if let Some(p) = pending.take() {
                    debug!(id = p.id, color = %idle, "Flash over, reverting to idle");
                    apply(&mut driver, idle, &mut shown).await;
                }
            }
        }
    }

    info!(color = %idle, "Restoring idle color");
    apply(&mut driver, idle, &mut shown).await;
}
