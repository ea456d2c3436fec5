//! Event loop wiring the engine to its host feeds
//!
//! One task serially delivers identity changes, tree changes, playback
//! signals and the periodic reconciliation tick, so no two engine operations
//! interleave. Cancellation shuts the engine down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{AudioSwapEngine, PlaybackEventStream};
use crate::identity::ContentIdentity;

/// Host-facing inputs of the driver loop
pub struct DriverInputs {
    pub playback: PlaybackEventStream,
    /// Published by an `IdentityPoller` or any other identity watcher
    pub identity: watch::Receiver<Option<ContentIdentity>>,
    /// One message per observed tree mutation batch
    pub tree_changes: mpsc::UnboundedReceiver<()>,
}

pub struct EngineDriver {
    engine: Arc<AudioSwapEngine>,
    reconcile_interval: Duration,
}

impl EngineDriver {
    pub fn new(engine: Arc<AudioSwapEngine>, reconcile_interval: Duration) -> Self {
        Self {
            engine,
            reconcile_interval,
        }
    }

    /// Run until `cancel` fires
    pub async fn run(self, inputs: DriverInputs, cancel: CancellationToken) {
        let DriverInputs {
            mut playback,
            mut identity,
            mut tree_changes,
        } = inputs;

        let mut ticker = tokio::time::interval(self.reconcile_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut identity_open = true;
        let mut tree_open = true;

        // An identity published before the driver started still needs loading
        let initial = identity.borrow_and_update().clone();
        if let Some(initial) = initial {
            self.reload(initial).await;
        }

        info!("Engine driver started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                changed = identity.changed(), if identity_open => {
                    if changed.is_err() {
                        debug!("Identity feed closed");
                        identity_open = false;
                        continue;
                    }
                    let next = identity.borrow_and_update().clone();
                    if let Some(next) = next {
                        self.reload(next).await;
                    }
                }

                change = tree_changes.recv(), if tree_open => {
                    match change {
                        Some(()) => {
                            self.engine.on_tree_changed();
                        }
                        None => {
                            debug!("Tree change feed closed");
                            tree_open = false;
                        }
                    }
                }

                signal = playback.recv() => {
                    match signal {
                        Some(signal) => {
                            self.engine.handle_playback_event(signal);
                        }
                        None => break,
                    }
                }

                _ = ticker.tick() => {
                    self.engine.periodic_reconcile();
                }
            }
        }

        self.engine.shutdown();
        info!("Engine driver stopped");
    }

    async fn reload(&self, identity: ContentIdentity) {
        if let Err(e) = self.engine.reload_for_identity(identity.clone()).await {
            warn!(identity = %identity, "Failed to restore selection: {}", e);
        }
    }
}
