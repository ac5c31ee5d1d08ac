// ── Reconnect monitor ──
//
// A standalone service that restarts forgets every group and watch. The
// only symptom the reader sees is a pass where no fetch succeeds. The
// monitor answers that by reconciling both groups again and, when either
// had to be recreated, re-establishing the watch. Failures are logged and
// swallowed; the next failed pass retries the whole procedure.

use gpuwatch_api::Session;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::poller::PassOutcome;
use crate::reconcile::GroupReconciler;
use crate::watch::{WatchManager, WatchSpec, WatchTarget};

/// Observable reader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// The last non-empty pass delivered samples, or recovery completed.
    Watching,
    /// Recovery has been attempted `attempts` times without completing.
    Recovering { attempts: u32 },
}

#[derive(Debug)]
pub struct ReconnectMonitor {
    enabled: bool,
    state: ReaderState,
    /// A rewatch failed after the groups were already recreated, so the
    /// next reconcile will report nothing new but the watch is still due.
    rewatch_pending: bool,
    recoveries: u64,
}

impl ReconnectMonitor {
    /// `enabled` is false for an embedded service, which cannot restart
    /// on its own.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: ReaderState::Watching,
            rewatch_pending: false,
            recoveries: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Recovery procedures run so far, successful or not.
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    /// Feed one pass outcome. Runs a recovery on total failure and
    /// updates `spec` with whatever group ids it settled on.
    pub async fn observe<S: Session>(
        &mut self,
        session: &S,
        target: &WatchTarget,
        spec: &mut WatchSpec,
        outcome: PassOutcome,
    ) {
        match outcome {
            PassOutcome::Delivered { .. } => {
                if let ReaderState::Recovering { attempts } = self.state {
                    info!(attempts, "samples flowing again");
                }
                self.state = ReaderState::Watching;
                self.rewatch_pending = false;
            }
            PassOutcome::Empty => {}
            PassOutcome::TotalFailure { attempted } => {
                if !self.enabled {
                    return;
                }
                warn!(attempted, "no field could be fetched, attempting recovery");
                self.recover(session, target, spec).await;
            }
        }
    }

    /// Reconcile both groups and rewatch when either was recreated or an
    /// earlier rewatch is still pending.
    ///
    /// Never fails: errors are logged and leave the monitor `Recovering`.
    pub async fn recover<S: Session>(
        &mut self,
        session: &S,
        target: &WatchTarget,
        spec: &mut WatchSpec,
    ) {
        let attempt = match self.state {
            ReaderState::Watching => 1,
            ReaderState::Recovering { attempts } => attempts.saturating_add(1),
        };
        self.state = ReaderState::Recovering { attempts: attempt };
        self.recoveries += 1;

        match Self::attempt(session, target, spec, self.rewatch_pending).await {
            Ok(rewatched) => {
                self.state = ReaderState::Watching;
                self.rewatch_pending = false;
                info!(
                    attempt,
                    rewatched,
                    group_id = %spec.device_group,
                    field_group_id = %spec.field_group,
                    "recovery complete"
                );
            }
            Err(RecoveryError { error, rewatch_pending }) => {
                self.rewatch_pending = rewatch_pending;
                warn!(attempt, error = %error, "recovery failed, retrying on next pass");
            }
        }
    }

    async fn attempt<S: Session>(
        session: &S,
        target: &WatchTarget,
        spec: &mut WatchSpec,
        rewatch_pending: bool,
    ) -> Result<bool, RecoveryError> {
        let reconciled = GroupReconciler::new(session)
            .reconcile_target(target)
            .await
            .map_err(|error| RecoveryError {
                error,
                rewatch_pending,
            })?;
        *spec = reconciled.spec;

        if !(reconciled.created || rewatch_pending) {
            return Ok(false);
        }
        WatchManager::new(session)
            .start_watch(spec)
            .await
            .map_err(|error| RecoveryError {
                error,
                rewatch_pending: true,
            })?;
        Ok(true)
    }
}

struct RecoveryError {
    error: CoreError,
    rewatch_pending: bool,
}
