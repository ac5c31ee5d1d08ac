// ── Watch lifecycle ──

use gpuwatch_api::{DeviceGroupId, FieldGroupId, FieldId, Session, WatchPolicy};
use tracing::{debug, info};

use crate::error::CoreError;

/// What the reader wants watched, by group name and ordered membership.
///
/// Fixed for the reader's lifetime; every (re)connect reconciles against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub device_group_name: String,
    pub devices: Vec<u32>,
    pub field_group_name: String,
    pub fields: Vec<FieldId>,
    pub policy: WatchPolicy,
}

/// A concrete watch: service-assigned group ids plus retention policy.
///
/// Re-derived on every reconcile, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSpec {
    pub device_group: DeviceGroupId,
    pub field_group: FieldGroupId,
    pub policy: WatchPolicy,
}

/// Establishes watches against a session.
pub struct WatchManager<'a, S> {
    session: &'a S,
}

impl<'a, S: Session> WatchManager<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// Clear whatever watch a previous run left for the pair, then watch.
    ///
    /// The unwatch is best effort and its failure is ignored; a failed
    /// watch is an error.
    pub async fn start_watch(&self, spec: &WatchSpec) -> Result<(), CoreError> {
        if let Err(e) = self
            .session
            .unwatch(spec.device_group, spec.field_group)
            .await
        {
            debug!(
                group_id = %spec.device_group,
                field_group_id = %spec.field_group,
                error = %e,
                "no stale watch to clear"
            );
        }

        self.session
            .watch(spec.device_group, spec.field_group, &spec.policy)
            .await
            .map_err(|source| CoreError::Watch {
                device_group: spec.device_group,
                field_group: spec.field_group,
                source,
            })?;

        info!(
            group_id = %spec.device_group,
            field_group_id = %spec.field_group,
            update_interval_ms = spec.policy.update_interval.as_millis(),
            max_keep_age_s = spec.policy.max_keep_age.as_secs(),
            max_keep_samples = spec.policy.max_keep_samples,
            "watch established"
        );
        Ok(())
    }
}
