// ── Group reconciliation ──
//
// Named device and field groups are create-or-reuse-or-replace: a group
// with the target name and exactly the desired ordered membership is
// reused; any same-named group with different membership is destroyed;
// otherwise a fresh group is created and populated in order.
//
// Multi-step creation is not rolled back. A device group left partially
// populated by a failed add has the wrong membership, so the next
// reconcile destroys and recreates it.

use gpuwatch_api::{DeviceGroupId, FieldGroupId, FieldId, Session};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::watch::{WatchSpec, WatchTarget};

/// Result of reconciling one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled<Id> {
    pub id: Id,
    /// `true` when the group had to be (re)created.
    pub created: bool,
}

/// Both groups of a [`WatchTarget`], reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciledTarget {
    pub spec: WatchSpec,
    /// `true` when either group had to be (re)created.
    pub created: bool,
}

pub struct GroupReconciler<'a, S> {
    session: &'a S,
}

impl<'a, S: Session> GroupReconciler<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// Reuse, replace or create the device group `name` so that its
    /// membership is exactly `desired`, in order.
    pub async fn reconcile_device_group(
        &self,
        name: &str,
        desired: &[u32],
    ) -> Result<Reconciled<DeviceGroupId>, CoreError> {
        let err = |operation: &'static str| {
            move |source| CoreError::GroupOperation {
                group: name.to_owned(),
                operation,
                source,
            }
        };

        let existing = self
            .session
            .list_device_groups()
            .await
            .map_err(err("list device groups"))?;

        for group in existing.iter().filter(|g| g.name == name) {
            if group.devices == desired {
                debug!(group_id = %group.id, name, "reusing device group");
                return Ok(Reconciled {
                    id: group.id,
                    created: false,
                });
            }
            info!(
                group_id = %group.id,
                name,
                current = ?group.devices,
                desired = ?desired,
                "device group membership changed, replacing"
            );
            self.session
                .destroy_device_group(group.id)
                .await
                .map_err(err("destroy stale device group"))?;
        }

        let id = self
            .session
            .create_device_group(name)
            .await
            .map_err(err("create device group"))?;
        for &device in desired {
            self.session
                .add_device_to_group(id, device)
                .await
                .map_err(err("add device to group"))?;
        }

        info!(group_id = %id, name, devices = ?desired, "device group created");
        Ok(Reconciled { id, created: true })
    }

    /// Reuse, replace or create the field group `name` so that its
    /// membership is exactly `desired`, in order.
    pub async fn reconcile_field_group(
        &self,
        name: &str,
        desired: &[FieldId],
    ) -> Result<Reconciled<FieldGroupId>, CoreError> {
        let err = |operation: &'static str| {
            move |source| CoreError::GroupOperation {
                group: name.to_owned(),
                operation,
                source,
            }
        };

        let existing = self
            .session
            .list_field_groups()
            .await
            .map_err(err("list field groups"))?;

        for group in existing.iter().filter(|g| g.name == name) {
            if group.fields == desired {
                debug!(group_id = %group.id, name, "reusing field group");
                return Ok(Reconciled {
                    id: group.id,
                    created: false,
                });
            }
            info!(group_id = %group.id, name, "field group membership changed, replacing");
            self.session
                .destroy_field_group(group.id)
                .await
                .map_err(err("destroy stale field group"))?;
        }

        let id = self
            .session
            .create_field_group(name, desired)
            .await
            .map_err(err("create field group"))?;

        info!(group_id = %id, name, fields = desired.len(), "field group created");
        Ok(Reconciled { id, created: true })
    }

    /// Reconcile the device group, then the field group, of `target`.
    pub async fn reconcile_target(&self, target: &WatchTarget) -> Result<ReconciledTarget, CoreError> {
        let devices = self
            .reconcile_device_group(&target.device_group_name, &target.devices)
            .await?;
        let fields = self
            .reconcile_field_group(&target.field_group_name, &target.fields)
            .await?;
        Ok(ReconciledTarget {
            spec: WatchSpec {
                device_group: devices.id,
                field_group: fields.id,
                policy: target.policy,
            },
            created: devices.created || fields.created,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gpuwatch_api::{EmbeddedSession, OperationMode};
    use pretty_assertions::assert_eq;

    use super::*;

    fn engine() -> EmbeddedSession {
        EmbeddedSession::with_devices(OperationMode::Auto, vec![0, 1, 2])
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let session = engine();
        let reconciler = GroupReconciler::new(&session);

        let first = reconciler.reconcile_device_group("g1", &[0, 1]).await.unwrap();
        assert!(first.created);
        let second = reconciler.reconcile_device_group("g1", &[0, 1]).await.unwrap();
        assert_eq!(second, Reconciled { id: first.id, created: false });
        assert_eq!(session.list_device_groups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn membership_order_matters() {
        let session = engine();
        let reconciler = GroupReconciler::new(&session);

        let first = reconciler.reconcile_device_group("g1", &[0, 1]).await.unwrap();
        let swapped = reconciler.reconcile_device_group("g1", &[1, 0]).await.unwrap();
        assert!(swapped.created);
        assert_ne!(swapped.id, first.id);

        let groups = session.list_device_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].devices, vec![1, 0]);
    }

    #[tokio::test]
    async fn other_groups_are_left_alone() {
        let session = engine();
        let other = session.create_device_group("someone-else").await.unwrap();

        GroupReconciler::new(&session)
            .reconcile_device_group("g1", &[2])
            .await
            .unwrap();

        let ids: Vec<_> = session
            .list_device_groups()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert!(ids.contains(&other));
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_same_named_groups_collapse_to_the_match() {
        let session = engine();
        let stale = session.create_device_group("g1").await.unwrap();
        session.add_device_to_group(stale, 2).await.unwrap();
        let good = session.create_device_group("g1").await.unwrap();
        session.add_device_to_group(good, 0).await.unwrap();

        let result = GroupReconciler::new(&session)
            .reconcile_device_group("g1", &[0])
            .await
            .unwrap();
        assert_eq!(result, Reconciled { id: good, created: false });

        let groups = session.list_device_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, good);
    }

    #[tokio::test]
    async fn partial_group_heals_on_next_reconcile() {
        let session = engine();
        let reconciler = GroupReconciler::new(&session);

        // device 9 does not exist: the group is left holding only device 0
        let err = reconciler.reconcile_device_group("g1", &[0, 9]).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::GroupOperation {
                operation: "add device to group",
                ..
            }
        ));
        let partial = session.list_device_groups().await.unwrap();
        assert_eq!(partial[0].devices, vec![0]);

        let healed = reconciler.reconcile_device_group("g1", &[0, 1]).await.unwrap();
        assert!(healed.created);
        assert_ne!(healed.id, partial[0].id);
    }

    #[tokio::test]
    async fn field_groups_follow_the_same_rules() {
        let session = engine();
        let reconciler = GroupReconciler::new(&session);
        let fields = [FieldId::GPU_TEMP, FieldId::POWER_USAGE];

        let first = reconciler.reconcile_field_group("f1", &fields).await.unwrap();
        assert!(first.created);
        let again = reconciler.reconcile_field_group("f1", &fields).await.unwrap();
        assert_eq!(again, Reconciled { id: first.id, created: false });

        let changed = reconciler
            .reconcile_field_group("f1", &[FieldId::GPU_TEMP])
            .await
            .unwrap();
        assert!(changed.created);
        let listed = session.list_field_groups().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, changed.id);
    }

    #[tokio::test]
    async fn reconcile_target_reports_any_creation() {
        let session = engine();
        let reconciler = GroupReconciler::new(&session);
        let target = WatchTarget {
            device_group_name: "g".into(),
            devices: vec![0],
            field_group_name: "f".into(),
            fields: vec![FieldId::GPU_UTIL],
            policy: gpuwatch_api::WatchPolicy::default(),
        };

        let first = reconciler.reconcile_target(&target).await.unwrap();
        assert!(first.created);
        let second = reconciler.reconcile_target(&target).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.spec, first.spec);

        session.destroy_field_group(first.spec.field_group).await.unwrap();
        let third = reconciler.reconcile_target(&target).await.unwrap();
        assert!(third.created);
        assert_eq!(third.spec.device_group, first.spec.device_group);
    }
}
