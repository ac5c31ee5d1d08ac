// ── Embedded telemetry engine ──
//
// An in-process service instance. Group, watch and value tables live in
// memory behind a tokio mutex; the host pushes values with `record` and
// the reader pulls them through the `Session` trait like any other
// service. Ids are assigned from counters that survive `restart`.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Error;
use crate::model::{
    DeviceGroupId, DeviceGroupInfo, FieldGroupId, FieldGroupInfo, FieldId, FieldValue,
    OperationMode, Sample, ServiceStatus, WatchPolicy,
};
use crate::session::Session;

/// Device groups the engine holds at once.
pub const MAX_DEVICE_GROUPS: usize = 64;
/// Field groups the engine holds at once.
pub const MAX_FIELD_GROUPS: usize = 64;
/// Devices in a single device group.
pub const MAX_DEVICES_PER_GROUP: usize = 16;
/// Fields in a single field group.
pub const MAX_FIELDS_PER_GROUP: usize = 128;

#[derive(Debug, Default)]
struct EngineState {
    next_group_id: u32,
    next_field_group_id: u32,
    groups: BTreeMap<DeviceGroupId, DeviceGroupInfo>,
    field_groups: BTreeMap<FieldGroupId, FieldGroupInfo>,
    watches: BTreeMap<(DeviceGroupId, FieldGroupId), WatchPolicy>,
    /// Values visible to `latest_value`.
    values: HashMap<(u32, FieldId), Sample>,
    /// Values recorded in manual mode, awaiting `update_all`.
    staged: HashMap<(u32, FieldId), Sample>,
}

impl EngineState {
    fn is_watched(&self, device_index: u32, field: FieldId) -> bool {
        self.watches.keys().any(|(gid, fgid)| {
            let has_device = self
                .groups
                .get(gid)
                .is_some_and(|g| g.devices.contains(&device_index));
            let has_field = self
                .field_groups
                .get(fgid)
                .is_some_and(|g| g.fields.contains(&field));
            has_device && has_field
        })
    }
}

/// Telemetry service running inside this process.
///
/// It cannot restart independently of its host, so readers never arm
/// recovery for it. [`restart`](Self::restart) exists to simulate a lost
/// service state.
#[derive(Debug)]
pub struct EmbeddedSession {
    mode: OperationMode,
    devices: Vec<u32>,
    state: Mutex<EngineState>,
}

impl EmbeddedSession {
    /// Start an engine exposing a single device, index 0.
    pub fn start(mode: OperationMode) -> Self {
        Self::with_devices(mode, vec![0])
    }

    /// Start an engine exposing the given device indices.
    pub fn with_devices(mode: OperationMode, devices: Vec<u32>) -> Self {
        info!(%mode, devices = devices.len(), "embedded telemetry engine started");
        Self {
            mode,
            devices,
            state: Mutex::new(EngineState {
                next_group_id: 1,
                next_field_group_id: 1,
                ..EngineState::default()
            }),
        }
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    /// Push a freshly sampled value for `field` on `device_index`.
    ///
    /// In [`OperationMode::Auto`] the value is visible immediately; in
    /// [`OperationMode::Manual`] it waits for [`update_all`](Self::update_all).
    pub async fn record(
        &self,
        device_index: u32,
        field: FieldId,
        value: FieldValue,
    ) -> Result<(), Error> {
        if !self.devices.contains(&device_index) {
            return Err(Error::service("record value", ServiceStatus::NotFound));
        }
        let sample = Sample {
            field_id: field,
            device_index,
            status: ServiceStatus::Ok,
            timestamp: Utc::now(),
            value,
        };
        let mut state = self.state.lock().await;
        let table = match self.mode {
            OperationMode::Auto => &mut state.values,
            OperationMode::Manual => &mut state.staged,
        };
        table.insert((device_index, field), sample);
        Ok(())
    }

    /// Publish every value staged since the last update (manual mode).
    pub async fn update_all(&self) {
        let mut state = self.state.lock().await;
        let staged = std::mem::take(&mut state.staged);
        debug!(count = staged.len(), "publishing staged values");
        state.values.extend(staged);
    }

    /// Drop every group, watch and value, as a restarted service would.
    pub async fn restart(&self) {
        let mut state = self.state.lock().await;
        state.groups.clear();
        state.field_groups.clear();
        state.watches.clear();
        state.values.clear();
        state.staged.clear();
        info!("embedded telemetry engine state reset");
    }
}

impl Session for EmbeddedSession {
    async fn list_devices(&self) -> Result<Vec<u32>, Error> {
        Ok(self.devices.clone())
    }

    async fn list_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, Error> {
        let state = self.state.lock().await;
        Ok(state.groups.values().cloned().collect())
    }

    async fn create_device_group(&self, name: &str) -> Result<DeviceGroupId, Error> {
        const OP: &str = "create device group";
        if name.is_empty() {
            return Err(Error::service(OP, ServiceStatus::BadParameter));
        }
        let mut state = self.state.lock().await;
        if state.groups.len() >= MAX_DEVICE_GROUPS {
            return Err(Error::service(OP, ServiceStatus::MaxLimit));
        }
        let id = DeviceGroupId(state.next_group_id);
        state.next_group_id += 1;
        state.groups.insert(
            id,
            DeviceGroupInfo {
                id,
                name: name.to_owned(),
                devices: Vec::new(),
            },
        );
        debug!(group_id = %id, name, "device group created");
        Ok(id)
    }

    async fn add_device_to_group(&self, group: DeviceGroupId, device_index: u32) -> Result<(), Error> {
        const OP: &str = "add device to group";
        if !self.devices.contains(&device_index) {
            return Err(Error::service(OP, ServiceStatus::NotFound));
        }
        let mut state = self.state.lock().await;
        let Some(info) = state.groups.get_mut(&group) else {
            return Err(Error::service(OP, ServiceStatus::NotFound));
        };
        if info.devices.contains(&device_index) {
            return Err(Error::service(OP, ServiceStatus::AlreadyExists));
        }
        if info.devices.len() >= MAX_DEVICES_PER_GROUP {
            return Err(Error::service(OP, ServiceStatus::MaxLimit));
        }
        info.devices.push(device_index);
        Ok(())
    }

    async fn destroy_device_group(&self, group: DeviceGroupId) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.groups.remove(&group).is_none() {
            return Err(Error::service("destroy device group", ServiceStatus::NotFound));
        }
        state.watches.retain(|(gid, _), _| *gid != group);
        debug!(group_id = %group, "device group destroyed");
        Ok(())
    }

    async fn list_field_groups(&self) -> Result<Vec<FieldGroupInfo>, Error> {
        let state = self.state.lock().await;
        Ok(state.field_groups.values().cloned().collect())
    }

    async fn create_field_group(&self, name: &str, fields: &[FieldId]) -> Result<FieldGroupId, Error> {
        const OP: &str = "create field group";
        if name.is_empty() || fields.contains(&FieldId::INVALID) {
            return Err(Error::service(OP, ServiceStatus::BadParameter));
        }
        if fields.len() > MAX_FIELDS_PER_GROUP {
            return Err(Error::service(OP, ServiceStatus::MaxLimit));
        }
        let mut state = self.state.lock().await;
        if state.field_groups.len() >= MAX_FIELD_GROUPS {
            return Err(Error::service(OP, ServiceStatus::MaxLimit));
        }
        let id = FieldGroupId(state.next_field_group_id);
        state.next_field_group_id += 1;
        state.field_groups.insert(
            id,
            FieldGroupInfo {
                id,
                name: name.to_owned(),
                fields: fields.to_vec(),
            },
        );
        debug!(group_id = %id, name, fields = fields.len(), "field group created");
        Ok(id)
    }

    async fn destroy_field_group(&self, group: FieldGroupId) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.field_groups.remove(&group).is_none() {
            return Err(Error::service("destroy field group", ServiceStatus::NotFound));
        }
        state.watches.retain(|(_, fgid), _| *fgid != group);
        debug!(group_id = %group, "field group destroyed");
        Ok(())
    }

    async fn watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
        policy: &WatchPolicy,
    ) -> Result<(), Error> {
        const OP: &str = "watch";
        if policy.update_interval.is_zero() {
            return Err(Error::service(OP, ServiceStatus::BadParameter));
        }
        let mut state = self.state.lock().await;
        if !state.groups.contains_key(&devices) || !state.field_groups.contains_key(&fields) {
            return Err(Error::service(OP, ServiceStatus::NotFound));
        }
        state.watches.insert((devices, fields), *policy);
        Ok(())
    }

    async fn unwatch(&self, devices: DeviceGroupId, fields: FieldGroupId) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.watches.remove(&(devices, fields)).is_none() {
            return Err(Error::service("unwatch", ServiceStatus::NotFound));
        }
        Ok(())
    }

    async fn latest_value(&self, device_index: u32, field: FieldId) -> Result<Sample, Error> {
        const OP: &str = "fetch latest value";
        let state = self.state.lock().await;
        if !state.is_watched(device_index, field) {
            return Err(Error::service(OP, ServiceStatus::NotFound));
        }
        state
            .values
            .get(&(device_index, field))
            .cloned()
            .ok_or_else(|| Error::service(OP, ServiceStatus::NotFound))
    }
}
