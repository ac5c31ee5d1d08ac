// ── Session boundary ──
//
// The logical operation set of the telemetry service. Every call is a
// single request/response; callers await them one at a time.

use std::future::Future;

use crate::embedded::EmbeddedSession;
use crate::error::Error;
use crate::model::{
    DeviceGroupId, DeviceGroupInfo, FieldGroupId, FieldGroupInfo, FieldId, Sample, WatchPolicy,
};
use crate::remote::RemoteSession;

/// Operations issued against a connected or embedded telemetry service.
///
/// Implementations own their transport or in-process state; the reader
/// owns the session exclusively for its lifetime.
pub trait Session: Send + Sync {
    /// Every device index the service can sample.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<u32>, Error>> + Send;

    /// All device groups currently registered, with their membership.
    fn list_device_groups(&self) -> impl Future<Output = Result<Vec<DeviceGroupInfo>, Error>> + Send;

    /// Create an empty device group.
    fn create_device_group(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<DeviceGroupId, Error>> + Send;

    /// Append one device to a group.
    fn add_device_to_group(
        &self,
        group: DeviceGroupId,
        device_index: u32,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn destroy_device_group(
        &self,
        group: DeviceGroupId,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// All field groups currently registered, with their membership.
    fn list_field_groups(&self) -> impl Future<Output = Result<Vec<FieldGroupInfo>, Error>> + Send;

    /// Create a field group populated with `fields`, in order.
    fn create_field_group(
        &self,
        name: &str,
        fields: &[FieldId],
    ) -> impl Future<Output = Result<FieldGroupId, Error>> + Send;

    fn destroy_field_group(
        &self,
        group: FieldGroupId,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Start sampling `fields` on `devices` with the given retention.
    fn watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
        policy: &WatchPolicy,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Stop sampling for the pair.
    fn unwatch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Most recent value the service holds for the pair.
    fn latest_value(
        &self,
        device_index: u32,
        field: FieldId,
    ) -> impl Future<Output = Result<Sample, Error>> + Send;
}

// ── Borrowed sessions ────────────────────────────────────────────────

impl<T: Session + ?Sized> Session for &T {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<u32>, Error>> + Send {
        (**self).list_devices()
    }

    fn list_device_groups(&self) -> impl Future<Output = Result<Vec<DeviceGroupInfo>, Error>> + Send {
        (**self).list_device_groups()
    }

    fn create_device_group(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<DeviceGroupId, Error>> + Send {
        (**self).create_device_group(name)
    }

    fn add_device_to_group(
        &self,
        group: DeviceGroupId,
        device_index: u32,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).add_device_to_group(group, device_index)
    }

    fn destroy_device_group(
        &self,
        group: DeviceGroupId,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).destroy_device_group(group)
    }

    fn list_field_groups(&self) -> impl Future<Output = Result<Vec<FieldGroupInfo>, Error>> + Send {
        (**self).list_field_groups()
    }

    fn create_field_group(
        &self,
        name: &str,
        fields: &[FieldId],
    ) -> impl Future<Output = Result<FieldGroupId, Error>> + Send {
        (**self).create_field_group(name, fields)
    }

    fn destroy_field_group(
        &self,
        group: FieldGroupId,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).destroy_field_group(group)
    }

    fn watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
        policy: &WatchPolicy,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).watch(devices, fields, policy)
    }

    fn unwatch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).unwatch(devices, fields)
    }

    fn latest_value(
        &self,
        device_index: u32,
        field: FieldId,
    ) -> impl Future<Output = Result<Sample, Error>> + Send {
        (**self).latest_value(device_index, field)
    }
}

// ── Connection ───────────────────────────────────────────────────────

/// A session chosen at startup: standalone daemon or in-process engine.
pub enum Connection {
    Remote(RemoteSession),
    Embedded(EmbeddedSession),
}

impl Connection {
    /// `true` when the service lives in another process and can restart
    /// independently of this one.
    pub fn is_standalone(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<RemoteSession> for Connection {
    fn from(session: RemoteSession) -> Self {
        Self::Remote(session)
    }
}

impl From<EmbeddedSession> for Connection {
    fn from(session: EmbeddedSession) -> Self {
        Self::Embedded(session)
    }
}

impl Session for Connection {
    async fn list_devices(&self) -> Result<Vec<u32>, Error> {
        match self {
            Self::Remote(s) => s.list_devices().await,
            Self::Embedded(s) => s.list_devices().await,
        }
    }

    async fn list_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, Error> {
        match self {
            Self::Remote(s) => s.list_device_groups().await,
            Self::Embedded(s) => s.list_device_groups().await,
        }
    }

    async fn create_device_group(&self, name: &str) -> Result<DeviceGroupId, Error> {
        match self {
            Self::Remote(s) => s.create_device_group(name).await,
            Self::Embedded(s) => s.create_device_group(name).await,
        }
    }

    async fn add_device_to_group(&self, group: DeviceGroupId, device_index: u32) -> Result<(), Error> {
        match self {
            Self::Remote(s) => s.add_device_to_group(group, device_index).await,
            Self::Embedded(s) => s.add_device_to_group(group, device_index).await,
        }
    }

    async fn destroy_device_group(&self, group: DeviceGroupId) -> Result<(), Error> {
        match self {
            Self::Remote(s) => s.destroy_device_group(group).await,
            Self::Embedded(s) => s.destroy_device_group(group).await,
        }
    }

    async fn list_field_groups(&self) -> Result<Vec<FieldGroupInfo>, Error> {
        match self {
            Self::Remote(s) => s.list_field_groups().await,
            Self::Embedded(s) => s.list_field_groups().await,
        }
    }

    async fn create_field_group(&self, name: &str, fields: &[FieldId]) -> Result<FieldGroupId, Error> {
        match self {
            Self::Remote(s) => s.create_field_group(name, fields).await,
            Self::Embedded(s) => s.create_field_group(name, fields).await,
        }
    }

    async fn destroy_field_group(&self, group: FieldGroupId) -> Result<(), Error> {
        match self {
            Self::Remote(s) => s.destroy_field_group(group).await,
            Self::Embedded(s) => s.destroy_field_group(group).await,
        }
    }

    async fn watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
        policy: &WatchPolicy,
    ) -> Result<(), Error> {
        match self {
            Self::Remote(s) => s.watch(devices, fields, policy).await,
            Self::Embedded(s) => s.watch(devices, fields, policy).await,
        }
    }

    async fn unwatch(&self, devices: DeviceGroupId, fields: FieldGroupId) -> Result<(), Error> {
        match self {
            Self::Remote(s) => s.unwatch(devices, fields).await,
            Self::Embedded(s) => s.unwatch(devices, fields).await,
        }
    }

    async fn latest_value(&self, device_index: u32, field: FieldId) -> Result<Sample, Error> {
        match self {
            Self::Remote(s) => s.latest_value(device_index, field).await,
            Self::Embedded(s) => s.latest_value(device_index, field).await,
        }
    }
}
