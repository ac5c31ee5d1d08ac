// Remote telemetry gateway client.
//
// `client` holds transport mechanics (URL construction, status envelope);
// `groups` and `fields` add the endpoint methods as inherent impls, and
// this module wires them into the `Session` trait.

mod client;
mod fields;
mod groups;

pub use client::RemoteSession;

use crate::error::Error;
use crate::model::{
    DeviceGroupId, DeviceGroupInfo, FieldGroupId, FieldGroupInfo, FieldId, Sample, WatchPolicy,
};
use crate::session::Session;

impl Session for RemoteSession {
    async fn list_devices(&self) -> Result<Vec<u32>, Error> {
        self.get_devices().await
    }

    async fn list_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, Error> {
        self.get_device_groups().await
    }

    async fn create_device_group(&self, name: &str) -> Result<DeviceGroupId, Error> {
        self.post_device_group(name).await
    }

    async fn add_device_to_group(&self, group: DeviceGroupId, device_index: u32) -> Result<(), Error> {
        self.post_group_device(group, device_index).await
    }

    async fn destroy_device_group(&self, group: DeviceGroupId) -> Result<(), Error> {
        self.delete_device_group(group).await
    }

    async fn list_field_groups(&self) -> Result<Vec<FieldGroupInfo>, Error> {
        self.get_field_groups().await
    }

    async fn create_field_group(&self, name: &str, fields: &[FieldId]) -> Result<FieldGroupId, Error> {
        self.post_field_group(name, fields).await
    }

    async fn destroy_field_group(&self, group: FieldGroupId) -> Result<(), Error> {
        self.delete_field_group(group).await
    }

    async fn watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
        policy: &WatchPolicy,
    ) -> Result<(), Error> {
        self.post_watch(devices, fields, policy).await
    }

    async fn unwatch(&self, devices: DeviceGroupId, fields: FieldGroupId) -> Result<(), Error> {
        self.delete_watch(devices, fields).await
    }

    async fn latest_value(&self, device_index: u32, field: FieldId) -> Result<Sample, Error> {
        self.get_latest_value(device_index, field).await
    }
}
