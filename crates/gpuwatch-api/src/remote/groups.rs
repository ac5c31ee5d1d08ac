// Device and field group endpoints
//
// Group ids are assigned by the service and returned in a `{ "id": n }`
// payload on creation.

use serde::{Deserialize, Serialize};

use super::client::RemoteSession;
use crate::error::Error;
use crate::model::{DeviceGroupId, DeviceGroupInfo, FieldGroupId, FieldGroupInfo, FieldId};

#[derive(Deserialize)]
struct Created<T> {
    id: T,
}

#[derive(Serialize)]
struct CreateGroup<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct AddDevice {
    device_index: u32,
}

#[derive(Serialize)]
struct CreateFieldGroup<'a> {
    name: &'a str,
    field_ids: &'a [FieldId],
}

impl RemoteSession {
    // ── Devices ──────────────────────────────────────────────────────

    /// List every device index the service can sample.
    ///
    /// `GET /v1/devices`
    pub(crate) async fn get_devices(&self) -> Result<Vec<u32>, Error> {
        let url = self.api_url("devices")?;
        self.get("list devices", url).await
    }

    // ── Device groups ────────────────────────────────────────────────

    /// `GET /v1/groups`
    pub(crate) async fn get_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, Error> {
        let url = self.api_url("groups")?;
        self.get("list device groups", url).await
    }

    /// `POST /v1/groups`
    pub(crate) async fn post_device_group(&self, name: &str) -> Result<DeviceGroupId, Error> {
        let url = self.api_url("groups")?;
        let created: Created<DeviceGroupId> = self
            .post("create device group", url, &CreateGroup { name })
            .await?;
        Ok(created.id)
    }

    /// `POST /v1/groups/{id}/devices`
    pub(crate) async fn post_group_device(
        &self,
        group: DeviceGroupId,
        device_index: u32,
    ) -> Result<(), Error> {
        let url = self.api_url(&format!("groups/{group}/devices"))?;
        self.post_unit("add device to group", url, &AddDevice { device_index })
            .await
    }

    /// `DELETE /v1/groups/{id}`
    pub(crate) async fn delete_device_group(&self, group: DeviceGroupId) -> Result<(), Error> {
        let url = self.api_url(&format!("groups/{group}"))?;
        self.delete("destroy device group", url).await
    }

    // ── Field groups ─────────────────────────────────────────────────

    /// `GET /v1/field-groups`
    pub(crate) async fn get_field_groups(&self) -> Result<Vec<FieldGroupInfo>, Error> {
        let url = self.api_url("field-groups")?;
        self.get("list field groups", url).await
    }

    /// `POST /v1/field-groups`
    pub(crate) async fn post_field_group(
        &self,
        name: &str,
        fields: &[FieldId],
    ) -> Result<FieldGroupId, Error> {
        let url = self.api_url("field-groups")?;
        let body = CreateFieldGroup {
            name,
            field_ids: fields,
        };
        let created: Created<FieldGroupId> = self.post("create field group", url, &body).await?;
        Ok(created.id)
    }

    /// `DELETE /v1/field-groups/{id}`
    pub(crate) async fn delete_field_group(&self, group: FieldGroupId) -> Result<(), Error> {
        let url = self.api_url(&format!("field-groups/{group}"))?;
        self.delete("destroy field group", url).await
    }
}
