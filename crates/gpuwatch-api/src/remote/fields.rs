// Watch and sample endpoints

use serde::Serialize;
use tracing::trace;

use super::client::RemoteSession;
use crate::error::Error;
use crate::model::{DeviceGroupId, FieldGroupId, FieldId, Sample, WatchPolicy};

#[derive(Serialize)]
struct WatchRequest {
    group_id: DeviceGroupId,
    field_group_id: FieldGroupId,
    update_freq_us: u64,
    max_keep_age_s: f64,
    max_keep_samples: u32,
}

impl WatchRequest {
    fn new(devices: DeviceGroupId, fields: FieldGroupId, policy: &WatchPolicy) -> Self {
        Self {
            group_id: devices,
            field_group_id: fields,
            update_freq_us: u64::try_from(policy.update_interval.as_micros()).unwrap_or(u64::MAX),
            max_keep_age_s: policy.max_keep_age.as_secs_f64(),
            max_keep_samples: policy.max_keep_samples,
        }
    }
}

impl RemoteSession {
    /// `POST /v1/watches`
    pub(crate) async fn post_watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
        policy: &WatchPolicy,
    ) -> Result<(), Error> {
        let url = self.api_url("watches")?;
        self.post_unit("watch", url, &WatchRequest::new(devices, fields, policy))
            .await
    }

    /// `DELETE /v1/watches/{group}/{field_group}`
    pub(crate) async fn delete_watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
    ) -> Result<(), Error> {
        let url = self.api_url(&format!("watches/{devices}/{fields}"))?;
        self.delete("unwatch", url).await
    }

    /// Latest retained value of `field` on `device_index`.
    ///
    /// `GET /v1/devices/{index}/fields/{field}/latest`. A sample whose own
    /// status is not OK is reported as a service error.
    pub(crate) async fn get_latest_value(
        &self,
        device_index: u32,
        field: FieldId,
    ) -> Result<Sample, Error> {
        let url = self.api_url(&format!(
            "devices/{device_index}/fields/{}/latest",
            field.raw()
        ))?;
        let mut sample: Sample = self.get("fetch latest value", url).await?;
        if !sample.status.is_ok() {
            return Err(Error::service("fetch latest value", sample.status));
        }
        sample.device_index = device_index;
        trace!(device_index, field = %field, value = %sample.value, "latest value");
        Ok(sample)
    }
}
