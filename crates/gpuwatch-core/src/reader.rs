// ── Reader ──
//
// Owns the session and the sink. Construction connects (or embeds),
// resolves the device list, reconciles both groups and starts the watch;
// any failure there is returned. After that, `process()` never fails.

use gpuwatch_api::{
    Connection, DeviceGroupId, EmbeddedSession, FieldGroupId, FieldId, RemoteSession, Session,
    WatchPolicy,
};
use tracing::{debug, info};

use crate::config::{Endpoint, ReaderConfig};
use crate::error::CoreError;
use crate::fields::UnitConversionTable;
use crate::poller::{PassOutcome, Poller};
use crate::reconcile::GroupReconciler;
use crate::recovery::{ReaderState, ReconnectMonitor};
use crate::sink::SampleSink;
use crate::watch::{WatchManager, WatchSpec, WatchTarget};

/// Initialize-then-poll telemetry reader.
///
/// Generic over the session so tests and embedding hosts can supply their
/// own; [`Reader::initialize`] picks a [`Connection`] from the endpoint.
pub struct Reader<S, K> {
    session: S,
    sink: K,
    target: WatchTarget,
    spec: WatchSpec,
    conversion: UnitConversionTable,
    monitor: ReconnectMonitor,
}

impl<K: SampleSink> Reader<Connection, K> {
    /// Connect to (or start) the configured service and bring the watch up.
    ///
    /// The config is validated before anything is connected.
    pub async fn initialize(config: ReaderConfig, sink: K) -> Result<Self, CoreError> {
        config.validate()?;
        let session = connect(&config).await?;
        Self::establish(session, config, sink).await
    }
}

impl<S: Session, K: SampleSink> Reader<S, K> {
    /// Bring the watch up on an already-established session.
    ///
    /// Recovery is armed only for a remote endpoint in `config`.
    pub async fn with_session(
        session: S,
        config: ReaderConfig,
        sink: K,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Self::establish(session, config, sink).await
    }

    async fn establish(session: S, config: ReaderConfig, sink: K) -> Result<Self, CoreError> {
        let policy = config.watch_policy();
        let devices = match config.devices {
            Some(devices) => devices,
            None => {
                let all = session
                    .list_devices()
                    .await
                    .map_err(|source| CoreError::DeviceDiscovery { source })?;
                debug!(devices = ?all, "watching every device the service reports");
                all
            }
        };

        let target = WatchTarget {
            device_group_name: config.device_group_name,
            devices,
            field_group_name: config.field_group_name,
            fields: config.fields,
            policy,
        };

        let reconciled = GroupReconciler::new(&session).reconcile_target(&target).await?;
        WatchManager::new(&session).start_watch(&reconciled.spec).await?;

        info!(
            endpoint = %config.endpoint,
            devices = target.devices.len(),
            fields = target.fields.len(),
            "reader initialized"
        );

        Ok(Self {
            session,
            sink,
            target,
            spec: reconciled.spec,
            conversion: config.unit_conversion,
            monitor: ReconnectMonitor::new(config.endpoint.is_standalone()),
        })
    }

    /// Run one sampling pass and, if nothing could be fetched, one
    /// recovery attempt. Never fails.
    pub async fn process(&mut self) -> PassOutcome {
        let outcome = Poller::new(
            &self.session,
            &self.target.devices,
            &self.target.fields,
            &self.conversion,
        )
        .process(&mut self.sink)
        .await;

        self.monitor
            .observe(&self.session, &self.target, &mut self.spec, outcome)
            .await;
        outcome
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> ReaderState {
        self.monitor.state()
    }

    /// Recovery procedures run since initialization.
    pub fn recoveries(&self) -> u64 {
        self.monitor.recoveries()
    }

    /// Device indices in the watched device group, in order.
    pub fn devices(&self) -> &[u32] {
        &self.target.devices
    }

    /// Field ids in the watched field group, in order.
    pub fn fields(&self) -> &[FieldId] {
        &self.target.fields
    }

    pub fn device_group_id(&self) -> DeviceGroupId {
        self.spec.device_group
    }

    pub fn field_group_id(&self) -> FieldGroupId {
        self.spec.field_group
    }

    pub fn watch_policy(&self) -> &WatchPolicy {
        &self.spec.policy
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Release the session and hand the sink back.
    ///
    /// The watch is left in place; the service retains samples per its own
    /// policy and the next reader unwatches before watching.
    pub fn shutdown(self) -> K {
        info!(
            group_id = %self.spec.device_group,
            field_group_id = %self.spec.field_group,
            "reader shut down"
        );
        self.sink
    }
}

async fn connect(config: &ReaderConfig) -> Result<Connection, CoreError> {
    match &config.endpoint {
        Endpoint::Remote { address } => {
            let session = RemoteSession::connect(address, &config.transport())
                .await
                .map_err(|source| CoreError::ConnectionFailed {
                    endpoint: address.clone(),
                    source,
                })?;
            Ok(session.into())
        }
        Endpoint::Embedded { mode } => Ok(EmbeddedSession::start(*mode).into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gpuwatch_api::{FieldValue, OperationMode, Sample};
    use pretty_assertions::assert_eq;

    use super::*;

    struct Last(Option<(u32, FieldValue)>);

    impl SampleSink for Last {
        fn on_sample(&mut self, device_index: u32, sample: Sample) {
            self.0 = Some((device_index, sample.value));
        }
    }

    fn embedded_config() -> ReaderConfig {
        ReaderConfig {
            endpoint: Endpoint::Embedded {
                mode: OperationMode::Auto,
            },
            ..ReaderConfig::default()
        }
    }

    #[tokio::test]
    async fn initialize_embedded_watches_every_device() {
        let reader = Reader::initialize(embedded_config(), |_: u32, _: Sample| {})
            .await
            .unwrap();

        assert!(matches!(reader.session(), Connection::Embedded(_)));
        assert_eq!(reader.devices(), &[0]);
        assert_eq!(reader.fields().len(), 6);
        assert_eq!(reader.state(), ReaderState::Watching);
    }

    #[tokio::test]
    async fn with_session_watches_with_configured_policy() {
        let config = ReaderConfig {
            update_interval: std::time::Duration::from_secs(7),
            max_keep_samples: 3,
            ..embedded_config()
        };
        let expected = config.watch_policy();
        let session = EmbeddedSession::start(OperationMode::Auto);
        let reader = Reader::with_session(session, config, |_: u32, _: Sample| {})
            .await
            .unwrap();

        assert_eq!(reader.watch_policy(), &expected);
    }

    #[tokio::test]
    async fn process_delivers_converted_samples() {
        let session = EmbeddedSession::start(OperationMode::Auto);
        session
            .record(0, FieldId::GPU_TEMP, FieldValue::Integer(61_000))
            .await
            .unwrap();
        let config = ReaderConfig {
            fields: vec![FieldId::GPU_TEMP],
            ..embedded_config()
        };
        let mut reader = Reader::with_session(session, config, Last(None)).await.unwrap();

        let outcome = reader.process().await;
        assert_eq!(outcome, PassOutcome::Delivered { samples: 1, skipped: 0 });
        assert_eq!(reader.sink().0, Some((0, FieldValue::Integer(61))));
        assert_eq!(reader.shutdown().0, Some((0, FieldValue::Integer(61))));
    }

    #[tokio::test]
    async fn unreachable_remote_fails_initialization() {
        let config = ReaderConfig {
            endpoint: Endpoint::Remote {
                address: "127.0.0.1:9".into(),
            },
            timeout: std::time::Duration::from_secs(2),
            ..ReaderConfig::default()
        };
        let result = Reader::initialize(config, |_: u32, _: Sample| {}).await;
        assert!(matches!(result, Err(CoreError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn invalid_config_fails_before_connecting() {
        let config = ReaderConfig {
            fields: Vec::from([FieldId::GPU_TEMP; 2]),
            ..embedded_config()
        };
        let result = Reader::initialize(config, |_: u32, _: Sample| {}).await;
        assert!(matches!(result, Err(CoreError::Config { .. })));
    }
}
