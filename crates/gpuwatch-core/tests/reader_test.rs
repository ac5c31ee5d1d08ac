#![allow(clippy::unwrap_used)]
// End-to-end reader scenarios against an embedded engine wrapped in a
// session that can inject failures and counts watch traffic.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use gpuwatch_api::{
    DeviceGroupId, DeviceGroupInfo, EmbeddedSession, Error, FieldGroupId, FieldGroupInfo,
    ServiceStatus, WatchPolicy,
};
use gpuwatch_core::{
    Endpoint, FieldId, FieldValue, GroupReconciler, OperationMode, PassOutcome, Reader,
    ReaderConfig, ReaderState, Reconciled, Sample, SampleSink, Session,
};
use gpuwatch_core::config::DEFAULT_DEVICE_GROUP_NAME;
use pretty_assertions::assert_eq;

// ── Fault-injecting session ─────────────────────────────────────────

#[derive(Default)]
struct Faults {
    fetch: AtomicBool,
    list_groups: AtomicBool,
    watch: AtomicBool,
}

struct FaultySession {
    inner: EmbeddedSession,
    faults: Faults,
    watch_calls: AtomicUsize,
    last_policy: Mutex<Option<WatchPolicy>>,
}

impl FaultySession {
    fn new(devices: Vec<u32>) -> Self {
        Self {
            inner: EmbeddedSession::with_devices(OperationMode::Auto, devices),
            faults: Faults::default(),
            watch_calls: AtomicUsize::new(0),
            last_policy: Mutex::new(None),
        }
    }

    fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }
}

fn injected(operation: &'static str) -> Error {
    Error::service(operation, ServiceStatus::ClientError)
}

impl Session for FaultySession {
    async fn list_devices(&self) -> Result<Vec<u32>, Error> {
        self.inner.list_devices().await
    }

    async fn list_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, Error> {
        if self.faults.list_groups.load(Ordering::SeqCst) {
            return Err(injected("list device groups"));
        }
        self.inner.list_device_groups().await
    }

    async fn create_device_group(&self, name: &str) -> Result<DeviceGroupId, Error> {
        self.inner.create_device_group(name).await
    }

    async fn add_device_to_group(&self, group: DeviceGroupId, device_index: u32) -> Result<(), Error> {
        self.inner.add_device_to_group(group, device_index).await
    }

    async fn destroy_device_group(&self, group: DeviceGroupId) -> Result<(), Error> {
        self.inner.destroy_device_group(group).await
    }

    async fn list_field_groups(&self) -> Result<Vec<FieldGroupInfo>, Error> {
        self.inner.list_field_groups().await
    }

    async fn create_field_group(&self, name: &str, fields: &[FieldId]) -> Result<FieldGroupId, Error> {
        self.inner.create_field_group(name, fields).await
    }

    async fn destroy_field_group(&self, group: FieldGroupId) -> Result<(), Error> {
        self.inner.destroy_field_group(group).await
    }

    async fn watch(
        &self,
        devices: DeviceGroupId,
        fields: FieldGroupId,
        policy: &WatchPolicy,
    ) -> Result<(), Error> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.watch.load(Ordering::SeqCst) {
            return Err(injected("watch"));
        }
        *self.last_policy.lock().unwrap() = Some(*policy);
        self.inner.watch(devices, fields, policy).await
    }

    async fn unwatch(&self, devices: DeviceGroupId, fields: FieldGroupId) -> Result<(), Error> {
        self.inner.unwatch(devices, fields).await
    }

    async fn latest_value(&self, device_index: u32, field: FieldId) -> Result<Sample, Error> {
        if self.faults.fetch.load(Ordering::SeqCst) {
            return Err(injected("fetch latest value"));
        }
        self.inner.latest_value(device_index, field).await
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Collect(Vec<(u32, Sample)>);

impl SampleSink for Collect {
    fn on_sample(&mut self, device_index: u32, sample: Sample) {
        self.0.push((device_index, sample));
    }
}

fn remote_config() -> ReaderConfig {
    ReaderConfig {
        endpoint: Endpoint::Remote {
            address: "gpu-node:50051".into(),
        },
        devices: Some(vec![0, 1]),
        fields: vec![FieldId::GPU_TEMP, FieldId::POWER_USAGE],
        update_interval: Duration::from_secs(1),
        max_keep_age: Duration::from_secs(60),
        max_keep_samples: 10,
        ..ReaderConfig::default()
    }
}

async fn reader_with(config: ReaderConfig) -> Reader<FaultySession, Collect> {
    Reader::with_session(FaultySession::new(vec![0, 1]), config, Collect::default())
        .await
        .unwrap()
}

// ── Reconciliation ──────────────────────────────────────────────────

#[tokio::test]
async fn test_reconcile_end_to_end_scenario() {
    let session = EmbeddedSession::with_devices(OperationMode::Auto, vec![0, 1]);
    let reconciler = GroupReconciler::new(&session);

    let first = reconciler.reconcile_device_group("g1", &[0, 1]).await.unwrap();
    assert!(first.created);

    let again = reconciler.reconcile_device_group("g1", &[0, 1]).await.unwrap();
    assert_eq!(again, Reconciled { id: first.id, created: false });

    let replaced = reconciler.reconcile_device_group("g1", &[0]).await.unwrap();
    assert!(replaced.created);
    assert_ne!(replaced.id, first.id);

    let ids: Vec<_> = session
        .list_device_groups()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert!(!ids.contains(&first.id));
    assert!(ids.contains(&replaced.id));
}

#[tokio::test]
async fn test_restarting_reader_reuses_groups() {
    let session = EmbeddedSession::with_devices(OperationMode::Auto, vec![0, 1]);
    let config = remote_config();

    let first = Reader::with_session(&session, config.clone(), Collect::default())
        .await
        .unwrap();
    let ids = (first.device_group_id(), first.field_group_id());
    drop(first.shutdown());

    let second = Reader::with_session(&session, config, Collect::default())
        .await
        .unwrap();
    assert_eq!((second.device_group_id(), second.field_group_id()), ids);
    assert_eq!(session.list_device_groups().await.unwrap().len(), 1);
}

// ── Initialization ──────────────────────────────────────────────────

#[tokio::test]
async fn test_initialization_watches_with_configured_policy() {
    let reader = reader_with(remote_config()).await;
    let session = reader.session();

    assert_eq!(session.watch_calls(), 1);
    assert_eq!(
        *session.last_policy.lock().unwrap(),
        Some(WatchPolicy {
            update_interval: Duration::from_secs(1),
            max_keep_age: Duration::from_secs(60),
            max_keep_samples: 10,
        })
    );
    assert_eq!(reader.devices(), &[0, 1]);
    assert_eq!(reader.state(), ReaderState::Watching);
}

#[tokio::test]
async fn test_initialization_fails_when_watch_fails() {
    let session = FaultySession::new(vec![0, 1]);
    FaultySession::set(&session.faults.watch, true);

    let result = Reader::with_session(session, remote_config(), Collect::default()).await;
    assert!(matches!(result, Err(gpuwatch_core::CoreError::Watch { .. })));
}

#[tokio::test]
async fn test_initialization_fails_when_groups_cannot_be_listed() {
    let session = FaultySession::new(vec![0, 1]);
    FaultySession::set(&session.faults.list_groups, true);

    let result = Reader::with_session(session, remote_config(), Collect::default()).await;
    assert!(matches!(
        result,
        Err(gpuwatch_core::CoreError::GroupOperation { .. })
    ));
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_process_converts_and_delivers_in_device_order() {
    let mut reader = reader_with(remote_config()).await;
    let engine = &reader.session().inner;
    engine
        .record(1, FieldId::POWER_USAGE, FieldValue::Integer(5_000_000))
        .await
        .unwrap();
    engine
        .record(0, FieldId::GPU_TEMP, FieldValue::Double(42_000.0))
        .await
        .unwrap();

    let outcome = reader.process().await;
    assert_eq!(outcome, PassOutcome::Delivered { samples: 2, skipped: 2 });

    let delivered: Vec<_> = reader
        .sink()
        .0
        .iter()
        .map(|(d, s)| (*d, s.field_id, s.value.clone()))
        .collect();
    assert_eq!(
        delivered,
        vec![
            (0, FieldId::GPU_TEMP, FieldValue::Double(42.0)),
            (1, FieldId::POWER_USAGE, FieldValue::Integer(5)),
        ]
    );
}

// ── Recovery trigger precision ──────────────────────────────────────

#[tokio::test]
async fn test_total_failure_runs_exactly_one_recovery() {
    let mut reader = reader_with(remote_config()).await;
    FaultySession::set(&reader.session().faults.fetch, true);

    let outcome = reader.process().await;
    assert_eq!(outcome, PassOutcome::TotalFailure { attempted: 4 });
    assert_eq!(reader.recoveries(), 1);
}

#[tokio::test]
async fn test_single_success_runs_no_recovery() {
    let mut reader = reader_with(remote_config()).await;
    reader
        .session()
        .inner
        .record(1, FieldId::GPU_TEMP, FieldValue::Integer(30_000))
        .await
        .unwrap();

    let outcome = reader.process().await;
    assert_eq!(outcome.delivered(), 1);
    assert_eq!(reader.recoveries(), 0);
}

#[tokio::test]
async fn test_empty_matrix_runs_no_recovery() {
    let no_devices = ReaderConfig {
        devices: Some(Vec::new()),
        ..remote_config()
    };
    let mut reader = reader_with(no_devices).await;
    FaultySession::set(&reader.session().faults.fetch, true);
    assert_eq!(reader.process().await, PassOutcome::Empty);
    assert_eq!(reader.recoveries(), 0);

    let no_fields = ReaderConfig {
        fields: Vec::new(),
        ..remote_config()
    };
    let mut reader = reader_with(no_fields).await;
    assert_eq!(reader.process().await, PassOutcome::Empty);
    assert_eq!(reader.recoveries(), 0);
}

#[tokio::test]
async fn test_embedded_endpoint_never_recovers() {
    let config = ReaderConfig {
        endpoint: Endpoint::Embedded {
            mode: OperationMode::Auto,
        },
        ..remote_config()
    };
    let mut reader = reader_with(config).await;
    reader.session().inner.restart().await;

    assert!(reader.process().await.is_total_failure());
    assert_eq!(reader.recoveries(), 0);
    assert_eq!(reader.state(), ReaderState::Watching);
    assert!(reader.session().inner.list_device_groups().await.unwrap().is_empty());
}

// ── Recovery re-watch gating ────────────────────────────────────────

#[tokio::test]
async fn test_recovery_with_intact_groups_does_not_rewatch() {
    let mut reader = reader_with(remote_config()).await;
    let ids = (reader.device_group_id(), reader.field_group_id());

    // watch is live, nothing recorded: every fetch fails
    reader.process().await;

    assert_eq!(reader.recoveries(), 1);
    assert_eq!(reader.session().watch_calls(), 1);
    assert_eq!((reader.device_group_id(), reader.field_group_id()), ids);
    assert_eq!(reader.state(), ReaderState::Watching);
}

#[tokio::test]
async fn test_service_restart_is_healed() {
    let mut reader = reader_with(remote_config()).await;
    let old_group = reader.device_group_id();
    reader.session().inner.restart().await;

    assert!(reader.process().await.is_total_failure());

    let session = reader.session();
    assert_eq!(session.watch_calls(), 2);
    assert_eq!(
        session.last_policy.lock().unwrap().map(|p| p.max_keep_samples),
        Some(10)
    );
    assert_ne!(reader.device_group_id(), old_group);
    assert_eq!(reader.state(), ReaderState::Watching);

    // samples flow again through the recreated watch
    session
        .inner
        .record(0, FieldId::GPU_TEMP, FieldValue::Integer(50_000))
        .await
        .unwrap();
    assert_eq!(reader.process().await.delivered(), 1);
    assert_eq!(reader.sink().0.last().map(|(_, s)| s.value.clone()), Some(FieldValue::Integer(50)));
}

// ── Recovery failure handling ───────────────────────────────────────

#[tokio::test]
async fn test_failed_recovery_is_swallowed_and_retried() {
    let mut reader = reader_with(remote_config()).await;
    reader.session().inner.restart().await;
    FaultySession::set(&reader.session().faults.list_groups, true);

    reader.process().await;
    assert_eq!(reader.state(), ReaderState::Recovering { attempts: 1 });
    reader.process().await;
    assert_eq!(reader.state(), ReaderState::Recovering { attempts: 2 });
    assert_eq!(reader.session().watch_calls(), 1);

    FaultySession::set(&reader.session().faults.list_groups, false);
    reader.process().await;
    assert_eq!(reader.state(), ReaderState::Watching);
    assert_eq!(reader.recoveries(), 3);
    assert_eq!(reader.session().watch_calls(), 2);
}

#[tokio::test]
async fn test_pending_rewatch_is_issued_although_groups_were_not_recreated() {
    let mut reader = reader_with(remote_config()).await;
    reader.session().inner.restart().await;
    FaultySession::set(&reader.session().faults.watch, true);

    reader.process().await;
    assert_eq!(reader.state(), ReaderState::Recovering { attempts: 1 });
    assert_eq!(reader.session().watch_calls(), 2);

    // the groups were recreated by the failed attempt, so the next
    // reconcile reports nothing new
    let reconciled = GroupReconciler::new(&reader.session().inner)
        .reconcile_device_group(DEFAULT_DEVICE_GROUP_NAME, reader.devices())
        .await
        .unwrap();
    assert!(!reconciled.created);

    FaultySession::set(&reader.session().faults.watch, false);
    reader.process().await;
    assert_eq!(reader.state(), ReaderState::Watching);
    assert_eq!(reader.session().watch_calls(), 3);

    // nothing pending any more: intact groups get no further watch
    reader.process().await;
    assert_eq!(reader.recoveries(), 3);
    assert_eq!(reader.session().watch_calls(), 3);
}
