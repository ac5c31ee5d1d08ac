//! Client-side lifecycle for a GPU telemetry service.
//!
//! Given a desired set of devices and metric fields, this crate keeps a
//! watch alive on the service and pulls the latest values on demand:
//!
//! - **[`Reader`]**: connects (or embeds), reconciles its groups, starts
//!   the watch, then turns every [`process()`](Reader::process) call into
//!   one sampling pass delivered to a [`SampleSink`].
//! - **[`GroupReconciler`]**: create-or-reuse-or-replace for named device
//!   and field groups, keyed by name and compared by ordered membership.
//! - **[`WatchManager`]**: clears any stale watch, then watches with the
//!   configured retention policy.
//! - **[`Poller`]**: one pass over the device x field matrix with unit
//!   conversion from a [`UnitConversionTable`].
//! - **[`ReconnectMonitor`]**: turns a pass with zero successful fetches
//!   into a reconcile-and-rewatch attempt against a standalone service.
//!
//! The crate owns no timer or thread; callers drive `process()` on their
//! own cadence. Steady-state failures never surface as errors.

pub mod config;
pub mod error;
pub mod fields;
pub mod poller;
pub mod reader;
pub mod reconcile;
pub mod recovery;
pub mod sink;
pub mod watch;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{Endpoint, ReaderConfig};
pub use error::CoreError;
pub use fields::{UnitConversionTable, default_fields};
pub use poller::{PassOutcome, Poller};
pub use reader::Reader;
pub use reconcile::{GroupReconciler, Reconciled};
pub use recovery::{ReaderState, ReconnectMonitor};
pub use sink::SampleSink;
pub use watch::{WatchManager, WatchSpec, WatchTarget};

// The api types consumers touch most often.
pub use gpuwatch_api::{
    Connection, FieldId, FieldValue, OperationMode, Sample, ServiceStatus, Session,
    TlsCredentials,
};
pub use gpuwatch_api::Error as ApiError;
