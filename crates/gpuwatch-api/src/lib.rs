//! Client boundary for a GPU telemetry service.
//!
//! The service (a standalone daemon reached over the network, or an engine
//! started inside this process) owns hardware sampling and retention. This
//! crate exposes the logical operations the reader issues against it:
//!
//! - **[`Session`]**: device/field group enumeration and mutation,
//!   watch/unwatch, latest-value fetch and device listing.
//! - **[`RemoteSession`]**: JSON over HTTP(S) to a telemetry gateway, with
//!   optional mutual TLS built from [`TlsCredentials`].
//! - **[`EmbeddedSession`]**: an in-process service keeping its group,
//!   watch and value tables in memory.
//! - **[`Connection`]**: either of the above, chosen at startup.
//!
//! Model types ([`FieldId`], [`Sample`], [`FieldValue`], group infos) are
//! shared by both implementations and by `gpuwatch-core`.

pub mod embedded;
pub mod error;
pub mod model;
pub mod remote;
pub mod session;
pub mod transport;

pub use embedded::EmbeddedSession;
pub use error::Error;
pub use model::{
    DeviceGroupId, DeviceGroupInfo, FieldDescriptor, FieldGroupId, FieldGroupInfo, FieldId,
    FieldType, FieldValue, OperationMode, Sample, ServiceStatus, UnknownFieldError, WatchPolicy,
};
pub use remote::RemoteSession;
pub use session::{Connection, Session};
pub use transport::{TlsCredentials, TransportConfig};
