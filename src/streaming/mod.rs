//! TCP streaming to and from the middleware side
//!
//! The odometry core talks to the middleware through the narrow
//! [`OdometrySink`] boundary; everything else in this module is transport
//! plumbing around it.

pub mod frame;
pub mod messages;

mod command_server;
mod publisher;

pub use command_server::CommandServer;
pub use publisher::TcpPublisher;

use crate::error::{Error, Result};
use messages::{OdometryRecord, TransformRecord};

/// Outbound collaborator boundary for integrated odometry
///
/// Receives one pose+twist record and the matching frame transform per
/// successfully decoded encoder sample, both carrying the same capture time.
pub trait OdometrySink: Send + Sync {
    fn publish(&self, odometry: OdometryRecord, transform: TransformRecord) -> Result<()>;
}

/// Channel-backed sink, used by tests and in-process consumers
impl OdometrySink for crossbeam_channel::Sender<(OdometryRecord, TransformRecord)> {
    fn publish(&self, odometry: OdometryRecord, transform: TransformRecord) -> Result<()> {
        self.send((odometry, transform))
            .map_err(|_| Error::Other("odometry sink channel disconnected".to_string()))
    }
}
