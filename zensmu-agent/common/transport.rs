//! Register transport seam
//!
//! Everything above this trait is pure protocol logic; everything below it
//! touches the kernel driver. Tests substitute `common::mock::MockTransport`.

use crate::error::Result;
use crate::mailbox::{CommandReply, CommandRequest, MailboxKind};

/// Metadata the driver publishes once it has bound to the SMU
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverInfo {
    /// Driver codename id, see `Codename::from_driver_id`
    pub codename_id: u32,
    /// Raw firmware version word
    pub smu_version: u32,
    /// MP1 interface version index, see `InterfaceVersion::from_driver_index`
    pub if_version_index: u32,
    /// PM table size in bytes, `None` when the platform has no PM table
    pub pm_table_size: Option<u64>,
    pub pm_table_version: Option<u32>,
}

/// Synchronous access to SMN registers and the driver's mailbox primitive
pub trait Transport: Send + Sync {
    fn read_smn(&self, addr: u32) -> Result<u32>;

    fn write_smn(&self, addr: u32, value: u32) -> Result<()>;

    /// Run one mailbox transaction on a driver-known mailbox
    ///
    /// The reply carries whatever argument words the driver returned; the
    /// session is responsible for the read-back-on-success rule.
    fn submit(&self, kind: MailboxKind, request: &CommandRequest) -> Result<CommandReply>;

    fn driver_info(&self) -> Result<DriverInfo>;

    /// Copy the current PM table into `buffer`, returning the bytes written
    fn read_pm_table(&self, buffer: &mut [u8]) -> Result<usize>;
}
