//! AMD Zen SMU register definitions
//!
//! This module provides the constants and register layouts used to drive the
//! System Management Unit of AMD Zen processors from the host.
//!
//! ## Components
//!
//! - **Mailbox** - Status codes, command ids and poll budget shared by the
//!   RSMU, MP1 and HSMP command channels
//! - **PSM** - Per-core voltage margin (curve optimizer) commands and wire
//!   encodings
//! - **Fuse** - CCD / core fuse registers used to derive the core topology
//! - **UMC** - DRAM controller timing registers
//! - **PM table** - Telemetry table limits and known layout versions
//!
//! ## References
//!
//! - ryzen_smu kernel driver sysfs ABI
//! - ZenStates-Core command tables

pub mod fuse;
pub mod mailbox;
pub mod pm_table;
pub mod psm;
pub mod umc;
