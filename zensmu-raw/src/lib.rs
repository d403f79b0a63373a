//! # zensmu-raw
//!
//! Register definitions for the AMD Zen System Management Unit (SMU).
//!
//! This crate provides type-safe abstractions over SMN (System Management
//! Network) register access and the hardware constants needed to talk to the
//! SMU mailboxes: status codes, command ids, fuse layouts, PM table limits
//! and memory controller timing registers.
//!
//! ## Features
//!
//! - `zen` (default) - Zen / Zen+ / Zen 2 / Zen 3 / Zen 4 / Zen 5 definitions
//!
//! ## Usage
//!
//! ```ignore
//! use zensmu_raw::current_arch::fuse::{self, CcdFuse};
//! use zensmu_raw::smn::{open_smn, read_smn};
//! use zensmu_raw::RegisterLayout;
//!
//! let mut smn = open_smn(Path::new("/sys/kernel/ryzen_smu_drv"))?;
//! let (lo, hi) = fuse::ccd_fuse_addresses(0x19, 0x21);
//! let ccd = CcdFuse::from_words(read_smn(&mut smn, lo)?, read_smn(&mut smn, hi)?);
//! ```

pub mod arch;
pub mod register;
pub mod smn;

pub use register::RegisterLayout;
pub use smn::{read_smn, write_smn, Result, SmnError};

#[cfg(feature = "zen")]
pub use arch::zen as current_arch;
