pub mod codename;
pub mod cpuid;
pub mod driver;
#[cfg(test)]
pub mod mock;
pub mod transport;

pub use codename::{Codename, InterfaceVersion};
pub use cpuid::{CpuSignature, CPU_SIGNATURE};
pub use driver::{SysfsTransport, DEFAULT_DRIVER_ROOT};
pub use transport::{DriverInfo, Transport};
