//! PM table codec
//!
//! The raw view is always available. The named view and the derived
//! summary exist only for table versions with a known layout.

pub mod matisse;
pub mod snapshot;
pub mod summary;

pub use matisse::{LclkDomain, MatisseTable};
pub use snapshot::{NamedTable, PmTableSnapshot};
pub use summary::{CoreTelemetry, TelemetrySummary};
