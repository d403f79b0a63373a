// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod catalog;
pub mod common;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod metrics;
pub mod orchestrator;
pub mod pmtable;
pub mod prom;
pub mod report;
pub mod scanner;
pub mod session;
pub mod timings;
pub mod topology;

pub use common::{SysfsTransport, Transport, DEFAULT_DRIVER_ROOT};
pub use config::ExportConfig;
pub use error::{Result, SmuError};
pub use mailbox::{CommandReply, CommandRequest, MailboxAddressSet, MailboxKind, PollPolicy};
pub use orchestrator::{CollectorConfig, MetricCollector};
pub use prom::{PmTableMetricExporter, SmuMetricExporter};
pub use report::SystemReport;
pub use scanner::ScanOptions;
pub use session::{PlatformIdentity, Session};
pub use topology::Topology;
