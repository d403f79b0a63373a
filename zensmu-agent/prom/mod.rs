pub mod pmtable;
pub mod smu;

pub use pmtable::PmTableMetricExporter;
pub use smu::SmuMetricExporter;
