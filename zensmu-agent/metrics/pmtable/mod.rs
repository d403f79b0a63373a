pub mod types;

pub use types::{PmCoreMetric, PmSummaryMetric};
