pub mod types;

pub use types::SmuMetric;
