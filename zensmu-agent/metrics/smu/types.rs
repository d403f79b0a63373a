// Metrics read back through RSMU commands
use crate::metric_enum;

metric_enum! {
    pub enum SmuMetric {
        MaxFrequency => "MaxFrequencyMHz",
        CurveOptimizerMargin => "CurveOptimizerMargin",
    }
}
