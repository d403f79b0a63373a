// PM table metrics derived from the named layout
use crate::metric_enum;
use crate::pmtable::{CoreTelemetry, TelemetrySummary};

metric_enum! {
    pub enum PmSummaryMetric {
        PeakCoreFrequency => "PeakCoreFrequencyMHz",
        PeakTemperature => "PeakTemperature",
        PackagePower => "PackagePower",
        PeakCoreVoltage => "PeakCoreVoltage",
        AverageCoreVoltage => "AverageCoreVoltage",
        PackageC6 => "PackageC6",
        CoreC6Average => "CoreC6Average",
        Temperature => "Temperature",
        SocTemperature => "SocTemperature",
        CorePower => "CorePower",
        SocPower => "SocPower",
        Ppt => "PPT",
        PptLimit => "PPTLimit",
        Tdc => "TDC",
        TdcLimit => "TDCLimit",
        Edc => "EDC",
        EdcLimit => "EDCLimit",
        FrequencyLimit => "FrequencyLimitMHz",
        CoupledMode => "CoupledMode",
        FabricClock => "FabricClockMHz",
        MemoryClock => "MemoryClockMHz",
        DramReadBandwidth => "DRAMReadBandwidth",
        DramWriteBandwidth => "DRAMWriteBandwidth",
    }
}

impl PmSummaryMetric {
    pub fn value(&self, summary: &TelemetrySummary) -> f64 {
        let value = match self {
            PmSummaryMetric::PeakCoreFrequency => summary.peak_core_frequency_mhz,
            PmSummaryMetric::PeakTemperature => summary.peak_temperature_c,
            PmSummaryMetric::PackagePower => summary.package_power_w,
            PmSummaryMetric::PeakCoreVoltage => summary.peak_core_voltage_v,
            PmSummaryMetric::AverageCoreVoltage => summary.average_core_voltage_v,
            PmSummaryMetric::PackageC6 => summary.package_c6_percent,
            PmSummaryMetric::CoreC6Average => summary.core_c6_average_percent,
            PmSummaryMetric::Temperature => summary.temperature_c,
            PmSummaryMetric::SocTemperature => summary.soc_temperature_c,
            PmSummaryMetric::CorePower => summary.core_power_w,
            PmSummaryMetric::SocPower => summary.soc_power_w,
            PmSummaryMetric::Ppt => summary.ppt_w,
            PmSummaryMetric::PptLimit => summary.ppt_limit_w,
            PmSummaryMetric::Tdc => summary.tdc_a,
            PmSummaryMetric::TdcLimit => summary.tdc_limit_a,
            PmSummaryMetric::Edc => summary.edc_a,
            PmSummaryMetric::EdcLimit => summary.edc_limit_a,
            PmSummaryMetric::FrequencyLimit => summary.frequency_limit_mhz,
            PmSummaryMetric::CoupledMode => {
                if summary.coupled_mode {
                    1.0
                } else {
                    0.0
                }
            }
            PmSummaryMetric::FabricClock => summary.fclk_mhz,
            PmSummaryMetric::MemoryClock => summary.memclk_mhz,
            PmSummaryMetric::DramReadBandwidth => summary.dram_read_gibps,
            PmSummaryMetric::DramWriteBandwidth => summary.dram_write_gibps,
        };
        value as f64
    }
}

metric_enum! {
    pub enum PmCoreMetric {
        Frequency => "CoreFrequencyMHz",
        Voltage => "CoreVoltage",
        Power => "CorePowerWatts",
        Temperature => "CoreTemperature",
        C0 => "CoreC0",
        Cc1 => "CoreCC1",
        Cc6 => "CoreCC6",
    }
}

impl PmCoreMetric {
    pub fn value(&self, core: &CoreTelemetry) -> f64 {
        let value = match self {
            PmCoreMetric::Frequency => core.frequency_mhz,
            PmCoreMetric::Voltage => core.voltage_v,
            PmCoreMetric::Power => core.power_w,
            PmCoreMetric::Temperature => core.temperature_c,
            PmCoreMetric::C0 => core.c0_percent,
            PmCoreMetric::Cc1 => core.cc1_percent,
            PmCoreMetric::Cc6 => core.cc6_percent,
        };
        value as f64
    }
}
