//! Derived telemetry on top of the Matisse layout
//!
//! Per-core voltage is estimated by blending the package average voltage
//! with the sleep-state voltage by each core's CC6 residency.

use serde::Serialize;

use zensmu_raw::current_arch::pm_table::{MATISSE_CORES, SLEEP_VOLTAGE};

use crate::pmtable::matisse::MatisseTable;

/// C0 residency below which a core is reported as sleeping
const ACTIVE_C0_PERCENT: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoreTelemetry {
    pub index: u32,
    pub frequency_mhz: f32,
    pub power_w: f32,
    pub voltage_v: f32,
    pub temperature_c: f32,
    pub c0_percent: f32,
    pub cc1_percent: f32,
    pub cc6_percent: f32,
    pub sleeping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySummary {
    pub cores: Vec<CoreTelemetry>,
    pub peak_core_frequency_mhz: f32,
    pub peak_temperature_c: f32,
    pub package_power_w: f32,
    pub peak_core_voltage_v: f32,
    pub average_core_voltage_v: f32,
    pub package_c6_percent: f32,
    pub core_c6_average_percent: f32,
    pub thermal_limit_c: f32,
    pub temperature_c: f32,
    pub soc_temperature_c: f32,
    pub core_power_w: f32,
    pub soc_power_w: f32,
    pub soc_current_a: f32,
    pub soc_voltage_v: f32,
    pub ppt_w: f32,
    pub ppt_limit_w: f32,
    pub tdc_a: f32,
    pub tdc_limit_a: f32,
    pub edc_a: f32,
    pub edc_limit_a: f32,
    pub frequency_limit_mhz: f32,
    pub coupled_mode: bool,
    pub fclk_average_mhz: f32,
    pub fclk_mhz: f32,
    pub uclk_mhz: f32,
    pub memclk_mhz: f32,
    pub dram_read_gibps: f32,
    pub dram_write_gibps: f32,
    pub vddcr_soc_v: f32,
    pub vddm_v: f32,
    pub vddp_v: f32,
    pub vddg_v: f32,
}

/// Blend the package average voltage with the sleep voltage
pub fn blended_voltage(average: f32, sleep_fraction: f32) -> f32 {
    (1.0 - sleep_fraction) * average + SLEEP_VOLTAGE * sleep_fraction
}

/// Package average voltage with package C6 time taken out
pub fn average_voltage(table: &MatisseTable) -> f32 {
    let package_sleep = table.pc6 / 100.0;
    (table.cpu_telemetry_voltage - SLEEP_VOLTAGE * package_sleep) / (1.0 - package_sleep)
}

impl TelemetrySummary {
    /// Summarize a table for a CPU with `physical_cores` cores
    ///
    /// Only the first eight cores have per-core entries; averages still
    /// divide by the full physical core count.
    pub fn from_table(table: &MatisseTable, physical_cores: u32) -> Self {
        let average = average_voltage(table);
        let shown = (physical_cores as usize).min(MATISSE_CORES);

        let mut cores = Vec::with_capacity(shown);
        let mut peak_frequency = 0.0f32;
        let mut total_c0 = 0.0f32;
        let mut total_c6 = 0.0f32;
        let mut total_voltage = 0.0f32;

        for i in 0..shown {
            let frequency = table.core_freqeff[i] * 1000.0;
            let voltage = blended_voltage(average, table.core_cc6[i] / 100.0);

            peak_frequency = peak_frequency.max(frequency);
            total_c0 += table.core_c0[i];
            total_c6 += table.core_cc6[i];
            if table.core_freq[i] != 0.0 {
                total_voltage += voltage;
            }

            cores.push(CoreTelemetry {
                index: i as u32,
                frequency_mhz: frequency,
                power_w: table.core_power[i],
                voltage_v: voltage,
                temperature_c: table.core_temp[i],
                c0_percent: table.core_c0[i],
                cc1_percent: table.core_cc1[i],
                cc6_percent: table.core_cc6[i],
                sleeping: table.core_c0[i] < ACTIVE_C0_PERCENT,
            });
        }

        // No cores means no averages
        let per_core = |total: f32| {
            if physical_cores == 0 {
                0.0
            } else {
                total / physical_cores as f32
            }
        };
        let edc = (table.edc_value * (per_core(total_c0) / 100.0)).max(table.tdc_value);

        Self {
            cores,
            peak_core_frequency_mhz: peak_frequency,
            peak_temperature_c: table.peak_temp,
            package_power_w: table.socket_power,
            peak_core_voltage_v: table.cpu_telemetry_voltage,
            average_core_voltage_v: per_core(total_voltage),
            package_c6_percent: table.pc6,
            core_c6_average_percent: per_core(total_c6),
            thermal_limit_c: table.thm_limit,
            temperature_c: table.thm_value,
            soc_temperature_c: table.soc_temp,
            core_power_w: table.vddcr_cpu_power,
            soc_power_w: table.soc_telemetry_power,
            soc_current_a: table.soc_telemetry_current,
            soc_voltage_v: table.soc_telemetry_voltage,
            ppt_w: table.ppt_value,
            ppt_limit_w: table.ppt_limit,
            tdc_a: table.tdc_value,
            tdc_limit_a: table.tdc_limit,
            edc_a: edc,
            edc_limit_a: table.edc_limit,
            frequency_limit_mhz: table.cclk_limit * 1000.0,
            coupled_mode: table.uclk_freq == table.memclk_freq,
            fclk_average_mhz: table.fclk_freq_eff,
            fclk_mhz: table.fclk_freq,
            uclk_mhz: table.uclk_freq,
            memclk_mhz: table.memclk_freq,
            dram_read_gibps: table.cs_umc_reads,
            dram_write_gibps: table.cs_umc_writes,
            vddcr_soc_v: table.soc_set_voltage,
            vddm_v: table.v_vddm,
            vddp_v: table.v_vddp,
            vddg_v: table.v_vddg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zensmu_raw::current_arch::pm_table::MATISSE_240903_ENTRIES;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4 * b.abs().max(1.0)
    }

    fn table() -> MatisseTable {
        let mut table = MatisseTable::decode(&vec![0.0; MATISSE_240903_ENTRIES]).unwrap();
        table.cpu_telemetry_voltage = 1.2;
        table.pc6 = 0.0;
        table.edc_value = 100.0;
        table.tdc_value = 30.0;
        table.cclk_limit = 4.7;
        table.uclk_freq = 1800.0;
        table.memclk_freq = 1800.0;
        for i in 0..8 {
            table.core_freq[i] = 4.0;
            table.core_freqeff[i] = 4.0 + i as f32 * 0.1;
            table.core_c0[i] = 50.0;
        }
        table
    }

    #[test]
    fn test_voltage_blending() {
        assert!(close(blended_voltage(1.2, 0.0), 1.2));
        assert!(close(blended_voltage(1.2, 1.0), 0.2));
        assert!(close(blended_voltage(1.0, 0.5), 0.6));

        let mut t = table();
        t.pc6 = 50.0;
        t.cpu_telemetry_voltage = 0.7;
        // (0.7 - 0.1) / 0.5
        assert!(close(average_voltage(&t), 1.2));
    }

    #[test]
    fn test_summary() {
        let summary = TelemetrySummary::from_table(&table(), 8);

        assert_eq!(summary.cores.len(), 8);
        assert!(close(summary.peak_core_frequency_mhz, 4700.0));
        assert!(close(summary.average_core_voltage_v, 1.2));
        // 100 A * 50% usage
        assert!(close(summary.edc_a, 50.0));
        assert!(close(summary.frequency_limit_mhz, 4700.0));
        assert!(summary.coupled_mode);
        assert!(!summary.cores[0].sleeping);
    }

    #[test]
    fn test_edc_floored_at_tdc() {
        let mut t = table();
        for i in 0..8 {
            t.core_c0[i] = 10.0;
        }
        let summary = TelemetrySummary::from_table(&t, 8);
        assert!(close(summary.edc_a, 30.0));
    }

    #[test]
    fn test_more_cores_than_entries() {
        let summary = TelemetrySummary::from_table(&table(), 16);
        assert_eq!(summary.cores.len(), 8);
        // only half the cores contribute, averaged over all 16
        assert!(close(summary.average_core_voltage_v, 0.6));
    }

    #[test]
    fn test_zero_physical_cores() {
        let summary = TelemetrySummary::from_table(&table(), 0);
        assert!(summary.cores.is_empty());
        assert_eq!(summary.average_core_voltage_v, 0.0);
        assert_eq!(summary.core_c6_average_percent, 0.0);
        assert!(close(summary.edc_a, 30.0));
        assert!(summary.edc_a.is_finite());
    }
}
