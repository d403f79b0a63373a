//! Named layout of PM table version 0x240903 (Matisse, Castle Peak)

use serde::Serialize;

use zensmu_raw::current_arch::pm_table::{
    MATISSE_240903_ENTRIES, MATISSE_CORES, MATISSE_L3_COMPLEXES,
};

/// Sequential reader over the float array
struct FloatCursor<'a> {
    values: &'a [f32],
    position: usize,
}

impl<'a> FloatCursor<'a> {
    fn new(values: &'a [f32]) -> Self {
        Self {
            values,
            position: 0,
        }
    }

    fn scalar(&mut self) -> f32 {
        let value = self.values.get(self.position).copied().unwrap_or(0.0);
        self.position += 1;
        value
    }

    fn array<const N: usize>(&mut self) -> [f32; N] {
        let mut out = [0.0; N];
        for slot in out.iter_mut() {
            *slot = self.scalar();
        }
        out
    }
}

/// One LCLK (I/O clock) domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LclkDomain {
    pub setpoint: f32,
    pub busy: f32,
    pub freq: f32,
    pub freq_eff: f32,
    pub max_dpm: f32,
    pub min_dpm: f32,
}

impl LclkDomain {
    fn take(cursor: &mut FloatCursor<'_>) -> Self {
        Self {
            setpoint: cursor.scalar(),
            busy: cursor.scalar(),
            freq: cursor.scalar(),
            freq_eff: cursor.scalar(),
            max_dpm: cursor.scalar(),
            min_dpm: cursor.scalar(),
        }
    }
}

/// Fields in table order; units are W, A, V, degC, MHz (GHz for per-core
/// frequencies) and percent for residencies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatisseTable {
    // Limits and current values
    pub ppt_limit: f32,
    pub ppt_value: f32,
    pub tdc_limit: f32,
    pub tdc_value: f32,
    pub thm_limit: f32,
    pub thm_value: f32,
    pub fit_limit: f32,
    pub fit_value: f32,
    pub edc_limit: f32,
    pub edc_value: f32,
    pub vid_limit: f32,
    pub vid_value: f32,
    pub ppt_wc: f32,
    pub ppt_actual: f32,
    pub tdc_wc: f32,
    pub tdc_actual: f32,
    pub thm_wc: f32,
    pub thm_actual: f32,
    pub fit_wc: f32,
    pub fit_actual: f32,
    pub edc_wc: f32,
    pub edc_actual: f32,
    pub vid_wc: f32,
    pub vid_actual: f32,

    // Rail power
    pub vddcr_cpu_power: f32,
    pub vddcr_soc_power: f32,
    pub vddio_mem_power: f32,
    pub vdd18_power: f32,
    pub roc_power: f32,
    pub socket_power: f32,

    // Frequency limiters
    pub ppt_frequency: f32,
    pub tdc_frequency: f32,
    pub thm_frequency: f32,
    pub prochot_frequency: f32,
    pub voltage_frequency: f32,
    pub cca_frequency: f32,

    // Voltage telemetry
    pub fit_voltage: f32,
    pub fit_pre_voltage: f32,
    pub latchup_voltage: f32,
    pub cpu_set_voltage: f32,
    pub cpu_telemetry_voltage: f32,
    pub cpu_telemetry_current: f32,
    pub cpu_telemetry_power: f32,
    pub cpu_telemetry_power_alt: f32,
    pub soc_set_voltage: f32,
    pub soc_telemetry_voltage: f32,
    pub soc_telemetry_current: f32,
    pub soc_telemetry_power: f32,

    // Fabric
    pub fclk_freq: f32,
    pub fclk_freq_eff: f32,
    pub uclk_freq: f32,
    pub memclk_freq: f32,
    pub fclk_dram_setpoint: f32,
    pub fclk_dram_busy: f32,
    pub fclk_gmi_setpoint: f32,
    pub fclk_gmi_busy: f32,
    pub fclk_iohc_setpoint: f32,
    pub fclk_iohc_busy: f32,
    pub fclk_xgmi_setpoint: f32,
    pub fclk_xgmi_busy: f32,
    pub ccm_reads: f32,
    pub ccm_writes: f32,
    pub ioms: f32,
    pub xgmi: f32,
    pub cs_umc_reads: f32,
    pub cs_umc_writes: f32,
    pub fclk_residency: [f32; 4],
    pub fclk_freq_table: [f32; 4],
    pub uclk_freq_table: [f32; 4],
    pub memclk_freq_table: [f32; 4],
    pub fclk_voltage: [f32; 4],

    // LCLK
    pub lclk: [LclkDomain; 4],
    pub xgmi_setpoint: f32,
    pub xgmi_busy: f32,
    pub xgmi_lane_width: f32,
    pub xgmi_data_rate: f32,
    pub soc_power: f32,
    pub soc_temp: f32,
    pub ddr_vddp_power: f32,
    pub ddr_vddio_mem_power: f32,
    pub gmi2_vddg_power: f32,
    pub io_vddcr_soc_power: f32,
    pub iod_vddio_mem_power: f32,
    pub io_vdd18_power: f32,

    // Package
    pub tdp: f32,
    pub determinism: f32,
    pub v_vddm: f32,
    pub v_vddp: f32,
    pub v_vddg: f32,
    pub peak_temp: f32,
    pub peak_voltage: f32,
    pub avg_core_count: f32,
    pub cclk_limit: f32,
    pub max_voltage: f32,
    pub dc_btc: f32,
    pub cstate_boost: f32,
    pub prochot: f32,
    pub pc6: f32,
    pub pwm: f32,

    // Clocks
    pub socclk: f32,
    pub shubclk: f32,
    pub mp0clk: f32,
    pub mp1clk: f32,
    pub mp5clk: f32,
    pub smnclk: f32,
    pub twixclk: f32,
    pub waflclk: f32,
    pub dpm_busy: f32,
    pub mp1_busy: f32,

    // Per core
    pub core_power: [f32; MATISSE_CORES],
    pub core_voltage: [f32; MATISSE_CORES],
    pub core_temp: [f32; MATISSE_CORES],
    pub core_fit: [f32; MATISSE_CORES],
    pub core_iddmax: [f32; MATISSE_CORES],
    pub core_freq: [f32; MATISSE_CORES],
    pub core_freqeff: [f32; MATISSE_CORES],
    pub core_c0: [f32; MATISSE_CORES],
    pub core_cc1: [f32; MATISSE_CORES],
    pub core_cc6: [f32; MATISSE_CORES],
    pub core_cks_fdd: [f32; MATISSE_CORES],
    pub core_ci_fdd: [f32; MATISSE_CORES],
    pub core_irm: [f32; MATISSE_CORES],
    pub core_pstate: [f32; MATISSE_CORES],
    pub core_cppc_max: [f32; MATISSE_CORES],
    pub core_cppc_min: [f32; MATISSE_CORES],
    pub core_sc_limit: [f32; MATISSE_CORES],
    pub core_sc_cac: [f32; MATISSE_CORES],
    pub core_sc_residency: [f32; MATISSE_CORES],

    // Per L3 complex
    pub l3_logic_power: [f32; MATISSE_L3_COMPLEXES],
    pub l3_vddm_power: [f32; MATISSE_L3_COMPLEXES],
    pub l3_temp: [f32; MATISSE_L3_COMPLEXES],
    pub l3_fit: [f32; MATISSE_L3_COMPLEXES],
    pub l3_iddmax: [f32; MATISSE_L3_COMPLEXES],
    pub l3_freq: [f32; MATISSE_L3_COMPLEXES],
    pub l3_cks_fdd: [f32; MATISSE_L3_COMPLEXES],
    pub l3_cca_threshold: [f32; MATISSE_L3_COMPLEXES],
    pub l3_cca_cac: [f32; MATISSE_L3_COMPLEXES],
    pub l3_cca_activation: [f32; MATISSE_L3_COMPLEXES],
    pub l3_edc_limit: [f32; MATISSE_L3_COMPLEXES],
    pub l3_edc_cac: [f32; MATISSE_L3_COMPLEXES],
    pub l3_edc_residency: [f32; MATISSE_L3_COMPLEXES],
    pub mp5_busy: f32,
}

impl MatisseTable {
    /// Overlay the layout on a decoded table
    ///
    /// Returns `None` when the table is shorter than the layout.
    pub fn decode(values: &[f32]) -> Option<Self> {
        if values.len() < MATISSE_240903_ENTRIES {
            return None;
        }
        let mut cursor = FloatCursor::new(values);
        let table = Self {
            ppt_limit: cursor.scalar(),
            ppt_value: cursor.scalar(),
            tdc_limit: cursor.scalar(),
            tdc_value: cursor.scalar(),
            thm_limit: cursor.scalar(),
            thm_value: cursor.scalar(),
            fit_limit: cursor.scalar(),
            fit_value: cursor.scalar(),
            edc_limit: cursor.scalar(),
            edc_value: cursor.scalar(),
            vid_limit: cursor.scalar(),
            vid_value: cursor.scalar(),
            ppt_wc: cursor.scalar(),
            ppt_actual: cursor.scalar(),
            tdc_wc: cursor.scalar(),
            tdc_actual: cursor.scalar(),
            thm_wc: cursor.scalar(),
            thm_actual: cursor.scalar(),
            fit_wc: cursor.scalar(),
            fit_actual: cursor.scalar(),
            edc_wc: cursor.scalar(),
            edc_actual: cursor.scalar(),
            vid_wc: cursor.scalar(),
            vid_actual: cursor.scalar(),
            vddcr_cpu_power: cursor.scalar(),
            vddcr_soc_power: cursor.scalar(),
            vddio_mem_power: cursor.scalar(),
            vdd18_power: cursor.scalar(),
            roc_power: cursor.scalar(),
            socket_power: cursor.scalar(),
            ppt_frequency: cursor.scalar(),
            tdc_frequency: cursor.scalar(),
            thm_frequency: cursor.scalar(),
            prochot_frequency: cursor.scalar(),
            voltage_frequency: cursor.scalar(),
            cca_frequency: cursor.scalar(),
            fit_voltage: cursor.scalar(),
            fit_pre_voltage: cursor.scalar(),
            latchup_voltage: cursor.scalar(),
            cpu_set_voltage: cursor.scalar(),
            cpu_telemetry_voltage: cursor.scalar(),
            cpu_telemetry_current: cursor.scalar(),
            cpu_telemetry_power: cursor.scalar(),
            cpu_telemetry_power_alt: cursor.scalar(),
            soc_set_voltage: cursor.scalar(),
            soc_telemetry_voltage: cursor.scalar(),
            soc_telemetry_current: cursor.scalar(),
            soc_telemetry_power: cursor.scalar(),
            fclk_freq: cursor.scalar(),
            fclk_freq_eff: cursor.scalar(),
            uclk_freq: cursor.scalar(),
            memclk_freq: cursor.scalar(),
            fclk_dram_setpoint: cursor.scalar(),
            fclk_dram_busy: cursor.scalar(),
            fclk_gmi_setpoint: cursor.scalar(),
            fclk_gmi_busy: cursor.scalar(),
            fclk_iohc_setpoint: cursor.scalar(),
            fclk_iohc_busy: cursor.scalar(),
            fclk_xgmi_setpoint: cursor.scalar(),
            fclk_xgmi_busy: cursor.scalar(),
            ccm_reads: cursor.scalar(),
            ccm_writes: cursor.scalar(),
            ioms: cursor.scalar(),
            xgmi: cursor.scalar(),
            cs_umc_reads: cursor.scalar(),
            cs_umc_writes: cursor.scalar(),
            fclk_residency: cursor.array(),
            fclk_freq_table: cursor.array(),
            uclk_freq_table: cursor.array(),
            memclk_freq_table: cursor.array(),
            fclk_voltage: cursor.array(),
            lclk: [(); 4].map(|_| LclkDomain::take(&mut cursor)),
            xgmi_setpoint: cursor.scalar(),
            xgmi_busy: cursor.scalar(),
            xgmi_lane_width: cursor.scalar(),
            xgmi_data_rate: cursor.scalar(),
            soc_power: cursor.scalar(),
            soc_temp: cursor.scalar(),
            ddr_vddp_power: cursor.scalar(),
            ddr_vddio_mem_power: cursor.scalar(),
            gmi2_vddg_power: cursor.scalar(),
            io_vddcr_soc_power: cursor.scalar(),
            iod_vddio_mem_power: cursor.scalar(),
            io_vdd18_power: cursor.scalar(),
            tdp: cursor.scalar(),
            determinism: cursor.scalar(),
            v_vddm: cursor.scalar(),
            v_vddp: cursor.scalar(),
            v_vddg: cursor.scalar(),
            peak_temp: cursor.scalar(),
            peak_voltage: cursor.scalar(),
            avg_core_count: cursor.scalar(),
            cclk_limit: cursor.scalar(),
            max_voltage: cursor.scalar(),
            dc_btc: cursor.scalar(),
            cstate_boost: cursor.scalar(),
            prochot: cursor.scalar(),
            pc6: cursor.scalar(),
            pwm: cursor.scalar(),
            socclk: cursor.scalar(),
            shubclk: cursor.scalar(),
            mp0clk: cursor.scalar(),
            mp1clk: cursor.scalar(),
            mp5clk: cursor.scalar(),
            smnclk: cursor.scalar(),
            twixclk: cursor.scalar(),
            waflclk: cursor.scalar(),
            dpm_busy: cursor.scalar(),
            mp1_busy: cursor.scalar(),
            core_power: cursor.array(),
            core_voltage: cursor.array(),
            core_temp: cursor.array(),
            core_fit: cursor.array(),
            core_iddmax: cursor.array(),
            core_freq: cursor.array(),
            core_freqeff: cursor.array(),
            core_c0: cursor.array(),
            core_cc1: cursor.array(),
            core_cc6: cursor.array(),
            core_cks_fdd: cursor.array(),
            core_ci_fdd: cursor.array(),
            core_irm: cursor.array(),
            core_pstate: cursor.array(),
            core_cppc_max: cursor.array(),
            core_cppc_min: cursor.array(),
            core_sc_limit: cursor.array(),
            core_sc_cac: cursor.array(),
            core_sc_residency: cursor.array(),
            l3_logic_power: cursor.array(),
            l3_vddm_power: cursor.array(),
            l3_temp: cursor.array(),
            l3_fit: cursor.array(),
            l3_iddmax: cursor.array(),
            l3_freq: cursor.array(),
            l3_cks_fdd: cursor.array(),
            l3_cca_threshold: cursor.array(),
            l3_cca_cac: cursor.array(),
            l3_cca_activation: cursor.array(),
            l3_edc_limit: cursor.array(),
            l3_edc_cac: cursor.array(),
            l3_edc_residency: cursor.array(),
            mp5_busy: cursor.scalar(),
        };
        debug_assert_eq!(cursor.position, MATISSE_240903_ENTRIES);
        Some(table)
    }
}
