//! UMC (Unified Memory Controller) timing register definitions
//!
//! DRAM timings are programmed by firmware into the UMC and can be read back
//! over SMN. Channel B sits 0x100000 above channel A; the first populated
//! channel is found by checking the configuration register.
//!
//! ## References
//!
//! - ZenTimings / monitor_cpu register maps

use crate::register::RegisterLayout;

/// SMN addresses of the channel A timing registers
pub mod smn {
    pub const BANK_GROUP_SWAP: [u32; 2] = [0x50050, 0x50058];
    pub const BANK_GROUP_SWAP_ALT: [u32; 2] = [0x500D0, 0x500D4];
    pub const DRAM_CONFIG: u32 = 0x50200;
    pub const DRAM_TIMING1: u32 = 0x50204;
    pub const DRAM_TIMING2: u32 = 0x50208;
    pub const DRAM_TIMING3: u32 = 0x5020C;
    pub const DRAM_TIMING4: u32 = 0x50210;
    pub const DRAM_TIMING5: u32 = 0x50214;
    pub const DRAM_TIMING6: u32 = 0x50218;
    pub const DRAM_TIMING7: u32 = 0x50220;
    pub const DRAM_TIMING8: u32 = 0x50224;
    pub const DRAM_TIMING9: u32 = 0x50228;
    pub const DRAM_TIMING10: u32 = 0x50254;
    pub const DRAM_REFRESH: [u32; 2] = [0x50260, 0x50264];
}

/// Value of `DRAM_CONFIG` on channel A when channel A is unpopulated
pub const CHANNEL_A_EMPTY: u32 = 0x300;

/// Offset from channel A to channel B registers
pub const CHANNEL_B_OFFSET: u32 = 0x10_0000;

/// Both bank group swap words hold this value when swapping is off
pub const BANK_GROUP_SWAP_OFF: u32 = 0x8765_4321;

/// Stale refresh word some AGESA versions leave in the first slot
pub const REFRESH_STALE: u32 = 0x2106_0138;

fn field(value: u32, shift: u32, mask: u32) -> u8 {
    ((value >> shift) & mask) as u8
}

fn place(value: u8, shift: u32, mask: u32) -> u32 {
    (value as u32 & mask) << shift
}

/// DRAM configuration register
///
/// | Bits  | Field      |
/// |-------|------------|
/// | 0-6   | mem_ratio  |
/// | 10    | cmd_2t     |
/// | 11    | gear_down  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramConfig {
    pub mem_ratio: u8,
    pub cmd_2t: bool,
    pub gear_down: bool,
}

impl DramConfig {
    /// Memory clock in MHz (ratio is in 33.3 MHz steps)
    pub fn memory_clock_mhz(&self) -> f32 {
        self.mem_ratio as f32 / 3.0 * 100.0
    }
}

impl RegisterLayout for DramConfig {
    fn to_reg_value(&self) -> u32 {
        place(self.mem_ratio, 0, 0x7F)
            | (if self.cmd_2t { 1 << 10 } else { 0 })
            | (if self.gear_down { 1 << 11 } else { 0 })
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            mem_ratio: field(value, 0, 0x7F),
            cmd_2t: (value & (1 << 10)) != 0,
            gear_down: (value & (1 << 11)) != 0,
        }
    }
}

/// Primary timings: tCL, tRAS, tRCDRD, tRCDWR
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming1 {
    pub tcl: u8,
    pub tras: u8,
    pub trcdrd: u8,
    pub trcdwr: u8,
}

impl RegisterLayout for DramTiming1 {
    fn to_reg_value(&self) -> u32 {
        place(self.tcl, 0, 0x3F)
            | place(self.tras, 8, 0x7F)
            | place(self.trcdrd, 16, 0x3F)
            | place(self.trcdwr, 24, 0x3F)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            tcl: field(value, 0, 0x3F),
            tras: field(value, 8, 0x7F),
            trcdrd: field(value, 16, 0x3F),
            trcdwr: field(value, 24, 0x3F),
        }
    }
}

/// tRC and tRP
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming2 {
    pub trc: u8,
    pub trp: u8,
}

impl RegisterLayout for DramTiming2 {
    fn to_reg_value(&self) -> u32 {
        place(self.trc, 0, 0xFF) | place(self.trp, 16, 0x3F)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            trc: field(value, 0, 0xFF),
            trp: field(value, 16, 0x3F),
        }
    }
}

/// tRRDS, tRRDL and tRTP
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming3 {
    pub trrds: u8,
    pub trrdl: u8,
    pub trtp: u8,
}

impl RegisterLayout for DramTiming3 {
    fn to_reg_value(&self) -> u32 {
        place(self.trrds, 0, 0x1F) | place(self.trrdl, 8, 0x1F) | place(self.trtp, 24, 0x1F)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            trrds: field(value, 0, 0x1F),
            trrdl: field(value, 8, 0x1F),
            trtp: field(value, 24, 0x1F),
        }
    }
}

/// tFAW
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming4 {
    pub tfaw: u8,
}

impl RegisterLayout for DramTiming4 {
    fn to_reg_value(&self) -> u32 {
        place(self.tfaw, 0, 0xFF)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            tfaw: field(value, 0, 0xFF),
        }
    }
}

/// tCWL, tWTRS and tWTRL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming5 {
    pub tcwl: u8,
    pub twtrs: u8,
    pub twtrl: u8,
}

impl RegisterLayout for DramTiming5 {
    fn to_reg_value(&self) -> u32 {
        place(self.tcwl, 0, 0x3F) | place(self.twtrs, 8, 0x1F) | place(self.twtrl, 16, 0x3F)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            tcwl: field(value, 0, 0x3F),
            twtrs: field(value, 8, 0x1F),
            twtrl: field(value, 16, 0x3F),
        }
    }
}

/// tWR
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming6 {
    pub twr: u8,
}

impl RegisterLayout for DramTiming6 {
    fn to_reg_value(&self) -> u32 {
        place(self.twr, 0, 0xFF)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            twr: field(value, 0, 0xFF),
        }
    }
}

/// Turnaround timings sharing one layout: different DIMM, same DIMM,
/// same chip select, same chip select long
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Turnaround {
    pub dd: u8,
    pub sd: u8,
    pub sc: u8,
    pub scl: u8,
}

impl RegisterLayout for Turnaround {
    fn to_reg_value(&self) -> u32 {
        place(self.dd, 0, 0xF)
            | place(self.sd, 8, 0xF)
            | place(self.sc, 16, 0xF)
            | place(self.scl, 24, 0x3F)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            dd: field(value, 0, 0xF),
            sd: field(value, 8, 0xF),
            sc: field(value, 16, 0xF),
            scl: field(value, 24, 0x3F),
        }
    }
}

/// tWRRD and tRDWR
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming9 {
    pub twrrd: u8,
    pub trdwr: u8,
}

impl RegisterLayout for DramTiming9 {
    fn to_reg_value(&self) -> u32 {
        place(self.twrrd, 0, 0xF) | place(self.trdwr, 8, 0x1F)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            twrrd: field(value, 0, 0xF),
            trdwr: field(value, 8, 0x1F),
        }
    }
}

/// tCKE
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramTiming10 {
    pub tcke: u8,
}

impl RegisterLayout for DramTiming10 {
    fn to_reg_value(&self) -> u32 {
        place(self.tcke, 24, 0x1F)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            tcke: field(value, 24, 0x1F),
        }
    }
}

/// Refresh cycle times
///
/// | Bits  | Field  |
/// |-------|--------|
/// | 0-9   | trfc   |
/// | 11-20 | trfc2  |
/// | 22-31 | trfc4  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DramRefresh {
    pub trfc: u16,
    pub trfc2: u16,
    pub trfc4: u16,
}

impl DramRefresh {
    /// Pick the live refresh word out of the two refresh slots
    pub fn select_word(first: u32, second: u32) -> u32 {
        if first != second && first == REFRESH_STALE {
            second
        } else {
            first
        }
    }
}

impl RegisterLayout for DramRefresh {
    fn to_reg_value(&self) -> u32 {
        (self.trfc as u32 & 0x3FF)
            | ((self.trfc2 as u32 & 0x3FF) << 11)
            | ((self.trfc4 as u32 & 0x3FF) << 22)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            trfc: (value & 0x3FF) as u16,
            trfc2: ((value >> 11) & 0x3FF) as u16,
            trfc4: ((value >> 22) & 0x3FF) as u16,
        }
    }
}
