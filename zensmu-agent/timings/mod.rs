//! DRAM timings read back from the memory controller

use serde::Serialize;

use zensmu_raw::current_arch::umc::{
    smn, DramConfig, DramRefresh, DramTiming1, DramTiming10, DramTiming2, DramTiming3,
    DramTiming4, DramTiming5, DramTiming6, DramTiming9, Turnaround, BANK_GROUP_SWAP_OFF,
    CHANNEL_A_EMPTY, CHANNEL_B_OFFSET,
};
use zensmu_raw::RegisterLayout;

use crate::common::Transport;
use crate::error::Result;

/// Read-to-read or write-to-write turnaround set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TurnaroundTimings {
    /// Different DIMM
    pub dd: u8,
    /// Same DIMM
    pub sd: u8,
    /// Same chip select
    pub sc: u8,
    /// Same chip select, long
    pub scl: u8,
}

impl From<Turnaround> for TurnaroundTimings {
    fn from(raw: Turnaround) -> Self {
        Self {
            dd: raw.dd,
            sd: raw.sd,
            sc: raw.sc,
            scl: raw.scl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryTimings {
    /// Offset of the channel the timings were read from
    pub channel_offset: u32,
    pub memory_clock_mhz: f32,
    pub gear_down: bool,
    pub cmd_2t: bool,
    pub bank_group_swap: bool,
    pub bank_group_swap_alt: bool,
    pub tcl: u8,
    pub tras: u8,
    pub trcdrd: u8,
    pub trcdwr: u8,
    pub trc: u8,
    pub trp: u8,
    pub trrds: u8,
    pub trrdl: u8,
    pub trtp: u8,
    pub tfaw: u8,
    pub tcwl: u8,
    pub twtrs: u8,
    pub twtrl: u8,
    pub twr: u8,
    pub trdrd: TurnaroundTimings,
    pub twrwr: TurnaroundTimings,
    pub twrrd: u8,
    pub trdwr: u8,
    pub tcke: u8,
    pub trfc: u16,
    pub trfc2: u16,
    pub trfc4: u16,
}

struct Channel<'a, T: Transport + ?Sized> {
    transport: &'a T,
    offset: u32,
}

impl<T: Transport + ?Sized> Channel<'_, T> {
    fn read(&self, addr: u32) -> Result<u32> {
        self.transport.read_smn(addr + self.offset)
    }

    fn decode<L: RegisterLayout>(&self, addr: u32) -> Result<L> {
        Ok(L::from_reg_value(self.read(addr)?))
    }
}

impl MemoryTimings {
    /// Read the first populated channel; any failed read aborts
    pub fn read<T: Transport + ?Sized>(transport: &T) -> Result<Self> {
        let offset = if transport.read_smn(smn::DRAM_CONFIG)? == CHANNEL_A_EMPTY {
            CHANNEL_B_OFFSET
        } else {
            0
        };
        let channel = Channel { transport, offset };

        let [bgs0, bgs1] = smn::BANK_GROUP_SWAP;
        let bank_group_swap = {
            let (a, b) = (channel.read(bgs0)?, channel.read(bgs1)?);
            !(a == b && a == BANK_GROUP_SWAP_OFF)
        };

        let [alt0, alt1] = smn::BANK_GROUP_SWAP_ALT;
        let bank_group_swap_alt = {
            let (a, b) = (channel.read(alt0)?, channel.read(alt1)?);
            (a >> 4) & 0x7F != 0 || (b >> 4) & 0x7F != 0
        };

        let config: DramConfig = channel.decode(smn::DRAM_CONFIG)?;
        let t1: DramTiming1 = channel.decode(smn::DRAM_TIMING1)?;
        let t2: DramTiming2 = channel.decode(smn::DRAM_TIMING2)?;
        let t3: DramTiming3 = channel.decode(smn::DRAM_TIMING3)?;
        let t4: DramTiming4 = channel.decode(smn::DRAM_TIMING4)?;
        let t5: DramTiming5 = channel.decode(smn::DRAM_TIMING5)?;
        let t6: DramTiming6 = channel.decode(smn::DRAM_TIMING6)?;
        let trdrd: Turnaround = channel.decode(smn::DRAM_TIMING7)?;
        let twrwr: Turnaround = channel.decode(smn::DRAM_TIMING8)?;
        let t9: DramTiming9 = channel.decode(smn::DRAM_TIMING9)?;
        let t10: DramTiming10 = channel.decode(smn::DRAM_TIMING10)?;

        let [rfc0, rfc1] = smn::DRAM_REFRESH;
        let refresh = DramRefresh::from_reg_value(DramRefresh::select_word(
            channel.read(rfc0)?,
            channel.read(rfc1)?,
        ));

        tracing::debug!("UMC channel offset 0x{:x}, config {:?}", offset, config);

        Ok(Self {
            channel_offset: offset,
            memory_clock_mhz: config.memory_clock_mhz(),
            gear_down: config.gear_down,
            cmd_2t: config.cmd_2t,
            bank_group_swap,
            bank_group_swap_alt,
            tcl: t1.tcl,
            tras: t1.tras,
            trcdrd: t1.trcdrd,
            trcdwr: t1.trcdwr,
            trc: t2.trc,
            trp: t2.trp,
            trrds: t3.trrds,
            trrdl: t3.trrdl,
            trtp: t3.trtp,
            tfaw: t4.tfaw,
            tcwl: t5.tcwl,
            twtrs: t5.twtrs,
            twtrl: t5.twtrl,
            twr: t6.twr,
            trdrd: trdrd.into(),
            twrwr: twrwr.into(),
            twrrd: t9.twrrd,
            trdwr: t9.trdwr,
            tcke: t10.tcke,
            trfc: refresh.trfc,
            trfc2: refresh.trfc2,
            trfc4: refresh.trfc4,
        })
    }
}
