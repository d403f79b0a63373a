//! CPU topology from CCD and core fuses
//!
//! Three SMN reads: two CCD fuse words, then the core fuse they point at.
//! Logical core count comes from CPUID.

use serde::Serialize;

use zensmu_raw::current_arch::fuse::{
    ccd_fuse_addresses, CcdFuse, CoreFuse, CORES_PER_FUSE_GROUP, FAMILY_19H,
};
use zensmu_raw::RegisterLayout;

use crate::common::{CpuSignature, Transport};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub ccds: u32,
    pub ccxs: u32,
    pub cores_per_ccx: u32,
    pub physical_cores: u32,
    pub smt: bool,
    /// One bitmap per group of eight cores, 1 = fused off
    pub core_disable_map: [u32; 2],
}

impl Topology {
    /// Derive the topology from already-read fuse values
    pub fn from_fuses(family: u32, logical_cores: u32, ccd: CcdFuse, core: CoreFuse) -> Self {
        let ccds = ccd.enabled_count();
        let active = CORES_PER_FUSE_GROUP - core.disabled_count();

        let (ccxs, cores_per_ccx) = if family == FAMILY_19H {
            (ccds, active)
        } else {
            (ccds * 2, active / 2)
        };

        let physical_cores = if core.smt {
            logical_cores / 2
        } else {
            logical_cores
        };

        Self {
            ccds,
            ccxs,
            cores_per_ccx,
            physical_cores,
            smt: core.smt,
            core_disable_map: core.disable_map(),
        }
    }

    /// Read the fuses and derive the topology
    ///
    /// Any failed read aborts the whole resolution.
    pub fn resolve<T: Transport + ?Sized>(transport: &T, cpu: &CpuSignature) -> Result<Self> {
        let (fuse1, fuse2) = ccd_fuse_addresses(cpu.family, cpu.model);
        let ccd = CcdFuse::from_words(transport.read_smn(fuse1)?, transport.read_smn(fuse2)?);

        let core_addr = ccd.core_fuse_address(cpu.family);
        let core = CoreFuse::from_reg_value(transport.read_smn(core_addr)?);

        let topology = Self::from_fuses(cpu.family, cpu.logical_cores, ccd, core);
        tracing::debug!(
            "CCD fuse present=0x{:02x} down=0x{:02x}, core fuse @0x{:08x}: {:?}",
            ccd.present,
            ccd.down,
            core_addr,
            topology
        );
        Ok(topology)
    }

    pub fn core_enabled(&self, index: u32) -> bool {
        if index >= self.physical_cores {
            return false;
        }
        let group = (index / CORES_PER_FUSE_GROUP) as usize;
        let bit = index % CORES_PER_FUSE_GROUP;
        match self.core_disable_map.get(group) {
            Some(map) => (map >> bit) & 1 == 0,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mock::MockTransport;

    fn cpu(family: u32, model: u32, logical_cores: u32) -> CpuSignature {
        CpuSignature {
            family,
            model,
            stepping: 0,
            logical_cores,
            brand: String::new(),
        }
    }

    #[test]
    fn test_consistency_over_fuse_space() {
        for family in [0x17, 0x19] {
            for present in [0b1u32, 0b11, 0b111, 0b1111] {
                for disable in 0u32..=0xFF {
                    for smt in [false, true] {
                        let ccd = CcdFuse::from_words(present << 22, 0);
                        let raw = disable | if smt { 1 << 8 } else { 0 };
                        let core = CoreFuse::from_reg_value(raw);
                        let topo = Topology::from_fuses(family, 32, ccd, core);

                        assert!(topo.ccxs * topo.cores_per_ccx <= 8 * topo.ccds);
                        assert_eq!(topo.physical_cores, if smt { 16 } else { 32 });
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_vermeer_5950x() {
        // two CCDs present, nothing fused off, SMT on
        let transport = MockTransport::new()
            .with_register(0x5D218, 0b11 << 22)
            .with_register(0x5D21C, 0)
            .with_register(0x3008_1D98, 1 << 8);

        let topo = Topology::resolve(&transport, &cpu(0x19, 0x21, 32)).unwrap();

        assert_eq!(topo.ccds, 2);
        assert_eq!(topo.ccxs, 2);
        assert_eq!(topo.cores_per_ccx, 8);
        assert_eq!(topo.physical_cores, 16);
        assert!(topo.smt);
        // bits 8-15 double as the second group's mask, so the SMT bit shows up there
        assert_eq!(topo.core_disable_map, [0x00, 0x01]);
        assert!((0..8).all(|i| topo.core_enabled(i)));
        assert!(!topo.core_enabled(8));
        assert!(topo.core_enabled(9));
        assert!(!topo.core_enabled(16));
    }

    #[test]
    fn test_resolve_matisse_3600() {
        // one CCD, cores 3 and 7 fused off in each CCX
        let transport = MockTransport::new()
            .with_register(0x5D218, 0b1 << 22)
            .with_register(0x5D21C, 0)
            .with_register(0x3008_1A38, 0x88 | (1 << 8));

        let topo = Topology::resolve(&transport, &cpu(0x17, 0x71, 12)).unwrap();

        assert_eq!(topo.ccds, 1);
        assert_eq!(topo.ccxs, 2);
        assert_eq!(topo.cores_per_ccx, 3);
        assert_eq!(topo.physical_cores, 6);
        assert!(topo.core_enabled(0));
        assert!(!topo.core_enabled(3));
        assert!(!topo.core_enabled(6));
    }

    #[test]
    fn test_legacy_model_uses_offset_fuses() {
        let transport = MockTransport::new()
            .with_register(0x5D258, 0b1 << 22)
            .with_register(0x3008_1A38, 0);

        let topo = Topology::resolve(&transport, &cpu(0x17, 0x08, 8)).unwrap();

        assert_eq!(topo.physical_cores, 8);
        assert_eq!(transport.read_count(0x5D218), 0);
        assert_eq!(transport.read_count(0x5D258), 1);
    }

    #[test]
    fn test_fuse_read_failure_aborts() {
        let transport = MockTransport::new().with_failing(0x5D21C);
        assert!(Topology::resolve(&transport, &cpu(0x19, 0x21, 16)).is_err());
    }
}
