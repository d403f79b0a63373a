//! CCD and core fuse register definitions
//!
//! Two adjacent fuse words describe which CCDs are present and which were
//! fused off. A per-CCD core fuse then gives the core-disable mask and the
//! SMT capability bit.

use crate::register::RegisterLayout;

/// Family 17h (Zen / Zen+ / Zen 2)
pub const FAMILY_17H: u32 = 0x17;

/// Family 19h (Zen 3 / Zen 4)
pub const FAMILY_19H: u32 = 0x19;

/// Family 17h model that keeps the base fuse addresses (Matisse)
pub const MODEL_MATISSE: u32 = 0x71;

/// Base address of the first CCD fuse word
pub const CCD_FUSE_BASE: u32 = 0x5D218;

/// Offset applied to the CCD fuse addresses on most family 17h parts
pub const CCD_FUSE_LEGACY_OFFSET: u32 = 0x40;

/// Base of the per-CCD core fuse block
pub const CORE_FUSE_BASE: u32 = 0x3008_1800;

/// Core fuse offset inside the block for family 19h
pub const CORE_FUSE_OFFSET_19H: u32 = 0x598;

/// Core fuse offset inside the block for every other family
pub const CORE_FUSE_OFFSET_LEGACY: u32 = 0x238;

/// Selects the second CCD's copy of the core fuse
pub const CORE_FUSE_ALT_CCD: u32 = 0x0200_0000;

/// Number of cores covered by one core-disable mask
pub const CORES_PER_FUSE_GROUP: u32 = 8;

/// Addresses of the two CCD fuse words for a family/model
pub fn ccd_fuse_addresses(family: u32, model: u32) -> (u32, u32) {
    let base = if family == FAMILY_17H && model != MODEL_MATISSE {
        CCD_FUSE_BASE + CCD_FUSE_LEGACY_OFFSET
    } else {
        CCD_FUSE_BASE
    };
    (base, base + 4)
}

/// Decoded CCD fuse words
///
/// ## Register Format
///
/// | Word | Bits   | Field                         |
/// |------|--------|-------------------------------|
/// | 1    | 22-29  | CCDs present                  |
/// | 1    | 30-31  | CCDs down, bits 0-1           |
/// | 2    | 0-5    | CCDs down, bits 2-7           |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CcdFuse {
    pub present: u8,
    pub down: u8,
}

impl CcdFuse {
    pub fn from_words(word1: u32, word2: u32) -> Self {
        Self {
            present: ((word1 >> 22) & 0xFF) as u8,
            down: ((((word2 & 0x3F) << 2) | ((word1 >> 30) & 0x3)) & 0xFF) as u8,
        }
    }

    /// CCDs that count as enabled
    ///
    /// The down bits are not subtracted; firmware reports fused-off CCDs as
    /// absent already.
    pub fn enabled(&self) -> u8 {
        self.present
    }

    pub fn enabled_count(&self) -> u32 {
        self.enabled().count_ones()
    }

    /// Address of the core fuse to read for this CCD configuration
    pub fn core_fuse_address(&self, family: u32) -> u32 {
        if family == FAMILY_19H {
            let alt = (self.down & self.present) & 1 == 1;
            (CORE_FUSE_BASE + CORE_FUSE_OFFSET_19H) | if alt { CORE_FUSE_ALT_CCD } else { 0 }
        } else {
            let alt = self.present & 1 == 0;
            (CORE_FUSE_BASE + CORE_FUSE_OFFSET_LEGACY) | if alt { CORE_FUSE_ALT_CCD } else { 0 }
        }
    }
}

/// Core fuse register layout
///
/// ## Register Format
///
/// | Bits  | Field        | Description                            |
/// |-------|--------------|----------------------------------------|
/// | 0-7   | core_disable | One bit per core, 1 = fused off        |
/// | 8     | smt          | Simultaneous multithreading available  |
/// | 8-15  | upper_group  | Disable mask reported for a second CCD |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreFuse {
    pub core_disable: u8,
    pub smt: bool,
    /// Bits 8-15 read as a second disable mask; zero on single-CCD parts
    pub upper_group: u8,
}

impl RegisterLayout for CoreFuse {
    fn to_reg_value(&self) -> u32 {
        (self.core_disable as u32)
            | ((self.upper_group as u32) << 8)
            | (if self.smt { 1 << 8 } else { 0 })
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            core_disable: (value & 0xFF) as u8,
            smt: (value & (1 << 8)) != 0,
            upper_group: ((value >> 8) & 0xFF) as u8,
        }
    }
}

impl CoreFuse {
    pub fn disabled_count(&self) -> u32 {
        self.core_disable.count_ones()
    }

    /// Per-group disable bitmaps; the second group mirrors the first when
    /// the upper byte is empty
    pub fn disable_map(&self) -> [u32; 2] {
        let first = self.core_disable as u32;
        let second = match self.upper_group {
            0 => first,
            upper => upper as u32,
        };
        [first, second]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ccd_fuse_addresses() {
        assert_eq!(ccd_fuse_addresses(0x17, 0x31), (0x5D258, 0x5D25C));
        assert_eq!(ccd_fuse_addresses(0x17, 0x71), (0x5D218, 0x5D21C));
        assert_eq!(ccd_fuse_addresses(0x19, 0x21), (0x5D218, 0x5D21C));
    }

    #[test]
    fn test_ccd_fuse_decode() {
        // present = 0b11 in bits 22-29, down bits 0-1 from word1[30:31]
        let word1 = (0b11 << 22) | (0b10 << 30);
        let word2 = 0b000001;
        let fuse = CcdFuse::from_words(word1, word2);
        assert_eq!(fuse.present, 0b11);
        assert_eq!(fuse.down, 0b110);
        assert_eq!(fuse.enabled_count(), 2);
    }

    #[test]
    fn test_core_fuse_address_selection() {
        let single = CcdFuse { present: 1, down: 0 };
        assert_eq!(single.core_fuse_address(0x19), 0x3008_1D98);
        let alt = CcdFuse { present: 1, down: 1 };
        assert_eq!(alt.core_fuse_address(0x19), 0x3008_1D98 | 0x0200_0000);
        assert_eq!(single.core_fuse_address(0x17), 0x3008_1A38);
        let absent = CcdFuse { present: 0b10, down: 0 };
        assert_eq!(absent.core_fuse_address(0x17), 0x3008_1A38 | 0x0200_0000);
    }

    #[test]
    fn test_core_fuse_decode() {
        let fuse = CoreFuse::from_reg_value(0x0000_0103);
        assert_eq!(fuse.core_disable, 0x03);
        assert!(fuse.smt);
        assert_eq!(fuse.disabled_count(), 2);
        assert_eq!(fuse.disable_map(), [0x03, 0x01]);

        let single = CoreFuse::from_reg_value(0x0000_0080);
        assert!(!single.smt);
        assert_eq!(single.disable_map(), [0x80, 0x80]);
    }
}
