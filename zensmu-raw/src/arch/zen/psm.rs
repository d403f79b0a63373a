//! Per-core voltage margin (PSM / curve optimizer) definitions
//!
//! The margin is a signed per-core offset. Zen 2 / Zen 3 parts take the
//! core selector and the margin as two separate arguments; Zen 4 / Zen 5
//! parts take a single word combining the top 12 bits of the selector with
//! the margin as a 16-bit two's complement value.
//!
//! ## References
//!
//! - ZenStates-Core `GetDldoPsmMargin` / `SetDldoPsmMargin` tables

use crate::register::RegisterLayout;

/// Most negative accepted margin
pub const MARGIN_MIN: i32 = -60;

/// Most positive accepted margin
pub const MARGIN_MAX: i32 = 10;

/// Bits of the core selector kept in the combined argument
pub const COMBINED_MASK_BITS: u32 = 0xFFF0_0000;

/// Cores addressed per CCD in the desktop selector encoding
pub const CORES_PER_CCD: u32 = 8;

/// RSMU command ids for setting a margin
pub mod set {
    /// Zen 2 / Zen 3: `arg0 = mask`, `arg1 = margin`
    pub const LEGACY: u32 = 0x76;
    /// Zen 4 / Zen 5: `arg0 = CombinedPsmArg`
    pub const COMBINED: u32 = 0x06;
}

/// RSMU command ids for querying a margin
pub mod get {
    /// Matisse, Vermeer, Milan, Chagall, Castle Peak
    pub const ZEN3: u32 = 0x7C;
    /// Raphael, Granite Ridge, Dragon Range and related Zen 4 / Zen 5 parts
    pub const ZEN4_ZEN5: u32 = 0xD5;
    /// Shimada Peak
    pub const ZEN5_SP: u32 = 0xA3;
    /// Phoenix APU
    pub const PHOENIX: u32 = 0xE1;
    /// Cezanne APU
    pub const CEZANNE: u32 = 0xC3;
    pub const LEGACY: u32 = 0x77;
    pub const LEGACY_ALT: u32 = 0x78;

    /// Probe order used when the platform has no known query command
    pub const FALLBACK_ORDER: [u32; 7] =
        [ZEN4_ZEN5, ZEN3, ZEN5_SP, PHOENIX, CEZANNE, LEGACY, LEGACY_ALT];
}

/// Check whether a margin lies in the accepted range
pub fn margin_in_range(margin: i32) -> bool {
    (MARGIN_MIN..=MARGIN_MAX).contains(&margin)
}

/// Encode the core selector for a core index
///
/// APUs address cores by their plain index. Desktop and server parts use
/// `((ccd << 8) | core_in_ccd) << 20`.
pub fn encode_core_mask(core_index: u32, apu_addressing: bool) -> u32 {
    if apu_addressing {
        return core_index;
    }
    let ccd = core_index / CORES_PER_CCD;
    let local = core_index % CORES_PER_CCD;
    ((ccd << 8) | local) << 20
}

/// Interpret a reply word as a margin
///
/// The word is first taken as a signed 32-bit integer; if that is out of
/// range the low half-word is taken as a signed 16-bit value. Returns `None`
/// when neither reading is a valid margin.
pub fn decode_margin(word: u32) -> Option<i32> {
    let full = word as i32;
    if margin_in_range(full) {
        return Some(full);
    }
    let low = (word & 0xFFFF) as u16 as i16 as i32;
    margin_in_range(low).then_some(low)
}

/// Single-word margin argument used by Zen 4 / Zen 5 parts
///
/// ## Register Format
///
/// | Bits   | Field     | Description                              |
/// |--------|-----------|------------------------------------------|
/// | 0-15   | margin    | Signed margin, two's complement          |
/// | 16-19  | reserved  |                                          |
/// | 20-31  | core_bits | Top bits of the encoded core selector    |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombinedPsmArg {
    /// Core selector, already shifted into bits 20-31
    pub core_bits: u32,
    pub margin: i16,
}

impl CombinedPsmArg {
    pub fn new(core_mask: u32, margin: i32) -> Self {
        Self {
            core_bits: core_mask & COMBINED_MASK_BITS,
            margin: margin as i16,
        }
    }
}

impl RegisterLayout for CombinedPsmArg {
    fn to_reg_value(&self) -> u32 {
        (self.core_bits & COMBINED_MASK_BITS) | (self.margin as u16 as u32)
    }

    fn from_reg_value(value: u32) -> Self {
        Self {
            core_bits: value & COMBINED_MASK_BITS,
            margin: (value & 0xFFFF) as u16 as i16,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if !margin_in_range(self.margin as i32) {
            return Err("Margin must be within -60..=10");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_mask_encoding() {
        for core in 0..16u32 {
            let expected = (((core / 8) << 8) | (core % 8)) << 20;
            assert_eq!(encode_core_mask(core, false), expected);
        }
        assert_eq!(encode_core_mask(9, false), 0x1010_0000);
    }

    #[test]
    fn test_apu_mask_is_identity() {
        for core in 0..16u32 {
            assert_eq!(encode_core_mask(core, true), core);
        }
    }

    #[test]
    fn test_combined_margin_recovers_every_value() {
        for core in 0..16u32 {
            let mask = encode_core_mask(core, false);
            for margin in MARGIN_MIN..=MARGIN_MAX {
                let word = CombinedPsmArg::new(mask, margin).to_reg_value();
                assert_eq!(word & COMBINED_MASK_BITS, mask & COMBINED_MASK_BITS);
                let decoded = CombinedPsmArg::from_reg_value(word);
                assert_eq!(decoded.margin as i32, margin);
                assert_eq!(decode_margin(word & 0xFFFF), Some(margin));
            }
        }
    }

    #[test]
    fn test_combined_edge_values() {
        assert_eq!(CombinedPsmArg::new(0, -60).to_reg_value(), 0xFFC4);
        assert_eq!(CombinedPsmArg::new(0, 10).to_reg_value(), 0x000A);
        assert!(CombinedPsmArg::new(0, -61).validate().is_err());
    }

    #[test]
    fn test_decode_prefers_full_word() {
        assert_eq!(decode_margin(0xFFFF_FFF6), Some(-10));
        assert_eq!(decode_margin(5), Some(5));
        // Selector bits in the high half push the full word out of range.
        assert_eq!(decode_margin(0x0010_FFEC), Some(-20));
        assert_eq!(decode_margin(0x0000_1234), None);
    }
}
