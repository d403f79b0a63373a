//! Generic register abstractions for type-safe SMN register decoding

/// Trait for register layouts that can be converted to/from raw SMN values
///
/// SMN registers are 32 bits wide. Most registers this crate describes are
/// read-only fuses or timing registers, so `from_reg_value` is the direction
/// that matters; `to_reg_value` exists so layouts can be built in tests and
/// written back where the hardware allows it.
///
/// # Example
///
/// ```
/// use zensmu_raw::register::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct SmtFuse {
///     disable_mask: u8,
///     smt: bool,
/// }
///
/// impl RegisterLayout for SmtFuse {
///     fn to_reg_value(&self) -> u32 {
///         (self.disable_mask as u32) | (if self.smt { 1 << 8 } else { 0 })
///     }
///
///     fn from_reg_value(value: u32) -> Self {
///         Self {
///             disable_mask: (value & 0xFF) as u8,
///             smt: (value & (1 << 8)) != 0,
///         }
///     }
/// }
///
/// assert!(SmtFuse::from_reg_value(0x103).smt);
/// ```
pub trait RegisterLayout: Sized {
    /// Convert this register layout to a raw register value
    fn to_reg_value(&self) -> u32;

    /// Parse a raw register value into this register layout
    fn from_reg_value(value: u32) -> Self;

    /// Validate that the register values are within acceptable ranges
    ///
    /// Returns `Ok(())` if valid, or an error message if invalid.
    fn validate(&self) -> Result<(), &'static str> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::zen::fuse::CoreFuse;

    #[test]
    fn test_layout_round_trip() {
        let fuse = CoreFuse::from_reg_value(0x0000_0103);
        assert_eq!(fuse.core_disable, 0x03);
        assert!(fuse.smt);
        assert_eq!(CoreFuse::from_reg_value(fuse.to_reg_value()), fuse);
        assert!(fuse.validate().is_ok());
    }
}
