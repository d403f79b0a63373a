//! PM table limits and known layout versions
//!
//! The PM table is a block of IEEE-754 binary32 values the SMU refreshes
//! periodically. Its size and layout depend on the firmware's table
//! version; only the size is reported by the driver, field meaning has to
//! be known per version.

/// Largest table the driver is allowed to hand out, in bytes
pub const MAX_BYTES: usize = 0x1AB0;

/// Size of one table entry in bytes
pub const ENTRY_BYTES: usize = 4;

/// Largest number of entries in any table
pub const MAX_ENTRIES: usize = MAX_BYTES / ENTRY_BYTES;

/// Matisse / Castle Peak layout with a known named-field map
pub const VERSION_MATISSE_240903: u32 = 0x0024_0903;

/// Entries covered by the Matisse 0x240903 named layout
pub const MATISSE_240903_ENTRIES: usize = 326;

/// Cores described by the per-core arrays of the Matisse layout
pub const MATISSE_CORES: usize = 8;

/// L3 complexes described by the per-L3 arrays of the Matisse layout
pub const MATISSE_L3_COMPLEXES: usize = 2;

/// Sleep-state voltage used when blending per-core voltage estimates
pub const SLEEP_VOLTAGE: f32 = 0.2;
