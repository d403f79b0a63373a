//! Per-codename dispatch table
//!
//! Everything that varies by silicon generation lives in `PROFILES`.
//! Supporting a new platform means adding a row.

use serde::Serialize;

use zensmu_raw::current_arch::psm::get;

use crate::common::Codename;

/// How a core index is turned into the PSM core selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoreAddressing {
    /// Bare core index (APUs)
    Apu,
    /// `((ccd << 8) | local) << 20`
    Ccd,
}

/// Wire format of the set-margin command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PsmSetFormat {
    /// Two arguments: core mask, signed margin
    Legacy,
    /// One argument: high mask bits OR'd with the 16-bit margin
    Combined,
}

/// Address window swept by the mailbox scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
    pub response_offset: u32,
}

impl ScanRange {
    pub const fn new(start: u32, end: u32, step: u32, response_offset: u32) -> Self {
        Self {
            start,
            end,
            step,
            response_offset,
        }
    }
}

const PRIMARY: ScanRange = ScanRange::new(0x03B1_0500, 0x03B1_0998, 8, 0x3C);

const APU_RANGES: &[ScanRange] = &[PRIMARY, ScanRange::new(0x03B1_0A00, 0x03B1_0AFF, 4, 0x60)];

const DESKTOP_RANGES: &[ScanRange] =
    &[PRIMARY, ScanRange::new(0x03B1_0500, 0x03B1_0AFF, 4, 0x4C)];

const GENERIC_RANGES: &[ScanRange] = &[PRIMARY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub codename: Codename,
    pub addressing: CoreAddressing,
    pub psm_set: PsmSetFormat,
    /// Known get-margin command, `None` when the fallback probe is needed
    pub psm_get: Option<u32>,
    pub scan_ranges: &'static [ScanRange],
}

impl PlatformProfile {
    const fn new(
        codename: Codename,
        addressing: CoreAddressing,
        psm_set: PsmSetFormat,
        psm_get: Option<u32>,
        scan_ranges: &'static [ScanRange],
    ) -> Self {
        Self {
            codename,
            addressing,
            psm_set,
            psm_get,
            scan_ranges,
        }
    }

    /// Profile used for codenames without a row
    pub const fn generic(codename: Codename) -> Self {
        Self::new(
            codename,
            CoreAddressing::Ccd,
            PsmSetFormat::Legacy,
            None,
            GENERIC_RANGES,
        )
    }

    pub fn is_apu(&self) -> bool {
        self.addressing == CoreAddressing::Apu
    }
}

use CoreAddressing::{Apu, Ccd};
use PsmSetFormat::{Combined, Legacy};

static PROFILES: &[PlatformProfile] = &[
    PlatformProfile::new(Codename::Colfax, Ccd, Legacy, None, DESKTOP_RANGES),
    PlatformProfile::new(Codename::Renoir, Apu, Legacy, None, APU_RANGES),
    PlatformProfile::new(Codename::Picasso, Apu, Legacy, None, APU_RANGES),
    PlatformProfile::new(Codename::Matisse, Ccd, Legacy, Some(get::ZEN3), DESKTOP_RANGES),
    PlatformProfile::new(Codename::Threadripper, Ccd, Legacy, None, DESKTOP_RANGES),
    PlatformProfile::new(Codename::CastlePeak, Ccd, Legacy, Some(get::ZEN3), DESKTOP_RANGES),
    PlatformProfile::new(Codename::RavenRidge, Apu, Legacy, None, APU_RANGES),
    PlatformProfile::new(Codename::RavenRidge2, Ccd, Legacy, None, APU_RANGES),
    PlatformProfile::new(Codename::SummitRidge, Ccd, Legacy, None, DESKTOP_RANGES),
    PlatformProfile::new(Codename::PinnacleRidge, Ccd, Legacy, None, DESKTOP_RANGES),
    PlatformProfile::new(Codename::Rembrandt, Apu, Combined, Some(get::ZEN4_ZEN5), GENERIC_RANGES),
    PlatformProfile::new(Codename::Vermeer, Ccd, Legacy, Some(get::ZEN3), DESKTOP_RANGES),
    PlatformProfile::new(Codename::Cezanne, Apu, Legacy, Some(get::CEZANNE), GENERIC_RANGES),
    PlatformProfile::new(Codename::Milan, Ccd, Legacy, Some(get::ZEN3), GENERIC_RANGES),
    PlatformProfile::new(Codename::Dali, Apu, Legacy, None, APU_RANGES),
    PlatformProfile::new(Codename::Lucienne, Apu, Legacy, None, APU_RANGES),
    PlatformProfile::new(Codename::Chagall, Ccd, Legacy, Some(get::ZEN3), GENERIC_RANGES),
    PlatformProfile::new(Codename::Raphael, Ccd, Combined, Some(get::ZEN4_ZEN5), GENERIC_RANGES),
    PlatformProfile::new(Codename::Phoenix, Apu, Legacy, Some(get::PHOENIX), GENERIC_RANGES),
    PlatformProfile::new(Codename::StrixPoint, Ccd, Combined, Some(get::ZEN4_ZEN5), GENERIC_RANGES),
    PlatformProfile::new(Codename::GraniteRidge, Ccd, Combined, Some(get::ZEN4_ZEN5), GENERIC_RANGES),
    PlatformProfile::new(Codename::HawkPoint, Ccd, Combined, Some(get::ZEN4_ZEN5), GENERIC_RANGES),
    PlatformProfile::new(Codename::StormPeak, Ccd, Combined, Some(get::ZEN4_ZEN5), GENERIC_RANGES),
    PlatformProfile::new(Codename::StrixHalo, Ccd, Combined, Some(get::ZEN4_ZEN5), GENERIC_RANGES),
    PlatformProfile::new(Codename::ShimadaPeak, Ccd, Combined, Some(get::ZEN5_SP), GENERIC_RANGES),
];

pub fn profile_for(codename: Codename) -> PlatformProfile {
    PROFILES
        .iter()
        .find(|profile| profile.codename == codename)
        .copied()
        .unwrap_or_else(|| PlatformProfile::generic(codename))
}
