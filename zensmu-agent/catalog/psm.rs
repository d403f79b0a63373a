//! Curve optimizer (PSM margin) commands
//!
//! Setting a margin is a straight table lookup. Reading one is not: several
//! command ids answer OK with unrelated data, so the probe walks an ordered
//! candidate list and only trusts values inside the margin range.

use zensmu_raw::current_arch::psm::{self, decode_margin, encode_core_mask, get, CombinedPsmArg};
use zensmu_raw::RegisterLayout;

use crate::catalog::platform::{PlatformProfile, PsmSetFormat};
use crate::error::{Result, SmuError};
use crate::mailbox::{CommandReply, CommandRequest};

/// First argument word variants tried for each get command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgVariant {
    CoreMask,
    CoreIndex,
}

impl ArgVariant {
    pub const ORDER: [ArgVariant; 2] = [ArgVariant::CoreMask, ArgVariant::CoreIndex];

    fn encode(self, profile: &PlatformProfile, core: u32) -> u32 {
        match self {
            ArgVariant::CoreMask => encode_core_mask(core, profile.is_apu()),
            ArgVariant::CoreIndex => core,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeCandidate {
    pub command: u32,
    pub variant: ArgVariant,
    pub arg0: u32,
}

impl ProbeCandidate {
    pub fn request(&self) -> CommandRequest {
        CommandRequest::new(self.command).with_arg(0, self.arg0)
    }
}

/// Ordered (command, argument) pairs for a get-margin probe
///
/// A known platform only tries its own command. An unknown one tries every
/// command for the mask variant before moving on to the index variant.
pub fn get_candidates(profile: &PlatformProfile, core: u32) -> Vec<ProbeCandidate> {
    let commands: &[u32] = match &profile.psm_get {
        Some(command) => std::slice::from_ref(command),
        None => &get::FALLBACK_ORDER,
    };

    let mut candidates = Vec::with_capacity(ArgVariant::ORDER.len() * commands.len());
    for variant in ArgVariant::ORDER {
        let arg0 = variant.encode(profile, core);
        for &command in commands {
            candidates.push(ProbeCandidate {
                command,
                variant,
                arg0,
            });
        }
    }
    candidates
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A candidate returned a non-zero in-range margin
    Found(i32),
    /// Only zero margins were seen
    ZeroOnly,
    NotFound,
}

impl ProbeOutcome {
    pub fn margin(self) -> Option<i32> {
        match self {
            ProbeOutcome::Found(margin) => Some(margin),
            ProbeOutcome::ZeroOnly => Some(0),
            ProbeOutcome::NotFound => None,
        }
    }
}

#[derive(Debug, Default)]
struct MarginProbe {
    saw_zero: bool,
}

impl MarginProbe {
    /// Feed one reply; returns a margin once the probe can stop
    fn observe(&mut self, reply: &CommandReply) -> Option<i32> {
        if !reply.status.is_ok() {
            return None;
        }
        match decode_margin(reply.args[0]) {
            Some(0) => {
                self.saw_zero = true;
                None
            }
            other => other,
        }
    }

    fn finish(self) -> ProbeOutcome {
        if self.saw_zero {
            ProbeOutcome::ZeroOnly
        } else {
            ProbeOutcome::NotFound
        }
    }
}

/// Run candidates in order until one yields a non-zero margin
///
/// Transport errors abort the probe. Rejections and out-of-range values
/// just move on to the next candidate.
pub fn probe_margin<F>(candidates: &[ProbeCandidate], mut submit: F) -> Result<ProbeOutcome>
where
    F: FnMut(&CommandRequest) -> Result<CommandReply>,
{
    let mut probe = MarginProbe::default();
    for candidate in candidates {
        let reply = submit(&candidate.request())?;
        tracing::debug!(
            "PSM get 0x{:02X} arg 0x{:08X} ({:?}): {} 0x{:08X}",
            candidate.command,
            candidate.arg0,
            candidate.variant,
            reply.status,
            reply.args[0]
        );
        if let Some(margin) = probe.observe(&reply) {
            return Ok(ProbeOutcome::Found(margin));
        }
    }
    Ok(probe.finish())
}

/// Build the set-margin request for a platform
pub fn set_request(profile: &PlatformProfile, core: u32, margin: i32) -> Result<CommandRequest> {
    if !psm::margin_in_range(margin) {
        return Err(SmuError::MarginOutOfRange(margin));
    }

    let mask = encode_core_mask(core, profile.is_apu());
    let request = match profile.psm_set {
        PsmSetFormat::Combined => {
            let arg = CombinedPsmArg::new(mask, margin);
            arg.validate()
                .map_err(|e| SmuError::ConfigError(e.to_string()))?;
            CommandRequest::new(psm::set::COMBINED).with_arg(0, arg.to_reg_value())
        }
        PsmSetFormat::Legacy => CommandRequest::new(psm::set::LEGACY)
            .with_arg(0, mask)
            .with_arg(1, margin as u32),
    };
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::platform::profile_for;
    use crate::common::Codename;
    use zensmu_raw::current_arch::mailbox::MailboxStatus;

    fn scripted(
        answers: &[(u32, u32)],
    ) -> impl FnMut(&CommandRequest) -> Result<CommandReply> + '_ {
        move |request: &CommandRequest| {
            let answer = answers
                .iter()
                .find(|(command, _)| *command == request.command)
                .map(|(_, word)| *word);
            Ok(match answer {
                Some(word) => CommandReply::ok([word, 0, 0, 0, 0, 0]),
                None => CommandReply::rejected(MailboxStatus::UnknownCommand, request),
            })
        }
    }

    #[test]
    fn test_known_platform_candidates() {
        let profile = profile_for(Codename::Vermeer);
        let candidates = get_candidates(&profile, 9);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.command == 0x7C));
        assert_eq!(candidates[0].arg0, 0x1010_0000);
        assert_eq!(candidates[1].arg0, 9);
    }

    #[test]
    fn test_unknown_platform_candidate_order() {
        let profile = profile_for(Codename::Undefined);
        let candidates = get_candidates(&profile, 1);
        assert_eq!(candidates.len(), 14);
        let commands: Vec<u32> = candidates.iter().map(|c| c.command).collect();
        assert_eq!(&commands[..7], &get::FALLBACK_ORDER);
        assert_eq!(&commands[7..], &get::FALLBACK_ORDER);
        assert!(candidates[..7].iter().all(|c| c.variant == ArgVariant::CoreMask));
        assert!(candidates[7..].iter().all(|c| c.arg0 == 1));
    }

    #[test]
    fn test_nonzero_beats_earlier_zero() {
        let profile = profile_for(Codename::Undefined);
        let candidates = get_candidates(&profile, 0);
        // 0x7C is second and answers zero, 0xE1 is fourth and answers -15
        let answers = [(get::ZEN3, 0), (get::PHOENIX, (-15i32) as u32)];
        let outcome = probe_margin(&candidates, scripted(&answers)).unwrap();
        assert_eq!(outcome, ProbeOutcome::Found(-15));
    }

    #[test]
    fn test_zero_only() {
        let profile = profile_for(Codename::Undefined);
        let candidates = get_candidates(&profile, 0);
        let answers = [(get::LEGACY, 0)];
        let outcome = probe_margin(&candidates, scripted(&answers)).unwrap();
        assert_eq!(outcome, ProbeOutcome::ZeroOnly);
        assert_eq!(outcome.margin(), Some(0));
    }

    #[test]
    fn test_out_of_range_is_skipped() {
        let profile = profile_for(Codename::Undefined);
        let candidates = get_candidates(&profile, 0);
        let answers = [(get::ZEN4_ZEN5, 0x1234), (get::CEZANNE, 0x0010_FFEC)];
        let outcome = probe_margin(&candidates, scripted(&answers)).unwrap();
        assert_eq!(outcome, ProbeOutcome::Found(-20));
    }

    #[test]
    fn test_not_found() {
        let profile = profile_for(Codename::GraniteRidge);
        let candidates = get_candidates(&profile, 3);
        let outcome = probe_margin(&candidates, scripted(&[])).unwrap();
        assert_eq!(outcome, ProbeOutcome::NotFound);
        assert_eq!(outcome.margin(), None);
    }

    #[test]
    fn test_transport_error_aborts() {
        let profile = profile_for(Codename::Undefined);
        let candidates = get_candidates(&profile, 0);
        let mut calls = 0;
        let result = probe_margin(&candidates, |_| {
            calls += 1;
            Err(SmuError::DriverError("gone".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_set_requests() {
        let combined = set_request(&profile_for(Codename::GraniteRidge), 9, -20).unwrap();
        assert_eq!(combined.command, 0x06);
        assert_eq!(combined.args[0], 0x1010_FFEC);

        let legacy = set_request(&profile_for(Codename::Vermeer), 2, -5).unwrap();
        assert_eq!(legacy.command, 0x76);
        assert_eq!(legacy.args[0], 0x0020_0000);
        assert_eq!(legacy.args[1] as i32, -5);

        let apu = set_request(&profile_for(Codename::Renoir), 3, 4).unwrap();
        assert_eq!(apu.args[0], 3);

        assert!(matches!(
            set_request(&profile_for(Codename::Vermeer), 0, 11),
            Err(SmuError::MarginOutOfRange(11))
        ));
    }
}
