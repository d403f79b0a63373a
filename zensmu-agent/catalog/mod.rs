//! Command catalog: abstract operations resolved to concrete mailbox
//! requests for the running platform

pub mod platform;
pub mod psm;

pub use platform::{profile_for, CoreAddressing, PlatformProfile, PsmSetFormat, ScanRange};
pub use psm::{get_candidates, probe_margin, set_request, ProbeCandidate, ProbeOutcome};

use zensmu_raw::current_arch::mailbox::rsmu;

use crate::mailbox::{CommandRequest, MailboxKind};

/// Mailbox every catalog operation is sent on
pub const CATALOG_MAILBOX: MailboxKind = MailboxKind::Rsmu;

pub fn get_max_frequency_request() -> CommandRequest {
    CommandRequest::new(rsmu::GET_MAX_FREQUENCY)
}

pub fn set_max_frequency_request(mhz: u32) -> CommandRequest {
    CommandRequest::new(rsmu::SET_MAX_FREQUENCY_ALL_CORES).with_arg(0, mhz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_requests() {
        let get = get_max_frequency_request();
        assert_eq!(get.command, 0x6E);
        assert_eq!(get.args, [0; 6]);

        let set = set_max_frequency_request(4850);
        assert_eq!(set.command, 0x5C);
        assert_eq!(set.args[0], 4850);
    }
}
