//! SMU mailbox protocol constants
//!
//! A mailbox is a triple of SMN registers: message (command id), response
//! (status) and a block of six argument registers. The host waits for a
//! non-zero response, clears it, writes the arguments and the command id,
//! then polls the response register again.

/// Number of argument registers in every mailbox
pub const MAILBOX_ARG_COUNT: usize = 6;

/// Distance in bytes between consecutive argument registers
pub const MAILBOX_ARG_STRIDE: u32 = 4;

/// Poll iterations before an exchange is reported as timed out
pub const POLL_RETRIES: u32 = 8192;

/// Delay between response register polls, in microseconds
pub const POLL_INTERVAL_US: u64 = 100;

/// Mailbox status codes as reported in the response register
pub mod status {
    pub const OK: u32 = 0x01;
    pub const FAILED: u32 = 0xFF;
    pub const UNKNOWN_CMD: u32 = 0xFE;
    pub const CMD_REJECTED_PREREQ: u32 = 0xFD;
    pub const CMD_REJECTED_BUSY: u32 = 0xFC;
    /// Not produced by firmware; signals that a poll loop ran out of budget
    pub const COMMAND_TIMEOUT: u32 = 0xFB;
}

/// Decoded mailbox status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailboxStatus {
    Ok,
    Failed,
    UnknownCommand,
    RejectedPrerequisite,
    RejectedBusy,
    Timeout,
    Other(u32),
}

impl MailboxStatus {
    pub fn from_raw(value: u32) -> Self {
        match value {
            status::OK => MailboxStatus::Ok,
            status::FAILED => MailboxStatus::Failed,
            status::UNKNOWN_CMD => MailboxStatus::UnknownCommand,
            status::CMD_REJECTED_PREREQ => MailboxStatus::RejectedPrerequisite,
            status::CMD_REJECTED_BUSY => MailboxStatus::RejectedBusy,
            status::COMMAND_TIMEOUT => MailboxStatus::Timeout,
            other => MailboxStatus::Other(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            MailboxStatus::Ok => status::OK,
            MailboxStatus::Failed => status::FAILED,
            MailboxStatus::UnknownCommand => status::UNKNOWN_CMD,
            MailboxStatus::RejectedPrerequisite => status::CMD_REJECTED_PREREQ,
            MailboxStatus::RejectedBusy => status::CMD_REJECTED_BUSY,
            MailboxStatus::Timeout => status::COMMAND_TIMEOUT,
            MailboxStatus::Other(value) => value,
        }
    }

    pub fn is_ok(self) -> bool {
        self == MailboxStatus::Ok
    }

    pub fn name(&self) -> &'static str {
        match self {
            MailboxStatus::Ok => "OK",
            MailboxStatus::Failed => "Failed",
            MailboxStatus::UnknownCommand => "Unknown command",
            MailboxStatus::RejectedPrerequisite => "Rejected (prerequisite)",
            MailboxStatus::RejectedBusy => "Rejected (busy)",
            MailboxStatus::Timeout => "Timeout",
            MailboxStatus::Other(_) => "Unrecognized status",
        }
    }
}

impl std::fmt::Display for MailboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X} ({})", self.to_raw(), self.name())
    }
}

/// Commands understood by every SMU mailbox
pub mod common {
    /// Echoes `arg0 + 1` back in `arg0`
    pub const TEST_MESSAGE: u32 = 0x01;
    /// Returns the firmware version word in `arg0`
    pub const GET_SMU_VERSION: u32 = 0x02;
    /// Never implemented; answered with `UNKNOWN_CMD`
    pub const UNKNOWN_PROBE: u32 = 0xFF;
}

/// RSMU command ids (Matisse / Vermeer / Raphael numbering)
pub mod rsmu {
    pub const GET_MAX_FREQUENCY: u32 = 0x6E;
    pub const SET_MAX_FREQUENCY_ALL_CORES: u32 = 0x5C;
}

/// Scanner sentinels
pub mod scan {
    /// First test value used to validate a candidate argument register
    pub const TEST_SENTINEL: u32 = 0xFAFA_FAFA;
    /// Number of echo round-trips required to accept an argument register
    pub const TEST_ROUNDS: u32 = 3;
    /// Candidate (message, response) pairs kept per scanned range
    pub const MAX_PAIRS: usize = 64;
    /// Validated mailboxes kept per session
    pub const MAX_MATCHES: usize = 32;
    /// Settle delay after a probe write, in milliseconds
    pub const SETTLE_MS: u64 = 10;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for raw in [0x01, 0xFF, 0xFE, 0xFD, 0xFC, 0xFB, 0x42] {
            assert_eq!(MailboxStatus::from_raw(raw).to_raw(), raw);
        }
        assert_eq!(MailboxStatus::from_raw(0x42), MailboxStatus::Other(0x42));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(MailboxStatus::UnknownCommand.to_string(), "0xFE (Unknown command)");
        assert!(MailboxStatus::Ok.is_ok());
        assert!(!MailboxStatus::Timeout.is_ok());
    }
}
