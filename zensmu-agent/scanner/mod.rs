//! Mailbox address scanner
//!
//! Finds undocumented mailboxes by poking candidate message registers with
//! an unknown command and watching for the unknown-command status. This
//! writes to arbitrary SMN addresses and can hang the machine; it is only
//! ever run on explicit request.

use std::time::Duration;

use zensmu_raw::current_arch::mailbox::{common, scan, status};

use crate::catalog::ScanRange;
use crate::common::Transport;
use crate::error::{Result, SmuError};
use crate::mailbox::{CommandRequest, MailboxAddressSet, MailboxEngine, PollPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Pause after each probe write before reading responses
    pub settle: Duration,
    pub poll: PollPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(scan::SETTLE_MS),
            poll: PollPolicy::default(),
        }
    }
}

pub struct MailboxScanner<'a, T: Transport + ?Sized> {
    transport: &'a T,
    options: ScanOptions,
    /// Firmware version word the argument register must echo
    firmware: u32,
}

impl<'a, T: Transport + ?Sized> MailboxScanner<'a, T> {
    pub fn new(transport: &'a T, firmware: u32, options: ScanOptions) -> Self {
        Self {
            transport,
            options,
            firmware,
        }
    }

    /// Scan every range, accumulating at most 32 mailboxes
    pub fn scan(&self, ranges: &[ScanRange]) -> Result<Vec<MailboxAddressSet>> {
        let mut found = Vec::new();
        for range in ranges {
            self.scan_range(range, &mut found)?;
        }
        Ok(found)
    }

    pub fn scan_range(&self, range: &ScanRange, found: &mut Vec<MailboxAddressSet>) -> Result<()> {
        if range.step == 0 || range.start > range.end {
            return Err(SmuError::ConfigError(format!(
                "Invalid scan range 0x{:08X}-0x{:08X} step {}",
                range.start, range.end, range.step
            )));
        }

        tracing::info!(
            "Scanning 0x{:08X} - 0x{:08X} (step={}, offset=0x{:X})",
            range.start,
            range.end,
            range.step,
            range.response_offset
        );

        let pairs = self.find_pairs(range);
        if pairs.is_empty() {
            tracing::info!("No mailbox pairs found in this range");
        }

        for (message, response) in pairs {
            if found.len() >= scan::MAX_MATCHES {
                tracing::warn!("Mailbox list full, ignoring remaining candidates");
                break;
            }
            match self.find_argument(range, message, response) {
                Ok(Some(argument)) => {
                    let mailbox = MailboxAddressSet {
                        message,
                        response,
                        argument: Some(argument),
                    };
                    tracing::info!("Validated mailbox {}", mailbox);
                    found.push(mailbox);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Pair CMD=0x{:08X}: {}", message, e),
            }
        }
        Ok(())
    }

    fn settle(&self) {
        if !self.options.settle.is_zero() {
            std::thread::sleep(self.options.settle);
        }
    }

    /// Phase 1: message/response pairs that answer the unknown-command probe
    fn find_pairs(&self, range: &ScanRange) -> Vec<(u32, u32)> {
        let mut pairs = Vec::new();
        let mut addr = range.start;

        while addr <= range.end && pairs.len() < scan::MAX_PAIRS {
            self.probe_message(addr, range, &mut pairs);
            addr = match addr.checked_add(range.step) {
                Some(next) => next,
                None => break,
            };
        }
        pairs
    }

    fn probe_message(&self, addr: u32, range: &ScanRange, pairs: &mut Vec<(u32, u32)>) {
        match self.transport.read_smn(addr) {
            Ok(value) if value != u32::MAX => {}
            _ => return,
        }

        if self.transport.write_smn(addr, common::UNKNOWN_PROBE).is_err() {
            return;
        }
        self.settle();

        let mut response = match addr.checked_add(range.response_offset) {
            Some(response) => response,
            None => return,
        };

        while response <= range.end && pairs.len() < scan::MAX_PAIRS {
            let value = match self.transport.read_smn(response) {
                Ok(value) => value,
                Err(_) => break,
            };

            if value == status::UNKNOWN_CMD
                && self
                    .transport
                    .write_smn(addr, common::GET_SMU_VERSION)
                    .is_ok()
            {
                self.settle();
                if matches!(self.transport.read_smn(response), Ok(status::OK)) {
                    tracing::info!("Found CMD/RSP pair: CMD=0x{:08X} RSP=0x{:08X}", addr, response);
                    pairs.push((addr, response));
                }
            }

            response = match response.checked_add(range.step) {
                Some(next) => next,
                None => break,
            };
        }
    }

    /// Phase 2: the argument register that holds the firmware version after
    /// GET_SMU_VERSION and echoes test values incremented by one
    fn find_argument(&self, range: &ScanRange, message: u32, response: u32) -> Result<Option<u32>> {
        let engine = MailboxEngine::new(self.transport, self.options.poll);
        let bare = MailboxAddressSet {
            message,
            response,
            argument: None,
        };

        let reply = engine.execute(&bare, &CommandRequest::new(common::GET_SMU_VERSION))?;
        if !reply.status.is_ok() {
            tracing::info!("Pair CMD=0x{:08X}: GetSMUVersion failed ({})", message, reply.status);
            return Ok(None);
        }

        let mut candidate = response.saturating_add(4);
        while candidate <= range.end {
            let holds_version = matches!(
                self.transport.read_smn(candidate),
                Ok(value) if value == self.firmware
            );
            if holds_version && self.validate(&engine, bare, candidate) {
                return Ok(Some(candidate));
            }
            candidate = match candidate.checked_add(range.step) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(None)
    }

    fn validate(&self, engine: &MailboxEngine<'_, T>, bare: MailboxAddressSet, candidate: u32) -> bool {
        let mailbox = MailboxAddressSet {
            argument: Some(candidate),
            ..bare
        };

        (0..scan::TEST_ROUNDS).all(|attempt| {
            let test = scan::TEST_SENTINEL.wrapping_add(attempt);
            let request = CommandRequest::new(common::TEST_MESSAGE).with_arg(0, test);
            matches!(engine.execute(&mailbox, &request), Ok(reply) if reply.status.is_ok())
                && matches!(
                    self.transport.read_smn(candidate),
                    Ok(value) if value == test.wrapping_add(1)
                )
        })
    }
}
