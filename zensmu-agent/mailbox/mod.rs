//! Mailbox protocol engine
//!
//! A mailbox is a message/response/argument register triple. One exchange
//! waits for the mailbox to go idle, clears the response, writes arguments
//! and the command id, then polls for the firmware's status. Arguments are
//! read back only when the status is OK.
//!
//! The driver-known mailboxes (RSMU, MP1, HSMP) are reached through
//! `Transport::submit`; `MailboxEngine` runs the same algorithm over raw
//! SMN addresses for mailboxes the driver does not know about.

use clap::ValueEnum;
use serde::Serialize;
use std::time::Duration;

use zensmu_raw::current_arch::mailbox::{
    MailboxStatus, MAILBOX_ARG_COUNT, MAILBOX_ARG_STRIDE, POLL_INTERVAL_US, POLL_RETRIES,
};

use crate::common::Transport;
use crate::error::{Result, SmuError};

/// Six 32-bit argument words
pub type MailboxArgs = [u32; MAILBOX_ARG_COUNT];

/// Logical command channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
pub enum MailboxKind {
    Rsmu,
    Mp1,
    Hsmp,
}

impl MailboxKind {
    pub fn name(&self) -> &'static str {
        match self {
            MailboxKind::Rsmu => "RSMU",
            MailboxKind::Mp1 => "MP1",
            MailboxKind::Hsmp => "HSMP",
        }
    }

    /// Driver node that accepts commands for this mailbox
    pub fn node(&self) -> &'static str {
        match self {
            MailboxKind::Rsmu => "rsmu_cmd",
            MailboxKind::Mp1 => "mp1_smu_cmd",
            MailboxKind::Hsmp => "hsmp_smu_cmd",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: u32,
    pub args: MailboxArgs,
}

impl CommandRequest {
    pub fn new(command: u32) -> Self {
        Self {
            command,
            args: [0; MAILBOX_ARG_COUNT],
        }
    }

    pub fn with_arg(mut self, index: usize, value: u32) -> Self {
        if let Some(slot) = self.args.get_mut(index) {
            *slot = value;
        }
        self
    }

    pub fn with_args(command: u32, args: MailboxArgs) -> Self {
        Self { command, args }
    }
}

/// Outcome of one exchange
///
/// `args` is a fresh array: the firmware's words on OK, a copy of the
/// request's words otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandReply {
    pub status: MailboxStatus,
    pub args: MailboxArgs,
}

impl CommandReply {
    pub fn ok(args: MailboxArgs) -> Self {
        Self {
            status: MailboxStatus::Ok,
            args,
        }
    }

    pub fn rejected(status: MailboxStatus, request: &CommandRequest) -> Self {
        Self {
            status,
            args: request.args,
        }
    }

    /// Argument word reinterpreted as an IEEE-754 float
    pub fn arg_f32(&self, index: usize) -> Option<f32> {
        self.args.get(index).map(|word| f32::from_bits(*word))
    }

    /// Turn a non-OK status into `SmuError::CommandFailed`
    pub fn into_result(self, command: u32) -> Result<MailboxArgs> {
        if self.status.is_ok() {
            Ok(self.args)
        } else {
            Err(SmuError::CommandFailed {
                command,
                status: self.status,
            })
        }
    }

    /// Enforce the read-back-on-success rule on a transport reply
    pub(crate) fn normalized(self, request: &CommandRequest) -> Self {
        if self.status.is_ok() {
            self
        } else {
            Self::rejected(self.status, request)
        }
    }
}

/// Mailbox register triple in SMN address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MailboxAddressSet {
    pub message: u32,
    pub response: u32,
    /// `None` for exchanges that carry no arguments
    pub argument: Option<u32>,
}

impl std::fmt::Display for MailboxAddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CMD=0x{:08X} RSP=0x{:08X}", self.message, self.response)?;
        match self.argument {
            Some(arg) => write!(f, " ARG=0x{arg:08X}"),
            None => Ok(()),
        }
    }
}

/// Retry budget for the two poll phases of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub retries: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            retries: POLL_RETRIES,
            interval: Duration::from_micros(POLL_INTERVAL_US),
        }
    }
}

/// Runs exchanges against raw mailbox registers
pub struct MailboxEngine<'a, T: Transport + ?Sized> {
    transport: &'a T,
    policy: PollPolicy,
}

impl<'a, T: Transport + ?Sized> MailboxEngine<'a, T> {
    pub fn new(transport: &'a T, policy: PollPolicy) -> Self {
        Self { transport, policy }
    }

    /// Poll until the response register is non-zero
    ///
    /// Returns `None` once the retry budget is spent. Exactly
    /// `policy.retries` reads are issued in that case.
    fn wait_response(&self, response: u32) -> Result<Option<u32>> {
        for attempt in 0..self.policy.retries {
            let value = self.transport.read_smn(response)?;
            if value != 0 {
                return Ok(Some(value));
            }
            if attempt + 1 < self.policy.retries && !self.policy.interval.is_zero() {
                std::thread::sleep(self.policy.interval);
            }
        }
        Ok(None)
    }

    pub fn execute(&self, mailbox: &MailboxAddressSet, request: &CommandRequest) -> Result<CommandReply> {
        if self.wait_response(mailbox.response)?.is_none() {
            tracing::debug!("{}: mailbox busy before command 0x{:02X}", mailbox, request.command);
            return Ok(CommandReply::rejected(MailboxStatus::Timeout, request));
        }

        self.transport.write_smn(mailbox.response, 0)?;

        if let Some(base) = mailbox.argument {
            for (slot, value) in (0u32..).zip(request.args.iter()) {
                self.transport
                    .write_smn(base + slot * MAILBOX_ARG_STRIDE, *value)?;
            }
        }

        self.transport.write_smn(mailbox.message, request.command)?;

        let status = match self.wait_response(mailbox.response)? {
            Some(raw) => MailboxStatus::from_raw(raw),
            None => MailboxStatus::Timeout,
        };

        let mut args = request.args;
        if status.is_ok() {
            if let Some(base) = mailbox.argument {
                for (slot, value) in (0u32..).zip(args.iter_mut()) {
                    *value = self.transport.read_smn(base + slot * MAILBOX_ARG_STRIDE)?;
                }
            }
        }

        tracing::debug!(
            "{}: command 0x{:02X} -> {}",
            mailbox,
            request.command,
            status
        );

        Ok(CommandReply { status, args })
    }
}
