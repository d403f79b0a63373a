//! In-memory transport for hardware-free tests
//!
//! Registers live in a map with a configurable default. Emulated mailboxes
//! react to writes of their message register the way firmware does for the
//! test and version commands, and a scripted handler answers driver-level
//! submissions.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use zensmu_raw::current_arch::mailbox::{common, status, MailboxStatus};

use crate::common::transport::{DriverInfo, Transport};
use crate::error::{Result, SmuError};
use crate::mailbox::{CommandReply, CommandRequest, MailboxKind};

type SubmitHandler = Box<dyn FnMut(MailboxKind, &CommandRequest) -> CommandReply + Send>;

#[derive(Debug, Clone, Copy)]
struct EmulatedMailbox {
    message: u32,
    response: u32,
    argument: u32,
    firmware: u32,
}

#[derive(Default)]
struct MockState {
    registers: HashMap<u32, u32>,
    default_value: u32,
    failing: HashSet<u32>,
    reads: HashMap<u32, usize>,
    writes: Vec<(u32, u32)>,
    mailboxes: Vec<EmulatedMailbox>,
    handler: Option<SubmitHandler>,
    submissions: Vec<(MailboxKind, CommandRequest)>,
    info: DriverInfo,
    pm_table: Vec<u8>,
}

#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned for addresses that were never written
    pub fn with_default(self, value: u32) -> Self {
        self.state.lock().default_value = value;
        self
    }

    pub fn with_register(self, addr: u32, value: u32) -> Self {
        self.state.lock().registers.insert(addr, value);
        self
    }

    pub fn with_failing(self, addr: u32) -> Self {
        self.state.lock().failing.insert(addr);
        self
    }

    pub fn with_info(self, info: DriverInfo) -> Self {
        self.state.lock().info = info;
        self
    }

    pub fn with_pm_table(self, bytes: Vec<u8>) -> Self {
        self.state.lock().pm_table = bytes;
        self
    }

    /// Emulate a mailbox that answers TEST_MESSAGE and GET_SMU_VERSION
    pub fn with_mailbox(self, message: u32, response: u32, argument: u32, firmware: u32) -> Self {
        {
            let mut state = self.state.lock();
            state.registers.insert(message, 0);
            state.registers.insert(response, status::OK);
            state.registers.insert(argument, 0);
            state.mailboxes.push(EmulatedMailbox {
                message,
                response,
                argument,
                firmware,
            });
        }
        self
    }

    pub fn with_handler<F>(self, handler: F) -> Self
    where
        F: FnMut(MailboxKind, &CommandRequest) -> CommandReply + Send + 'static,
    {
        self.state.lock().handler = Some(Box::new(handler));
        self
    }

    pub fn read_count(&self, addr: u32) -> usize {
        self.state.lock().reads.get(&addr).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.state.lock().writes.clone()
    }

    pub fn submissions(&self) -> Vec<(MailboxKind, CommandRequest)> {
        self.state.lock().submissions.clone()
    }

    pub fn register(&self, addr: u32) -> u32 {
        let state = self.state.lock();
        state
            .registers
            .get(&addr)
            .copied()
            .unwrap_or(state.default_value)
    }
}

impl Transport for MockTransport {
    fn read_smn(&self, addr: u32) -> Result<u32> {
        let mut state = self.state.lock();
        *state.reads.entry(addr).or_insert(0) += 1;
        if state.failing.contains(&addr) {
            return Err(SmuError::DriverError(format!("mock read of 0x{addr:08X} failed")));
        }
        Ok(state
            .registers
            .get(&addr)
            .copied()
            .unwrap_or(state.default_value))
    }

    fn write_smn(&self, addr: u32, value: u32) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing.contains(&addr) {
            return Err(SmuError::DriverError(format!("mock write of 0x{addr:08X} failed")));
        }
        state.writes.push((addr, value));
        state.registers.insert(addr, value);

        let mailbox = state.mailboxes.iter().copied().find(|m| m.message == addr);
        if let Some(mailbox) = mailbox {
            let reply = match value {
                common::TEST_MESSAGE => {
                    let arg = state
                        .registers
                        .get(&mailbox.argument)
                        .copied()
                        .unwrap_or(0);
                    state.registers.insert(mailbox.argument, arg.wrapping_add(1));
                    status::OK
                }
                common::GET_SMU_VERSION => {
                    state.registers.insert(mailbox.argument, mailbox.firmware);
                    status::OK
                }
                _ => status::UNKNOWN_CMD,
            };
            state.registers.insert(mailbox.response, reply);
        }
        Ok(())
    }

    fn submit(&self, kind: MailboxKind, request: &CommandRequest) -> Result<CommandReply> {
        let mut state = self.state.lock();
        state.submissions.push((kind, *request));
        let reply = match state.handler.as_mut() {
            Some(handler) => handler(kind, request),
            None => CommandReply {
                status: MailboxStatus::UnknownCommand,
                args: request.args,
            },
        };
        Ok(reply)
    }

    fn driver_info(&self) -> Result<DriverInfo> {
        Ok(self.state.lock().info.clone())
    }

    fn read_pm_table(&self, buffer: &mut [u8]) -> Result<usize> {
        let state = self.state.lock();
        let n = buffer.len().min(state.pm_table.len());
        buffer[..n].copy_from_slice(&state.pm_table[..n]);
        Ok(n)
    }
}
