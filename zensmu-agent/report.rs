//! Machine-readable snapshot of everything the session can tell about the
//! platform

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::Transport;
use crate::error::Result;
use crate::mailbox::MailboxAddressSet;
use crate::pmtable::PmTableSnapshot;
use crate::session::{PlatformIdentity, Session};
use crate::topology::Topology;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PmTableEntry {
    pub index: usize,
    pub offset: String,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemReport {
    pub tool_version: &'static str,
    pub timestamp: u64,
    pub identity: PlatformIdentity,
    pub topology: Option<Topology>,
    pub mailboxes: Vec<MailboxAddressSet>,
    pub pm_table: Option<Vec<PmTableEntry>>,
}

fn entries(snapshot: &PmTableSnapshot) -> Vec<PmTableEntry> {
    snapshot
        .values
        .iter()
        .enumerate()
        .map(|(index, &value)| PmTableEntry {
            index,
            offset: format!("0x{:04X}", PmTableSnapshot::offset_of(index)),
            value,
        })
        .collect()
}

impl SystemReport {
    /// Gather a report; parts that cannot be read are left empty
    pub fn collect<T: Transport>(session: &Session<T>, mailboxes: Vec<MailboxAddressSet>) -> Self {
        let topology = session
            .topology()
            .map_err(|e| tracing::warn!("Topology unavailable: {}", e))
            .ok();

        let pm_table = session
            .read_pm_table()
            .map_err(|e| tracing::warn!("PM table unavailable: {}", e))
            .ok()
            .map(|snapshot| entries(&snapshot));

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            tool_version: env!("CARGO_PKG_VERSION"),
            timestamp,
            identity: session.identity().clone(),
            topology,
            mailboxes,
            pm_table,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
