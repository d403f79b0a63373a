//! Session: the context every SMU operation runs against
//!
//! A session is created once at startup from a transport. It captures the
//! platform identity, resolves the dispatch profile, and caches the
//! topology the first time it is asked for.

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::Path;

use zensmu_raw::current_arch::pm_table::MAX_BYTES;

use crate::catalog::{self, PlatformProfile, ProbeOutcome, ScanRange};
use crate::common::{
    Codename, CpuSignature, InterfaceVersion, SysfsTransport, Transport, CPU_SIGNATURE,
};
use crate::error::{Result, SmuError};
use crate::mailbox::{CommandReply, CommandRequest, MailboxAddressSet, MailboxArgs, MailboxKind};
use crate::pmtable::PmTableSnapshot;
use crate::scanner::{MailboxScanner, ScanOptions};
use crate::timings::MemoryTimings;
use crate::topology::Topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PmTableInfo {
    pub size: u64,
    pub version: u32,
}

/// Immutable facts about the processor, captured at session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformIdentity {
    pub cpu_name: String,
    pub family: u32,
    pub model: u32,
    pub codename: Codename,
    pub interface_version: InterfaceVersion,
    pub firmware_version: String,
    pub firmware_raw: u32,
    /// `None` when the platform has no PM table
    pub pm_table: Option<PmTableInfo>,
}

/// Render a firmware word as `major.minor.patch`
pub fn format_firmware_version(raw: u32) -> String {
    format!("{}.{}.{}", (raw >> 16) & 0xFF, (raw >> 8) & 0xFF, raw & 0xFF)
}

pub struct Session<T: Transport> {
    transport: T,
    cpu: CpuSignature,
    identity: PlatformIdentity,
    profile: PlatformProfile,
    scan_options: ScanOptions,
    topology: OnceCell<Topology>,
}

impl Session<SysfsTransport> {
    /// Open the driver at `root` on the running CPU
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let transport = SysfsTransport::new(root.as_ref())?;
        Self::new(transport, CPU_SIGNATURE.clone())
    }
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, cpu: CpuSignature) -> Result<Self> {
        let info = transport.driver_info()?;

        let codename = Codename::from_driver_id(info.codename_id);
        let pm_table = match (info.pm_table_size, info.pm_table_version) {
            (Some(size), Some(version)) if size > 0 => Some(PmTableInfo { size, version }),
            _ => None,
        };

        let identity = PlatformIdentity {
            cpu_name: cpu.brand.clone(),
            family: cpu.family,
            model: cpu.model,
            codename,
            interface_version: InterfaceVersion::from_driver_index(info.if_version_index),
            firmware_version: format_firmware_version(info.smu_version),
            firmware_raw: info.smu_version,
            pm_table,
        };

        tracing::info!(
            "SMU v{} on {} ({:?}), PM table {}",
            identity.firmware_version,
            identity.codename,
            identity.interface_version,
            match identity.pm_table {
                Some(t) => format!("0x{:06X} ({} bytes)", t.version, t.size),
                None => "unsupported".to_string(),
            }
        );

        Ok(Self {
            transport,
            cpu,
            profile: catalog::profile_for(codename),
            identity,
            scan_options: ScanOptions::default(),
            topology: OnceCell::new(),
        })
    }

    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    pub fn identity(&self) -> &PlatformIdentity {
        &self.identity
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn topology(&self) -> Result<Topology> {
        self.topology
            .get_or_try_init(|| Topology::resolve(&self.transport, &self.cpu))
            .copied()
    }

    pub fn core_enabled(&self, index: u32) -> Result<bool> {
        Ok(self.topology()?.core_enabled(index))
    }

    /// Send one command on a driver-known mailbox
    ///
    /// The reply's arguments are the firmware's only when the status is OK.
    pub fn send_command(
        &self,
        kind: MailboxKind,
        command: u32,
        args: MailboxArgs,
    ) -> Result<CommandReply> {
        self.submit(kind, &CommandRequest::with_args(command, args))
    }

    fn submit(&self, kind: MailboxKind, request: &CommandRequest) -> Result<CommandReply> {
        Ok(self.transport.submit(kind, request)?.normalized(request))
    }

    pub fn get_max_frequency(&self) -> Result<u32> {
        let request = catalog::get_max_frequency_request();
        let args = self
            .submit(catalog::CATALOG_MAILBOX, &request)?
            .into_result(request.command)?;
        Ok(args[0])
    }

    pub fn set_max_frequency(&self, mhz: u32) -> Result<()> {
        let request = catalog::set_max_frequency_request(mhz);
        self.submit(catalog::CATALOG_MAILBOX, &request)?
            .into_result(request.command)?;
        tracing::info!("Max frequency set to {} MHz", mhz);
        Ok(())
    }

    pub fn get_core_voltage_margin(&self, core: u32) -> Result<i32> {
        let candidates = catalog::get_candidates(&self.profile, core);
        let outcome = catalog::probe_margin(&candidates, |request| {
            self.submit(catalog::CATALOG_MAILBOX, request)
        })?;

        if outcome == ProbeOutcome::ZeroOnly {
            tracing::debug!("Core {}: only zero margins reported", core);
        }
        outcome.margin().ok_or(SmuError::MarginProbeFailed { core })
    }

    /// Margins outside -60..=10 are rejected before anything is sent
    pub fn set_core_voltage_margin(&self, core: u32, margin: i32) -> Result<()> {
        let request = catalog::set_request(&self.profile, core, margin)?;
        self.submit(catalog::CATALOG_MAILBOX, &request)?
            .into_result(request.command)?;
        tracing::info!("Core {} margin set to {}", core, margin);
        Ok(())
    }

    pub fn read_pm_table(&self) -> Result<PmTableSnapshot> {
        let info = self.identity.pm_table.ok_or(SmuError::PmTableUnsupported)?;
        if info.size > MAX_BYTES as u64 {
            return Err(SmuError::PmTableTooLarge(info.size));
        }

        let mut buffer = vec![0u8; info.size as usize];
        let read = self.transport.read_pm_table(&mut buffer)?;
        PmTableSnapshot::decode(&buffer[..read], info.size, info.version)
    }

    pub fn read_smn(&self, addr: u32) -> Result<u32> {
        self.transport.read_smn(addr)
    }

    pub fn write_smn(&self, addr: u32, value: u32) -> Result<()> {
        self.transport.write_smn(addr, value)
    }

    /// Read every word in `start..=end`; a failed address does not stop
    /// the rest of the range
    pub fn read_smn_range(&self, start: u32, end: u32) -> Vec<(u32, Result<u32>)> {
        let mut words = Vec::new();
        let mut addr = start;
        while addr <= end {
            words.push((addr, self.transport.read_smn(addr)));
            addr = match addr.checked_add(4) {
                Some(next) => next,
                None => break,
            };
        }
        words
    }

    /// Sweep the platform's scan ranges for undocumented mailboxes
    pub fn scan_mailboxes(&self) -> Result<Vec<MailboxAddressSet>> {
        tracing::warn!("Mailbox scan writes to arbitrary SMN addresses");
        MailboxScanner::new(&self.transport, self.identity.firmware_raw, self.scan_options)
            .scan(self.profile.scan_ranges)
    }

    /// Sweep a single caller-supplied range
    pub fn scan_mailbox_range(&self, range: &ScanRange) -> Result<Vec<MailboxAddressSet>> {
        tracing::warn!("Mailbox scan writes to arbitrary SMN addresses");
        let mut found = Vec::new();
        MailboxScanner::new(&self.transport, self.identity.firmware_raw, self.scan_options)
            .scan_range(range, &mut found)?;
        Ok(found)
    }

    pub fn memory_timings(&self) -> Result<MemoryTimings> {
        MemoryTimings::read(&self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mock::MockTransport;
    use crate::common::DriverInfo;
    use crate::mailbox::PollPolicy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use zensmu_raw::current_arch::mailbox::MailboxStatus;

    fn cpu() -> CpuSignature {
        CpuSignature {
            family: 0x19,
            model: 0x21,
            stepping: 0,
            logical_cores: 16,
            brand: "AMD Ryzen 7 5800X 8-Core Processor".into(),
        }
    }

    fn info(codename_id: u32) -> DriverInfo {
        DriverInfo {
            codename_id,
            smu_version: 0x0038_5200,
            if_version_index: 2,
            pm_table_size: Some(0x7E4),
            pm_table_version: Some(0x0038_0805),
        }
    }

    #[test]
    fn test_identity() {
        let session = Session::new(MockTransport::new().with_info(info(12)), cpu()).unwrap();
        let identity = session.identity();
        assert_eq!(identity.codename, Codename::Vermeer);
        assert_eq!(identity.firmware_version, "56.82.0");
        assert_eq!(identity.interface_version, InterfaceVersion::V11);
        assert_eq!(identity.pm_table, Some(PmTableInfo { size: 0x7E4, version: 0x0038_0805 }));
        assert_eq!(session.profile().psm_get, Some(0x7C));
    }

    #[test]
    fn test_max_frequency() {
        let transport = MockTransport::new().with_info(info(12)).with_handler(|kind, request| {
            assert_eq!(kind, MailboxKind::Rsmu);
            match request.command {
                0x6E => CommandReply::ok([4850, 0, 0, 0, 0, 0]),
                0x5C => CommandReply::ok(request.args),
                _ => CommandReply::rejected(MailboxStatus::UnknownCommand, request),
            }
        });
        let session = Session::new(transport, cpu()).unwrap();

        assert_eq!(session.get_max_frequency().unwrap(), 4850);
        session.set_max_frequency(4600).unwrap();

        let submissions = session.transport().submissions();
        assert_eq!(submissions[1].1.command, 0x5C);
        assert_eq!(submissions[1].1.args[0], 4600);
    }

    #[test]
    fn test_rejected_reply_keeps_request_args() {
        let transport = MockTransport::new()
            .with_info(info(12))
            .with_handler(|_, _| CommandReply {
                status: MailboxStatus::RejectedBusy,
                args: [0xDEAD; 6],
            });
        let session = Session::new(transport, cpu()).unwrap();

        let reply = session
            .send_command(MailboxKind::Mp1, 0x42, [1, 2, 3, 4, 5, 6])
            .unwrap();
        assert_eq!(reply.status, MailboxStatus::RejectedBusy);
        assert_eq!(reply.args, [1, 2, 3, 4, 5, 6]);
        assert!(session.get_max_frequency().is_err());
    }

    #[test]
    fn test_margin_on_unknown_platform() {
        // 0x7C answers zero, 0xE1 answers -15
        let transport = MockTransport::new().with_info(info(0)).with_handler(|_, request| {
            match request.command {
                0x7C => CommandReply::ok([0; 6]),
                0xE1 => CommandReply::ok([(-15i32) as u32, 0, 0, 0, 0, 0]),
                _ => CommandReply::rejected(MailboxStatus::UnknownCommand, request),
            }
        });
        let session = Session::new(transport, cpu()).unwrap();

        assert_eq!(session.get_core_voltage_margin(0).unwrap(), -15);
        let commands: Vec<u32> = session
            .transport()
            .submissions()
            .iter()
            .map(|(_, r)| r.command)
            .collect();
        assert_eq!(commands, vec![0xD5, 0x7C, 0xA3, 0xE1]);
    }

    #[test]
    fn test_margin_probe_failure() {
        let session = Session::new(MockTransport::new().with_info(info(23)), cpu()).unwrap();
        assert!(matches!(
            session.get_core_voltage_margin(3),
            Err(SmuError::MarginProbeFailed { core: 3 })
        ));
        assert_eq!(session.transport().submissions().len(), 2);
    }

    #[test]
    fn test_set_margin_validates_first() {
        let session = Session::new(MockTransport::new().with_info(info(23)), cpu()).unwrap();
        assert!(matches!(
            session.set_core_voltage_margin(0, -61),
            Err(SmuError::MarginOutOfRange(-61))
        ));
        assert!(session.transport().submissions().is_empty());
    }

    #[test]
    fn test_set_margin_combined() {
        let transport = MockTransport::new()
            .with_info(info(23))
            .with_handler(|_, request| CommandReply::ok(request.args));
        let session = Session::new(transport, cpu()).unwrap();

        session.set_core_voltage_margin(9, -20).unwrap();
        let (_, request) = session.transport().submissions()[0];
        assert_eq!(request.command, 0x06);
        assert_eq!(request.args[0], 0x1010_FFEC);
    }

    #[test]
    fn test_pm_table_unsupported() {
        let mut no_table = info(12);
        no_table.pm_table_size = None;
        let session = Session::new(MockTransport::new().with_info(no_table), cpu()).unwrap();
        assert!(matches!(session.read_pm_table(), Err(SmuError::PmTableUnsupported)));
    }

    #[test]
    fn test_pm_table_read() {
        let bytes: Vec<u8> = (0..0x7E4 / 4).flat_map(|i| (i as f32).to_le_bytes()).collect();
        let transport = MockTransport::new().with_info(info(12)).with_pm_table(bytes);
        let session = Session::new(transport, cpu()).unwrap();

        let snapshot = session.read_pm_table().unwrap();
        assert_eq!(snapshot.len(), 0x7E4 / 4);
        assert_eq!(snapshot.get(10), Some(10.0));
        assert!(snapshot.named().is_none());
    }

    #[test]
    fn test_pm_table_too_large() {
        let mut huge = info(12);
        huge.pm_table_size = Some(0x2000);
        let session = Session::new(MockTransport::new().with_info(huge), cpu()).unwrap();
        assert!(matches!(session.read_pm_table(), Err(SmuError::PmTableTooLarge(0x2000))));
    }

    #[test]
    fn test_topology_is_cached() {
        let transport = MockTransport::new()
            .with_info(info(12))
            .with_register(0x5D218, 1 << 22)
            .with_register(0x3008_1D98, 1 << 8);
        let session = Session::new(transport, cpu()).unwrap();

        let first = session.topology().unwrap();
        let second = session.topology().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.physical_cores, 8);
        assert_eq!(session.transport().read_count(0x5D218), 1);
        assert!(session.core_enabled(7).unwrap());
    }

    #[test]
    fn test_smn_range_keeps_going() {
        let transport = MockTransport::new()
            .with_info(info(12))
            .with_register(0x100, 1)
            .with_failing(0x104)
            .with_register(0x108, 3);
        let session = Session::new(transport, cpu()).unwrap();

        let words = session.read_smn_range(0x100, 0x10B);
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].1.as_ref().ok(), Some(&1));
        assert!(words[1].1.is_err());
        assert_eq!(words[2].1.as_ref().ok(), Some(&3));
    }

    #[test]
    fn test_scan_uses_platform_ranges() {
        let transport = MockTransport::new()
            .with_info(info(20))
            .with_default(u32::MAX)
            .with_mailbox(0x03B1_0528, 0x03B1_0564, 0x03B1_0998, 0x0038_5200);
        let options = ScanOptions {
            settle: Duration::ZERO,
            poll: PollPolicy {
                retries: 4,
                interval: Duration::ZERO,
            },
        };
        let session = Session::new(transport, cpu()).unwrap().with_scan_options(options);

        let found = session.scan_mailboxes().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].argument, Some(0x03B1_0998));
    }

    #[test]
    fn test_scan_single_range() {
        let transport = MockTransport::new()
            .with_info(info(0))
            .with_default(u32::MAX)
            .with_mailbox(0x03B1_0A20, 0x03B1_0A80, 0x03B1_0A90, 0x0038_5200);
        let options = ScanOptions {
            settle: Duration::ZERO,
            poll: PollPolicy {
                retries: 4,
                interval: Duration::ZERO,
            },
        };
        let session = Session::new(transport, cpu()).unwrap().with_scan_options(options);

        let range = ScanRange::new(0x03B1_0A00, 0x03B1_0AFF, 4, 0x60);
        let found = session.scan_mailbox_range(&range).unwrap();
        assert_eq!(
            found,
            vec![MailboxAddressSet {
                message: 0x03B1_0A20,
                response: 0x03B1_0A80,
                argument: Some(0x03B1_0A90),
            }]
        );
        assert!(session
            .scan_mailbox_range(&ScanRange::new(0x100, 0x200, 0, 4))
            .is_err());
    }

    #[test]
    fn test_session_is_shareable() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let transport = MockTransport::new().with_info(info(12)).with_handler(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            CommandReply::ok([4000, 0, 0, 0, 0, 0])
        });
        let session = Arc::new(Session::new(transport, cpu()).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || session.get_max_frequency().unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 4000);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
