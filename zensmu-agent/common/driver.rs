use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use zensmu_raw::current_arch::mailbox::{MailboxStatus, MAILBOX_ARG_COUNT};
use zensmu_raw::smn;

use crate::common::transport::{DriverInfo, Transport};
use crate::error::{Result, SmuError};
use crate::mailbox::{CommandReply, CommandRequest, MailboxArgs, MailboxKind};

pub const DEFAULT_DRIVER_ROOT: &str = "/sys/kernel/ryzen_smu_drv";

const ARGS_NODE: &str = "smu_args";
const PM_TABLE_NODE: &str = "pm_table";
const PM_TABLE_SIZE_NODE: &str = "pm_table_size";
const PM_TABLE_VERSION_NODE: &str = "pm_table_version";

/// Transport backed by the `ryzen_smu` sysfs interface
pub struct SysfsTransport {
    root: PathBuf,
    smn: Mutex<File>,
    mailboxes: Mutex<HashMap<MailboxKind, File>>,
}

impl SysfsTransport {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let smn = smn::open_smn(&root)?;

        tracing::info!("Opened SMN node under {}", root.display());

        Ok(Self {
            root,
            smn: Mutex::new(smn),
            mailboxes: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn node(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn open_rw(&self, name: &str) -> Result<File> {
        let path = self.node(name);
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| SmuError::DriverError(format!("Failed to open {}: {e}", path.display())))
    }

    fn read_text(&self, name: &str) -> Result<String> {
        let path = self.node(name);
        std::fs::read_to_string(&path)
            .map(|s| s.trim().to_string())
            .map_err(|e| SmuError::DriverError(format!("Failed to read {}: {e}", path.display())))
    }

    fn read_binary<const N: usize>(&self, name: &str) -> Result<Option<[u8; N]>> {
        let path = self.node(name);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SmuError::DriverError(format!(
                    "Failed to open {}: {e}",
                    path.display()
                )))
            }
        };

        let mut buffer = [0u8; N];
        file.read_exact(&mut buffer).map_err(|e| {
            SmuError::DriverError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(Some(buffer))
    }

    fn exchange(file: &mut File, args: &mut File, request: &CommandRequest) -> std::io::Result<CommandReply> {
        args.seek(SeekFrom::Start(0))?;
        args.write_all(&encode_args(&request.args))?;

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&request.command.to_le_bytes())?;

        file.seek(SeekFrom::Start(0))?;
        let mut status = [0u8; 4];
        file.read_exact(&mut status)?;
        let status = MailboxStatus::from_raw(u32::from_le_bytes(status));

        let mut reply = request.args;
        if status.is_ok() {
            args.seek(SeekFrom::Start(0))?;
            let mut buffer = [0u8; MAILBOX_ARG_COUNT * 4];
            args.read_exact(&mut buffer)?;
            reply = decode_args(&buffer);
        }

        Ok(CommandReply {
            status,
            args: reply,
        })
    }
}

impl Transport for SysfsTransport {
    fn read_smn(&self, addr: u32) -> Result<u32> {
        let mut file = self.smn.lock();
        let value = smn::read_smn(&mut file, addr)?;
        tracing::debug!("SMN read: 0x{:08x} = 0x{:08x}", addr, value);
        Ok(value)
    }

    fn write_smn(&self, addr: u32, value: u32) -> Result<()> {
        let mut file = self.smn.lock();
        tracing::debug!("SMN write: 0x{:08x} <- 0x{:08x}", addr, value);
        smn::write_smn(&mut file, addr, value)?;
        Ok(())
    }

    fn submit(&self, kind: MailboxKind, request: &CommandRequest) -> Result<CommandReply> {
        let mut mailboxes = self.mailboxes.lock();
        if !mailboxes.contains_key(&kind) {
            let file = self.open_rw(kind.node())?;
            mailboxes.insert(kind, file);
        }
        let mut args = self.open_rw(ARGS_NODE)?;

        let file = mailboxes
            .get_mut(&kind)
            .ok_or_else(|| SmuError::DriverError(format!("{} mailbox unavailable", kind.name())))?;

        let reply = Self::exchange(file, &mut args, request).map_err(|e| {
            SmuError::DriverError(format!(
                "{} command 0x{:02X} failed: {e}",
                kind.name(),
                request.command
            ))
        })?;

        tracing::debug!(
            "{} command 0x{:02X} args {:08x?} -> {} {:08x?}",
            kind.name(),
            request.command,
            request.args,
            reply.status,
            reply.args
        );

        Ok(reply)
    }

    fn driver_info(&self) -> Result<DriverInfo> {
        let codename_id = parse_decimal(&self.read_text("codename")?)?;
        let smu_version = parse_firmware_version(&self.read_text("version")?)?;
        let if_version_index = parse_decimal(&self.read_text("mp1_if_version")?)?;

        let pm_table_size = self
            .read_binary::<8>(PM_TABLE_SIZE_NODE)?
            .map(u64::from_le_bytes);
        let pm_table_version = self
            .read_binary::<4>(PM_TABLE_VERSION_NODE)?
            .map(u32::from_le_bytes);

        Ok(DriverInfo {
            codename_id,
            smu_version,
            if_version_index,
            pm_table_size,
            pm_table_version,
        })
    }

    fn read_pm_table(&self, buffer: &mut [u8]) -> Result<usize> {
        let path = self.node(PM_TABLE_NODE);
        let mut file = File::open(&path).map_err(|e| {
            SmuError::DriverError(format!("Failed to open {}: {e}", path.display()))
        })?;

        let mut filled = 0;
        while filled < buffer.len() {
            let n = file.read(&mut buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

fn encode_args(args: &MailboxArgs) -> [u8; MAILBOX_ARG_COUNT * 4] {
    let mut buffer = [0u8; MAILBOX_ARG_COUNT * 4];
    for (chunk, arg) in buffer.chunks_exact_mut(4).zip(args) {
        chunk.copy_from_slice(&arg.to_le_bytes());
    }
    buffer
}

fn decode_args(buffer: &[u8; MAILBOX_ARG_COUNT * 4]) -> MailboxArgs {
    let mut args = [0u32; MAILBOX_ARG_COUNT];
    for (arg, chunk) in args.iter_mut().zip(buffer.chunks_exact(4)) {
        *arg = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    args
}

fn parse_decimal(text: &str) -> Result<u32> {
    text.trim()
        .parse()
        .map_err(|e| SmuError::ParseError(format!("Expected a number, got {text:?}: {e}")))
}

/// Accepts `46.54.0`, `SMU v46.54.0` or a bare hex word
fn parse_firmware_version(text: &str) -> Result<u32> {
    let text = text.trim();
    let text = text.strip_prefix("SMU v").unwrap_or(text);

    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() >= 3 {
        let mut word = 0u32;
        for part in &parts[parts.len() - 3..] {
            let byte: u8 = part.parse().map_err(|e| {
                SmuError::ParseError(format!("Bad firmware version {text:?}: {e}"))
            })?;
            word = (word << 8) | byte as u32;
        }
        return Ok(word);
    }

    let hex = text.trim_start_matches("0x");
    u32::from_str_radix(hex, 16)
        .map_err(|e| SmuError::ParseError(format!("Bad firmware version {text:?}: {e}")))
}
