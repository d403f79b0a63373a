//! SMN (System Management Network) read/write primitives
//!
//! The `ryzen_smu` kernel driver exposes the SMN address space through a
//! single sysfs node. A read is performed by writing the 4-byte address and
//! reading back 4 bytes; a write sends the address and value as one 8-byte
//! record. Handle caching and locking live in the higher-level transport in
//! zensmu-agent; these functions only speak the wire format.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

pub type Result<T> = std::result::Result<T, SmnError>;

/// Name of the SMN node below the driver's sysfs directory
pub const SMN_NODE: &str = "smn";

/// Errors that can occur during SMN operations
#[derive(Debug, thiserror::Error)]
pub enum SmnError {
    #[error("Failed to open SMN node {path}: {source}")]
    OpenFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to read SMN address 0x{addr:08X}: {source}")]
    ReadFailed { addr: u32, source: std::io::Error },

    #[error("Failed to write SMN address 0x{addr:08X}: {source}")]
    WriteFailed { addr: u32, source: std::io::Error },

    #[error("Failed to rewind SMN node for address 0x{addr:08X}: {source}")]
    SeekFailed { addr: u32, source: std::io::Error },
}

/// Open the SMN node of a driver directory for reading and writing
///
/// # Errors
///
/// Returns an error if the driver is not loaded or the caller lacks
/// permission (the node is root-only).
pub fn open_smn(driver_root: &Path) -> Result<File> {
    let path = driver_root.join(SMN_NODE);
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(&path)
        .map_err(|e| SmnError::OpenFailed {
            path: path.display().to_string(),
            source: e,
        })
}

fn rewind(file: &mut File, addr: u32) -> Result<()> {
    file.seek(SeekFrom::Start(0))
        .map_err(|e| SmnError::SeekFailed { addr, source: e })?;
    Ok(())
}

/// Read a 32-bit value from an SMN address
///
/// # Example
///
/// ```ignore
/// use zensmu_raw::smn::{open_smn, read_smn};
///
/// let mut smn = open_smn(Path::new("/sys/kernel/ryzen_smu_drv"))?;
/// let fuse = read_smn(&mut smn, 0x5D218)?;
/// ```
pub fn read_smn(file: &mut File, addr: u32) -> Result<u32> {
    rewind(file, addr)?;
    file.write_all(&addr.to_le_bytes())
        .map_err(|e| SmnError::WriteFailed { addr, source: e })?;

    rewind(file, addr)?;
    let mut buffer = [0u8; 4];
    file.read_exact(&mut buffer)
        .map_err(|e| SmnError::ReadFailed { addr, source: e })?;

    Ok(u32::from_le_bytes(buffer))
}

/// Write a 32-bit value to an SMN address
///
/// # Safety
///
/// Writing arbitrary SMN addresses can hang or reset the machine. Callers
/// are expected to only write mailbox registers they have identified.
pub fn write_smn(file: &mut File, addr: u32, value: u32) -> Result<()> {
    rewind(file, addr)?;
    file.write_all(&encode_write(addr, value))
        .map_err(|e| SmnError::WriteFailed { addr, source: e })?;
    Ok(())
}

/// Encode the 8-byte write record: address followed by value, little endian
pub fn encode_write(addr: u32, value: u32) -> [u8; 8] {
    let mut record = [0u8; 8];
    record[..4].copy_from_slice(&addr.to_le_bytes());
    record[4..].copy_from_slice(&value.to_le_bytes());
    record
}
