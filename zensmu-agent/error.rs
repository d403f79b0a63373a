use std::io;
use thiserror::Error;
use zensmu_raw::current_arch::mailbox::MailboxStatus;
use zensmu_raw::SmnError;

#[derive(Error, Debug)]
pub enum SmuError {
    #[error("SMN access failed: {0}")]
    SmnError(#[from] SmnError),

    #[error("Driver operation failed: {0}")]
    DriverError(String),

    #[error("Command 0x{command:02X} failed with status {status}")]
    CommandFailed { command: u32, status: MailboxStatus },

    #[error("No curve optimizer command returned a valid margin for core {core}")]
    MarginProbeFailed { core: u32 },

    #[error("Margin {0} is outside -60..=10")]
    MarginOutOfRange(i32),

    #[error("PM tables are not supported on this platform")]
    PmTableUnsupported,

    #[error("PM table of {0} bytes exceeds the 0x1AB0 byte limit")]
    PmTableTooLarge(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Prometheus error: {0}")]
    PrometheusError(#[from] prometheus::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, SmuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let err: SmuError = io::Error::new(io::ErrorKind::NotFound, "smu_args").into();
        assert!(matches!(err, SmuError::IoError(_)));

        let err = SmuError::CommandFailed {
            command: 0x5C,
            status: MailboxStatus::RejectedBusy,
        };
        assert!(err.to_string().starts_with("Command 0x5C failed"));
        assert_eq!(
            SmuError::MarginOutOfRange(-61).to_string(),
            "Margin -61 is outside -60..=10"
        );
    }
}
