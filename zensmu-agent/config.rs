use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, SmuError};
use crate::topology::Topology;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:9100";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub cores: Vec<u32>,
    pub core_labels: HashMap<u32, String>,
    pub listen: SocketAddr,
    pub interval: Duration,
    /// Export every PM table float under an `index` label
    pub raw_entries: bool,
}

impl ExportConfig {
    /// Create a new configuration for the given physical cores
    pub fn new(cores: Vec<u32>) -> Self {
        let core_labels: HashMap<u32, String> = cores
            .iter()
            .map(|&core| (core, format!("core_{core}")))
            .collect();

        Self {
            cores,
            core_labels,
            listen: SocketAddr::from(([0, 0, 0, 0], 9100)),
            interval: DEFAULT_INTERVAL,
            raw_entries: false,
        }
    }

    /// Every enabled physical core of the resolved topology
    pub fn from_topology(topology: &Topology) -> Self {
        let cores: Vec<u32> = (0..topology.physical_cores)
            .filter(|&core| topology.core_enabled(core))
            .collect();

        tracing::info!(
            "Auto-detected {} enabled cores of {}",
            cores.len(),
            topology.physical_cores
        );

        Self::new(cores)
    }

    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_raw_entries(mut self, raw_entries: bool) -> Self {
        self.raw_entries = raw_entries;
        self
    }

    /// Parse a core list like "0-3,5" into a sorted, deduplicated list
    pub fn parse_cpu_list(s: &str) -> Result<Vec<u32>> {
        let invalid = || SmuError::ConfigError(format!("invalid core list: {s:?}"));

        let mut cpus = Vec::new();
        for part in s.trim().split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| invalid())?;
                let end: u32 = end.trim().parse().map_err(|_| invalid())?;
                if start > end {
                    return Err(invalid());
                }
                cpus.extend(start..=end);
            } else {
                cpus.push(part.parse().map_err(|_| invalid())?);
            }
        }

        cpus.sort_unstable();
        cpus.dedup();
        Ok(cpus)
    }

    pub fn parse_listen(s: &str) -> Result<SocketAddr> {
        s.parse()
            .map_err(|e| SmuError::ConfigError(format!("invalid listen address {s:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zensmu_raw::current_arch::fuse::{CcdFuse, CoreFuse};
    use zensmu_raw::RegisterLayout;

    #[test]
    fn test_parse_cpu_list() {
        assert_eq!(ExportConfig::parse_cpu_list("0-3,5").unwrap(), vec![0, 1, 2, 3, 5]);
        assert_eq!(ExportConfig::parse_cpu_list(" 7 ").unwrap(), vec![7]);
        assert_eq!(ExportConfig::parse_cpu_list("3,1-2,1").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_cpu_list_rejects_garbage() {
        assert!(ExportConfig::parse_cpu_list("").is_err());
        assert!(ExportConfig::parse_cpu_list("a-b").is_err());
        assert!(ExportConfig::parse_cpu_list("4-2").is_err());
        assert!(ExportConfig::parse_cpu_list("1,,2").is_err());
    }

    #[test]
    fn test_labels() {
        let config = ExportConfig::new(vec![0, 4]);
        assert_eq!(config.core_labels[&4], "core_4");
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert!(!config.raw_entries);
        assert_eq!(config.listen, ExportConfig::parse_listen(DEFAULT_LISTEN).unwrap());
    }

    #[test]
    fn test_from_topology_skips_disabled_cores() {
        // One CCD with SMT, core 2 fused off
        let ccd = CcdFuse::from_words(1 << 22, 0);
        let core = CoreFuse::from_reg_value(0b0000_0100 | 1 << 8);
        let topology = Topology::from_fuses(0x19, 16, ccd, core);

        let config = ExportConfig::from_topology(&topology);
        assert_eq!(config.cores, vec![0, 1, 3, 4, 5, 6, 7]);
    }
}
