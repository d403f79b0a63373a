use prometheus::{Gauge, Opts, Registry};
use std::collections::HashMap;
use std::sync::Arc;

use zensmu_raw::current_arch::pm_table::{ENTRY_BYTES, MATISSE_CORES};

use crate::common::Transport;
use crate::config::ExportConfig;
use crate::error::{Result, SmuError};
use crate::metrics::pmtable::{PmCoreMetric, PmSummaryMetric};
use crate::pmtable::{NamedTable, PmTableSnapshot, TelemetrySummary};
use crate::session::Session;

pub struct PmTableMetricExporter<T: Transport> {
    config: ExportConfig,
    registry: Arc<Registry>,
    session: Arc<Session<T>>,
    raw_gauges: Vec<Gauge>,
    summary_gauges: HashMap<PmSummaryMetric, Gauge>,
    core_gauges: HashMap<PmCoreMetric, HashMap<u32, Gauge>>,
}

impl<T: Transport + 'static> PmTableMetricExporter<T> {
    pub fn new(config: ExportConfig, session: Arc<Session<T>>) -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let mut exporter = Self {
            config,
            registry,
            session,
            raw_gauges: Vec::new(),
            summary_gauges: HashMap::new(),
            core_gauges: HashMap::new(),
        };

        exporter.register_metrics()?;

        Ok(exporter)
    }

    fn register_metrics(&mut self) -> Result<()> {
        let info = self.session.identity().pm_table.ok_or(SmuError::PmTableUnsupported)?;

        if self.config.raw_entries {
            let entries = info.size as usize / ENTRY_BYTES;
            let opts = Opts::new("PmTableEntry", "Raw PM table entry");
            for index in 0..entries {
                let gauge = Gauge::with_opts(opts.clone().const_label("index", index.to_string()))?;
                self.registry.register(Box::new(gauge.clone()))?;
                self.raw_gauges.push(gauge);
            }
        }

        if !PmTableSnapshot::has_named_layout(info.version) {
            tracing::info!(
                "PM table 0x{:06X} has no named layout, exporting raw entries only",
                info.version
            );
            return Ok(());
        }

        for metric in PmSummaryMetric::all() {
            let gauge = Gauge::with_opts(Opts::new(
                metric.name(),
                format!("PM table {} reading", metric.name()),
            ))?;
            self.registry.register(Box::new(gauge.clone()))?;
            self.summary_gauges.insert(metric, gauge);
        }

        for metric in PmCoreMetric::all() {
            let opts = Opts::new(metric.name(), format!("Per-core {} reading", metric.name()));

            let mut core_map = HashMap::new();
            for &core in self.config.cores.iter().filter(|&&c| (c as usize) < MATISSE_CORES) {
                let label = self
                    .config
                    .core_labels
                    .get(&core)
                    .cloned()
                    .unwrap_or_else(|| core.to_string());
                let gauge = Gauge::with_opts(opts.clone().const_label("core", label))?;
                self.registry.register(Box::new(gauge.clone()))?;
                core_map.insert(core, gauge);
            }
            self.core_gauges.insert(metric, core_map);
        }

        Ok(())
    }

    fn update_summary(&self, summary: &TelemetrySummary) {
        for (metric, gauge) in &self.summary_gauges {
            gauge.set(metric.value(summary));
        }

        for core in &summary.cores {
            for (metric, core_map) in &self.core_gauges {
                if let Some(gauge) = core_map.get(&core.index) {
                    gauge.set(metric.value(core));
                }
            }
        }
    }

    /// Collect metrics once (called by orchestrator)
    ///
    /// The driver reads block, so they run on the blocking pool.
    pub async fn collect(&self) {
        let session = Arc::clone(&self.session);
        let wants_summary = !self.summary_gauges.is_empty();

        let reading = tokio::task::spawn_blocking(move || {
            let snapshot = session.read_pm_table()?;
            let physical_cores = if wants_summary {
                Some(session.topology().map(|t| t.physical_cores))
            } else {
                None
            };
            Ok::<_, SmuError>((snapshot, physical_cores))
        })
        .await;

        let (snapshot, physical_cores) = match reading {
            Ok(Ok(reading)) => reading,
            Ok(Err(e)) => {
                tracing::error!("Failed to read PM table: {}", e);
                return;
            }
            Err(e) => {
                tracing::error!("PM table collection task failed: {}", e);
                return;
            }
        };

        for (gauge, value) in self.raw_gauges.iter().zip(&snapshot.values) {
            gauge.set(*value as f64);
        }

        let physical_cores = match physical_cores {
            Some(Ok(cores)) => cores,
            Some(Err(e)) => {
                tracing::error!("Failed to resolve topology for PM table summary: {}", e);
                return;
            }
            None => return,
        };

        match snapshot.named() {
            Some(NamedTable::Matisse(table)) => {
                self.update_summary(&TelemetrySummary::from_table(&table, physical_cores));
            }
            None => {
                tracing::warn!("PM table shorter than its named layout, skipping summary");
            }
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}
