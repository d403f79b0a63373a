use prometheus::{Gauge, Opts, Registry};
use std::collections::HashMap;
use std::sync::Arc;

use crate::common::Transport;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::metrics::smu::SmuMetric;
use crate::session::Session;

pub struct SmuMetricExporter<T: Transport> {
    config: ExportConfig,
    registry: Arc<Registry>,
    session: Arc<Session<T>>,
    max_frequency: Gauge,
    margin_gauges: HashMap<u32, Gauge>,
}

impl<T: Transport + 'static> SmuMetricExporter<T> {
    pub fn new(config: ExportConfig, session: Arc<Session<T>>) -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let max_frequency = Gauge::with_opts(Opts::new(
            SmuMetric::MaxFrequency.name(),
            "Maximum boost frequency override",
        ))?;
        registry.register(Box::new(max_frequency.clone()))?;

        let metric = SmuMetric::CurveOptimizerMargin;
        let opts = Opts::new(metric.name(), "Curve optimizer voltage margin");
        let mut margin_gauges = HashMap::new();
        for &core in &config.cores {
            let label = config
                .core_labels
                .get(&core)
                .cloned()
                .unwrap_or_else(|| core.to_string());
            let gauge = Gauge::with_opts(opts.clone().const_label("core", label))?;
            registry.register(Box::new(gauge.clone()))?;
            margin_gauges.insert(core, gauge);
        }

        Ok(Self {
            config,
            registry,
            session,
            max_frequency,
            margin_gauges,
        })
    }

    /// Collect metrics once (called by orchestrator)
    ///
    /// Mailbox exchanges sleep between polls, so they run on the blocking
    /// pool.
    pub async fn collect(&self) {
        let session = Arc::clone(&self.session);
        let cores = self.config.cores.clone();

        let readings = tokio::task::spawn_blocking(move || {
            let max_frequency = session.get_max_frequency();
            let margins: Vec<_> = cores
                .into_iter()
                .map(|core| (core, session.get_core_voltage_margin(core)))
                .collect();
            (max_frequency, margins)
        })
        .await;

        let (max_frequency, margins) = match readings {
            Ok(readings) => readings,
            Err(e) => {
                tracing::error!("SMU collection task failed: {}", e);
                return;
            }
        };

        match max_frequency {
            Ok(mhz) => self.max_frequency.set(mhz as f64),
            Err(e) => tracing::error!("Failed to read max frequency: {}", e),
        }

        for (core, margin) in margins {
            let Some(gauge) = self.margin_gauges.get(&core) else {
                continue;
            };
            match margin {
                Ok(margin) => gauge.set(margin as f64),
                Err(e) => tracing::error!("Failed to read margin for core {}: {}", core, e),
            }
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mock::MockTransport;
    use crate::common::{CpuSignature, DriverInfo};
    use crate::mailbox::CommandReply;
    use std::sync::atomic::{AtomicBool, Ordering};
    use zensmu_raw::current_arch::mailbox::MailboxStatus;

    fn session() -> Arc<Session<MockTransport>> {
        // Vermeer: get margin is 0x7C keyed by core mask
        let transport = MockTransport::new()
            .with_info(DriverInfo {
                codename_id: 12,
                smu_version: 0x0038_5200,
                ..Default::default()
            })
            .with_handler(|_, request| match request.command {
                0x6E => CommandReply::ok([4650, 0, 0, 0, 0, 0]),
                0x7C if request.args[0] >> 20 == 1 => {
                    CommandReply::ok([(-20i32) as u32, 0, 0, 0, 0, 0])
                }
                0x7C => CommandReply::ok([(-5i32) as u32, 0, 0, 0, 0, 0]),
                _ => CommandReply::rejected(MailboxStatus::UnknownCommand, request),
            });
        let cpu = CpuSignature {
            family: 0x19,
            model: 0x21,
            stepping: 0,
            logical_cores: 16,
            brand: String::new(),
        };
        Arc::new(Session::new(transport, cpu).unwrap())
    }

    fn value(registry: &Registry, name: &str, core: Option<&str>) -> Option<f64> {
        registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?
            .get_metric()
            .iter()
            .find(|m| match core {
                Some(core) => m.get_label().iter().any(|l| l.get_value() == core),
                None => true,
            })
            .map(|m| m.get_gauge().get_value())
    }

    #[tokio::test]
    async fn test_slow_mailbox_does_not_block_runtime() {
        let transport = MockTransport::new()
            .with_info(DriverInfo {
                codename_id: 12,
                ..Default::default()
            })
            .with_handler(|_, _| {
                std::thread::sleep(std::time::Duration::from_millis(60));
                CommandReply::ok([4650, 0, 0, 0, 0, 0])
            });
        let cpu = CpuSignature {
            family: 0x19,
            model: 0x21,
            stepping: 0,
            logical_cores: 16,
            brand: String::new(),
        };
        let session = Arc::new(Session::new(transport, cpu).unwrap());
        let exporter = SmuMetricExporter::new(ExportConfig::new(vec![]), session).unwrap();

        let done = AtomicBool::new(false);
        let collect = async {
            exporter.collect().await;
            done.store(true, Ordering::SeqCst);
        };
        let ticker = async {
            let mut ticks = 0;
            while !done.load(Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                ticks += 1;
            }
            ticks
        };

        let ((), ticks) = tokio::join!(collect, ticker);
        assert!(ticks >= 2, "runtime stalled during collection ({ticks} ticks)");
        assert_eq!(value(&exporter.registry(), "MaxFrequencyMHz", None), Some(4650.0));
    }

    #[tokio::test]
    async fn test_collect() {
        let exporter = SmuMetricExporter::new(ExportConfig::new(vec![0, 1]), session()).unwrap();
        exporter.collect().await;

        let registry = exporter.registry();
        assert_eq!(value(&registry, "MaxFrequencyMHz", None), Some(4650.0));
        assert_eq!(value(&registry, "CurveOptimizerMargin", Some("core_0")), Some(-5.0));
        assert_eq!(value(&registry, "CurveOptimizerMargin", Some("core_1")), Some(-20.0));
    }
}
