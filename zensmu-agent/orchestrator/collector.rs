// Centralized metric collection orchestrator
// Drives every exporter from a single interval loop until cancelled

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::Transport;
use crate::config::ExportConfig;
use crate::prom::{PmTableMetricExporter, SmuMetricExporter};
use crate::session::Session;

/// Configuration for which metrics to collect
#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    pub pm_table: bool,
    pub smu: bool,
}

pub struct MetricCollector<T: Transport + 'static> {
    config: ExportConfig,

    pm_table_exporter: Option<Arc<PmTableMetricExporter<T>>>,
    smu_exporter: Option<Arc<SmuMetricExporter<T>>>,
}

impl<T: Transport + 'static> MetricCollector<T> {
    pub fn new(
        config: ExportConfig,
        collector_config: CollectorConfig,
        session: Arc<Session<T>>,
    ) -> crate::error::Result<Self> {
        let mut collector = Self {
            config: config.clone(),
            pm_table_exporter: None,
            smu_exporter: None,
        };

        crate::init_exporter!(
            collector,
            collector_config,
            config,
            session,
            pm_table_exporter,
            pm_table,
            PmTableMetricExporter<T>,
            "PM table"
        );
        crate::init_exporter!(
            collector,
            collector_config,
            config,
            session,
            smu_exporter,
            smu,
            SmuMetricExporter<T>,
            "SMU"
        );

        if collector.pm_table_exporter.is_none() && collector.smu_exporter.is_none() {
            return Err(crate::SmuError::ConfigError(
                "no exporter could be initialized".to_string(),
            ));
        }

        Ok(collector)
    }

    /// Start the collection loop; it exits once `cancel_token` fires
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tracing::warn!(
            "Starting metric collection every {:?}",
            self.config.interval
        );

        tokio::spawn(async move {
            self.collection_loop(cancel_token).await;
        })
    }

    async fn collection_loop(self, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("Collection loop cancelled");
                    break;
                }
                _ = interval.tick() => {}
            }

            let mut tasks = Vec::new();

            crate::spawn_collector!(tasks, &self.pm_table_exporter);
            crate::spawn_collector!(tasks, &self.smu_exporter);

            for task in tasks {
                if let Err(e) = task.await {
                    tracing::error!("Collection task failed: {}", e);
                }
            }
        }
    }

    pub fn pm_table_exporter(&self) -> Option<Arc<PmTableMetricExporter<T>>> {
        self.pm_table_exporter.clone()
    }

    pub fn smu_exporter(&self) -> Option<Arc<SmuMetricExporter<T>>> {
        self.smu_exporter.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mock::MockTransport;
    use crate::common::{CpuSignature, DriverInfo};
    use crate::mailbox::CommandReply;
    use std::time::Duration;

    fn session() -> Arc<Session<MockTransport>> {
        let transport = MockTransport::new()
            .with_info(DriverInfo {
                codename_id: 12,
                ..Default::default()
            })
            .with_handler(|_, _| CommandReply::ok([4700, 0, 0, 0, 0, 0]));
        let cpu = CpuSignature {
            family: 0x19,
            model: 0x21,
            stepping: 0,
            logical_cores: 16,
            brand: String::new(),
        };
        Arc::new(Session::new(transport, cpu).unwrap())
    }

    #[test]
    fn test_failed_exporter_is_skipped() {
        // No PM table on this platform, SMU exporter still comes up
        let config = CollectorConfig {
            pm_table: true,
            smu: true,
        };
        let collector = MetricCollector::new(ExportConfig::new(vec![0]), config, session()).unwrap();
        assert!(collector.pm_table_exporter().is_none());
        assert!(collector.smu_exporter().is_some());
    }

    #[test]
    fn test_nothing_enabled() {
        let result = MetricCollector::new(
            ExportConfig::new(vec![0]),
            CollectorConfig::default(),
            session(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancel() {
        let config = ExportConfig::new(vec![0]).with_interval(Duration::from_millis(5));
        let session = session();
        let collector = MetricCollector::new(
            config,
            CollectorConfig {
                pm_table: false,
                smu: true,
            },
            Arc::clone(&session),
        )
        .unwrap();
        let exporter = collector.smu_exporter().unwrap();

        let cancel_token = CancellationToken::new();
        let handle = collector.start(cancel_token.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel_token.cancel();
        handle.await.unwrap();

        assert!(!session.transport().submissions().is_empty());
        let gathered = exporter.registry().gather();
        assert!(gathered
            .iter()
            .any(|family| family.get_name() == "MaxFrequencyMHz"));
    }
}
