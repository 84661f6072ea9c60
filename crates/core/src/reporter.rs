use std::sync::Arc;

use tokio::{sync::broadcast, task::JoinHandle};
use tracing::info;

use crate::{
    config::ReporterConfig,
    consent::{DecisionStore, FileDecisionStore, InMemoryDecisionStore},
    error::{Result, UsageError},
    events::{EventEncoder, EventFactory, SystemInfo},
    pipeline::{DeliveryMetrics, DeliveryPipeline, MetricsSnapshot},
    queues::BatchWindow,
    sink::{HttpSink, Sink, TimeoutSink},
    workers::DeliveryWorker,
};

/// Wires store, window, pipeline and sink together.
///
/// Without an explicit store the reporter persists to `decision_path` when
/// configured and otherwise keeps the decision in memory. Without an explicit
/// sink it posts to `collector_url`.
pub struct UsageReporterBuilder {
    cfg: ReporterConfig,
    store: Option<Arc<dyn DecisionStore>>,
    sink: Option<Arc<dyn Sink>>,
    encoder: Option<Arc<dyn EventEncoder>>,
    system_info: Option<SystemInfo>,
}

impl UsageReporterBuilder {
    pub fn new(cfg: ReporterConfig) -> Self {
        Self {
            cfg,
            store: None,
            sink: None,
            encoder: None,
            system_info: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn EventEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Use fixed host observations instead of probing the machine.
    pub fn system_info(mut self, info: SystemInfo) -> Self {
        self.system_info = Some(info);
        self
    }

    /// Assemble the factory and its delivery worker without spawning anything.
    ///
    /// The bootstrap events are already buffered when this returns.
    pub fn build(self) -> Result<(EventFactory, DeliveryWorker)> {
        let cfg = self.cfg;
        cfg.validate()?;

        let store: Arc<dyn DecisionStore> = match (self.store, &cfg.decision_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileDecisionStore::open(path)?),
            (None, None) => Arc::new(InMemoryDecisionStore::new()),
        };

        let sink: Arc<dyn Sink> = match (self.sink, &cfg.collector_url) {
            (Some(sink), _) => sink,
            (None, Some(url)) => Arc::new(HttpSink::new(
                url.as_str(),
                cfg.send_timeout(),
                cfg.reconnect_backoff(),
            )?),
            (None, None) => return Err(UsageError::MissingSink),
        };
        let sink: Arc<dyn Sink> = Arc::new(TimeoutSink::new(sink, cfg.send_timeout()));

        let window = Arc::new(BatchWindow::new(cfg.window()));
        let mut pipeline = DeliveryPipeline::new(sink, Arc::clone(&store), cfg.held_back_capacity);
        if let Some(encoder) = self.encoder {
            pipeline = pipeline.with_encoder(encoder);
        }

        let factory = EventFactory::new(Arc::clone(&window), store);
        info!(
            session_id = %factory.session_id(),
            consent = %factory.consent(),
            window_ms = cfg.window_ms,
            "usage reporter ready"
        );

        if cfg.bootstrap_events {
            factory.send_bootstrap_events(self.system_info.unwrap_or_else(SystemInfo::probe));
        }

        Ok((factory, DeliveryWorker::new(window, pipeline)))
    }

    /// Build and spawn the delivery worker on the current tokio runtime.
    pub fn start(self) -> Result<(EventFactory, ReporterHandle)> {
        let (factory, worker) = self.build()?;
        let metrics = worker.pipeline().metrics();
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let task = tokio::spawn(worker.run(shutdown_rx));

        Ok((
            factory,
            ReporterHandle {
                shutdown_tx,
                task,
                metrics,
            },
        ))
    }
}

/// Controls a running delivery worker.
///
/// Dropping the handle leaves the worker running without a way to flush it.
#[must_use = "without the handle the worker cannot be shut down"]
pub struct ReporterHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
    metrics: Arc<DeliveryMetrics>,
}

impl ReporterHandle {
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// True once the worker has exited, e.g. after consent was declined.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the worker after one final delivery pass and wait for it.
    pub async fn shutdown(self) -> Result<MetricsSnapshot> {
        // The worker may already be gone after a decline.
        let _ = self.shutdown_tx.send(());
        self.task.await?;
        Ok(self.metrics.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{consent::ConsentState, sink::MemorySink};

    #[test]
    fn build_requires_a_sink() {
        let err = UsageReporterBuilder::new(ReporterConfig::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, UsageError::MissingSink));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let cfg = ReporterConfig {
            send_timeout_ms: 0,
            ..Default::default()
        };
        let err = UsageReporterBuilder::new(cfg)
            .sink(Arc::new(MemorySink::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, UsageError::InvalidConfig { .. }));
    }

    #[test]
    fn default_store_is_undecided_and_bootstrap_is_buffered() {
        let (factory, worker) = UsageReporterBuilder::new(ReporterConfig::default())
            .sink(Arc::new(MemorySink::new()))
            .system_info(SystemInfo {
                cpu_count: 4,
                memory_mb: None,
            })
            .build()
            .unwrap();

        assert_eq!(factory.consent(), ConsentState::Undecided);
        assert_eq!(worker.window().len(), 2);
    }

    #[test]
    fn configured_decision_path_is_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ReporterConfig {
            decision_path: Some(dir.path().join("decision.json")),
            bootstrap_events: false,
            ..Default::default()
        };

        let (factory, _worker) = UsageReporterBuilder::new(cfg.clone())
            .sink(Arc::new(MemorySink::new()))
            .build()
            .unwrap();
        factory.set_decision(true).unwrap();

        let (reopened, _worker) = UsageReporterBuilder::new(cfg)
            .sink(Arc::new(MemorySink::new()))
            .build()
            .unwrap();
        assert_eq!(reopened.consent(), ConsentState::Accepted);
    }
}
