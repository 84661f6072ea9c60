use std::{ops::ControlFlow, sync::Arc};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};

use crate::{
    pipeline::{DeliveryPipeline, DeliveryReport, PipelineState},
    queues::{Batch, BatchWindow},
};

/// The single consumer of a [`BatchWindow`].
///
/// Every tick drains the window and runs at most one delivery pass; passes
/// never overlap because they all run on this task.
pub struct DeliveryWorker {
    window: Arc<BatchWindow>,
    pipeline: DeliveryPipeline,
}

impl DeliveryWorker {
    pub fn new(window: Arc<BatchWindow>, pipeline: DeliveryPipeline) -> Self {
        Self { window, pipeline }
    }

    pub fn pipeline(&self) -> &DeliveryPipeline {
        &self.pipeline
    }

    pub fn window(&self) -> &Arc<BatchWindow> {
        &self.window
    }

    /// Handle one window tick. Breaks once the pipeline has terminated.
    ///
    /// An idle window with nothing held back makes no delivery pass at all;
    /// an idle window with held-back events retries them.
    pub async fn tick(&mut self) -> ControlFlow<DeliveryReport, Option<DeliveryReport>> {
        if self.window.is_closed() {
            return ControlFlow::Break(self.shut_window());
        }

        let batch = match self.window.drain() {
            Some(batch) => batch,
            None if self.pipeline.has_held_back() => Batch::default(),
            None => return ControlFlow::Continue(None),
        };

        let report = self.pipeline.process(batch).await;
        if self.pipeline.state() == PipelineState::Terminated {
            self.window.close();
            let late = self.shut_window();
            return ControlFlow::Break(DeliveryReport {
                discarded: report.discarded + late.discarded,
                ..report
            });
        }
        ControlFlow::Continue(Some(report))
    }

    /// Tick on the window's period until shutdown or termination. Shutdown
    /// runs one last tick so recently submitted events get a delivery attempt.
    /// If every shutdown sender is dropped the worker keeps delivering until
    /// the pipeline terminates.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = self.window.ticker();
        let mut listening = true;

        loop {
            tokio::select! {
                signal = shutdown.recv(), if listening => {
                    if let Err(RecvError::Closed) = signal {
                        debug!("shutdown sender dropped, delivering until terminated");
                        listening = false;
                        continue;
                    }
                    if self.tick().await.is_continue() && self.pipeline.has_held_back() {
                        info!(
                            count = self.pipeline.held_back_len(),
                            "shutting down with undelivered events"
                        );
                    }
                    return;
                }
                _ = ticker.tick() => {
                    if self.tick().await.is_break() {
                        info!("delivery worker stopped, usage reporting terminated");
                        return;
                    }
                }
            }
        }
    }

    fn shut_window(&mut self) -> DeliveryReport {
        let leftovers = self.window.drain();
        if let Some(batch) = &leftovers {
            debug!(count = batch.len(), "discarding events left in closed window");
        }
        self.pipeline.terminate(leftovers)
    }
}
