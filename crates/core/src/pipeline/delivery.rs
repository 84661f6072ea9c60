//! Ordering, consent gating and retry for released batches.
//!
//! Each pass merges the held-back events with the new batch, sorts by
//! sequence and then either discards everything (declined), holds everything
//! (undecided) or walks the events in order (accepted). During the walk the
//! first event that cannot be sent halts the pass: it and every later event
//! go back to the held-back set untouched, so nothing is ever delivered ahead
//! of an earlier event.
//!
//! Only one pass runs at a time; the pipeline is driven by a single worker
//! task and needs no internal locking.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    consent::{ConsentState, DecisionStore},
    events::{Event, EventEncoder, JsonEncoder},
    pipeline::DeliveryMetrics,
    queues::{Batch, FifoDropOldestQueue},
    sink::Sink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No decision yet; events are held.
    AwaitingConsent,
    /// Consent given; events are delivered in order.
    Flowing,
    /// Consent declined. Absorbing: every later event is discarded.
    Terminated,
}

/// Outcome of one delivery pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Handed to the sink successfully.
    pub sent: usize,
    /// Placed in the held-back set for the next pass.
    pub requeued: usize,
    /// Thrown away because consent was declined.
    pub discarded: usize,
    /// Dropped because they could not be encoded or were already behind the
    /// delivered high-water mark.
    pub dropped: usize,
    /// Evicted from a full held-back set.
    pub shed: usize,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.sent + self.requeued + self.discarded + self.dropped
    }
}

pub struct DeliveryPipeline {
    sink: Arc<dyn Sink>,
    store: Arc<dyn DecisionStore>,
    encoder: Arc<dyn EventEncoder>,
    held_back: FifoDropOldestQueue<Event>,
    state: PipelineState,
    last_sent: Option<u64>,
    metrics: Arc<DeliveryMetrics>,
}

impl DeliveryPipeline {
    /// `None` capacity keeps every held-back event.
    ///
    /// # Panics
    ///
    /// If `held_back_capacity` is `Some(0)`.
    pub fn new(
        sink: Arc<dyn Sink>,
        store: Arc<dyn DecisionStore>,
        held_back_capacity: Option<usize>,
    ) -> Self {
        Self {
            sink,
            store,
            encoder: Arc::new(JsonEncoder),
            held_back: FifoDropOldestQueue::new(held_back_capacity),
            state: PipelineState::AwaitingConsent,
            last_sent: None,
            metrics: Arc::new(DeliveryMetrics::new()),
        }
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn EventEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<DeliveryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn metrics(&self) -> Arc<DeliveryMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn has_held_back(&self) -> bool {
        !self.held_back.is_empty()
    }

    pub fn held_back_len(&self) -> usize {
        self.held_back.len()
    }

    pub fn held_back_sequences(&self) -> Vec<u64> {
        self.held_back.iter().map(Event::sequence).collect()
    }

    /// Highest sequence number handed to the sink so far.
    pub fn last_sent(&self) -> Option<u64> {
        self.last_sent
    }

    /// Run one delivery pass over the held-back events plus `batch`.
    pub async fn process(&mut self, batch: Batch) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let mut merged: Vec<Event> = self
            .held_back
            .drain()
            .chain(batch.into_events())
            .collect();
        merged.sort_by_key(Event::sequence);

        if self.state == PipelineState::Terminated {
            if !merged.is_empty() {
                debug!(count = merged.len(), "pipeline terminated, discarding late events");
            }
            report.discarded = merged.len();
        } else {
            match self.store.consent() {
                ConsentState::Declined => {
                    report.discarded = merged.len();
                    self.enter(PipelineState::Terminated);
                    info!(
                        discarded = report.discarded,
                        "usage reporting declined, pipeline terminated"
                    );
                }
                ConsentState::Undecided => {
                    self.enter(PipelineState::AwaitingConsent);
                    for event in merged {
                        self.requeue(event, &mut report);
                    }
                }
                ConsentState::Accepted => {
                    self.enter(PipelineState::Flowing);
                    self.walk(merged, &mut report).await;
                }
            }
        }

        self.metrics.record(&report);
        self.metrics.set_held_back(self.held_back.len());
        if report.total() > 0 {
            debug!(
                sent = report.sent,
                requeued = report.requeued,
                discarded = report.discarded,
                dropped = report.dropped,
                shed = report.shed,
                "delivery pass complete"
            );
        }
        report
    }

    /// Terminate regardless of the stored decision, discarding everything
    /// held back together with `leftovers`.
    pub fn terminate(&mut self, leftovers: Option<Batch>) -> DeliveryReport {
        let report = DeliveryReport {
            discarded: self.held_back.clear() + leftovers.map_or(0, |b| b.len()),
            ..Default::default()
        };
        if self.state != PipelineState::Terminated {
            self.enter(PipelineState::Terminated);
            info!(discarded = report.discarded, "pipeline terminated");
        }
        self.metrics.record(&report);
        self.metrics.set_held_back(0);
        report
    }

    async fn walk(&mut self, merged: Vec<Event>, report: &mut DeliveryReport) {
        let mut halted = false;

        for event in merged {
            let sequence = event.sequence();

            if let Some(last) = self.last_sent.filter(|&last| sequence <= last) {
                error!(sequence, last_sent = last, "event is behind delivered events, dropping");
                report.dropped += 1;
                continue;
            }

            if !halted {
                if !self.sink.is_connected() {
                    debug!(sequence, "sink disconnected, holding back remaining events");
                    halted = true;
                } else if self.store.consent() != ConsentState::Accepted {
                    debug!(sequence, "consent withdrawn mid-pass, holding back remaining events");
                    halted = true;
                }
            }
            if halted {
                self.requeue(event, report);
                continue;
            }

            let payload = match self.encoder.encode(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!(sequence, error = %e, "failed to encode event, dropping");
                    report.dropped += 1;
                    continue;
                }
            };

            match self.sink.send(&payload).await {
                Ok(()) => {
                    self.last_sent = Some(sequence);
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(sequence, error = %e, "send failed, holding back remaining events");
                    halted = true;
                    self.requeue(event, report);
                }
            }
        }
    }

    fn requeue(&mut self, event: Event, report: &mut DeliveryReport) {
        report.requeued += 1;
        if let Some(evicted) = self.held_back.push_overwrite(event) {
            warn!(
                sequence = evicted.sequence(),
                capacity = self.held_back.capacity(),
                "held-back set full, shedding oldest event"
            );
            report.shed += 1;
        }
    }

    fn enter(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "pipeline state change");
            self.state = next;
        }
    }
}
