//! Consent-gated, order-preserving delivery of usage events.
//!
//! Application code records events through an [`EventFactory`]. Events are
//! buffered in a [`BatchWindow`], and a single [`DeliveryWorker`] hands each
//! window to the [`DeliveryPipeline`], which sends them to a [`Sink`] in
//! strict sequence order, holding back whatever could not be sent and
//! discarding everything once the user declines.

pub mod config;
pub mod consent;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod queues;
pub mod reporter;
pub mod sink;
pub mod workers;

pub use config::ReporterConfig;
pub use consent::{ConsentState, DecisionStore, FileDecisionStore, InMemoryDecisionStore};
pub use error::{EncodeError, Result, SinkError, UsageError};
pub use events::{
    Event, EventBuilder, EventEncoder, EventFactory, EventKind, EventValue, JsonEncoder, Location,
    Payload, SystemInfo,
};
pub use pipeline::{DeliveryMetrics, DeliveryPipeline, DeliveryReport, MetricsSnapshot, PipelineState};
pub use queues::{Batch, BatchWindow};
pub use reporter::{ReporterHandle, UsageReporterBuilder};
pub use sink::{HttpSink, MemorySink, Sink, TimeoutSink};
pub use workers::DeliveryWorker;
