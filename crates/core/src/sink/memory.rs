use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    error::SinkError,
    events::{Payload, payload_sequence},
    sink::Sink,
};

/// Sink that keeps every delivered payload in memory.
///
/// Connectivity and failures can be scripted, which makes it the sink of
/// choice for tests and dry runs.
pub struct MemorySink {
    delivered: Mutex<Vec<Payload>>,
    connected: AtomicBool,
    failing: AtomicBool,
    fail_once: Mutex<HashSet<u64>>,
    attempts: AtomicU64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            fail_once: Mutex::new(HashSet::new()),
            attempts: AtomicU64::new(0),
        }
    }

    /// A sink that reports itself disconnected until told otherwise.
    pub fn disconnected() -> Self {
        let sink = Self::new();
        sink.set_connected(false);
        sink
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Make every send fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Fail the next attempt to send the event with this sequence number.
    pub fn fail_once_on(&self, sequence: u64) {
        self.fail_once
            .lock()
            .expect("MemorySink poisoned")
            .insert(sequence);
    }

    pub fn delivered(&self) -> Vec<Payload> {
        self.delivered.lock().expect("MemorySink poisoned").clone()
    }

    /// Sequence numbers of delivered payloads, in delivery order.
    pub fn delivered_sequences(&self) -> Vec<u64> {
        self.delivered
            .lock()
            .expect("MemorySink poisoned")
            .iter()
            .filter_map(payload_sequence)
            .collect()
    }

    pub fn take_delivered(&self) -> Vec<Payload> {
        std::mem::take(&mut *self.delivered.lock().expect("MemorySink poisoned"))
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn send(&self, payload: &Payload) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        if !self.is_connected() {
            return Err(SinkError::Disconnected);
        }
        if self.failing.load(Ordering::Acquire) {
            return Err(SinkError::Other("scripted failure".into()));
        }
        if let Some(sequence) = payload_sequence(payload) {
            if self
                .fail_once
                .lock()
                .expect("MemorySink poisoned")
                .remove(&sequence)
            {
                return Err(SinkError::Other(format!(
                    "scripted failure for event {sequence}"
                )));
            }
        }

        self.delivered
            .lock()
            .expect("MemorySink poisoned")
            .push(payload.clone());
        Ok(())
    }
}
