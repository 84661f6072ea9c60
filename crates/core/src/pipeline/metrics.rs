use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::DeliveryReport;

/// Running totals across every delivery pass of one pipeline.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    ticks_total: AtomicU64,
    sent_total: AtomicU64,
    requeued_total: AtomicU64,
    discarded_total: AtomicU64,
    dropped_total: AtomicU64,
    shed_total: AtomicU64,
    held_back: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub sent: u64,
    pub requeued: u64,
    pub discarded: u64,
    pub dropped: u64,
    pub shed: u64,
    /// Events held back after the latest pass.
    pub held_back: u64,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &DeliveryReport) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        self.sent_total
            .fetch_add(report.sent as u64, Ordering::Relaxed);
        self.requeued_total
            .fetch_add(report.requeued as u64, Ordering::Relaxed);
        self.discarded_total
            .fetch_add(report.discarded as u64, Ordering::Relaxed);
        self.dropped_total
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.shed_total
            .fetch_add(report.shed as u64, Ordering::Relaxed);
    }

    pub fn set_held_back(&self, len: usize) {
        self.held_back.store(len as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks_total.load(Ordering::Relaxed),
            sent: self.sent_total.load(Ordering::Relaxed),
            requeued: self.requeued_total.load(Ordering::Relaxed),
            discarded: self.discarded_total.load(Ordering::Relaxed),
            dropped: self.dropped_total.load(Ordering::Relaxed),
            shed: self.shed_total.load(Ordering::Relaxed),
            held_back: self.held_back.load(Ordering::Relaxed),
        }
    }
}
