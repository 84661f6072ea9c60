use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::time::{Interval, MissedTickBehavior, interval_at};

use crate::events::Event;

/// Events collected during one window, in submission order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Batch {
    events: Vec<Event>,
}

impl Batch {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Buffers submitted events until the next tick drains them as one [`Batch`].
///
/// Submission is safe from any thread and only holds the lock for a push.
/// Once closed, the window accepts nothing; events already buffered stay
/// drainable.
pub struct BatchWindow {
    buf: Mutex<Vec<Event>>,
    closed: AtomicBool,
    period: Duration,
}

impl BatchWindow {
    pub fn new(period: Duration) -> Self {
        assert!(!period.is_zero());

        Self {
            buf: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Buffer an event. Returns false if the window is closed.
    pub fn submit(&self, event: Event) -> bool {
        self.submit_minted(|| event).is_ok()
    }

    /// Mint and buffer an event while holding the buffer lock, so that buffer
    /// order matches mint order across concurrent producers. On a closed window
    /// the minting closure is handed back unused.
    pub(crate) fn submit_minted<F>(&self, mint: F) -> Result<Event, F>
    where
        F: FnOnce() -> Event,
    {
        let mut buf = self.buf.lock().expect("BatchWindow poisoned");
        if self.closed.load(Ordering::Acquire) {
            return Err(mint);
        }
        let event = mint();
        buf.push(event.clone());
        Ok(event)
    }

    /// Take everything submitted since the previous drain. Empty windows yield `None`.
    pub fn drain(&self) -> Option<Batch> {
        let events = std::mem::take(&mut *self.buf.lock().expect("BatchWindow poisoned"));
        if events.is_empty() {
            None
        } else {
            Some(Batch::new(events))
        }
    }

    pub fn close(&self) {
        let _buf = self.buf.lock().expect("BatchWindow poisoned");
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.buf.lock().expect("BatchWindow poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ticker firing once per period, starting one period from now.
    pub fn ticker(&self) -> Interval {
        let mut ticker = interval_at(tokio::time::Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::events::test_event;

    #[test]
    fn empty_window_drains_nothing() {
        let window = BatchWindow::new(Duration::from_secs(2));
        assert!(window.drain().is_none());
    }

    #[test]
    fn drain_takes_everything_once() {
        let window = BatchWindow::new(Duration::from_secs(2));
        assert!(window.submit(test_event(0)));
        assert!(window.submit(test_event(1)));

        let batch = window.drain().unwrap();
        let seqs: Vec<u64> = batch.events().iter().map(Event::sequence).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert!(window.drain().is_none());
    }

    #[test]
    fn closed_window_rejects_but_keeps_buffered() {
        let window = BatchWindow::new(Duration::from_secs(2));
        assert!(window.submit(test_event(0)));
        window.close();
        assert!(!window.submit(test_event(1)));
        assert!(window.is_closed());

        let batch = window.drain().unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn closed_window_returns_mint_unused() {
        let window = BatchWindow::new(Duration::from_secs(2));
        window.close();
        let mint = window.submit_minted(|| test_event(3)).unwrap_err();
        assert_eq!(mint().sequence(), 3);
        assert!(window.is_empty());
    }

    #[test]
    fn concurrent_submissions_land_exactly_once() {
        let window = Arc::new(BatchWindow::new(Duration::from_secs(2)));
        let mut drained = Vec::new();

        let producers: Vec<_> = (0..4u64)
            .map(|p| {
                let window = Arc::clone(&window);
                thread::spawn(move || {
                    for i in 0..250 {
                        window.submit(test_event(p * 1000 + i));
                    }
                })
            })
            .collect();

        while producers.iter().any(|h| !h.is_finished()) {
            if let Some(batch) = window.drain() {
                drained.extend(batch.into_events());
            }
        }
        for handle in producers {
            handle.join().unwrap();
        }
        if let Some(batch) = window.drain() {
            drained.extend(batch.into_events());
        }

        let mut seqs: Vec<u64> = drained.iter().map(Event::sequence).collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 1000);
        assert_eq!(drained.len(), 1000);
    }
}
