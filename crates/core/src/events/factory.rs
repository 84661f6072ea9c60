use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tracing::{info, trace};
use uuid::Uuid;

use crate::{
    consent::{ConsentState, DecisionStore},
    error::Result,
    events::{Event, EventKind, EventValue, Location, SystemInfo},
    queues::BatchWindow,
};

/// Entry point for the hosting application.
///
/// ```ignore
/// factory
///     .create_event(EventKind::Switch, "Threshold min/max", Location::new("LUT panel"))
///     .value(true)
///     .send();
/// ```
#[derive(Clone)]
pub struct EventFactory {
    inner: Arc<EventFactoryInner>,
}

struct EventFactoryInner {
    session_id: Uuid,
    next_sequence: AtomicU64,
    window: Arc<BatchWindow>,
    store: Arc<dyn DecisionStore>,
}

impl EventFactory {
    pub fn new(window: Arc<BatchWindow>, store: Arc<dyn DecisionStore>) -> Self {
        Self::with_session_id(Uuid::new_v4(), window, store)
    }

    pub fn with_session_id(
        session_id: Uuid,
        window: Arc<BatchWindow>,
        store: Arc<dyn DecisionStore>,
    ) -> Self {
        if store.consent() == ConsentState::Declined {
            info!(%session_id, "usage reporting declined, nothing will be collected");
            window.close();
        }

        Self {
            inner: Arc::new(EventFactoryInner {
                session_id,
                next_sequence: AtomicU64::new(0),
                window,
                store,
            }),
        }
    }

    pub fn create_event(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        location: impl Into<Location>,
    ) -> EventBuilder<'_> {
        EventBuilder {
            factory: self,
            kind,
            name: name.into(),
            location: location.into(),
            value: None,
        }
    }

    pub fn has_decided(&self) -> bool {
        self.inner.store.has_decided()
    }

    pub fn consent(&self) -> ConsentState {
        self.inner.store.consent()
    }

    /// Record the user's decision. Declining closes the window for the rest of
    /// the process run; everything still buffered or held is discarded on the
    /// next delivery tick.
    pub fn set_decision(&self, accept: bool) -> Result<()> {
        self.inner.store.set_decision(accept)?;
        if accept {
            info!(session_id = %self.inner.session_id, "usage reporting accepted");
        } else {
            info!(session_id = %self.inner.session_id, "usage reporting declined, closing window");
            self.inner.window.close();
        }
        Ok(())
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    /// Emit the CPU and RAM observations through the regular send path.
    pub fn send_bootstrap_events(&self, info: SystemInfo) {
        self.create_event(EventKind::Set, "CPU", Location::INFO)
            .value(info.cpu_count)
            .send();

        let ram = self.create_event(EventKind::Set, "RAM", Location::INFO);
        match info.memory_mb {
            Some(mb) => ram.value(mb).send(),
            None => ram.send(),
        };
    }

    fn submit(
        &self,
        kind: EventKind,
        name: String,
        location: Location,
        value: Option<EventValue>,
    ) -> Event {
        let inner = &self.inner;
        let mint = move || {
            let sequence = inner.next_sequence.fetch_add(1, Ordering::Relaxed);
            Event::new(kind, name, location, value, inner.session_id, sequence)
        };

        if !inner.store.consent().permits_collection() {
            let event = mint();
            trace!(sequence = event.sequence(), "consent declined, dropping event at source");
            return event;
        }

        match inner.window.submit_minted(mint) {
            Ok(event) => event,
            Err(mint) => {
                let event = mint();
                trace!(sequence = event.sequence(), "window closed, dropping event at source");
                event
            }
        }
    }
}

/// A pending event. Nothing is recorded until [`send`](EventBuilder::send).
#[must_use = "an event is only recorded once `send` is called"]
pub struct EventBuilder<'a> {
    factory: &'a EventFactory,
    kind: EventKind,
    name: String,
    location: Location,
    value: Option<EventValue>,
}

impl EventBuilder<'_> {
    pub fn value(mut self, value: impl Into<EventValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Assign the next sequence number and submit the event, unless consent
    /// has been declined. Never fails and never blocks on delivery.
    pub fn send(self) -> Event {
        self.factory
            .submit(self.kind, self.name, self.location, self.value)
    }
}
