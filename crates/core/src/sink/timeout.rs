use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{error::SinkError, events::Payload, sink::Sink};

/// Bounds every send of the wrapped sink; an elapsed send counts as a failure.
pub struct TimeoutSink {
    inner: Arc<dyn Sink>,
    timeout: Duration,
}

impl TimeoutSink {
    pub fn new(inner: Arc<dyn Sink>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Sink for TimeoutSink {
    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn send(&self, payload: &Payload) -> Result<(), SinkError> {
        tokio::time::timeout(self.timeout, self.inner.send(payload))
            .await
            .map_err(|_| SinkError::Timeout(self.timeout))?
    }
}
