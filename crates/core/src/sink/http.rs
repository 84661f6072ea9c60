use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    error::{Result, SinkError},
    events::Payload,
    sink::Sink,
};

/// Posts each event as JSON to a collector endpoint.
///
/// A transport failure marks the sink disconnected for `reconnect_backoff`;
/// after that `is_connected` reports true again so the next pass probes the
/// collector.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    reconnect_backoff: Duration,
    down_since: Mutex<Option<Instant>>,
}

impl HttpSink {
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        reconnect_backoff: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            reconnect_backoff,
            down_since: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn mark_down(&self) {
        let mut down_since = self.down_since.lock().expect("HttpSink poisoned");
        if down_since.is_none() {
            warn!(endpoint = %self.endpoint, "collector unreachable, backing off");
        }
        *down_since = Some(Instant::now());
    }

    fn mark_up(&self) {
        let mut down_since = self.down_since.lock().expect("HttpSink poisoned");
        if down_since.take().is_some() {
            debug!(endpoint = %self.endpoint, "collector reachable again");
        }
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn is_connected(&self) -> bool {
        match *self.down_since.lock().expect("HttpSink poisoned") {
            Some(since) => since.elapsed() >= self.reconnect_backoff,
            None => true,
        }
    }

    async fn send(&self, payload: &Payload) -> std::result::Result<(), SinkError> {
        let response = match self.client.post(&self.endpoint).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                self.mark_down();
                return Err(SinkError::Transport(e));
            }
        };

        let status = response.status();
        self.mark_up();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_collector_backs_off() {
        // Port 9 (discard) on localhost is closed on any sane test host.
        let sink = HttpSink::new(
            "http://127.0.0.1:9/usage",
            Duration::from_secs(1),
            Duration::from_secs(60),
        )
        .unwrap();
        assert!(sink.is_connected());

        let err = sink.send(&serde_json::json!({"position": 0})).await.unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)));
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn zero_backoff_probes_immediately() {
        let sink = HttpSink::new(
            "http://127.0.0.1:9/usage",
            Duration::from_secs(1),
            Duration::ZERO,
        )
        .unwrap();
        let _ = sink.send(&serde_json::json!({})).await;
        assert!(sink.is_connected());
    }
}
