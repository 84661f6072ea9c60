use async_trait::async_trait;
use console::style;
use usage_core::{Payload, Sink, SinkError};

/// Prints every event instead of posting it. Used by `emit --dry-run`.
pub struct StdoutSink;

#[async_trait]
impl Sink for StdoutSink {
    fn is_connected(&self) -> bool {
        true
    }

    async fn send(&self, payload: &Payload) -> Result<(), SinkError> {
        println!("{} {}", style("→").cyan().bold(), payload);
        Ok(())
    }
}
