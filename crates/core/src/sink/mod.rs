//! Transport boundary.
//!
//! A [`Sink`] reports whether it is currently able to transmit and sends one
//! encoded event at a time. Failures never escape the delivery pipeline.

pub mod http;
pub mod memory;
pub mod timeout;

pub use http::*;
pub use memory::*;
pub use timeout::*;

use async_trait::async_trait;

use crate::{error::SinkError, events::Payload};

#[async_trait]
pub trait Sink: Send + Sync {
    /// Last known connectivity. Checked before every send.
    fn is_connected(&self) -> bool;

    async fn send(&self, payload: &Payload) -> Result<(), SinkError>;
}
