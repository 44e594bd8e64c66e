//! Publish/subscribe transport seam.
//!
//! The router only needs three operations from the messaging layer. The MQTT
//! implementation queues them on the rumqttc client; the in-memory broker
//! keeps a retained store and is used to exercise the router without a
//! network.

pub mod memory;
pub mod mqtt;

pub use memory::{MemoryBroker, Published};
pub use mqtt::{MqttClient, MqttEvent, MqttTransport};

use crate::error::Result;

/// Inbound message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    /// Set when the broker replays a stored retained value.
    pub retained: bool,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retained: false,
        }
    }
}

pub trait Transport {
    fn subscribe(&mut self, topic: &str) -> Result<()>;
    fn unsubscribe(&mut self, topic: &str) -> Result<()>;
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()>;
}
