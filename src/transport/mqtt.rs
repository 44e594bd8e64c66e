//! MQTT transport backed by rumqttc.

use super::{Message, Transport};
use crate::config::MqttConfig;
use crate::error::Result;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Events forwarded from the MQTT event loop to the node.
#[derive(Debug, Clone)]
pub enum MqttEvent {
    /// The broker accepted a (re)connection; subscriptions must be renewed.
    Connected,
    Message(Message),
}

/// MQTT client owning the rumqttc event loop.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    pub fn new(config: &MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));

        // Set credentials if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Self { client, event_loop }
    }

    /// Handle for issuing subscribe/unsubscribe/publish requests.
    pub fn transport(&self) -> MqttTransport {
        MqttTransport {
            client: self.client.clone(),
        }
    }

    /// Run the MQTT event loop and forward events to the provided channel.
    ///
    /// Runs until the receiving side is dropped. Connection errors are
    /// retried after [`RECONNECT_DELAY`].
    pub async fn run(mut self, tx: mpsc::Sender<MqttEvent>) {
        info!("[MQTT] Starting event loop");

        loop {
            let event = match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    info!("[MQTT] Connected ({:?})", ack.code);
                    MqttEvent::Connected
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    // Topics and payloads of this protocol are plain text
                    let payload = match String::from_utf8(publish.payload.to_vec()) {
                        Ok(s) => s,
                        Err(e) => {
                            warn!("[MQTT] Invalid UTF-8 in payload on {}: {}", publish.topic, e);
                            continue;
                        }
                    };
                    debug!("[MQTT] Received on {}: {}", publish.topic, payload);
                    MqttEvent::Message(Message {
                        topic: publish.topic,
                        payload,
                        retained: publish.retain,
                    })
                }
                // Pings, acks and outgoing packets
                Ok(_) => continue,
                Err(e) => {
                    error!("[MQTT] Connection error: {}", e);
                    // Wait before reconnecting
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };

            if tx.send(event).await.is_err() {
                info!("[MQTT] Event channel closed, stopping event loop");
                break;
            }
        }
    }
}

/// [`Transport`] that queues requests on the rumqttc client without awaiting.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Disconnect cleanly from the broker.
    pub async fn disconnect(&self) -> Result<()> {
        self.client.disconnect().await?;
        Ok(())
    }
}

impl Transport for MqttTransport {
    fn subscribe(&mut self, topic: &str) -> Result<()> {
        info!("[MQTT] Subscribing to {}", topic);
        self.client.try_subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<()> {
        info!("[MQTT] Unsubscribing from {}", topic);
        self.client.try_unsubscribe(topic)?;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        debug!("[MQTT] Publishing to {} (retain={}): {}", topic, retain, payload);
        self.client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.as_bytes())?;
        Ok(())
    }
}
