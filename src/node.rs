//! Node run loop.
//!
//! One task owns the registry and the router and handles, strictly one at a
//! time, broker events and the periodic sensor refresh. The rumqttc event
//! loop runs beside it and only forwards events.

use crate::config::Config;
use crate::error::{NodeError, Result};
use crate::registry::Registry;
use crate::router::Router;
use crate::transport::{MqttClient, MqttEvent, Transport};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

pub struct Node {
    registry: Registry,
    router: Router,
    sensor_poll: Option<Duration>,
}

impl Node {
    pub fn new(registry: Registry, sensor_poll_interval_secs: u64) -> Self {
        let router = Router::new(&registry);
        Self {
            registry,
            router,
            sensor_poll: (sensor_poll_interval_secs > 0)
                .then(|| Duration::from_secs(sensor_poll_interval_secs)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Initialise peripherals and log the resulting snapshot.
    pub fn init(&mut self) -> Result<()> {
        self.registry.init()?;
        self.log_snapshot(false);
        Ok(())
    }

    /// Handle one event from the transport.
    pub fn handle_event(&mut self, event: MqttEvent, transport: &mut impl Transport) {
        match event {
            MqttEvent::Connected => {
                if let Err(e) = self.router.start(transport) {
                    warn!("[Node] Subscriptions incomplete: {}", e);
                }
            }
            MqttEvent::Message(message) => {
                let outcome = self.router.dispatch(&mut self.registry, &message, transport);
                debug!("[Node] {} -> {:?}", message.topic, outcome);
            }
        }
    }

    /// Refresh sensor caches without publishing anything.
    pub fn refresh_sensors(&mut self) {
        let ok = self.registry.read_sensors();
        debug!("[Node] Sensor refresh: {} good read(s)", ok);
        self.log_snapshot(true);
    }

    /// Connect to the broker and serve until Ctrl+C.
    pub async fn run(mut self, config: &Config) -> Result<()> {
        let client = MqttClient::new(&config.mqtt);
        let mut transport = client.transport();

        info!(
            "[Node] Connecting to {}:{} as {}",
            config.mqtt.broker_host, config.mqtt.broker_port, config.mqtt.client_id
        );

        // Spawn the MQTT event loop; this task only sees forwarded events
        let (event_tx, mut event_rx) = mpsc::channel::<MqttEvent>(64);
        let mqtt_loop: JoinHandle<()> = tokio::spawn(client.run(event_tx));

        // First sensor refresh one period after start, init already read once
        let mut poll = self.sensor_poll.map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let result = loop {
            tokio::select! {
                event = event_rx.recv() => match event {
                    Some(event) => self.handle_event(event, &mut transport),
                    None => break Err(NodeError::Connection("event loop stopped".to_string())),
                },
                _ = next_tick(&mut poll) => {
                    self.refresh_sensors();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("[Node] Received shutdown signal");
                    break Ok(());
                }
            }
        };

        // Shutdown
        if let Err(e) = transport.disconnect().await {
            debug!("[Node] Disconnect failed: {}", e);
        }
        mqtt_loop.abort();
        result
    }

    fn log_snapshot(&self, quiet: bool) {
        match self.registry.status_snapshot().to_json() {
            Ok(json) if quiet => debug!("[Node] Status: {}", json),
            Ok(json) => info!("[Node] Status: {}", json),
            Err(e) => warn!("[Node] Failed to encode status snapshot: {}", e),
        }
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::simulation::SimulatedBoard;
    use crate::transport::{MemoryBroker, Message};

    fn node() -> Node {
        let mut board = SimulatedBoard::new().with_seed(5).with_failure_rate(0.0);
        let registry = Layout::Minimal.build("salon", &mut board, true).unwrap();
        Node::new(registry, 0)
    }

    #[test]
    fn test_connect_then_command() {
        let mut node = node();
        node.init().unwrap();
        let mut broker = MemoryBroker::new();
        broker.retain("salon/ledSwitch/status", "ON");

        node.handle_event(MqttEvent::Connected, &mut broker);
        while let Some(message) = broker.poll() {
            node.handle_event(MqttEvent::Message(message), &mut broker);
        }
        let led = node.registry().get("ledSwitch").unwrap();
        assert!(led.as_switch().unwrap().is_on());

        node.handle_event(
            MqttEvent::Message(Message::new("salon/dht", "")),
            &mut broker,
        );
        let topics: Vec<_> = broker.published().iter().map(|p| p.topic.as_str()).collect();
        assert_eq!(
            topics,
            vec!["salon/dht/temperature", "salon/dht/humidity", "salon/dht/heat_index"]
        );
        assert!(broker.published().iter().all(|p| p.retain));
    }

    #[test]
    fn test_poll_interval() {
        assert!(node().sensor_poll.is_none());

        let mut board = SimulatedBoard::new().with_seed(5);
        let registry = Layout::Minimal.build("salon", &mut board, true).unwrap();
        let node = Node::new(registry, 30);
        assert_eq!(node.sensor_poll, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_refresh_sensors_updates_snapshot() {
        let mut node = node();
        node.refresh_sensors();
        let snapshot = node.registry().status_snapshot();
        assert_eq!(snapshot.sensors.len(), 2);
    }
}
