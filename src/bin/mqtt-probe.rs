//! Manual test tool for a running node.
//!
//! Usage:
//!   cargo run --bin mqtt-probe -- --device salon --element ledSwitch --payload ON
//!
//! Subscribes to every channel of the device, optionally sends one command
//! and logs all traffic (including retained values) for a while.

use clap::Parser;
use element_node::config::{self, Config};
use element_node::topic;
use element_node::transport::{MqttClient, MqttEvent, Transport};
use log::{info, warn};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(about = "Send a command to an element node and watch its channels")]
struct Args {
    /// Node identity (topic root)
    #[arg(long, env = "DEVICE_NAME")]
    device: String,

    /// Element channel segment, e.g. ledSwitch or ir_transmitter
    #[arg(long, requires = "payload")]
    element: Option<String>,

    /// Command payload
    #[arg(long)]
    payload: Option<String>,

    /// Publish the command retained
    #[arg(long)]
    retain: bool,

    /// Seconds to keep listening
    #[arg(long, default_value_t = 5)]
    watch: u64,

    /// Broker host, overrides MQTT_BROKER_HOST
    #[arg(long)]
    host: Option<String>,

    /// Broker port, overrides MQTT_BROKER_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("{}", e);
            std::process::exit(2);
        }
    };
    if let Some(host) = args.host {
        config.mqtt.broker_host = host;
    }
    if let Some(port) = args.port {
        config.mqtt.broker_port = port;
    }
    config.mqtt.client_id = format!("element-probe-{}", uuid::Uuid::new_v4().simple());

    info!(
        "Connecting to MQTT broker at {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    let client = MqttClient::new(&config.mqtt);
    let mut transport = client.transport();
    let (tx, mut rx) = mpsc::channel(100);
    let mqtt_handle = tokio::spawn(client.run(tx));

    let wildcard = format!("{}/#", args.device);
    let mut command_sent = false;
    let deadline = tokio::time::sleep(Duration::from_secs(args.watch));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(MqttEvent::Connected) => {
                    if let Err(e) = transport.subscribe(&wildcard) {
                        warn!("Failed to subscribe to {}: {}", wildcard, e);
                    }
                    if let (false, Some(element), Some(payload)) = (command_sent, &args.element, &args.payload) {
                        let command_topic = topic::command_topic(&args.device, element);
                        info!(">>> {} {}", command_topic, payload);
                        match transport.publish(&command_topic, payload, args.retain) {
                            Ok(()) => command_sent = true,
                            Err(e) => warn!("Failed to publish: {}", e),
                        }
                    }
                }
                Some(MqttEvent::Message(message)) => {
                    let marker = if message.retained { " (retained)" } else { "" };
                    info!("<<< {}{}: {}", message.topic, marker, message.payload);
                }
                None => break,
            },
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Err(e) = transport.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }
    mqtt_handle.abort();
    info!("Probe finished.");
}
