use crate::error::{NodeError, Result};
use crate::layout::Layout;
use crate::topic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Fallback node identity when neither `DEVICE_NAME` nor the host name is usable.
pub const DEFAULT_DEVICE_NAME: &str = "element-node";

/// Load variables from a `.env` file in the working directory.
///
/// Values already present in the environment are left untouched.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            // SAFETY: called from main before the runtime spawns any threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split `.env` content into key/value pairs.
///
/// Blank lines and `#` comments are skipped, values may contain spaces and
/// one level of matching quotes is stripped.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub mqtt: MqttConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Topic root for every element of this node.
    pub device_name: String,
    pub layout: Layout,
    /// Relays switch on when their line is driven low.
    pub switch_active_low: bool,
    /// Local sensor refresh period in seconds, `0` disables it.
    pub sensor_poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let device_name = default_device_name();
        Self {
            mqtt: MqttConfig {
                broker_host: "10.0.0.2".to_string(),
                broker_port: 1883,
                client_id: device_name.clone(),
                username: None,
                password: None,
                keep_alive_secs: 15,
            },
            node: NodeConfig {
                device_name,
                layout: Layout::Minimal,
                switch_active_low: true,
                sensor_poll_interval_secs: 60,
            },
        }
    }
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Unparsable numeric or boolean values are reported, not defaulted.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup("DEVICE_NAME") {
            config.mqtt.client_id = name.clone();
            config.node.device_name = name;
        }
        if let Some(layout) = lookup("NODE_LAYOUT") {
            config.node.layout = Layout::from_str(layout.trim())
                .map_err(|_| NodeError::Config(format!("unknown NODE_LAYOUT {layout:?}")))?;
        }
        if let Some(active_low) = lookup("SWITCH_ACTIVE_LOW") {
            config.node.switch_active_low = parse_value("SWITCH_ACTIVE_LOW", &active_low)?;
        }
        if let Some(interval) = lookup("SENSOR_POLL_INTERVAL_SECS") {
            config.node.sensor_poll_interval_secs =
                parse_value("SENSOR_POLL_INTERVAL_SECS", &interval)?;
        }

        // MQTT configuration
        if let Some(host) = lookup("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Some(port) = lookup("MQTT_BROKER_PORT") {
            config.mqtt.broker_port = parse_value("MQTT_BROKER_PORT", &port)?;
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Some(keep_alive) = lookup("MQTT_KEEP_ALIVE_SECS") {
            config.mqtt.keep_alive_secs = parse_value("MQTT_KEEP_ALIVE_SECS", &keep_alive)?;
        }

        topic::validate_segment(&config.node.device_name)?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| NodeError::Config(format!("invalid value for {key}: {raw:?}")))
}

fn default_device_name() -> String {
    gethostname::gethostname()
        .into_string()
        .ok()
        .map(|host| host.split('.').next().unwrap_or_default().to_string())
        .filter(|host| topic::validate_segment(host).is_ok())
        .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_dotenv() {
        let content = "# comment\n\nDEVICE_NAME=salon\nMQTT_PASSWORD = \"with spaces\"\nBROKEN\n=nokey\n";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("DEVICE_NAME".to_string(), "salon".to_string()),
                ("MQTT_PASSWORD".to_string(), "with spaces".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DEVICE_NAME", "salon"),
            ("NODE_LAYOUT", "media-center"),
            ("SWITCH_ACTIVE_LOW", "false"),
            ("SENSOR_POLL_INTERVAL_SECS", "0"),
            ("MQTT_BROKER_PORT", "8883"),
        ]))
        .unwrap();

        assert_eq!(config.node.device_name, "salon");
        assert_eq!(config.mqtt.client_id, "salon");
        assert_eq!(config.node.layout, Layout::MediaCenter);
        assert!(!config.node.switch_active_low);
        assert_eq!(config.node.sensor_poll_interval_secs, 0);
        assert_eq!(config.mqtt.broker_port, 8883);
    }

    #[test]
    fn test_explicit_client_id_wins() {
        let config = Config::from_lookup(lookup_from(&[
            ("DEVICE_NAME", "salon"),
            ("MQTT_CLIENT_ID", "salon-node-1"),
        ]))
        .unwrap();
        assert_eq!(config.mqtt.client_id, "salon-node-1");
    }

    #[test]
    fn test_invalid_values_are_reported() {
        assert!(Config::from_lookup(lookup_from(&[("MQTT_BROKER_PORT", "port")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("NODE_LAYOUT", "garage")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("DEVICE_NAME", "a/b")])).is_err());
    }
}
