//! Channel name derivation.
//!
//! Every channel of a node lives under `<device>/<segment>`. Names are built
//! from the fixed registry and never parsed back from inbound traffic.

use crate::error::{NodeError, Result};

/// Suffix of a switch's retained state channel.
pub const STATUS_SUFFIX: &str = "status";

/// Command channel of an element: `<device>/<segment>`.
pub fn command_topic(device: &str, segment: &str) -> String {
    format!("{}/{}", device, segment)
}

/// Sub-channel of an element: `<device>/<segment>/<suffix>`.
pub fn sub_topic(device: &str, segment: &str, suffix: &str) -> String {
    format!("{}/{}/{}", device, segment, suffix)
}

/// Status channel of a switch: `<device>/<segment>/status`.
pub fn status_topic(device: &str, segment: &str) -> String {
    sub_topic(device, segment, STATUS_SUFFIX)
}

/// Check that a device name or element segment is one literal topic level.
pub fn validate_segment(segment: &str) -> Result<()> {
    let illegal = |c: char| matches!(c, '/' | '+' | '#' | '\0') || c.is_whitespace();
    if segment.is_empty() || segment.contains(illegal) {
        return Err(NodeError::InvalidTopicSegment(segment.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_derivation() {
        assert_eq!(command_topic("salon", "tvSwitch"), "salon/tvSwitch");
        assert_eq!(status_topic("salon", "tvSwitch"), "salon/tvSwitch/status");
        assert_eq!(sub_topic("salon", "dht", "heat_index"), "salon/dht/heat_index");
    }

    #[test]
    fn test_topic_derivation_is_deterministic() {
        assert_eq!(command_topic("salon", "ampSwitch"), command_topic("salon", "ampSwitch"));
        assert_ne!(command_topic("salon", "ampSwitch"), command_topic("salon", "tvSwitch"));
        assert_ne!(status_topic("salon", "ampSwitch"), status_topic("salon", "tvSwitch"));
    }

    #[test]
    fn test_validate_segment() {
        assert!(validate_segment("ledSwitch").is_ok());
        assert!(validate_segment("ir_transmitter").is_ok());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("led/switch").is_err());
        assert!(validate_segment("led+").is_err());
        assert!(validate_segment("#").is_err());
        assert!(validate_segment("led switch").is_err());
    }
}
