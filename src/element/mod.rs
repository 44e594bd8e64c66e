//! Remotely addressable elements.
//!
//! Every peripheral of the node is wrapped in an [`Element`]: a closed set of
//! variants sharing one contract (name, command handler, status). Elements
//! own their peripheral handle exclusively and live for the whole process.

pub mod climate;
pub mod emitter;
pub mod light;
pub mod switch;

pub use climate::{ClimateProbe, ClimateReading, ClimateSample, ClimateSensor};
pub use emitter::{IrFrame, IrProtocol, IrSender, SignalEmitter, SignalRequest};
pub use light::{LightProbe, LightSensor};
pub use switch::{Switch, SwitchCommand, SwitchPin};

use crate::error::Result;
use crate::topic;
use log::{info, warn};
use serde::Serialize;

/// Channel segment of the infrared transmitter.
pub const IR_TRANSMITTER_SEGMENT: &str = "ir_transmitter";

/// What an element can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
    Switch,
    SignalEmitter,
    Sensor,
}

/// Registry grouping of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Actuator,
    Sensor,
}

/// Health of an element as reported in the status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusTag {
    Ok,
    ReadError,
}

/// A retained value an element wants published under `<command topic>/<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub suffix: &'static str,
    pub payload: String,
}

impl Publication {
    pub fn new(suffix: &'static str, payload: impl Into<String>) -> Self {
        Self {
            suffix,
            payload: payload.into(),
        }
    }
}

#[derive(Debug)]
pub enum Element {
    Switch(Switch),
    Emitter(SignalEmitter),
    Climate(ClimateSensor),
    Light(LightSensor),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Switch(s) => s.name(),
            Element::Emitter(e) => e.name(),
            Element::Climate(c) => c.name(),
            Element::Light(l) => l.name(),
        }
    }

    /// Topic level under the device name.
    ///
    /// The transmitter uses a fixed segment; everything else is addressed
    /// by its name.
    pub fn segment(&self) -> &str {
        match self {
            Element::Emitter(_) => IR_TRANSMITTER_SEGMENT,
            other => other.name(),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Element::Switch(_) => Capability::Switch,
            Element::Emitter(_) => Capability::SignalEmitter,
            Element::Climate(_) | Element::Light(_) => Capability::Sensor,
        }
    }

    pub fn role(&self) -> Role {
        match self.capability() {
            Capability::Switch | Capability::SignalEmitter => Role::Actuator,
            Capability::Sensor => Role::Sensor,
        }
    }

    /// Whether the element keeps commanded state worth restoring after a restart.
    pub fn is_stateful(&self) -> bool {
        matches!(self, Element::Switch(_))
    }

    pub fn command_topic(&self, device: &str) -> String {
        topic::command_topic(device, self.segment())
    }

    /// Retained state channel, for stateful elements only.
    pub fn status_topic(&self, device: &str) -> Option<String> {
        self.is_stateful()
            .then(|| topic::status_topic(device, self.segment()))
    }

    /// Peripheral setup at boot.
    ///
    /// Sensors take a first reading; a failure there only marks them
    /// `READ_ERROR`.
    pub fn init(&mut self) -> Result<()> {
        match self {
            Element::Switch(s) => s.init(),
            Element::Emitter(_) => Ok(()),
            // A failed first read is already flagged READ_ERROR by the sensor.
            Element::Climate(c) => {
                c.read().ok();
                Ok(())
            }
            Element::Light(l) => {
                l.read().ok();
                Ok(())
            }
        }
    }

    /// Run a command, returning whether it was accepted.
    ///
    /// Sensors treat any payload as a read trigger and accept it when the
    /// read succeeds. Rejections are logged here and go no further.
    pub fn handle_command(&mut self, payload: &str) -> bool {
        let name = self.name().to_string();
        let outcome = match self {
            Element::Switch(s) => s.handle_command(payload).map(drop),
            Element::Emitter(e) => e.handle_command(payload).map(drop),
            Element::Climate(c) => c.read().map(drop),
            Element::Light(l) => l.read().map(drop),
        };

        match outcome {
            Ok(()) => {
                info!("[Element] {} accepted command {:?}", name, payload);
                true
            }
            Err(e) => {
                warn!("[Element] {} rejected command {:?}: {}", name, payload, e);
                false
            }
        }
    }

    pub fn status(&self) -> StatusTag {
        match self {
            Element::Switch(_) | Element::Emitter(_) => StatusTag::Ok,
            Element::Climate(c) => c.status(),
            Element::Light(l) => l.status(),
        }
    }

    /// Values to publish (retained) after an accepted command.
    pub fn publications(&self) -> Vec<Publication> {
        match self {
            Element::Switch(s) => vec![Publication::new(topic::STATUS_SUFFIX, s.state_payload())],
            Element::Emitter(_) => Vec::new(),
            Element::Climate(c) => c.publications(),
            Element::Light(l) => l.publications(),
        }
    }

    pub fn as_switch(&self) -> Option<&Switch> {
        match self {
            Element::Switch(s) => Some(s),
            _ => None,
        }
    }

    /// Refresh a sensor's cached readings. Actuators report `None`.
    pub fn refresh(&mut self) -> Option<bool> {
        match self {
            Element::Climate(c) => Some(c.read().is_ok()),
            Element::Light(l) => Some(l.read().is_ok()),
            Element::Switch(_) | Element::Emitter(_) => None,
        }
    }
}

impl From<Switch> for Element {
    fn from(value: Switch) -> Self {
        Element::Switch(value)
    }
}

impl From<SignalEmitter> for Element {
    fn from(value: SignalEmitter) -> Self {
        Element::Emitter(value)
    }
}

impl From<ClimateSensor> for Element {
    fn from(value: ClimateSensor) -> Self {
        Element::Climate(value)
    }
}

impl From<LightSensor> for Element {
    fn from(value: LightSensor) -> Self {
        Element::Light(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use embedded_hal::digital::{ErrorType, OutputPin};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use std::convert::Infallible;

    struct NullPin;

    impl ErrorType for NullPin {
        type Error = Infallible;
    }

    impl OutputPin for NullPin {
        fn set_low(&mut self) -> std::result::Result<(), Infallible> {
            Ok(())
        }

        fn set_high(&mut self) -> std::result::Result<(), Infallible> {
            Ok(())
        }
    }

    struct NullIr;

    impl IrSender for NullIr {
        fn send(&mut self, _frame: IrFrame) -> Result<()> {
            Ok(())
        }
    }

    struct DeadProbe;

    impl LightProbe for DeadProbe {
        fn sample(&mut self) -> Result<u16> {
            Err(NodeError::ReadFailure("disconnected".to_string()))
        }
    }

    #[test]
    fn test_status_tag_strings() {
        assert_eq!(StatusTag::Ok.to_string(), "OK");
        assert_eq!(StatusTag::ReadError.to_string(), "READ_ERROR");
        assert_eq!(serde_json::to_string(&StatusTag::ReadError).unwrap(), "\"READ_ERROR\"");
        assert_eq!(Capability::SignalEmitter.as_ref(), "signal-emitter");
    }

    #[test]
    fn test_switch_element_contract() {
        let mut element = Element::from(Switch::new("tvSwitch", NullPin));
        assert_eq!(element.capability(), Capability::Switch);
        assert_eq!(element.role(), Role::Actuator);
        assert_eq!(element.command_topic("salon"), "salon/tvSwitch");
        assert_eq!(element.status_topic("salon").as_deref(), Some("salon/tvSwitch/status"));

        assert!(element.handle_command("ON"));
        assert!(element.as_switch().unwrap().is_on());
        assert!(!element.handle_command("BLINK"));
        assert!(element.as_switch().unwrap().is_on());
        assert_eq!(element.status(), StatusTag::Ok);
        assert_eq!(element.publications(), vec![Publication::new("status", "ON")]);
    }

    #[test]
    fn test_emitter_element_contract() {
        let mut element =
            Element::from(SignalEmitter::new("irTransmitter", NullIr, NoopDelay::new()));
        assert_eq!(element.segment(), IR_TRANSMITTER_SEGMENT);
        assert_eq!(element.command_topic("salon"), "salon/ir_transmitter");
        assert_eq!(element.status_topic("salon"), None);
        assert!(element.handle_command(r#"{"protocol":"NEC","signal":"FF","repeat":1}"#));
        assert!(!element.handle_command(r#"{"protocol":"NEC"}"#));
        assert!(element.publications().is_empty());
        assert_eq!(element.status(), StatusTag::Ok);
    }

    #[test]
    fn test_sensor_element_contract() {
        let mut element = Element::from(LightSensor::new("photoresistor", DeadProbe));
        assert_eq!(element.role(), Role::Sensor);
        assert!(element.init().is_ok());
        assert_eq!(element.status(), StatusTag::ReadError);
        assert!(!element.handle_command("anything"));
        assert_eq!(element.refresh(), Some(false));
        assert!(element.publications().is_empty());
    }
}
