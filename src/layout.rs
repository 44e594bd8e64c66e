//! Board layouts.
//!
//! Each layout declares which element sits on which line. Actuators come
//! first, then sensors; the order is the registry order.

use crate::board::Board;
use crate::element::{ClimateSensor, LightSensor, SignalEmitter, Switch};
use crate::error::Result;
use crate::registry::{Registry, RegistryBuilder};
use serde::{Deserialize, Serialize};

/// On-board LED, also used as a status light.
pub const LED_SWITCH: &str = "ledSwitch";
pub const IR_TRANSMITTER: &str = "irTransmitter";
pub const DHT: &str = "dht";
pub const PHOTORESISTOR: &str = "photoresistor";

const LED_LINE: &str = "LED_BUILTIN";
const IR_LINE: &str = "D2";
const DHT_LINE: &str = "D3";
const PHOTORESISTOR_LINE: &str = "A0";

/// Extra relays of the media-center layout: (element name, line).
const MEDIA_CENTER_SWITCHES: [(&str, &str); 4] = [
    ("tvSwitch", "D5"),
    ("ampSwitch", "D6"),
    ("subwooferSwitch", "D7"),
    ("ps3Switch", "D8"),
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Layout {
    /// LED switch, IR transmitter and the two sensors.
    Minimal,
    /// Minimal plus relays for the TV, amplifier, subwoofer and console.
    MediaCenter,
}

impl Layout {
    /// Bind this layout's elements to `board` and build the registry.
    pub fn build<B: Board>(
        self,
        device_name: &str,
        board: &mut B,
        switch_active_low: bool,
    ) -> Result<Registry> {
        let mut builder = Registry::builder(device_name).with(
            Switch::new(LED_SWITCH, board.output_pin(LED_LINE)?).with_active_low(switch_active_low),
        );

        if self == Layout::MediaCenter {
            for (name, line) in MEDIA_CENTER_SWITCHES {
                builder = builder.with(
                    Switch::new(name, board.output_pin(line)?).with_active_low(switch_active_low),
                );
            }
        }

        builder = builder.with(SignalEmitter::new(
            IR_TRANSMITTER,
            board.ir_sender(IR_LINE)?,
            board.delay(),
        ));

        Self::with_sensors(builder, board)?.build()
    }

    fn with_sensors<B: Board>(builder: RegistryBuilder, board: &mut B) -> Result<RegistryBuilder> {
        Ok(builder
            .with(ClimateSensor::new(DHT, board.climate_probe(DHT_LINE)?))
            .with(LightSensor::new(
                PHOTORESISTOR,
                board.light_probe(PHOTORESISTOR_LINE)?,
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Capability, Element};
    use crate::simulation::SimulatedBoard;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_layout_parsing() {
        assert_eq!(Layout::from_str("minimal").unwrap(), Layout::Minimal);
        assert_eq!(Layout::from_str("media-center").unwrap(), Layout::MediaCenter);
        assert_eq!(Layout::from_str("Media-Center").unwrap(), Layout::MediaCenter);
        assert!(Layout::from_str("garage").is_err());
        assert_eq!(Layout::MediaCenter.to_string(), "media-center");
    }

    #[test]
    fn test_minimal_layout() {
        let mut board = SimulatedBoard::new().with_seed(1);
        let registry = Layout::Minimal.build("salon", &mut board, true).unwrap();

        let names: Vec<_> = registry.elements().iter().map(Element::name).collect();
        assert_eq!(names, vec![LED_SWITCH, IR_TRANSMITTER, DHT, PHOTORESISTOR]);
        assert_eq!(
            registry.get(IR_TRANSMITTER).unwrap().capability(),
            Capability::SignalEmitter
        );
    }

    #[test]
    fn test_media_center_layout() {
        let mut board = SimulatedBoard::new().with_seed(1);
        let registry = Layout::MediaCenter.build("salon", &mut board, true).unwrap();

        let devices: Vec<_> = registry.devices().map(Element::name).collect();
        assert_eq!(
            devices,
            vec![
                LED_SWITCH,
                "tvSwitch",
                "ampSwitch",
                "subwooferSwitch",
                "ps3Switch",
                IR_TRANSMITTER
            ]
        );
        assert_eq!(registry.sensors().count(), 2);
    }

    #[test]
    fn test_every_layout_builds() {
        for layout in Layout::iter() {
            let mut board = SimulatedBoard::new().with_seed(9);
            assert!(layout.build("node", &mut board, false).is_ok());
        }
    }
}
