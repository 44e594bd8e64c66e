//! Fixed collection of the node's elements.
//!
//! The registry is assembled once at start-up, owns every element and never
//! changes afterwards. Construction rejects duplicate names or channel
//! segments so two elements can never share a channel.

use crate::element::{Element, Role, StatusTag};
use crate::error::{NodeError, Result};
use crate::topic;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug)]
pub struct Registry {
    device_name: String,
    elements: Vec<Element>,
}

impl Registry {
    pub fn builder(device_name: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder {
            device_name: device_name.into(),
            elements: Vec::new(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Elements in construction order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name() == name)
    }

    pub(crate) fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    /// Actuators (switches and the signal emitter).
    pub fn devices(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.role() == Role::Actuator)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.role() == Role::Sensor)
    }

    /// Initialise every peripheral, actuators first.
    pub fn init(&mut self) -> Result<()> {
        for role in [Role::Actuator, Role::Sensor] {
            for element in self.elements.iter_mut().filter(|e| e.role() == role) {
                element.init()?;
                info!("[Registry] Initialised {} ({})", element.name(), element.capability());
            }
        }
        Ok(())
    }

    /// Refresh every sensor's cache, returning how many reads succeeded.
    pub fn read_sensors(&mut self) -> usize {
        let mut ok = 0;
        for element in &mut self.elements {
            match element.refresh() {
                Some(true) => ok += 1,
                Some(false) => warn!("[Registry] {} reported a read error", element.name()),
                None => {}
            }
        }
        ok
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        let collect = |role: Role| -> BTreeMap<String, ElementStatus> {
            self.elements
                .iter()
                .filter(|e| e.role() == role)
                .map(|e| {
                    (
                        e.name().to_string(),
                        ElementStatus {
                            status: e.status(),
                        },
                    )
                })
                .collect()
        };

        StatusSnapshot {
            device: self.device_name.clone(),
            taken_at: Utc::now(),
            devices: collect(Role::Actuator),
            sensors: collect(Role::Sensor),
        }
    }
}

pub struct RegistryBuilder {
    device_name: String,
    elements: Vec<Element>,
}

impl RegistryBuilder {
    pub fn with(mut self, element: impl Into<Element>) -> Self {
        self.elements.push(element.into());
        self
    }

    pub fn build(self) -> Result<Registry> {
        topic::validate_segment(&self.device_name)?;

        let mut names = HashSet::new();
        let mut segments = HashSet::new();
        for element in &self.elements {
            topic::validate_segment(element.segment())?;
            if !names.insert(element.name()) {
                return Err(NodeError::DuplicateElement(element.name().to_string()));
            }
            if !segments.insert(element.segment()) {
                return Err(NodeError::DuplicateElement(format!(
                    "{} (channel {})",
                    element.name(),
                    element.command_topic(&self.device_name)
                )));
            }
        }

        Ok(Registry {
            device_name: self.device_name,
            elements: self.elements,
        })
    }
}

/// `{"status": tag}` entry of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElementStatus {
    pub status: StatusTag,
}

/// Health of every element, grouped by role.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub device: String,
    pub taken_at: DateTime<Utc>,
    pub devices: BTreeMap<String, ElementStatus>,
    pub sensors: BTreeMap<String, ElementStatus>,
}

impl StatusSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{LightProbe, LightSensor, Switch};
    use crate::simulation::SimulatedPin;

    struct FixedLight(Option<u16>);

    impl LightProbe for FixedLight {
        fn sample(&mut self) -> Result<u16> {
            self.0
                .ok_or_else(|| NodeError::ReadFailure("no light".to_string()))
        }
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let result = Registry::builder("salon")
            .with(Switch::new("tvSwitch", SimulatedPin::new("D5")))
            .with(Switch::new("tvSwitch", SimulatedPin::new("D6")))
            .build();
        assert!(matches!(result, Err(NodeError::DuplicateElement(_))));
    }

    #[test]
    fn test_invalid_segments_are_rejected() {
        let result = Registry::builder("salon")
            .with(Switch::new("tv/switch", SimulatedPin::new("D5")))
            .build();
        assert!(matches!(result, Err(NodeError::InvalidTopicSegment(_))));

        let result = Registry::builder("sa+lon").build();
        assert!(matches!(result, Err(NodeError::InvalidTopicSegment(_))));
    }

    #[test]
    fn test_grouping_keeps_construction_order() {
        let registry = Registry::builder("salon")
            .with(Switch::new("ledSwitch", SimulatedPin::new("LED")))
            .with(LightSensor::new("photoresistor", FixedLight(Some(10))))
            .with(Switch::new("tvSwitch", SimulatedPin::new("D5")))
            .build()
            .unwrap();

        let devices: Vec<_> = registry.devices().map(Element::name).collect();
        let sensors: Vec<_> = registry.sensors().map(Element::name).collect();
        assert_eq!(devices, vec!["ledSwitch", "tvSwitch"]);
        assert_eq!(sensors, vec!["photoresistor"]);
        assert_eq!(registry.elements()[2].name(), "tvSwitch");
    }

    #[test]
    fn test_status_snapshot() {
        let mut registry = Registry::builder("salon")
            .with(Switch::new("ledSwitch", SimulatedPin::new("LED")))
            .with(LightSensor::new("photoresistor", FixedLight(None)))
            .build()
            .unwrap();
        registry.init().unwrap();
        assert_eq!(registry.read_sensors(), 0);

        let snapshot = registry.status_snapshot();
        assert_eq!(snapshot.devices["ledSwitch"].status, StatusTag::Ok);
        assert_eq!(snapshot.sensors["photoresistor"].status, StatusTag::ReadError);

        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["devices"]["ledSwitch"]["status"], "OK");
        assert_eq!(json["sensors"]["photoresistor"]["status"], "READ_ERROR");
        assert_eq!(json["device"], "salon");
    }
}
