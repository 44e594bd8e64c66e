//! Light-level sensor element (photoresistor on an analog input).

use super::{Publication, StatusTag};
use crate::error::Result;
use log::{debug, warn};
use std::fmt;

/// Analog light-level driver returning the raw ADC count.
pub trait LightProbe {
    fn sample(&mut self) -> Result<u16>;
}

pub struct LightSensor {
    name: String,
    probe: Box<dyn LightProbe>,
    last: Option<u16>,
    read_error: bool,
}

impl LightSensor {
    pub fn new(name: impl Into<String>, probe: impl LightProbe + 'static) -> Self {
        Self {
            name: name.into(),
            probe: Box::new(probe),
            last: None,
            read_error: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<u16> {
        self.last
    }

    pub fn status(&self) -> StatusTag {
        if self.read_error {
            StatusTag::ReadError
        } else {
            StatusTag::Ok
        }
    }

    pub fn read(&mut self) -> Result<u16> {
        match self.probe.sample() {
            Ok(value) => {
                debug!("[Sensor] {} light level: {}", self.name, value);
                self.last = Some(value);
                self.read_error = false;
                Ok(value)
            }
            Err(e) => {
                warn!("[Sensor] Failed to read from {}: {}", self.name, e);
                self.read_error = true;
                Err(e)
            }
        }
    }

    pub fn publications(&self) -> Vec<Publication> {
        self.last
            .map(|value| vec![Publication::new("value", value.to_string())])
            .unwrap_or_default()
    }
}

impl fmt::Debug for LightSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightSensor")
            .field("name", &self.name)
            .field("last", &self.last)
            .field("read_error", &self.read_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;

    struct Flaky {
        values: Vec<Option<u16>>,
    }

    impl LightProbe for Flaky {
        fn sample(&mut self) -> Result<u16> {
            match self.values.remove(0) {
                Some(v) => Ok(v),
                None => Err(NodeError::ReadFailure("adc busy".to_string())),
            }
        }
    }

    #[test]
    fn test_read_error_keeps_last_value() {
        let mut sensor = LightSensor::new(
            "photoresistor",
            Flaky {
                values: vec![Some(512), None, Some(700)],
            },
        );

        assert_eq!(sensor.read().unwrap(), 512);
        assert_eq!(sensor.status(), StatusTag::Ok);

        assert!(sensor.read().is_err());
        assert_eq!(sensor.status(), StatusTag::ReadError);
        assert_eq!(sensor.value(), Some(512));

        assert_eq!(sensor.read().unwrap(), 700);
        assert_eq!(sensor.status(), StatusTag::Ok);
        assert_eq!(sensor.publications()[0].payload, "700");
        assert_eq!(sensor.publications()[0].suffix, "value");
    }
}
