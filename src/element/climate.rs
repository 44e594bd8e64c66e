//! Humidity/temperature sensor element (DHT family).
//!
//! Readings are cached as one batch. A failed read keeps the previous batch
//! and flags the element with `READ_ERROR` until the next good read.

use super::{Publication, StatusTag};
use crate::error::{NodeError, Result};
use log::{debug, warn};
use std::fmt;

/// Raw values as returned by the sensor driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

/// Humidity/temperature driver. NaN fields count as a failed read.
pub trait ClimateProbe {
    fn sample(&mut self) -> Result<ClimateSample>;
}

/// One complete reading batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature: f32,
    pub humidity: f32,
    pub heat_index: f32,
}

pub struct ClimateSensor {
    name: String,
    probe: Box<dyn ClimateProbe>,
    last: Option<ClimateReading>,
    read_error: bool,
}

impl ClimateSensor {
    pub fn new(name: impl Into<String>, probe: impl ClimateProbe + 'static) -> Self {
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

    /// Last good reading batch, if any.
    pub fn reading(&self) -> Option<ClimateReading> {
        self.last
    }

    pub fn status(&self) -> StatusTag {
        if self.read_error {
            StatusTag::ReadError
        } else {
            StatusTag::Ok
        }
    }

    /// Take a fresh reading.
    pub fn read(&mut self) -> Result<ClimateReading> {
        debug!("[Sensor] Reading {}", self.name);
        let sample = self
            .probe
            .sample()
            .and_then(|s| {
                if s.temperature.is_nan() || s.humidity.is_nan() {
                    Err(NodeError::ReadFailure("sensor returned NaN".to_string()))
                } else {
                    Ok(s)
                }
            })
            .inspect_err(|e| {
                warn!("[Sensor] Failed to read from {}: {}", self.name, e);
            });

        let sample = match sample {
            Ok(sample) => sample,
            Err(e) => {
                self.read_error = true;
                return Err(e);
            }
        };

        let reading = ClimateReading {
            temperature: sample.temperature,
            humidity: sample.humidity,
            heat_index: heat_index(sample.temperature, sample.humidity),
        };
        debug!(
            "[Sensor] {} humidity: {:.1}%  temperature: {:.1}°C  heat index: {:.1}°C",
            self.name, reading.humidity, reading.temperature, reading.heat_index
        );
        self.last = Some(reading);
        self.read_error = false;
        Ok(reading)
    }

    pub fn publications(&self) -> Vec<Publication> {
        match self.last {
            Some(reading) => vec![
                Publication::new("temperature", format!("{:.2}", reading.temperature)),
                Publication::new("humidity", format!("{:.2}", reading.humidity)),
                Publication::new("heat_index", format!("{:.2}", reading.heat_index)),
            ],
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for ClimateSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClimateSensor")
            .field("name", &self.name)
            .field("last", &self.last)
            .field("read_error", &self.read_error)
            .finish()
    }
}

/// Apparent temperature in °C.
///
/// Uses Steadman's simple formula, switching to the Rothfusz regression
/// (with its low- and high-humidity adjustments) above 79 °F.
pub fn heat_index(temperature: f32, humidity: f32) -> f32 {
    let t = temperature * 1.8 + 32.0;
    let h = humidity;

    let mut hi = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + h * 0.094);

    if hi > 79.0 {
        hi = -42.379 + 2.049_015_2 * t + 10.143_331 * h
            - 0.224_755_4 * t * h
            - 0.006_837_83 * t * t
            - 0.054_817_17 * h * h
            + 0.001_228_74 * t * t * h
            + 0.000_852_82 * t * h * h
            - 0.000_001_99 * t * t * h * h;

        if h < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= (13.0 - h) * 0.25 * ((17.0 - (t - 95.0).abs()) * 0.058_82).sqrt();
        } else if h > 85.0 && (80.0..=87.0).contains(&t) {
            hi += (h - 85.0) * 0.1 * ((87.0 - t) * 0.2);
        }
    }

    (hi - 32.0) * 0.555_55
}
