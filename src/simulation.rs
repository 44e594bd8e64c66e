//! Simulated board for running the node without hardware.
//!
//! Output lines and IR frames are logged, sensors produce slowly drifting
//! values and fail now and then like a real DHT does.

use crate::board::{Board, StdDelay};
use crate::element::climate::{ClimateProbe, ClimateSample};
use crate::element::emitter::{IrFrame, IrSender};
use crate::element::light::LightProbe;
use crate::error::{NodeError, Result};
use chrono::{Local, Timelike};
use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::convert::Infallible;

/// Output line that logs every level change.
#[derive(Debug)]
pub struct SimulatedPin {
    line: &'static str,
    level: Option<PinState>,
}

impl SimulatedPin {
    pub fn new(line: &'static str) -> Self {
        Self { line, level: None }
    }

    /// Last driven level, `None` before the first write.
    pub fn level(&self) -> Option<PinState> {
        self.level
    }

    fn write(&mut self, level: PinState) {
        if self.level != Some(level) {
            info!("[Sim] pin {} -> {:?}", self.line, level);
        }
        self.level = Some(level);
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedPin {
    fn set_low(&mut self) -> std::result::Result<(), Self::Error> {
        self.write(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> std::result::Result<(), Self::Error> {
        self.write(PinState::High);
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimulatedIr {
    line: &'static str,
    sent: usize,
}

impl SimulatedIr {
    pub fn new(line: &'static str) -> Self {
        Self { line, sent: 0 }
    }

    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl IrSender for SimulatedIr {
    fn send(&mut self, frame: IrFrame) -> Result<()> {
        self.sent += 1;
        info!(
            "[Sim] IR {} {:?} 0x{:08X} ({} bits)",
            self.line, frame.protocol, frame.code, frame.bits
        );
        Ok(())
    }
}

/// Climate probe drifting around a comfortable room.
#[derive(Debug)]
pub struct SimulatedClimate {
    rng: StdRng,
    temperature: f32,
    humidity: f32,
    failure_rate: f64,
}

impl SimulatedClimate {
    pub fn new(rng: StdRng, failure_rate: f64) -> Self {
        Self {
            rng,
            temperature: 21.0,
            humidity: 45.0,
            failure_rate,
        }
    }
}

impl ClimateProbe for SimulatedClimate {
    fn sample(&mut self) -> Result<ClimateSample> {
        if self.rng.gen_bool(self.failure_rate) {
            // A DHT reports a failed transfer as NaN.
            return Ok(ClimateSample {
                temperature: f32::NAN,
                humidity: f32::NAN,
            });
        }
        self.temperature = (self.temperature + self.rng.gen_range(-0.3..0.3)).clamp(15.0, 30.0);
        self.humidity = (self.humidity + self.rng.gen_range(-1.0..1.0)).clamp(20.0, 80.0);
        Ok(ClimateSample {
            temperature: self.temperature,
            humidity: self.humidity,
        })
    }
}

/// Light probe following the local time of day on a 10-bit scale.
#[derive(Debug)]
pub struct SimulatedLight {
    rng: StdRng,
    failure_rate: f64,
}

impl SimulatedLight {
    pub fn new(rng: StdRng, failure_rate: f64) -> Self {
        Self { rng, failure_rate }
    }

    fn daylight(hour: u32) -> f32 {
        let distance_from_noon = (hour as f32 - 12.0).abs();
        (1.0 - distance_from_noon / 12.0).clamp(0.0, 1.0)
    }
}

impl LightProbe for SimulatedLight {
    fn sample(&mut self) -> Result<u16> {
        if self.rng.gen_bool(self.failure_rate) {
            return Err(NodeError::ReadFailure("simulated ADC fault".to_string()));
        }
        let base = Self::daylight(Local::now().hour()) * 900.0;
        let noise: f32 = self.rng.gen_range(0.0..60.0);
        Ok((base + noise).min(1023.0) as u16)
    }
}

/// Board whose peripherals are all simulated.
#[derive(Debug)]
pub struct SimulatedBoard {
    seed: Option<u64>,
    failure_rate: f64,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self {
            seed: None,
            failure_rate: 0.05,
        }
    }

    /// Deterministic readings for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Probability that a sensor read fails.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    fn rng(&mut self) -> StdRng {
        match self.seed.as_mut() {
            Some(seed) => {
                *seed = seed.wrapping_add(1);
                StdRng::seed_from_u64(*seed)
            }
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for SimulatedBoard {
    type Pin = SimulatedPin;
    type Ir = SimulatedIr;
    type Delay = StdDelay;
    type Climate = SimulatedClimate;
    type Light = SimulatedLight;

    fn output_pin(&mut self, line: &'static str) -> Result<SimulatedPin> {
        Ok(SimulatedPin::new(line))
    }

    fn ir_sender(&mut self, line: &'static str) -> Result<SimulatedIr> {
        Ok(SimulatedIr::new(line))
    }

    fn delay(&mut self) -> StdDelay {
        StdDelay
    }

    fn climate_probe(&mut self, _line: &'static str) -> Result<SimulatedClimate> {
        Ok(SimulatedClimate::new(self.rng(), self.failure_rate))
    }

    fn light_probe(&mut self, _line: &'static str) -> Result<SimulatedLight> {
        Ok(SimulatedLight::new(self.rng(), self.failure_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_records_level() {
        let mut pin = SimulatedPin::new("D5");
        assert_eq!(pin.level(), None);
        pin.set_low().unwrap();
        assert_eq!(pin.level(), Some(PinState::Low));
        pin.set_high().unwrap();
        assert_eq!(pin.level(), Some(PinState::High));
    }

    #[test]
    fn test_climate_without_failures_stays_in_range() {
        let mut probe = SimulatedClimate::new(StdRng::seed_from_u64(7), 0.0);
        for _ in 0..100 {
            let sample = probe.sample().unwrap();
            assert!((15.0..=30.0).contains(&sample.temperature));
            assert!((20.0..=80.0).contains(&sample.humidity));
        }
    }

    #[test]
    fn test_climate_failure_is_nan() {
        let mut probe = SimulatedClimate::new(StdRng::seed_from_u64(7), 1.0);
        assert!(probe.sample().unwrap().temperature.is_nan());
    }

    #[test]
    fn test_light_levels() {
        let mut probe = SimulatedLight::new(StdRng::seed_from_u64(3), 0.0);
        assert!(probe.sample().unwrap() <= 1023);
        assert_eq!(SimulatedLight::daylight(12), 1.0);
        assert_eq!(SimulatedLight::daylight(0), 0.0);

        let mut broken = SimulatedLight::new(StdRng::seed_from_u64(3), 1.0);
        assert!(broken.sample().is_err());
    }

    #[test]
    fn test_ir_counts_frames() {
        let mut ir = SimulatedIr::new("D2");
        ir.send(IrFrame::nec(0x20DF_10EF)).unwrap();
        assert_eq!(ir.sent(), 1);
    }
}
