//! Board bring-up seam.
//!
//! A [`Board`] hands out the peripheral drivers a layout binds to its
//! elements. Lines are identified by their silkscreen label (`D5`, `A0`, ...).

use crate::element::{ClimateProbe, IrSender, LightProbe, SwitchPin};
use crate::error::Result;
use embedded_hal::delay::DelayNs;
use std::time::Duration;

pub trait Board {
    type Pin: SwitchPin + 'static;
    type Ir: IrSender + 'static;
    type Delay: DelayNs + 'static;
    type Climate: ClimateProbe + 'static;
    type Light: LightProbe + 'static;

    /// Configure `line` as a push-pull output.
    fn output_pin(&mut self, line: &'static str) -> Result<Self::Pin>;
    fn ir_sender(&mut self, line: &'static str) -> Result<Self::Ir>;
    fn delay(&mut self) -> Self::Delay;
    fn climate_probe(&mut self, line: &'static str) -> Result<Self::Climate>;
    fn light_probe(&mut self, line: &'static str) -> Result<Self::Light>;
}

/// Blocking delay on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
