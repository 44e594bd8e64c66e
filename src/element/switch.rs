//! Switch element: a binary actuator (relay or LED) on one output line.
//!
//! The element remembers the last commanded state. There is no feedback
//! sensing, so the remembered state is what gets reported.

use crate::error::{NodeError, Result};
use embedded_hal::digital::{Error as _, OutputPin, PinState};
use log::{debug, info};
use std::fmt;
use std::str::FromStr;

/// Output line that can be driven to a logic level.
///
/// Implemented for every `embedded-hal` [`OutputPin`].
pub trait SwitchPin {
    fn drive(&mut self, level: PinState) -> Result<()>;
}

impl<P: OutputPin> SwitchPin for P {
    fn drive(&mut self, level: PinState) -> Result<()> {
        self.set_state(level)
            .map_err(|e| NodeError::Peripheral(format!("output pin: {:?}", e.kind())))
    }
}

/// The two literal tokens a switch understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
}

impl SwitchCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchCommand::On => "ON",
            SwitchCommand::Off => "OFF",
        }
    }
}

impl FromStr for SwitchCommand {
    type Err = NodeError;

    /// Case-sensitive, no trimming: only `ON` and `OFF` are accepted.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ON" => Ok(SwitchCommand::On),
            "OFF" => Ok(SwitchCommand::Off),
            other => Err(NodeError::RejectedCommand(other.to_string())),
        }
    }
}

impl fmt::Display for SwitchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Switch {
    name: String,
    pin: Box<dyn SwitchPin>,
    /// ON drives the line low (relay boards).
    active_low: bool,
    on: bool,
}

impl Switch {
    /// Create an active-low switch on the given line, initially off.
    pub fn new(name: impl Into<String>, pin: impl SwitchPin + 'static) -> Self {
        Self {
            name: name.into(),
            pin: Box::new(pin),
            active_low: true,
            on: false,
        }
    }

    pub fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Drive the line to the OFF level so hardware matches the in-memory flag.
    pub fn init(&mut self) -> Result<()> {
        self.apply(SwitchCommand::Off)
    }

    pub fn turn_on(&mut self) -> Result<()> {
        self.apply(SwitchCommand::On)
    }

    pub fn turn_off(&mut self) -> Result<()> {
        self.apply(SwitchCommand::Off)
    }

    /// Drive the actuator, then record the new state.
    ///
    /// A pin fault leaves the recorded state untouched.
    pub fn apply(&mut self, command: SwitchCommand) -> Result<()> {
        let on = command == SwitchCommand::On;
        self.pin.drive(self.level_for(on))?;
        if self.on != on {
            info!("[Switch] {} -> {}", self.name, command);
        } else {
            debug!("[Switch] {} already {}", self.name, command);
        }
        self.on = on;
        Ok(())
    }

    /// Parse and apply a command payload.
    pub fn handle_command(&mut self, payload: &str) -> Result<SwitchCommand> {
        let command = payload.parse::<SwitchCommand>()?;
        self.apply(command)?;
        Ok(command)
    }

    /// Body of the retained state message.
    pub fn state_payload(&self) -> &'static str {
        if self.on {
            SwitchCommand::On.as_str()
        } else {
            SwitchCommand::Off.as_str()
        }
    }

    fn level_for(&self, on: bool) -> PinState {
        PinState::from(on != self.active_low)
    }
}

impl fmt::Debug for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switch")
            .field("name", &self.name)
            .field("active_low", &self.active_low)
            .field("on", &self.on)
            .finish()
    }
}
