//! Infrared signal emitter.
//!
//! Commands are JSON records `{"protocol": .., "signal": .., "repeat": ..}`.
//! The Samsung scheme sends one frame per repetition; any other protocol name
//! falls back to an NEC frame followed by the NEC stop frame.

use crate::error::{NodeError, Result};
use embedded_hal::delay::DelayNs;
use log::{debug, info};
use serde::Deserialize;
use std::fmt;

/// Protocol name selecting the Samsung scheme (matched case-insensitively).
pub const PROTOCOL_SAMSUNG: &str = "SAMSUNG";

/// Frame width used for every emitted frame.
pub const FRAME_BITS: u16 = 32;

/// Frame closing a generic (NEC) transmission.
pub const NEC_STOP_CODE: u32 = 0xFFFF_FFFF;

/// Upper bound on repetitions per command.
pub const MAX_REPEAT: u32 = 16;

const SAMSUNG_GAP_MS: u32 = 40;
const NEC_FRAME_GAP_MS: u32 = 100;
const NEC_STOP_GAP_MS: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrProtocol {
    Samsung,
    Nec,
}

/// One modulated frame handed to the waveform encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrFrame {
    pub protocol: IrProtocol,
    pub code: u32,
    pub bits: u16,
}

impl IrFrame {
    pub fn samsung(code: u32) -> Self {
        Self {
            protocol: IrProtocol::Samsung,
            code,
            bits: FRAME_BITS,
        }
    }

    pub fn nec(code: u32) -> Self {
        Self {
            protocol: IrProtocol::Nec,
            code,
            bits: FRAME_BITS,
        }
    }
}

/// Infrared waveform encoder bound to the transmitter LED.
pub trait IrSender {
    fn send(&mut self, frame: IrFrame) -> Result<()>;
}

#[derive(Deserialize)]
struct RawSignalRequest {
    protocol: String,
    signal: String,
    repeat: u32,
}

/// A validated emission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRequest {
    pub protocol: String,
    pub code: u32,
    pub repeat: u32,
}

impl SignalRequest {
    /// Parse a command payload, failing on missing fields, a repeat count
    /// outside `0..=MAX_REPEAT` or a signal that is not a 32-bit hexadecimal
    /// number.
    pub fn parse(payload: &str) -> Result<Self> {
        let raw: RawSignalRequest = serde_json::from_str(payload)
            .map_err(|e| NodeError::MalformedSignal(e.to_string()))?;

        if raw.repeat > MAX_REPEAT {
            return Err(NodeError::MalformedSignal(format!(
                "repeat {} exceeds {}",
                raw.repeat, MAX_REPEAT
            )));
        }

        let digits = raw.signal.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        let code = u32::from_str_radix(digits, 16)
            .map_err(|e| NodeError::MalformedSignal(format!("signal {:?}: {}", raw.signal, e)))?;

        Ok(Self {
            protocol: raw.protocol,
            code,
            repeat: raw.repeat,
        })
    }

    pub fn is_samsung(&self) -> bool {
        self.protocol.eq_ignore_ascii_case(PROTOCOL_SAMSUNG)
    }
}

pub struct SignalEmitter {
    name: String,
    sender: Box<dyn IrSender>,
    delay: Box<dyn DelayNs>,
}

impl SignalEmitter {
    pub fn new(
        name: impl Into<String>,
        sender: impl IrSender + 'static,
        delay: impl DelayNs + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sender: Box::new(sender),
            delay: Box::new(delay),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse a payload and transmit it. Nothing is emitted if parsing fails.
    pub fn handle_command(&mut self, payload: &str) -> Result<SignalRequest> {
        let request = SignalRequest::parse(payload)?;
        self.transmit(&request)?;
        Ok(request)
    }

    /// Emit `request.repeat` repetitions, returning the number of frames sent.
    pub fn transmit(&mut self, request: &SignalRequest) -> Result<usize> {
        info!(
            "[IR] {} sending {} 0x{:08X} x{}",
            self.name, request.protocol, request.code, request.repeat
        );

        let mut frames = 0;
        for _ in 0..request.repeat {
            if request.is_samsung() {
                self.sender.send(IrFrame::samsung(request.code))?;
                self.delay.delay_ms(SAMSUNG_GAP_MS);
                frames += 1;
            } else {
                self.sender.send(IrFrame::nec(request.code))?;
                self.delay.delay_ms(NEC_FRAME_GAP_MS);
                self.sender.send(IrFrame::nec(NEC_STOP_CODE))?;
                self.delay.delay_ms(NEC_STOP_GAP_MS);
                frames += 2;
            }
        }

        debug!("[IR] {} sent {} frame(s)", self.name, frames);
        Ok(frames)
    }
}

impl fmt::Debug for SignalEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalEmitter")
            .field("name", &self.name)
            .finish()
    }
}
