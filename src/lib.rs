//! Element node library.
//!
//! Exposes the peripherals of a home-automation node (switches, an infrared
//! transmitter, a climate sensor and a light sensor) as uniformly addressed
//! elements over MQTT, and restores switch state after a restart from the
//! broker's retained messages.

pub mod board;
pub mod config;
pub mod element;
pub mod error;
pub mod instance_lock;
pub mod layout;
pub mod node;
pub mod registry;
pub mod router;
pub mod simulation;
pub mod topic;
pub mod transport;
