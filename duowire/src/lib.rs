//! Interrupt-driven TWI/I2C master driver
//!
//! The bus protocol runs entirely in the controller's interrupt handler;
//! tasks only stage a request, fire a START and wait for the outcome:
//!
//! - Bus configuration and bit-rate computation ([`config`])
//! - Error taxonomy ([`error`])
//! - Interrupt-to-task completion flags ([`flags`])
//! - Protocol engine, one transition per interrupt ([`engine`])
//! - Bus instance with probe/transmit/receive ([`master`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod flags;
pub mod master;

#[cfg(test)]
mod sim;

pub use config::{BitRate, TwiConfig};
pub use engine::{Mode, Register, Transfer};
pub use error::Error;
pub use flags::{Completion, EventFlags};
pub use master::{TwiMaster, DEFAULT_CAPACITY};

pub use duowire_hal::{Control, Prescaler, Status, TwiRegisters};
