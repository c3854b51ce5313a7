//! Duowire Hardware Abstraction Layer
//!
//! This crate defines the register-level view of a two-wire (TWI/I2C)
//! controller that the `duowire` driver drives from its interrupt
//! handler. Chip-specific crates implement [`TwiRegisters`] on top of
//! their peripheral access crate.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  duowire (engine, flags, bus facade)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  duowire-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ duowire-hal-  │
//!             │     avr       │
//!             └───────────────┘
//! ```
//!
//! # Contents
//!
//! - [`TwiRegisters`] - rate, control, status and data registers plus pins
//! - [`Control`] - control register commands (START, continue, STOP, ...)
//! - [`Status`] - decoded post-operation status codes
//! - [`Prescaler`] - bit-rate prescaler selection

#![no_std]
#![deny(unsafe_code)]

pub mod control;
pub mod registers;
pub mod status;

// Re-export key types at crate root for convenience
pub use control::Control;
pub use registers::{Prescaler, TwiRegisters};
pub use status::Status;
