//! Holdfast Hardware Abstraction Layer
//!
//! This crate defines the flash controller trait implemented by chip-specific
//! HALs (STM32L4, RP2040, etc.). This enables the same store logic to run on
//! different hardware platforms and against a simulation on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  holdfast-core (record layout + store)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  holdfast-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  chip HALs    │       │   SimFlash    │
//! │  (firmware)   │       │  (host tests) │
//! └───────────────┘       └───────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
#[cfg(feature = "sim")]
pub mod sim;

// Re-export key items at crate root for convenience
pub use flash::{FlashController, FlashError, ERASED_BYTE, PROGRAM_GRANULARITY};
#[cfg(feature = "sim")]
pub use sim::SimFlash;
