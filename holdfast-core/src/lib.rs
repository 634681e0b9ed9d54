//! Board-agnostic config store logic for the Holdfast firmware
//!
//! This crate contains everything that does not depend on a specific flash
//! peripheral:
//!
//! - Record layout and validation (magic/version/CRC, NUL-terminated payload)
//! - CRC16 integrity calculator
//! - Flash primitives (erase/read/write with alignment and verification)
//! - The config store lifecycle (lazy load, defaults fallback, write-back)
//!
//! Hardware access goes through [`holdfast_hal::FlashController`], so the
//! whole crate is testable on the host against a simulated flash.

#![no_std]
#![deny(unsafe_code)]

// Host-side tests use std-based tooling (proptest)
#[cfg(test)]
extern crate std;

pub mod flash;
pub mod integrity;
pub mod record;
pub mod store;

pub use record::{ConfigRecord, CONFIG_MAGIC, CONFIG_VERSION, PAGE_SIZE, PAYLOAD_CAPACITY};
pub use store::ConfigStore;
