// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # megahal
//!
//! Register, pin ownership and bus controller layer for ATmega microcontrollers, written in
//! Rust for bare-metal targets.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`register`] | Volatile register cells and bit-field descriptors |
//! | [`chip`] | Per-chip address tables and alternate-function lookup |
//! | [`resource`] | Ownership registry for pins and peripherals |
//! | [`hw`] | Pins, typed pin modes and the SPI / USART / TWI peripherals |
//! | [`bus`] | Fixed and variable blocking bus controllers over either SPI backend |
//! | [`interrupt`] | Interrupt-free sections |
//!
//! ## Getting Started
//!
//! ```no_run
//! use megahal::bus::{Config, FixedController};
//! use megahal::chip::atmega328p::{self, Atmega328p};
//! use megahal::hw::SpiBackend;
//!
//! let chip = Atmega328p;
//! let backend = SpiBackend::new(&chip, atmega328p::SPI0)?;
//! let mut bus = FixedController::new(backend, &Config::new(16_000_000, 4_000_000));
//! bus.initialize();
//! let status = bus.exchange(0x9F);
//! # let _ = status;
//! # Ok::<(), megahal::Error>(())
//! ```
//!
//! Build docs:
//!
//! ```bash
//! cargo doc --no-deps --open
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every other module.
mod fmt;

#[cfg(test)]
mod sim;

pub mod bus;
pub mod chip;
pub mod error;
pub mod hw;
pub mod interrupt;
pub mod register;
pub mod resource;

pub use error::Error;
