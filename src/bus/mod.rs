// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Blocking synchronous-serial bus.
//!
//! Two unrelated peripherals can drive the bus: the dedicated SPI block
//! ([`SpiBackend`](crate::hw::spi::SpiBackend)) and a USART in master-SPI mode
//! ([`UsartSpiBackend`](crate::hw::usart::UsartSpiBackend)). Both implement [`Backend`],
//! and either can be wrapped in
//!
//! - [`FixedController`]: the register configuration is derived once from a [`Config`] at
//!   construction;
//! - [`VariableController`]: construction only claims resources; [`Settings`] bundles
//!   computed ahead of time are swapped in with `configure`, so one controller can serve
//!   several devices with different timing.
//!
//! [`Settings`]: Backend::Settings

pub mod controller;

pub use controller::{FixedController, VariableController};
pub use embedded_hal::spi::{Mode, Phase, Polarity, MODE_0, MODE_1, MODE_2, MODE_3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Timing and framing of one bus session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Peripheral clock feeding the bus.
    pub cpu_hz: u32,
    /// Fastest clock the device accepts; the backend picks the nearest rate at or below it.
    pub sck_hz: u32,
    pub mode: Mode,
    pub bit_order: BitOrder,
}

impl Config {
    pub const fn new(cpu_hz: u32, sck_hz: u32) -> Self {
        Self {
            cpu_hz,
            sck_hz,
            mode: MODE_0,
            bit_order: BitOrder::MsbFirst,
        }
    }

    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
    }

    /// Register bundle for backend `B`. Pure; call it once and keep the result.
    pub fn settings<B: Backend>(&self) -> B::Settings {
        B::settings(self)
    }
}

impl Default for Config {
    /// 16 MHz core, 1 MHz bus, mode 0, MSB first.
    fn default() -> Self {
        Self::new(16_000_000, 1_000_000)
    }
}

/// One peripheral able to run the synchronous byte exchange.
///
/// Implementations own their register block and signal pins. Dropping a backend disables
/// the peripheral before the pins are torn down.
pub trait Backend {
    /// Precomputed register values for one [`Config`].
    type Settings: Copy;

    fn settings(config: &Config) -> Self::Settings;

    /// Overwrite every configuration field with `settings`.
    fn apply(&mut self, settings: &Self::Settings);

    fn initialize_pins(&mut self);

    fn enable(&mut self);

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Write `byte`, spin until the transfer completes, return the byte clocked in.
    ///
    /// There is no timeout. A bus that never completes hangs the caller.
    fn exchange(&mut self, byte: u8) -> u8;
}
