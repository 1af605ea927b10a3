// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! MCU-level wrappers: GPIO ports and pins, SPI, USART and TWI.

pub mod gpio;
pub mod pins;
pub mod port;
pub mod spi;
pub mod twi;
pub mod usart;

pub use gpio::Pin;
pub use pins::{IoPin, OpenDrain, PullUp, PullUpInput, PushPull};
pub use port::Port;
pub use spi::SpiBackend;
pub use twi::Twi;
pub use usart::{Transmitter, UsartSpiBackend};
