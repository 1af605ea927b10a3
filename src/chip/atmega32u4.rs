// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ATmega32U4 address and pin tables.
//!
//! The 32U4 has no USART0; its only USART is USART1 at 0xC8.

use super::{Binding, Chip, Peripheral, PortId, Signal, Table};
use crate::resource::Registry;

pub const PORTB: usize = 0x23;
pub const PORTC: usize = 0x26;
pub const PORTD: usize = 0x29;
pub const PORTE: usize = 0x2C;
pub const PORTF: usize = 0x2F;

pub const SPI0: usize = 0x4C;
pub const USART1: usize = 0xC8;
pub const TWI0: usize = 0xB8;

pub const SREG: usize = 0x5F;

const SPI: Peripheral = Peripheral::spi(SPI0);
const USART: Peripheral = Peripheral::usart(USART1);
const TWI: Peripheral = Peripheral::twi(TWI0);

pub const TABLE: Table = Table {
    ports: &[
        (PortId::B, PORTB),
        (PortId::C, PORTC),
        (PortId::D, PORTD),
        (PortId::E, PORTE),
        (PortId::F, PORTF),
    ],
    peripherals: &[SPI, USART, TWI],
    signals: &[
        Binding::new(SPI, Signal::Ss, PortId::B, 0),
        Binding::new(SPI, Signal::Sck, PortId::B, 1),
        Binding::new(SPI, Signal::Mosi, PortId::B, 2),
        Binding::new(SPI, Signal::Miso, PortId::B, 3),
        Binding::new(USART, Signal::Rxd, PortId::D, 2),
        Binding::new(USART, Signal::Txd, PortId::D, 3),
        Binding::new(USART, Signal::Xck, PortId::D, 5),
        Binding::new(TWI, Signal::Scl, PortId::D, 0),
        Binding::new(TWI, Signal::Sda, PortId::D, 1),
    ],
    status_register: SREG,
};

static REGISTRY: Registry = Registry::new();

#[derive(Clone, Copy, Debug, Default)]
pub struct Atmega32u4;

unsafe impl Chip for Atmega32u4 {
    fn name(&self) -> &'static str {
        "ATmega32U4"
    }

    fn table(&self) -> &Table {
        &TABLE
    }

    fn registry(&self) -> &'static Registry {
        &REGISTRY
    }
}
