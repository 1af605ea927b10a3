// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ATmega328P address and pin tables.

use super::{Binding, Chip, Peripheral, PortId, Signal, Table};
use crate::resource::Registry;

pub const PORTB: usize = 0x23;
pub const PORTC: usize = 0x26;
pub const PORTD: usize = 0x29;

pub const SPI0: usize = 0x4C;
pub const USART0: usize = 0xC0;
pub const TWI0: usize = 0xB8;

pub const SREG: usize = 0x5F;

const SPI: Peripheral = Peripheral::spi(SPI0);
const USART: Peripheral = Peripheral::usart(USART0);
const TWI: Peripheral = Peripheral::twi(TWI0);

pub const TABLE: Table = Table {
    ports: &[(PortId::B, PORTB), (PortId::C, PORTC), (PortId::D, PORTD)],
    peripherals: &[SPI, USART, TWI],
    signals: &[
        Binding::new(SPI, Signal::Ss, PortId::B, 2),
        Binding::new(SPI, Signal::Mosi, PortId::B, 3),
        Binding::new(SPI, Signal::Miso, PortId::B, 4),
        Binding::new(SPI, Signal::Sck, PortId::B, 5),
        Binding::new(USART, Signal::Rxd, PortId::D, 0),
        Binding::new(USART, Signal::Txd, PortId::D, 1),
        Binding::new(USART, Signal::Xck, PortId::D, 4),
        Binding::new(TWI, Signal::Sda, PortId::C, 4),
        Binding::new(TWI, Signal::Scl, PortId::C, 5),
    ],
    status_register: SREG,
};

static REGISTRY: Registry = Registry::new();

#[derive(Clone, Copy, Debug, Default)]
pub struct Atmega328p;

unsafe impl Chip for Atmega328p {
    fn name(&self) -> &'static str {
        "ATmega328P"
    }

    fn table(&self) -> &Table {
        &TABLE
    }

    fn registry(&self) -> &'static Registry {
        &REGISTRY
    }
}
