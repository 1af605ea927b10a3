// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ATmega2560 address and pin tables.
//!
//! Ports H..L sit in extended I/O space and are only reachable with data-space accesses,
//! which is all this crate ever issues.

use super::{Binding, Chip, Peripheral, PortId, Signal, Table};
use crate::resource::Registry;

pub const PORTA: usize = 0x20;
pub const PORTB: usize = 0x23;
pub const PORTC: usize = 0x26;
pub const PORTD: usize = 0x29;
pub const PORTE: usize = 0x2C;
pub const PORTF: usize = 0x2F;
pub const PORTG: usize = 0x32;
pub const PORTH: usize = 0x100;
pub const PORTJ: usize = 0x103;
pub const PORTK: usize = 0x106;
pub const PORTL: usize = 0x109;

pub const SPI0: usize = 0x4C;
pub const USART0: usize = 0xC0;
pub const USART1: usize = 0xC8;
pub const USART2: usize = 0xD0;
pub const USART3: usize = 0x130;
pub const TWI0: usize = 0xB8;

pub const SREG: usize = 0x5F;

const SPI: Peripheral = Peripheral::spi(SPI0);
const U0: Peripheral = Peripheral::usart(USART0);
const U1: Peripheral = Peripheral::usart(USART1);
const U2: Peripheral = Peripheral::usart(USART2);
const U3: Peripheral = Peripheral::usart(USART3);
const TWI: Peripheral = Peripheral::twi(TWI0);

pub const TABLE: Table = Table {
    ports: &[
        (PortId::A, PORTA),
        (PortId::B, PORTB),
        (PortId::C, PORTC),
        (PortId::D, PORTD),
        (PortId::E, PORTE),
        (PortId::F, PORTF),
        (PortId::G, PORTG),
        (PortId::H, PORTH),
        (PortId::J, PORTJ),
        (PortId::K, PORTK),
        (PortId::L, PORTL),
    ],
    peripherals: &[SPI, U0, U1, U2, U3, TWI],
    signals: &[
        Binding::new(SPI, Signal::Ss, PortId::B, 0),
        Binding::new(SPI, Signal::Sck, PortId::B, 1),
        Binding::new(SPI, Signal::Mosi, PortId::B, 2),
        Binding::new(SPI, Signal::Miso, PortId::B, 3),
        Binding::new(U0, Signal::Rxd, PortId::E, 0),
        Binding::new(U0, Signal::Txd, PortId::E, 1),
        Binding::new(U0, Signal::Xck, PortId::E, 2),
        Binding::new(U1, Signal::Rxd, PortId::D, 2),
        Binding::new(U1, Signal::Txd, PortId::D, 3),
        Binding::new(U1, Signal::Xck, PortId::D, 5),
        Binding::new(U2, Signal::Rxd, PortId::H, 0),
        Binding::new(U2, Signal::Txd, PortId::H, 1),
        Binding::new(U2, Signal::Xck, PortId::H, 2),
        Binding::new(U3, Signal::Rxd, PortId::J, 0),
        Binding::new(U3, Signal::Txd, PortId::J, 1),
        Binding::new(U3, Signal::Xck, PortId::J, 2),
        Binding::new(TWI, Signal::Scl, PortId::D, 0),
        Binding::new(TWI, Signal::Sda, PortId::D, 1),
    ],
    status_register: SREG,
};

static REGISTRY: Registry = Registry::new();

#[derive(Clone, Copy, Debug, Default)]
pub struct Atmega2560;

unsafe impl Chip for Atmega2560 {
    fn name(&self) -> &'static str {
        "ATmega2560"
    }

    fn table(&self) -> &Table {
        &TABLE
    }

    fn registry(&self) -> &'static Registry {
        &REGISTRY
    }
}
