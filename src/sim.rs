// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host-side chip with its registers in leaked heap memory.
//!
//! Pin routing matches the ATmega328P. Every `SimChip` gets fresh zeroed blocks and its own
//! registry, so tests running in parallel never share state.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::vec::Vec;

use crate::chip::{Binding, Chip, Peripheral, PortId, Signal, Table};
use crate::hw::port::Port;
use crate::hw::twi::{twcr, TwiRegisters};
use crate::register::Register;
use crate::resource::Registry;

pub(crate) struct SimChip {
    pub portb: &'static Port,
    pub portc: &'static Port,
    pub portd: &'static Port,
    pub spi_block: usize,
    pub usart_block: usize,
    pub twi_block: usize,
    pub sreg: &'static Register<u8>,
    table: &'static Table,
    registry: &'static Registry,
}

/// Address of `len` zeroed bytes that live for the rest of the test binary.
fn leak_zeroed(len: usize) -> usize {
    Box::leak(vec![0u8; len].into_boxed_slice()).as_mut_ptr() as usize
}

fn leak_slice<T>(items: Vec<T>) -> &'static [T] {
    Box::leak(items.into_boxed_slice())
}

impl SimChip {
    pub fn new() -> Self {
        let (b, c, d) = (leak_zeroed(3), leak_zeroed(3), leak_zeroed(3));
        let spi_block = leak_zeroed(3);
        let usart_block = leak_zeroed(7);
        let twi_block = leak_zeroed(6);
        let sreg = leak_zeroed(1);

        let spi = Peripheral::spi(spi_block);
        let usart = Peripheral::usart(usart_block);
        let twi = Peripheral::twi(twi_block);

        let table = Box::leak(Box::new(Table {
            ports: leak_slice(vec![(PortId::B, b), (PortId::C, c), (PortId::D, d)]),
            peripherals: leak_slice(vec![spi, usart, twi]),
            signals: leak_slice(vec![
                Binding::new(spi, Signal::Ss, PortId::B, 2),
                Binding::new(spi, Signal::Mosi, PortId::B, 3),
                Binding::new(spi, Signal::Miso, PortId::B, 4),
                Binding::new(spi, Signal::Sck, PortId::B, 5),
                Binding::new(usart, Signal::Rxd, PortId::D, 0),
                Binding::new(usart, Signal::Txd, PortId::D, 1),
                Binding::new(usart, Signal::Xck, PortId::D, 4),
                Binding::new(twi, Signal::Sda, PortId::C, 4),
                Binding::new(twi, Signal::Scl, PortId::C, 5),
            ]),
            status_register: sreg,
        }));

        unsafe {
            Self {
                portb: Port::at(b),
                portc: Port::at(c),
                portd: Port::at(d),
                spi_block,
                usart_block,
                twi_block,
                sreg: Register::at(sreg),
                table,
                registry: Box::leak(Box::new(Registry::new())),
            }
        }
    }

    pub fn spi(&self) -> Peripheral {
        Peripheral::spi(self.spi_block)
    }

    pub fn usart(&self) -> Peripheral {
        Peripheral::usart(self.usart_block)
    }

    pub fn twi(&self) -> Peripheral {
        Peripheral::twi(self.twi_block)
    }
}

unsafe impl Chip for SimChip {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn table(&self) -> &Table {
        self.table
    }

    fn registry(&self) -> &'static Registry {
        self.registry
    }
}

/// Refresh the input register of `port`: driven pins read their latch, undriven pins read
/// high as if every line had an external pull-up.
pub(crate) fn settle(port: &Port) {
    let driven = port.direction.read();
    port.input.write((port.output.read() & driven) | !driven);
}

/// One scripted TWI bus step: the status the hardware reports, and the byte it leaves in
/// TWDR when the step receives one.
#[derive(Clone, Copy)]
pub(crate) struct Reply {
    pub status: u8,
    pub data: Option<u8>,
}

impl Reply {
    pub const fn status(status: u8) -> Self {
        Self { status, data: None }
    }

    pub const fn data(status: u8, byte: u8) -> Self {
        Self {
            status,
            data: Some(byte),
        }
    }
}

#[derive(Default)]
struct TwiScript {
    replies: VecDeque<Reply>,
    controls: Vec<u8>,
}

std::thread_local! {
    static TWI_SCRIPT: RefCell<TwiScript> = RefCell::new(TwiScript::default());
}

/// Queue the replies for the next TWI steps on this thread and clear the control log.
/// With nothing queued a step reports whatever TWSR already holds.
pub(crate) fn script_twi(replies: &[Reply]) {
    TWI_SCRIPT.with(|script| {
        let mut script = script.borrow_mut();
        script.replies = replies.iter().copied().collect();
        script.controls.clear();
    });
}

/// Every TWCR value written since [`script_twi`], and the replies left unused.
pub(crate) fn twi_log() -> (Vec<u8>, usize) {
    TWI_SCRIPT.with(|script| {
        let script = script.borrow();
        (script.controls.clone(), script.replies.len())
    })
}

/// Called after TWCR is written with a step that waits for TWINT. TWINT stays set in
/// memory, so the wait ends at once with the scripted status.
pub(crate) fn twi_step(regs: &TwiRegisters) {
    TWI_SCRIPT.with(|script| {
        let mut script = script.borrow_mut();
        script.controls.push(regs.twcr.read());
        if let Some(reply) = script.replies.pop_front() {
            regs.twsr.write((regs.twsr.read() & 0b11) | reply.status);
            if let Some(byte) = reply.data {
                regs.twdr.write(byte);
            }
        }
    });
}

/// Called after TWCR is written with a STOP or a release. A STOP completes at once.
pub(crate) fn twi_control(regs: &TwiRegisters) {
    TWI_SCRIPT.with(|script| script.borrow_mut().controls.push(regs.twcr.read()));
    regs.twcr.clear_field(twcr::TWSTO);
}
