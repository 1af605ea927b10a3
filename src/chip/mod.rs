// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Chip description and alternate-function resolution.
//!
//! A [`Chip`] knows the data-space address of every GPIO port, the closed set of bus
//! peripheral instances it has, and which pin each instance's signals are routed to. The
//! concrete tables live in [`atmega328p`], [`atmega2560`] and [`atmega32u4`].
//!
//! Lookups are fail-fast: an address that is not one of the chip's instances resolves to
//! [`Error::UnsupportedInstance`], never to a usable-looking port.
//!
//! ```
//! use megahal::chip::{atmega328p, Chip, Peripheral, PortId, Signal};
//!
//! let chip = atmega328p::Atmega328p;
//! let spi = Peripheral::spi(atmega328p::SPI0);
//! let sck = chip.signal_location(spi, Signal::Sck).unwrap();
//! assert_eq!((sck.port, sck.bit), (PortId::B, 5));
//! assert_eq!(chip.mask_for(spi, Signal::Sck), Ok(1 << 5));
//! assert!(chip.signal_location(Peripheral::spi(0x1234), Signal::Sck).is_err());
//! ```

pub mod atmega2560;
pub mod atmega328p;
pub mod atmega32u4;

use crate::error::Error;
use crate::hw::port::Port;
use crate::hw::spi::SpiRegisters;
use crate::hw::twi::TwiRegisters;
use crate::hw::usart::UsartRegisters;
use crate::register::Register;
use crate::resource::{PeripheralClaim, Registry};

/// GPIO port letter. There is no port I on this family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PortId {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    J,
    K,
    L,
}

impl PortId {
    /// Position in a chip's registry.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralKind {
    /// Dedicated synchronous serial peripheral.
    Spi,
    /// Universal synchronous/asynchronous receiver-transmitter.
    Usart,
    /// Two-wire serial interface.
    Twi,
}

/// One peripheral instance, identified by the address of its register block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Peripheral {
    pub kind: PeripheralKind,
    pub address: usize,
}

impl Peripheral {
    pub const fn new(kind: PeripheralKind, address: usize) -> Self {
        Self { kind, address }
    }

    pub const fn spi(address: usize) -> Self {
        Self::new(PeripheralKind::Spi, address)
    }

    pub const fn usart(address: usize) -> Self {
        Self::new(PeripheralKind::Usart, address)
    }

    pub const fn twi(address: usize) -> Self {
        Self::new(PeripheralKind::Twi, address)
    }
}

/// Bus signal names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    Sck,
    Mosi,
    Miso,
    Ss,
    Xck,
    Txd,
    Rxd,
    Scl,
    Sda,
}

impl Signal {
    /// True if peripherals of `kind` have this signal at all.
    pub const fn belongs_to(self, kind: PeripheralKind) -> bool {
        matches!(
            (kind, self),
            (
                PeripheralKind::Spi,
                Signal::Sck | Signal::Mosi | Signal::Miso | Signal::Ss
            ) | (PeripheralKind::Usart, Signal::Xck | Signal::Txd | Signal::Rxd)
                | (PeripheralKind::Twi, Signal::Scl | Signal::Sda)
        )
    }
}

/// A (port, bit) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinLocation {
    pub port: PortId,
    pub bit: u8,
}

impl PinLocation {
    pub const fn new(port: PortId, bit: u8) -> Self {
        assert!(bit < 8);
        Self { port, bit }
    }

    #[inline]
    pub const fn mask(self) -> u8 {
        1 << self.bit
    }
}

/// One row of an alternate-function table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub peripheral: Peripheral,
    pub signal: Signal,
    pub location: PinLocation,
}

impl Binding {
    pub const fn new(peripheral: Peripheral, signal: Signal, port: PortId, bit: u8) -> Self {
        Self {
            peripheral,
            signal,
            location: PinLocation::new(port, bit),
        }
    }
}

/// A chip's closed address tables.
#[derive(Clone, Copy, Debug)]
pub struct Table {
    pub ports: &'static [(PortId, usize)],
    /// Claimable instances; position in this list is the registry slot.
    pub peripherals: &'static [Peripheral],
    pub signals: &'static [Binding],
    pub status_register: usize,
}

impl Table {
    pub fn port_address(&self, port: PortId) -> Result<usize, Error> {
        self.ports
            .iter()
            .find(|(id, _)| *id == port)
            .map(|&(_, address)| address)
            .ok_or(Error::UnsupportedPort(port))
    }

    pub fn peripheral_slot(&self, peripheral: Peripheral) -> Result<usize, Error> {
        self.peripherals
            .iter()
            .position(|p| *p == peripheral)
            .ok_or(Error::UnsupportedInstance {
                kind: peripheral.kind,
                address: peripheral.address,
            })
    }

    pub fn signal_location(
        &self,
        peripheral: Peripheral,
        signal: Signal,
    ) -> Result<PinLocation, Error> {
        self.peripheral_slot(peripheral)?;

        let unsupported = Error::UnsupportedSignal {
            kind: peripheral.kind,
            signal,
        };
        if !signal.belongs_to(peripheral.kind) {
            return Err(unsupported);
        }

        self.signals
            .iter()
            .find(|b| b.peripheral == peripheral && b.signal == signal)
            .map(|b| b.location)
            .ok_or(unsupported)
    }
}

/// A concrete microcontroller.
///
/// # Safety
/// Every address the implementation hands out (ports, peripheral instances, status
/// register) must be the address of the corresponding live register block for the rest of
/// the program; the provided methods overlay `&'static` register views on them.
pub unsafe trait Chip {
    fn name(&self) -> &'static str;

    fn table(&self) -> &Table;

    fn registry(&self) -> &'static Registry;

    fn port_address(&self, port: PortId) -> Result<usize, Error> {
        self.table().port_address(port)
    }

    /// Registry slot of `peripheral`, or [`Error::UnsupportedInstance`].
    fn peripheral_slot(&self, peripheral: Peripheral) -> Result<usize, Error> {
        self.table().peripheral_slot(peripheral)
    }

    fn signal_location(
        &self,
        peripheral: Peripheral,
        signal: Signal,
    ) -> Result<PinLocation, Error> {
        self.table().signal_location(peripheral, signal)
    }

    fn port(&self, port: PortId) -> Result<&'static Port, Error> {
        let address = self.port_address(port)?;
        Ok(unsafe { Port::at(address) })
    }

    /// Port that carries `signal` of `peripheral`.
    fn port_for(&self, peripheral: Peripheral, signal: Signal) -> Result<&'static Port, Error> {
        self.port(self.signal_location(peripheral, signal)?.port)
    }

    fn bit_number_for(&self, peripheral: Peripheral, signal: Signal) -> Result<u8, Error> {
        Ok(self.signal_location(peripheral, signal)?.bit)
    }

    fn mask_for(&self, peripheral: Peripheral, signal: Signal) -> Result<u8, Error> {
        Ok(self.signal_location(peripheral, signal)?.mask())
    }

    fn status_register_address(&self) -> usize {
        self.table().status_register
    }

    /// The status register holding the global interrupt-enable flag.
    fn status_register(&self) -> &'static Register<u8> {
        unsafe { Register::at(self.status_register_address()) }
    }

    /// Register view of the SPI block at `address`, if the chip has one there.
    fn spi_block(&self, address: usize) -> Result<&'static SpiRegisters, Error> {
        self.peripheral_slot(Peripheral::spi(address))?;
        Ok(unsafe { SpiRegisters::at(address) })
    }

    fn usart_block(&self, address: usize) -> Result<&'static UsartRegisters, Error> {
        self.peripheral_slot(Peripheral::usart(address))?;
        Ok(unsafe { UsartRegisters::at(address) })
    }

    fn twi_block(&self, address: usize) -> Result<&'static TwiRegisters, Error> {
        self.peripheral_slot(Peripheral::twi(address))?;
        Ok(unsafe { TwiRegisters::at(address) })
    }

    /// Validate `peripheral` against the table and claim it.
    fn claim_peripheral(&self, peripheral: Peripheral) -> Result<PeripheralClaim, Error> {
        let slot = self.peripheral_slot(peripheral)?;
        self.registry().claim_peripheral(slot, peripheral)
    }
}
