// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART abstraction layer.
//!
//! The same register block serves two roles:
//!
//! - [`UsartSpiBackend`]: master SPI (MSPIM) mode, usable behind the bus controllers.
//! - [`Transmitter`]: asynchronous transmit-only serial, for printing to an attached debug
//!   terminal.
//!
//! Note: When using `writeln!`, be sure to include `\r` (CR) in the format string to ensure
//! correct line endings on the terminal.

use core::convert::Infallible;
use core::fmt;
use core::hint::spin_loop;

use embedded_hal::digital::PinState;
use embedded_hal::spi::{Phase, Polarity};
use nb::block;

use super::gpio::Pin;
use super::pins::{PullUp, PullUpInput, PushPull};
use crate::bus::{Backend, BitOrder, Config};
use crate::chip::{Chip, Peripheral, Signal};
use crate::error::Error;
use crate::register::Register;
use crate::resource::PeripheralClaim;

/// Control and status register A.
pub mod ucsra {
    crate::fields! { u8;
        MPCM: 1,
        /// Double transmission speed (asynchronous mode only).
        U2X: 1,
        UPE: 1,
        DOR: 1,
        FE: 1,
        /// Transmit buffer empty.
        UDRE: 1,
        /// Transmit complete. Cleared by writing a one.
        TXC: 1,
        /// Receive complete.
        RXC: 1,
    }
}

/// Control and status register B.
pub mod ucsrb {
    crate::fields! { u8;
        TXB8: 1,
        RXB8: 1,
        UCSZ2: 1,
        TXEN: 1,
        RXEN: 1,
        UDRIE: 1,
        TXCIE: 1,
        RXCIE: 1,
    }
}

/// Control and status register C, asynchronous view.
pub mod ucsrc {
    crate::fields! { u8;
        UCPOL: 1,
        /// Character size bits 1:0; bit 2 lives in `ucsrb::UCSZ2`.
        UCSZ: 2,
        USBS: 1,
        UPM: 2,
        UMSEL: 2,
    }
}

/// Control and status register C, master SPI view.
pub mod ucsrc_mspim {
    crate::fields! { u8;
        UCPOL: 1,
        UCPHA: 1,
        /// 1 = LSB first.
        UDORD: 1,
        _: 3,
        UMSEL: 2,
    }
}

/// `UMSEL` codes.
pub mod umsel {
    pub const ASYNCHRONOUS: u8 = 0b00;
    pub const SYNCHRONOUS: u8 = 0b01;
    pub const MASTER_SPI: u8 = 0b11;
}

/// UBRR is 12 bits wide.
pub const UBRR_MAX: u16 = 0x0FFF;

#[repr(C)]
pub struct UsartRegisters {
    pub ucsra: Register<u8>,
    pub ucsrb: Register<u8>,
    pub ucsrc: Register<u8>,
    _reserved: Register<u8>,
    pub ubrrl: Register<u8>,
    pub ubrrh: Register<u8>,
    pub udr: Register<u8>,
}

impl UsartRegisters {
    /// # Safety
    /// `address` must be the UCSRnA address of a USART block.
    #[inline(always)]
    pub unsafe fn at(address: usize) -> &'static Self {
        &*(address as *const Self)
    }

    /// Write the baud divisor, high byte first; the low-byte write latches it.
    pub fn write_ubrr(&self, ubrr: u16) {
        let ubrr = ubrr.min(UBRR_MAX);
        self.ubrrh.write((ubrr >> 8) as u8);
        self.ubrrl.write(ubrr as u8);
    }

    pub fn read_ubrr(&self) -> u16 {
        let low = self.ubrrl.read() as u16;
        ((self.ubrrh.read() as u16 & 0x0F) << 8) | low
    }
}

/// `ceil(cpu_hz / (2 * sck_hz)) - 1`, clamped to the register range.
pub const fn mspim_ubrr(cpu_hz: u32, sck_hz: u32) -> u16 {
    if sck_hz == 0 {
        return UBRR_MAX;
    }
    let twice = 2 * sck_hz as u64;
    let ratio = (cpu_hz as u64).div_ceil(twice);
    let ubrr = ratio.saturating_sub(1);
    if ubrr > UBRR_MAX as u64 {
        UBRR_MAX
    } else {
        ubrr as u16
    }
}

// ============================================================================
// Master SPI mode
// ============================================================================

/// Precomputed UCSRnC / UBRRn values for MSPIM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MspimSettings {
    pub ucsrc: u8,
    pub ubrr: u16,
}

impl MspimSettings {
    pub const fn new(config: &Config) -> Self {
        let mut control = ucsrc_mspim::UMSEL.value(umsel::MASTER_SPI as u16);
        if let Polarity::IdleHigh = config.mode.polarity {
            control |= ucsrc_mspim::UCPOL.bits();
        }
        if let Phase::CaptureOnSecondTransition = config.mode.phase {
            control |= ucsrc_mspim::UCPHA.bits();
        }
        if let BitOrder::LsbFirst = config.bit_order {
            control |= ucsrc_mspim::UDORD.bits();
        }
        Self {
            ucsrc: control as u8,
            ubrr: mspim_ubrr(config.cpu_hz, config.sck_hz),
        }
    }

    /// Bus clock this divisor produces.
    pub const fn sck_hz(&self, cpu_hz: u32) -> u32 {
        cpu_hz / (2 * (self.ubrr as u32 + 1))
    }
}

/// USART in master SPI mode with its XCK, TXD and RXD pins.
pub struct UsartSpiBackend {
    regs: &'static UsartRegisters,
    xck: PushPull,
    txd: PushPull,
    rxd: PullUpInput,
    claim: PeripheralClaim,
}

impl UsartSpiBackend {
    /// Claim the USART block at `address` and its signal pins without touching the
    /// hardware.
    pub fn new<C: Chip + ?Sized>(chip: &C, address: usize) -> Result<Self, Error> {
        let peripheral = Peripheral::usart(address);
        let claim = chip.claim_peripheral(peripheral)?;
        let xck = Pin::for_signal(chip, peripheral, Signal::Xck)?;
        let txd = Pin::for_signal(chip, peripheral, Signal::Txd)?;
        let rxd = Pin::for_signal(chip, peripheral, Signal::Rxd)?;

        Ok(Self {
            regs: unsafe { UsartRegisters::at(address) },
            xck: PushPull::new(xck),
            txd: PushPull::new(txd),
            rxd: PullUpInput::new(rxd),
            claim,
        })
    }

    pub fn registers(&self) -> &'static UsartRegisters {
        self.regs
    }

    pub fn peripheral(&self) -> Peripheral {
        self.claim.peripheral()
    }
}

const ENABLE_BITS: u8 = (ucsrb::RXEN.bits() | ucsrb::TXEN.bits()) as u8;

/// UCSRnA error flags. Every write to UCSRnA must leave them zero.
const ERROR_FLAGS: u8 = (ucsra::FE.bits() | ucsra::DOR.bits() | ucsra::UPE.bits()) as u8;
const U2X: u8 = ucsra::U2X.bits() as u8;
const TXC: u8 = ucsra::TXC.bits() as u8;

impl Backend for UsartSpiBackend {
    type Settings = MspimSettings;

    fn settings(config: &Config) -> MspimSettings {
        MspimSettings::new(config)
    }

    fn apply(&mut self, settings: &MspimSettings) {
        self.regs.ucsrc.write(settings.ucsrc);
        self.regs.write_ubrr(settings.ubrr);
        trace!("mspim settings {=u8:#x} {=u16}", settings.ucsrc, settings.ubrr);
    }

    fn initialize_pins(&mut self) {
        // XCK must be an output before MSPIM is selected, or the block comes up as slave.
        self.xck.initialize(PinState::Low);
        self.txd.initialize(PinState::High);
        self.rxd.initialize(PullUp::Enabled);
    }

    fn enable(&mut self) {
        // The divisor has to be zero while the transmitter is switched on.
        let ubrr = self.regs.read_ubrr();
        self.regs.write_ubrr(0);
        self.regs
            .ucsrc
            .write_field(ucsrc_mspim::UMSEL, umsel::MASTER_SPI);
        self.regs.ucsrb.or_assign(ENABLE_BITS);
        self.regs.write_ubrr(ubrr);
        debug!("mspim enabled at {=usize:#x}", self.regs.ucsra.address());
    }

    fn disable(&mut self) {
        self.regs.ucsrb.and_assign(!ENABLE_BITS);
    }

    fn is_enabled(&self) -> bool {
        self.regs.ucsrb.read() & ENABLE_BITS == ENABLE_BITS
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        self.regs.udr.write(byte);
        while !self.regs.ucsra.is_set(ucsra::RXC) {
            spin_loop();
        }
        self.regs.udr.read()
    }
}

impl Drop for UsartSpiBackend {
    fn drop(&mut self) {
        self.disable();
        debug!("mspim released at {=usize:#x}", self.regs.ucsra.address());
    }
}

// ============================================================================
// Asynchronous transmitter
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    pub cpu_hz: u32,
    pub baud: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl SerialConfig {
    /// 8N1 at `baud`.
    pub const fn new(cpu_hz: u32, baud: u32) -> Self {
        Self {
            cpu_hz,
            baud,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    pub const fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub const fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub const fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }
}

impl Default for SerialConfig {
    /// 16 MHz core, 115200 8N1.
    fn default() -> Self {
        Self::new(16_000_000, 115_200)
    }
}

/// Register values for one [`SerialConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialSettings {
    pub double_speed: bool,
    pub ucsrc: u8,
    pub ubrr: u16,
}

/// `round(cpu_hz / (samples * baud)) - 1`, clamped.
const fn async_ubrr(cpu_hz: u32, baud: u32, samples: u32) -> u16 {
    if baud == 0 {
        return UBRR_MAX;
    }
    let per_bit = samples as u64 * baud as u64;
    let ratio = (cpu_hz as u64 + per_bit / 2) / per_bit;
    let ubrr = ratio.saturating_sub(1);
    if ubrr > UBRR_MAX as u64 {
        UBRR_MAX
    } else {
        ubrr as u16
    }
}

const fn baud_error(cpu_hz: u32, baud: u32, samples: u32, ubrr: u16) -> u64 {
    let actual = cpu_hz as u64 / (samples as u64 * (ubrr as u64 + 1));
    actual.abs_diff(baud as u64)
}

impl SerialSettings {
    /// Picks U2X whenever it is at least as accurate as normal speed.
    pub const fn new(config: &SerialConfig) -> Self {
        let normal = async_ubrr(config.cpu_hz, config.baud, 16);
        let double = async_ubrr(config.cpu_hz, config.baud, 8);
        let double_speed = baud_error(config.cpu_hz, config.baud, 8, double)
            <= baud_error(config.cpu_hz, config.baud, 16, normal);

        let size = match config.data_bits {
            DataBits::Five => 0b00,
            DataBits::Six => 0b01,
            DataBits::Seven => 0b10,
            DataBits::Eight => 0b11,
        };
        let parity = match config.parity {
            Parity::None => 0b00,
            Parity::Even => 0b10,
            Parity::Odd => 0b11,
        };
        let mut control = ucsrc::UMSEL.value(umsel::ASYNCHRONOUS as u16)
            | ucsrc::UCSZ.value(size)
            | ucsrc::UPM.value(parity);
        if let StopBits::Two = config.stop_bits {
            control |= ucsrc::USBS.bits();
        }

        Self {
            double_speed,
            ucsrc: control as u8,
            ubrr: if double_speed { double } else { normal },
        }
    }

    /// Baud rate this divisor produces.
    pub const fn baud(&self, cpu_hz: u32) -> u32 {
        let samples = if self.double_speed { 8 } else { 16 };
        cpu_hz / (samples * (self.ubrr as u32 + 1))
    }
}

/// Transmit-only asynchronous serial port.
pub struct Transmitter {
    regs: &'static UsartRegisters,
    txd: PushPull,
    claim: PeripheralClaim,
    pending: bool,
}

impl Transmitter {
    /// Claim the USART block at `address` and its TXD pin, and program the frame format.
    /// RXD stays unclaimed.
    pub fn new<C: Chip + ?Sized>(
        chip: &C,
        address: usize,
        config: &SerialConfig,
    ) -> Result<Self, Error> {
        let peripheral = Peripheral::usart(address);
        let claim = chip.claim_peripheral(peripheral)?;
        let txd = PushPull::new(Pin::for_signal(chip, peripheral, Signal::Txd)?);

        let regs = unsafe { UsartRegisters::at(address) };
        let settings = SerialSettings::new(config);
        regs.ucsrb.and_assign(!ENABLE_BITS);
        let double = if settings.double_speed { U2X } else { 0 };
        regs.ucsra.modify(|v| (v & !(ERROR_FLAGS | U2X)) | double);
        regs.ucsrc.write(settings.ucsrc);
        regs.write_ubrr(settings.ubrr);

        Ok(Self {
            regs,
            txd,
            claim,
            pending: false,
        })
    }

    /// Drive TXD idle high and switch the transmitter on.
    pub fn initialize(&mut self) {
        self.txd.initialize(PinState::High);
        self.regs.ucsrb.set_field(ucsrb::TXEN);
        debug!("serial tx enabled at {=usize:#x}", self.claim.peripheral().address);
    }

    pub fn registers(&self) -> &'static UsartRegisters {
        self.regs
    }

    /// Queue one byte if the transmit buffer has room.
    pub fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if !self.regs.ucsra.is_set(ucsra::UDRE) {
            return Err(nb::Error::WouldBlock);
        }
        // Writing TXC as one clears it, so it reports this byte.
        self.regs.ucsra.modify(|v| (v & !ERROR_FLAGS) | TXC);
        self.regs.udr.write(byte);
        self.pending = true;
        Ok(())
    }

    /// Done once the last queued byte has left the shift register.
    pub fn flush(&mut self) -> nb::Result<(), Infallible> {
        if self.pending && !self.regs.ucsra.is_set(ucsra::TXC) {
            return Err(nb::Error::WouldBlock);
        }
        self.pending = false;
        Ok(())
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.write(b));
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }

    /// Write string and CRLF terminator.
    #[inline]
    pub fn println(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }

    /// Block until the last byte is on the wire.
    #[inline]
    pub fn flush_blocking(&mut self) {
        let _ = block!(self.flush());
    }
}

// Implement `core::fmt::Write` so we can use `write!` / `writeln!` on `Transmitter`.
impl fmt::Write for Transmitter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Transmitter::write_str(self, s);
        Ok(())
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        // TXC never sets with the transmitter off.
        if self.regs.ucsrb.is_set(ucsrb::TXEN) {
            self.flush_blocking();
        }
        self.regs.ucsrb.clear_field(ucsrb::TXEN);
    }
}
