// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Dedicated SPI peripheral as a bus [`Backend`].
//!
//! - `SpiRegisters` overlays SPCR / SPSR / SPDR.
//! - `SpiBackend` owns the block and its four signal pins, master mode only.

use core::hint::spin_loop;

use embedded_hal::digital::PinState;
use embedded_hal::spi::{Phase, Polarity};

use super::gpio::Pin;
use super::pins::{PullUp, PullUpInput, PushPull};
use crate::bus::{Backend, BitOrder, Config};
use crate::chip::{Chip, Peripheral, Signal};
use crate::error::Error;
use crate::register::Register;
use crate::resource::PeripheralClaim;

/// SPI control register.
pub mod spcr {
    crate::fields! { u8;
        /// Clock rate select, together with `spsr::SPI2X`.
        SPR: 2,
        CPHA: 1,
        CPOL: 1,
        MSTR: 1,
        /// 1 = LSB first.
        DORD: 1,
        SPE: 1,
        SPIE: 1,
    }
}

/// SPI status register.
pub mod spsr {
    crate::fields! { u8;
        SPI2X: 1,
        _: 5,
        WCOL: 1,
        /// Transfer complete. Cleared by reading SPSR then accessing SPDR.
        SPIF: 1,
    }
}

#[repr(C)]
pub struct SpiRegisters {
    pub spcr: Register<u8>,
    pub spsr: Register<u8>,
    pub spdr: Register<u8>,
}

impl SpiRegisters {
    /// # Safety
    /// `address` must be the SPCR address of an SPI block.
    #[inline(always)]
    pub unsafe fn at(address: usize) -> &'static Self {
        &*(address as *const Self)
    }
}

/// SCK prescaler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDivider {
    Div2,
    Div4,
    Div8,
    Div16,
    Div32,
    Div64,
    Div128,
}

impl ClockDivider {
    const ASCENDING: [Self; 7] = [
        Self::Div2,
        Self::Div4,
        Self::Div8,
        Self::Div16,
        Self::Div32,
        Self::Div64,
        Self::Div128,
    ];

    /// Smallest divider whose resulting clock does not exceed `sck_hz`, or `Div128` when
    /// none does.
    pub const fn for_rate(cpu_hz: u32, sck_hz: u32) -> Self {
        let mut i = 0;
        while i < Self::ASCENDING.len() {
            let divider = Self::ASCENDING[i];
            if cpu_hz / divider.divisor() <= sck_hz {
                return divider;
            }
            i += 1;
        }
        Self::Div128
    }

    pub const fn divisor(self) -> u32 {
        match self {
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div32 => 32,
            Self::Div64 => 64,
            Self::Div128 => 128,
        }
    }

    /// (SPR1:0, SPI2X). The doubled rates reuse the next slower SPR code.
    const fn encoding(self) -> (u8, bool) {
        match self {
            Self::Div2 => (0, true),
            Self::Div4 => (0, false),
            Self::Div8 => (1, true),
            Self::Div16 => (1, false),
            Self::Div32 => (2, true),
            Self::Div64 => (2, false),
            Self::Div128 => (3, false),
        }
    }
}

/// Bits of SPCR owned by the configuration.
const SPCR_CONFIG: u8 = (spcr::SPR.bits()
    | spcr::CPHA.bits()
    | spcr::CPOL.bits()
    | spcr::MSTR.bits()
    | spcr::DORD.bits()) as u8;

/// Precomputed SPCR / SPSR values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiSettings {
    pub spcr: u8,
    pub spsr: u8,
}

impl SpiSettings {
    pub const fn new(config: &Config) -> Self {
        let divider = ClockDivider::for_rate(config.cpu_hz, config.sck_hz);
        let (spr, double) = divider.encoding();

        let mut control = spcr::MSTR.bits() | spcr::SPR.value(spr as u16);
        if let Polarity::IdleHigh = config.mode.polarity {
            control |= spcr::CPOL.bits();
        }
        if let Phase::CaptureOnSecondTransition = config.mode.phase {
            control |= spcr::CPHA.bits();
        }
        if let BitOrder::LsbFirst = config.bit_order {
            control |= spcr::DORD.bits();
        }

        let status = if double { spsr::SPI2X.bits() } else { 0 };
        Self {
            spcr: control as u8,
            spsr: status as u8,
        }
    }

    pub const fn divider(&self) -> ClockDivider {
        let spr = spcr::SPR.offset();
        let double = self.spsr & spsr::SPI2X.bits() as u8 != 0;
        match ((self.spcr >> spr) & 0b11, double) {
            (0, true) => ClockDivider::Div2,
            (0, false) => ClockDivider::Div4,
            (1, true) => ClockDivider::Div8,
            (1, false) => ClockDivider::Div16,
            (2, true) => ClockDivider::Div32,
            (2, false) => ClockDivider::Div64,
            _ => ClockDivider::Div128,
        }
    }
}

/// Master-mode SPI block with its SCK, MOSI, MISO and SS pins.
pub struct SpiBackend {
    regs: &'static SpiRegisters,
    sck: PushPull,
    mosi: PushPull,
    miso: PullUpInput,
    ss: PushPull,
    claim: PeripheralClaim,
}

impl SpiBackend {
    /// Claim the SPI block at `address` and its signal pins. Nothing is written to the
    /// hardware until `initialize_pins` / `enable`.
    pub fn new<C: Chip + ?Sized>(chip: &C, address: usize) -> Result<Self, Error> {
        let peripheral = Peripheral::spi(address);
        let claim = chip.claim_peripheral(peripheral)?;
        // Raw pins first: a wrapper tears its pin down on drop, so none may exist until
        // every claim has succeeded.
        let sck = Pin::for_signal(chip, peripheral, Signal::Sck)?;
        let mosi = Pin::for_signal(chip, peripheral, Signal::Mosi)?;
        let miso = Pin::for_signal(chip, peripheral, Signal::Miso)?;
        let ss = Pin::for_signal(chip, peripheral, Signal::Ss)?;

        Ok(Self {
            regs: unsafe { SpiRegisters::at(address) },
            sck: PushPull::new(sck),
            mosi: PushPull::new(mosi),
            miso: PullUpInput::new(miso),
            ss: PushPull::new(ss),
            claim,
        })
    }

    pub fn registers(&self) -> &'static SpiRegisters {
        self.regs
    }

    pub fn peripheral(&self) -> Peripheral {
        self.claim.peripheral()
    }

    /// The hardware SS line. It must stay an output for the block to remain master, but
    /// it is free to serve as the chip select of one device.
    pub fn ss(&mut self) -> &mut PushPull {
        &mut self.ss
    }
}

impl Backend for SpiBackend {
    type Settings = SpiSettings;

    fn settings(config: &Config) -> SpiSettings {
        SpiSettings::new(config)
    }

    fn apply(&mut self, settings: &SpiSettings) {
        self.regs
            .spcr
            .modify(|v| (v & !SPCR_CONFIG) | (settings.spcr & SPCR_CONFIG));
        self.regs
            .spsr
            .write_field(spsr::SPI2X, settings.spsr & spsr::SPI2X.bits() as u8);
        trace!("spi settings {=u8:#x} {=u8:#x}", settings.spcr, settings.spsr);
    }

    fn initialize_pins(&mut self) {
        // SS high before anything else: an SS input pulled low drops the block out of
        // master mode.
        self.ss.initialize(PinState::High);
        self.sck.initialize(PinState::Low);
        self.mosi.initialize(PinState::Low);
        self.miso.initialize(PullUp::Enabled);
    }

    fn enable(&mut self) {
        self.regs.spcr.set_field(spcr::SPE);
        debug!("spi enabled at {=usize:#x}", self.regs.spcr.address());
    }

    fn disable(&mut self) {
        self.regs.spcr.clear_field(spcr::SPE);
    }

    fn is_enabled(&self) -> bool {
        self.regs.spcr.is_set(spcr::SPE)
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        self.regs.spdr.write(byte);
        while !self.regs.spsr.is_set(spsr::SPIF) {
            spin_loop();
        }
        self.regs.spdr.read()
    }
}

impl Drop for SpiBackend {
    fn drop(&mut self) {
        // Fields drop after this, so the pins are torn down with the block already off.
        self.disable();
        debug!("spi released at {=usize:#x}", self.regs.spcr.address());
    }
}
