// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Raw pin handle.
//!
//! A [`Pin`] is the ownership token for one (port, bit) pair. It is movable but not
//! copyable, and there is no empty state: once a `Pin` has been moved, the compiler
//! rejects any further use of the old binding. Code that may or may not hold a pin uses
//! `Option<Pin>`.
//!
//! A `Pin` performs no hardware action on its own lifecycle; configuring and
//! deconfiguring the electrical mode is the job of the typed wrappers in
//! [`pins`](super::pins).

use embedded_hal::digital::PinState;

use super::port::Port;
use crate::chip::{Chip, Peripheral, PortId, Signal};
use crate::error::Error;
use crate::resource::PinClaim;

pub struct Pin {
    port: &'static Port,
    mask: u8,
    claim: Option<PinClaim>,
}

impl Pin {
    /// Build a handle from a port and a single-bit mask without consulting any registry.
    ///
    /// # Panics
    /// If `mask` does not select exactly one bit.
    ///
    /// # Safety
    /// No other live handle may address the same (port, bit) pair for as long as this one
    /// exists.
    pub unsafe fn new(port: &'static Port, mask: u8) -> Self {
        assert!(mask.is_power_of_two(), "pin mask must select exactly one bit");
        Self {
            port,
            mask,
            claim: None,
        }
    }

    /// Claim bit `bit` of `port` through the chip's registry.
    pub fn claim<C: Chip + ?Sized>(chip: &C, port: PortId, bit: u8) -> Result<Self, Error> {
        if bit >= 8 {
            return Err(Error::InvalidBit(bit));
        }
        let registers = chip.port(port)?;
        let mask = 1 << bit;
        let claim = chip.registry().claim_pin(port, mask)?;
        Ok(Self {
            port: registers,
            mask,
            claim: Some(claim),
        })
    }

    /// Claim the pin `signal` of `peripheral` is routed to.
    pub fn for_signal<C: Chip + ?Sized>(
        chip: &C,
        peripheral: Peripheral,
        signal: Signal,
    ) -> Result<Self, Error> {
        let location = chip.signal_location(peripheral, signal)?;
        Self::claim(chip, location.port, location.bit)
    }

    #[inline]
    pub fn port(&self) -> &'static Port {
        self.port
    }

    #[inline]
    pub fn mask(&self) -> u8 {
        self.mask
    }

    #[inline]
    pub fn bit(&self) -> u8 {
        self.mask.trailing_zeros() as u8
    }

    /// True if the pin was obtained through a registry claim.
    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.claim.is_some()
    }

    #[inline]
    pub fn set_direction_input(&mut self) {
        self.port.direction.and_assign(!self.mask);
    }

    #[inline]
    pub fn set_direction_output(&mut self) {
        self.port.direction.or_assign(self.mask);
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        self.port.direction.read() & self.mask != 0
    }

    /// Level seen on the input stage.
    #[inline]
    pub fn read_level(&self) -> PinState {
        PinState::from(self.port.input.read() & self.mask != 0)
    }

    /// Set the output latch. On an input pin this switches the pull-up instead.
    #[inline]
    pub fn write_level(&mut self, level: PinState) {
        match level {
            PinState::High => self.port.output.or_assign(self.mask),
            PinState::Low => self.port.output.and_assign(!self.mask),
        }
    }

    /// True if the output latch bit is set.
    #[inline]
    pub fn is_output_set(&self) -> bool {
        self.port.output.read() & self.mask != 0
    }

    #[inline]
    pub fn toggle(&mut self) {
        self.port.output.xor_assign(self.mask);
    }

    #[inline]
    pub fn enable_pull_up(&mut self) {
        self.write_level(PinState::High);
    }

    #[inline]
    pub fn disable_pull_up(&mut self) {
        self.write_level(PinState::Low);
    }
}

impl core::fmt::Debug for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pin")
            .field("port", &format_args!("{:#06x}", self.port.address()))
            .field("bit", &self.bit())
            .finish()
    }
}
