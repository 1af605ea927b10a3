// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Typed pin wrappers with drop-driven teardown.
//!
//! [`IoPin<M>`] wraps one [`Pin`] in an electrical mode `M`:
//!
//! | Alias | `initialize` | Teardown on drop |
//! | ----- | ------------ | ---------------- |
//! | [`PullUpInput`] | direction = input, then pull-up on/off | pull-up off |
//! | [`OpenDrain`] | latch = 0; High releases (input), Low sinks (output) | direction = input |
//! | [`PushPull`] | latch first, then direction = output | input, then pull-up off |
//!
//! Every teardown ends in the power-safe default: input with the pull-up disabled.
//! Moving a wrapper never runs teardown; it runs exactly once, when the final owner goes
//! out of scope or calls [`IoPin::release`].

use core::convert::Infallible;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState, StatefulOutputPin};

use super::gpio::Pin;

/// Pull-up state requested for an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PullUp {
    Disabled,
    Enabled,
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::mode::PullUp {}
    impl Sealed for super::mode::OpenDrain {}
    impl Sealed for super::mode::PushPull {}
}

/// Electrical mode markers.
pub mod mode {
    pub struct PullUp;
    pub struct OpenDrain;
    pub struct PushPull;
}

/// Implemented by the mode markers; sealed.
pub trait Mode: private::Sealed {
    /// Return `pin` to input with the pull-up disabled.
    fn teardown(pin: &mut Pin);
}

impl Mode for mode::PullUp {
    fn teardown(pin: &mut Pin) {
        // Already an input.
        pin.disable_pull_up();
    }
}

impl Mode for mode::OpenDrain {
    fn teardown(pin: &mut Pin) {
        // The latch is held at 0, so releasing the line also leaves the pull-up off.
        pin.set_direction_input();
    }
}

impl Mode for mode::PushPull {
    fn teardown(pin: &mut Pin) {
        // A high line stays weakly pulled up until the latch clears.
        pin.set_direction_input();
        pin.disable_pull_up();
    }
}

pub struct IoPin<M: Mode> {
    pin: Pin,
    mode: PhantomData<M>,
}

pub type PullUpInput = IoPin<mode::PullUp>;
pub type OpenDrain = IoPin<mode::OpenDrain>;
pub type PushPull = IoPin<mode::PushPull>;

impl<M: Mode> IoPin<M> {
    /// Take ownership of `pin`. Nothing is written until `initialize`.
    pub fn new(pin: Pin) -> Self {
        Self {
            pin,
            mode: PhantomData,
        }
    }

    /// Tear the pin down and hand the raw handle back.
    pub fn release(self) -> Pin {
        let mut this = ManuallyDrop::new(self);
        M::teardown(&mut this.pin);
        // `this` is never dropped, so the pin is moved out exactly once.
        unsafe { core::ptr::read(&this.pin) }
    }

    #[inline]
    pub fn pin(&self) -> &Pin {
        &self.pin
    }
}

impl<M: Mode> Drop for IoPin<M> {
    fn drop(&mut self) {
        M::teardown(&mut self.pin);
    }
}

impl IoPin<mode::PullUp> {
    pub fn initialize(&mut self, pull_up: PullUp) {
        self.pin.set_direction_input();
        self.set_pull_up(pull_up);
    }

    pub fn set_pull_up(&mut self, pull_up: PullUp) {
        match pull_up {
            PullUp::Enabled => self.pin.enable_pull_up(),
            PullUp::Disabled => self.pin.disable_pull_up(),
        }
    }

    #[inline]
    pub fn is_high(&self) -> bool {
        self.pin.read_level() == PinState::High
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        !self.is_high()
    }
}

impl IoPin<mode::OpenDrain> {
    pub fn initialize(&mut self, state: PinState) {
        self.pin.disable_pull_up();
        self.set_state(state);
    }

    pub fn set_state(&mut self, state: PinState) {
        match state {
            PinState::High => self.pin.set_direction_input(),
            PinState::Low => self.pin.set_direction_output(),
        }
    }

    /// Release the line; it floats high on the external pull-up.
    #[inline]
    pub fn set_high(&mut self) {
        self.set_state(PinState::High);
    }

    /// Sink the line.
    #[inline]
    pub fn set_low(&mut self) {
        self.set_state(PinState::Low);
    }

    /// Level actually present on the line.
    #[inline]
    pub fn is_high(&self) -> bool {
        self.pin.read_level() == PinState::High
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        !self.is_high()
    }
}

impl IoPin<mode::PushPull> {
    pub fn initialize(&mut self, state: PinState) {
        // Latch before direction, so the pin never drives the wrong level.
        self.pin.write_level(state);
        self.pin.set_direction_output();
    }

    #[inline]
    pub fn set_state(&mut self, state: PinState) {
        self.pin.write_level(state);
    }

    #[inline]
    pub fn set_high(&mut self) {
        self.set_state(PinState::High);
    }

    #[inline]
    pub fn set_low(&mut self) {
        self.set_state(PinState::Low);
    }

    #[inline]
    pub fn toggle(&mut self) {
        self.pin.toggle();
    }

    /// Level the latch is driving.
    #[inline]
    pub fn is_set_high(&self) -> bool {
        self.pin.is_output_set()
    }
}

impl<M: Mode> ErrorType for IoPin<M> {
    type Error = Infallible;
}

impl InputPin for IoPin<mode::PullUp> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.read_level() == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.read_level() == PinState::Low)
    }
}

impl InputPin for IoPin<mode::OpenDrain> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.read_level() == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.read_level() == PinState::Low)
    }
}

impl OutputPin for IoPin<mode::OpenDrain> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_state(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_state(PinState::High);
        Ok(())
    }
}

impl OutputPin for IoPin<mode::PushPull> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_state(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_state(PinState::High);
        Ok(())
    }
}

impl StatefulOutputPin for IoPin<mode::PushPull> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_output_set())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pin.is_output_set())
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.pin.toggle();
        Ok(())
    }
}
