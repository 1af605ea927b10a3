// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interrupt-free sections.
//!
//! [`RestoreGuard`] saves SREG, clears the global interrupt flag and restores the saved
//! word when dropped, so nested sections compose: only the outermost drop can turn
//! interrupts back on. [`EnableGuard`] does the same on entry but sets the flag
//! unconditionally on exit.
//!
//! Both guards borrow the status register for their whole lifetime and are `!Send`.

use core::marker::PhantomData;
use core::sync::atomic::{compiler_fence, Ordering};

use crate::register::Register;

/// Status register.
pub mod sreg {
    crate::fields! { u8;
        C: 1,
        Z: 1,
        N: 1,
        V: 1,
        S: 1,
        H: 1,
        T: 1,
        /// Global interrupt enable.
        I: 1,
    }
}

/// Clear I and order everything that follows after it.
#[inline(always)]
fn enter(sreg: &Register<u8>) -> u8 {
    let saved = sreg.read();
    sreg.write(saved & !sreg::I.mask::<u8>());
    compiler_fence(Ordering::SeqCst);
    saved
}

#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct RestoreGuard<'a> {
    sreg: &'a Register<u8>,
    saved: u8,
    _not_send: PhantomData<*mut ()>,
}

impl<'a> RestoreGuard<'a> {
    pub fn new(sreg: &'a Register<u8>) -> Self {
        let saved = enter(sreg);
        Self {
            sreg,
            saved,
            _not_send: PhantomData,
        }
    }

    /// True if interrupts were enabled when the guard was taken.
    #[inline]
    pub fn was_enabled(&self) -> bool {
        self.saved & sreg::I.mask::<u8>() != 0
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        self.sreg.write(self.saved);
    }
}

#[must_use = "interrupts are enabled as soon as the guard is dropped"]
pub struct EnableGuard<'a> {
    sreg: &'a Register<u8>,
    _not_send: PhantomData<*mut ()>,
}

impl<'a> EnableGuard<'a> {
    pub fn new(sreg: &'a Register<u8>) -> Self {
        enter(sreg);
        Self {
            sreg,
            _not_send: PhantomData,
        }
    }
}

impl Drop for EnableGuard<'_> {
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        self.sreg.set_field(sreg::I);
    }
}

/// Run `f` with interrupts disabled, then restore the previous state.
#[inline]
pub fn free<R>(sreg: &Register<u8>, f: impl FnOnce() -> R) -> R {
    let _guard = RestoreGuard::new(sreg);
    f()
}

/// Run `f` with interrupts disabled, then enable them.
#[inline]
pub fn free_then_enable<R>(sreg: &Register<u8>, f: impl FnOnce() -> R) -> R {
    let _guard = EnableGuard::new(sreg);
    f()
}
