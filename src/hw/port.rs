// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! GPIO port register triple.

use crate::register::Register;

/// PINx / DDRx / PORTx, laid out at three consecutive addresses.
///
/// `output` means "drive level" for a pin whose `direction` bit is set and "pull-up
/// enable" for a pin whose `direction` bit is clear, so a pin's mode always depends on
/// both registers together.
#[repr(C)]
pub struct Port {
    /// Input snapshot. Read-only by convention.
    pub input: Register<u8>,
    /// 1 = output, 0 = input.
    pub direction: Register<u8>,
    pub output: Register<u8>,
}

impl Port {
    /// # Safety
    /// `address` must be the PINx address of a GPIO port.
    #[inline(always)]
    pub unsafe fn at(address: usize) -> &'static Self {
        &*(address as *const Self)
    }

    #[inline]
    pub fn address(&self) -> usize {
        self.input.address()
    }
}
