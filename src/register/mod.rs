// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Volatile register views.
//!
//! A [`Register<T>`] *is* the hardware word. It is only ever reached through a
//! `&'static` reference overlaid on a fixed data-space address and is never constructed,
//! copied or moved by safe code. All accesses are volatile and happen in program order.
//!
//! Read-modify-write helpers (`and_assign`, `or_assign`, `xor_assign`, `modify` and the
//! field helpers) are *not* atomic with respect to interrupts. Wrap them in an
//! [`interrupt`](crate::interrupt) guard when an ISR touches the same register.

pub mod field;

pub use field::Field;

use core::cell::UnsafeCell;
use core::ops::{BitAnd, BitOr, BitXor, Not};
use core::ptr::{read_volatile, write_volatile};

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// Integer widths a register cell can have.
pub trait Width:
    private::Sealed
    + Copy
    + Eq
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    const BITS: u32;
    const ZERO: Self;

    /// Truncating conversion from the widest supported cell.
    fn from_u16(raw: u16) -> Self;
    fn into_u16(self) -> u16;
}

impl Width for u8 {
    const BITS: u32 = u8::BITS;
    const ZERO: Self = 0;

    #[inline(always)]
    fn from_u16(raw: u16) -> Self {
        raw as u8
    }

    #[inline(always)]
    fn into_u16(self) -> u16 {
        self as u16
    }
}

impl Width for u16 {
    const BITS: u32 = u16::BITS;
    const ZERO: Self = 0;

    #[inline(always)]
    fn from_u16(raw: u16) -> Self {
        raw
    }

    #[inline(always)]
    fn into_u16(self) -> u16 {
        self
    }
}

/// One memory-mapped register cell.
#[repr(transparent)]
pub struct Register<T: Width> {
    cell: UnsafeCell<T>,
}

impl<T: Width> Register<T> {
    /// Overlay a register view on `address`.
    ///
    /// # Safety
    /// `address` must be the data-space address of a `T`-wide hardware register that stays
    /// mapped for the rest of the program.
    #[inline(always)]
    pub unsafe fn at(address: usize) -> &'static Self {
        &*(address as *const Self)
    }

    /// Address this view is overlaid on.
    #[inline]
    pub fn address(&self) -> usize {
        self.cell.get() as usize
    }

    #[inline(always)]
    pub fn read(&self) -> T {
        unsafe { read_volatile(self.cell.get()) }
    }

    #[inline(always)]
    pub fn write(&self, value: T) {
        unsafe { write_volatile(self.cell.get(), value) }
    }

    #[inline(always)]
    pub fn and_assign(&self, value: T) {
        self.write(self.read() & value);
    }

    #[inline(always)]
    pub fn or_assign(&self, value: T) {
        self.write(self.read() | value);
    }

    #[inline(always)]
    pub fn xor_assign(&self, value: T) {
        self.write(self.read() ^ value);
    }

    /// Read, transform and write back the live word.
    #[inline(always)]
    pub fn modify(&self, f: impl FnOnce(T) -> T) {
        self.write(f(self.read()));
    }

    /// Value of `field`, shifted down to bit 0.
    #[inline]
    pub fn read_field(&self, field: Field) -> T {
        field.extract(self.read())
    }

    /// Replace `field` with `value`, leaving every other bit untouched.
    ///
    /// `value` is truncated to the field width.
    #[inline]
    pub fn write_field(&self, field: Field, value: T) {
        self.modify(|raw| field.insert(raw, value));
    }

    #[inline]
    pub fn set_field(&self, field: Field) {
        self.or_assign(field.mask());
    }

    #[inline]
    pub fn clear_field(&self, field: Field) {
        self.and_assign(!field.mask::<T>());
    }

    /// True if any bit of `field` is set.
    #[inline]
    pub fn is_set(&self, field: Field) -> bool {
        self.read() & field.mask() != T::ZERO
    }
}

#[cfg(test)]
impl<T: Width> Register<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self {
            cell: UnsafeCell::new(value),
        }
    }
}
