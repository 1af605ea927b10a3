// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Bit-field descriptors.
//!
//! A [`Field`] carries no state, only the `(width, offset)` of a sub-range of a register.
//! Register layouts are written with [`fields!`](crate::fields), which places each field at
//! a running bit cursor in declaration order:
//!
//! ```
//! pub mod spsr {
//!     megahal::fields! { u8;
//!         SPI2X: 1,
//!         _: 5,
//!         WCOL: 1,
//!         SPIF: 1,
//!     }
//! }
//!
//! assert_eq!(spsr::WCOL.offset(), 6);
//! assert_eq!(spsr::SPIF.bits(), 0x80);
//! assert_eq!(spsr::LAYOUT.len(), 4);
//! ```
//!
//! Declaration order must follow the datasheet exactly. A swapped pair still compiles and
//! silently misconfigures the peripheral.

use super::Width;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    width: u8,
    offset: u8,
}

impl Field {
    pub const fn new(width: u8, offset: u8) -> Self {
        assert!(width > 0 && width as u32 + offset as u32 <= u16::BITS);
        Self { width, offset }
    }

    #[inline]
    pub const fn width(self) -> u8 {
        self.width
    }

    /// Position of the field's low bit.
    #[inline]
    pub const fn offset(self) -> u8 {
        self.offset
    }

    /// First bit past the field.
    #[inline]
    pub const fn end(self) -> u8 {
        self.offset + self.width
    }

    /// `((1 << width) - 1) << offset`.
    #[inline]
    pub const fn bits(self) -> u16 {
        (((1u32 << self.width) - 1) << self.offset) as u16
    }

    /// `value` shifted into place and truncated to the field.
    #[inline]
    pub const fn value(self, value: u16) -> u16 {
        (((value as u32) << self.offset) as u16) & self.bits()
    }

    /// The mask at the register's own width.
    #[inline]
    pub fn mask<T: Width>(self) -> T {
        T::from_u16(self.bits())
    }

    /// The field's value within `raw`, shifted down to bit 0.
    #[inline]
    pub fn extract<T: Width>(self, raw: T) -> T {
        T::from_u16((raw.into_u16() & self.bits()) >> self.offset)
    }

    /// `raw` with this field replaced by `value`.
    #[inline]
    pub fn insert<T: Width>(self, raw: T, value: T) -> T {
        (raw & !self.mask::<T>()) | T::from_u16(self.value(value.into_u16()))
    }
}

/// Declare the fields of one register, low bit first.
///
/// Each `NAME: width` entry becomes a `pub const NAME: Field` at the current cursor; `_:
/// width` reserves bits without naming them. The macro also emits `LAYOUT`, every entry in
/// order with reserved ones included, and fails to compile unless the widths add up to the
/// register width.
#[macro_export]
macro_rules! fields {
    ($width:ty; $($body:tt)*) => {
        $crate::fields!(@place $width; 0u8; []; $($body)*);
    };

    (@place $width:ty; $cursor:expr; [$($layout:expr),*]; ) => {
        /// Every entry of this register, reserved bits included, low bit first.
        #[allow(dead_code)]
        pub const LAYOUT: &[$crate::register::Field] = &[$($layout),*];

        const _: () = assert!(
            ($cursor) as u32 == <$width>::BITS,
            "field widths do not add up to the register width"
        );
    };

    (@place $width:ty; $cursor:expr; [$($layout:expr),*]; _ : $w:literal $(, $($rest:tt)*)?) => {
        $crate::fields!(
            @place $width;
            $cursor + $w;
            [$($layout,)* $crate::register::Field::new($w, $cursor)];
            $($($rest)*)?
        );
    };

    (@place $width:ty; $cursor:expr; [$($layout:expr),*];
        $(#[$meta:meta])* $name:ident : $w:literal $(, $($rest:tt)*)?) => {
        $(#[$meta])*
        #[allow(dead_code)]
        pub const $name: $crate::register::Field = $crate::register::Field::new($w, $cursor);

        $crate::fields!(
            @place $width;
            $cursor + $w;
            [$($layout,)* $name];
            $($($rest)*)?
        );
    };
}

/// True if `layout` covers `width` bits exactly once each.
#[cfg(test)]
pub(crate) fn partitions(layout: &[Field], width: u32) -> bool {
    let mut seen = 0u32;
    for field in layout {
        let bits = field.bits() as u32;
        if seen & bits != 0 {
            return false;
        }
        seen |= bits;
    }
    seen == (1u32 << width) - 1
}
