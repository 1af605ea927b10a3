// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use core::fmt;

use crate::chip::{PeripheralKind, PortId, Signal};

/// Errors raised while resolving or claiming hardware resources.
///
/// Every variant is a programming error on the caller's side: the request names a resource
/// the selected chip does not have, or one that already has a live owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No peripheral of this kind lives at `address` on the selected chip.
    UnsupportedInstance {
        kind: PeripheralKind,
        address: usize,
    },
    /// The peripheral kind has no such signal.
    UnsupportedSignal { kind: PeripheralKind, signal: Signal },
    /// The selected chip has no such port.
    UnsupportedPort(PortId),
    /// Bit numbers run from 0 to 7.
    InvalidBit(u8),
    /// Another live handle owns this pin.
    PinInUse { port: PortId, bit: u8 },
    /// Another live backend owns this peripheral.
    PeripheralInUse {
        kind: PeripheralKind,
        address: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedInstance { kind, address } => {
                write!(f, "no {kind:?} instance at {address:#06x}")
            }
            Error::UnsupportedSignal { kind, signal } => {
                write!(f, "{kind:?} has no {signal:?} signal")
            }
            Error::UnsupportedPort(port) => write!(f, "port {port:?} does not exist"),
            Error::InvalidBit(bit) => write!(f, "bit {bit} is out of range"),
            Error::PinInUse { port, bit } => write!(f, "P{port:?}{bit} is already claimed"),
            Error::PeripheralInUse { kind, address } => {
                write!(f, "{kind:?} at {address:#06x} is already claimed")
            }
        }
    }
}

impl core::error::Error for Error {}
