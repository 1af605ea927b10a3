// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Ownership registry.
//!
//! Each chip owns one [`Registry`]. Claiming a pin or a peripheral sets its bit; dropping
//! the returned claim clears it again. A second claim on a set bit fails with
//! [`Error::PinInUse`] / [`Error::PeripheralInUse`], which turns the one-owner-per-resource
//! rule into a checked invariant instead of a convention.

use portable_atomic::{AtomicU16, AtomicU8, Ordering};

use crate::chip::{Peripheral, PortId};
use crate::error::Error;

/// Upper bound on GPIO ports per chip (A..L without I).
pub const MAX_PORTS: usize = 11;

/// Upper bound on claimable peripherals per chip.
pub const MAX_PERIPHERALS: usize = 16;

pub struct Registry {
    pins: [AtomicU8; MAX_PORTS],
    peripherals: AtomicU16,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            pins: [const { AtomicU8::new(0) }; MAX_PORTS],
            peripherals: AtomicU16::new(0),
        }
    }

    /// Claim the pins selected by `mask` on `port`.
    pub(crate) fn claim_pin(&'static self, port: PortId, mask: u8) -> Result<PinClaim, Error> {
        let slot = &self.pins[port.index()];
        let previous = slot.fetch_or(mask, Ordering::Acquire);
        if previous & mask != 0 {
            return Err(Error::PinInUse {
                port,
                bit: mask.trailing_zeros() as u8,
            });
        }
        trace!("claimed pin {} mask {=u8:#x}", port, mask);
        Ok(PinClaim { slot, mask })
    }

    /// Claim the peripheral at table position `slot`. Slots past [`MAX_PERIPHERALS`] have
    /// no bit to track them and are reported as unsupported.
    pub(crate) fn claim_peripheral(
        &'static self,
        slot: usize,
        peripheral: Peripheral,
    ) -> Result<PeripheralClaim, Error> {
        if slot >= MAX_PERIPHERALS {
            return Err(Error::UnsupportedInstance {
                kind: peripheral.kind,
                address: peripheral.address,
            });
        }
        let mask = 1u16 << slot;
        let previous = self.peripherals.fetch_or(mask, Ordering::Acquire);
        if previous & mask != 0 {
            return Err(Error::PeripheralInUse {
                kind: peripheral.kind,
                address: peripheral.address,
            });
        }
        trace!("claimed {} at {=usize:#x}", peripheral.kind, peripheral.address);
        Ok(PeripheralClaim {
            bits: &self.peripherals,
            mask,
            peripheral,
        })
    }

    pub fn is_pin_claimed(&self, port: PortId, bit: u8) -> bool {
        bit < 8 && self.pins[port.index()].load(Ordering::Relaxed) & (1 << bit) != 0
    }

    pub fn is_peripheral_claimed(&self, slot: usize) -> bool {
        slot < MAX_PERIPHERALS && self.peripherals.load(Ordering::Relaxed) & (1 << slot) != 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Live claim on one pin; released on drop.
pub struct PinClaim {
    slot: &'static AtomicU8,
    mask: u8,
}

impl Drop for PinClaim {
    fn drop(&mut self) {
        self.slot.fetch_and(!self.mask, Ordering::Release);
    }
}

/// Live claim on one peripheral; released on drop.
pub struct PeripheralClaim {
    bits: &'static AtomicU16,
    mask: u16,
    peripheral: Peripheral,
}

impl PeripheralClaim {
    #[inline]
    pub fn peripheral(&self) -> Peripheral {
        self.peripheral
    }
}

impl Drop for PeripheralClaim {
    fn drop(&mut self) {
        self.bits.fetch_and(!self.mask, Ordering::Release);
        trace!(
            "released {} at {=usize:#x}",
            self.peripheral.kind,
            self.peripheral.address
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;

    fn registry() -> &'static Registry {
        Box::leak(Box::new(Registry::new()))
    }

    #[test]
    fn second_pin_claim_fails_until_first_is_dropped() {
        let registry = registry();

        let first = registry.claim_pin(PortId::B, 1 << 5).unwrap();
        assert!(registry.is_pin_claimed(PortId::B, 5));
        assert_eq!(
            registry.claim_pin(PortId::B, 1 << 5).err(),
            Some(Error::PinInUse {
                port: PortId::B,
                bit: 5
            })
        );

        // Neighbouring bits and other ports are independent.
        let _other = registry.claim_pin(PortId::B, 1 << 4).unwrap();
        let _port_c = registry.claim_pin(PortId::C, 1 << 5).unwrap();

        drop(first);
        assert!(!registry.is_pin_claimed(PortId::B, 5));
        assert!(registry.is_pin_claimed(PortId::B, 4));
        assert!(registry.claim_pin(PortId::B, 1 << 5).is_ok());
    }

    #[test]
    fn peripheral_claims() {
        let registry = registry();
        let spi = Peripheral::spi(0x4C);

        let claim = registry.claim_peripheral(0, spi).unwrap();
        assert_eq!(claim.peripheral(), spi);
        assert_eq!(
            registry.claim_peripheral(0, spi).err(),
            Some(Error::PeripheralInUse {
                kind: spi.kind,
                address: 0x4C
            })
        );
        assert!(registry.claim_peripheral(1, Peripheral::usart(0xC0)).is_ok());

        drop(claim);
        assert!(!registry.is_peripheral_claimed(0));
    }

    #[test]
    fn slots_past_the_bitmap_are_rejected() {
        let registry = registry();
        let twi = Peripheral::twi(0xB8);
        assert!(registry.claim_peripheral(MAX_PERIPHERALS - 1, twi).is_ok());
        assert_eq!(
            registry.claim_peripheral(MAX_PERIPHERALS, twi).err(),
            Some(Error::UnsupportedInstance {
                kind: twi.kind,
                address: 0xB8
            })
        );
        assert!(!registry.is_peripheral_claimed(MAX_PERIPHERALS));
    }
}
