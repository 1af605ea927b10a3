// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed- and variable-configuration bus controllers.

use core::convert::Infallible;

use embedded_hal::spi::{ErrorType, SpiBus};

use super::{Backend, Config};

/// Configuration computed and applied once, at construction.
pub struct FixedController<B: Backend> {
    backend: B,
}

impl<B: Backend> FixedController<B> {
    pub fn new(mut backend: B, config: &Config) -> Self {
        let settings = B::settings(config);
        backend.disable();
        backend.apply(&settings);
        Self { backend }
    }

    /// Bring the pins up, then enable the peripheral.
    pub fn initialize(&mut self) {
        self.backend.initialize_pins();
        self.backend.enable();
    }

    #[inline]
    pub fn exchange(&mut self, byte: u8) -> u8 {
        self.backend.exchange(byte)
    }

    /// Exchange every byte of `buf`, replacing each with the byte received.
    pub fn transfer_in_place(&mut self, buf: &mut [u8]) {
        transfer_in_place(&mut self.backend, buf);
    }

    /// Send `bytes`, discarding what comes back.
    pub fn write(&mut self, bytes: &[u8]) {
        write(&mut self.backend, bytes);
    }

    /// Fill `buf`, sending 0x00.
    pub fn read(&mut self, buf: &mut [u8]) {
        read(&mut self.backend, buf);
    }

    pub fn backend(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Give the backend back. It stays enabled until it is dropped or disabled.
    pub fn free(self) -> B {
        self.backend
    }
}

/// Claims its resources up front; configurations are swapped in at run time.
pub struct VariableController<B: Backend> {
    backend: B,
}

impl<B: Backend> VariableController<B> {
    /// The bus stays disabled until [`initialize`](Self::initialize).
    pub fn new(mut backend: B) -> Self {
        backend.disable();
        Self { backend }
    }

    pub fn initialize(&mut self) {
        self.backend.initialize_pins();
        self.backend.enable();
    }

    /// Overwrite every configuration field with `settings`. Nothing from the previous
    /// configuration survives.
    pub fn configure(&mut self, settings: &B::Settings) {
        self.backend.apply(settings);
    }

    #[inline]
    pub fn exchange(&mut self, byte: u8) -> u8 {
        self.backend.exchange(byte)
    }

    pub fn transfer_in_place(&mut self, buf: &mut [u8]) {
        transfer_in_place(&mut self.backend, buf);
    }

    pub fn write(&mut self, bytes: &[u8]) {
        write(&mut self.backend, bytes);
    }

    pub fn read(&mut self, buf: &mut [u8]) {
        read(&mut self.backend, buf);
    }

    pub fn backend(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn free(self) -> B {
        self.backend
    }
}

fn transfer_in_place<B: Backend>(backend: &mut B, buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = backend.exchange(*b);
    }
}

fn write<B: Backend>(backend: &mut B, bytes: &[u8]) {
    for &b in bytes {
        let _ = backend.exchange(b);
    }
}

fn read<B: Backend>(backend: &mut B, buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = backend.exchange(0x00);
    }
}

/// Clocks `max(read.len(), write.len())` bytes: missing writes send 0x00, surplus reads
/// are dropped.
fn transfer<B: Backend>(backend: &mut B, read: &mut [u8], write: &[u8]) {
    for i in 0..read.len().max(write.len()) {
        let received = backend.exchange(write.get(i).copied().unwrap_or(0x00));
        if let Some(slot) = read.get_mut(i) {
            *slot = received;
        }
    }
}

macro_rules! impl_spi_bus {
    ($controller:ident) => {
        impl<B: Backend> ErrorType for $controller<B> {
            type Error = Infallible;
        }

        impl<B: Backend> SpiBus<u8> for $controller<B> {
            fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
                read(&mut self.backend, words);
                Ok(())
            }

            fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
                write(&mut self.backend, words);
                Ok(())
            }

            fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
                transfer(&mut self.backend, read, write);
                Ok(())
            }

            fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
                transfer_in_place(&mut self.backend, words);
                Ok(())
            }

            /// Every exchange has completed by the time it returns.
            fn flush(&mut self) -> Result<(), Self::Error> {
                Ok(())
            }
        }
    };
}

impl_spi_bus!(FixedController);
impl_spi_bus!(VariableController);
