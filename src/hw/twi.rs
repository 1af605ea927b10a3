// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Two-wire interface, master mode.
//!
//! Every bus step writes TWCR with TWINT set, spins until the hardware sets TWINT again and
//! then checks the status code in TWSR. There is no timeout: a slave that holds SCL low
//! hangs the caller.

use core::hint::spin_loop;

use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation, SevenBitAddress};

use super::gpio::Pin;
use super::pins::{PullUp, PullUpInput};
use crate::chip::{Chip, Peripheral, Signal};
use crate::error::Error;
use crate::register::Register;
use crate::resource::PeripheralClaim;

/// TWI control register.
pub mod twcr {
    crate::fields! { u8;
        TWIE: 1,
        _: 1,
        TWEN: 1,
        TWWC: 1,
        TWSTO: 1,
        TWSTA: 1,
        TWEA: 1,
        TWINT: 1,
    }
}

/// TWI status register.
pub mod twsr {
    crate::fields! { u8;
        /// Bit-rate prescaler, 4^TWPS.
        TWPS: 2,
        _: 1,
        TWS: 5,
    }
}

/// Status codes, prescaler bits masked off.
pub mod status {
    pub const START: u8 = 0x08;
    pub const REPEATED_START: u8 = 0x10;
    pub const MT_SLA_ACK: u8 = 0x18;
    pub const MT_SLA_NACK: u8 = 0x20;
    pub const MT_DATA_ACK: u8 = 0x28;
    pub const MT_DATA_NACK: u8 = 0x30;
    pub const ARBITRATION_LOST: u8 = 0x38;
    pub const MR_SLA_ACK: u8 = 0x40;
    pub const MR_SLA_NACK: u8 = 0x48;
    pub const MR_DATA_ACK: u8 = 0x50;
    pub const MR_DATA_NACK: u8 = 0x58;
}

#[repr(C)]
pub struct TwiRegisters {
    pub twbr: Register<u8>,
    pub twsr: Register<u8>,
    pub twar: Register<u8>,
    pub twdr: Register<u8>,
    pub twcr: Register<u8>,
    pub twamr: Register<u8>,
}

impl TwiRegisters {
    /// # Safety
    /// `address` must be the TWBR address of a TWI block.
    #[inline(always)]
    pub unsafe fn at(address: usize) -> &'static Self {
        &*(address as *const Self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwiConfig {
    pub cpu_hz: u32,
    pub scl_hz: u32,
}

impl TwiConfig {
    pub const fn new(cpu_hz: u32, scl_hz: u32) -> Self {
        Self { cpu_hz, scl_hz }
    }
}

impl Default for TwiConfig {
    /// 16 MHz core, 100 kHz standard mode.
    fn default() -> Self {
        Self::new(16_000_000, 100_000)
    }
}

/// TWBR and prescaler for one [`TwiConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitRate {
    pub twbr: u8,
    /// TWPS code; the prescaler is `4^twps`.
    pub twps: u8,
}

impl BitRate {
    /// `SCL = cpu / (16 + 2 * TWBR * 4^TWPS)`. Picks the smallest prescaler that fits,
    /// with TWBR rounded up so SCL never exceeds the request.
    pub const fn new(config: &TwiConfig) -> Self {
        if config.scl_hz == 0 {
            return Self { twbr: 255, twps: 3 };
        }
        let ratio = config.cpu_hz.div_ceil(config.scl_hz);
        if ratio <= 16 {
            return Self { twbr: 0, twps: 0 };
        }
        let excess = ratio - 16;

        let mut twps = 0;
        while twps < 4 {
            let twbr = excess.div_ceil(2 * Self::prescaler_of(twps));
            if twbr <= 255 {
                return Self {
                    twbr: twbr as u8,
                    twps,
                };
            }
            twps += 1;
        }
        Self { twbr: 255, twps: 3 }
    }

    const fn prescaler_of(twps: u8) -> u32 {
        1 << (2 * twps)
    }

    pub const fn prescaler(&self) -> u32 {
        Self::prescaler_of(self.twps)
    }

    pub const fn scl_hz(&self, cpu_hz: u32) -> u32 {
        cpu_hz / (16 + 2 * self.twbr as u32 * self.prescaler())
    }
}

/// Failure reported by one TWI bus step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TwiError {
    /// Address or data byte not acknowledged.
    NoAcknowledge(NoAcknowledgeSource),
    ArbitrationLost,
    /// Status code the current step does not expect.
    Bus(u8),
}

impl i2c::Error for TwiError {
    fn kind(&self) -> ErrorKind {
        match *self {
            TwiError::NoAcknowledge(source) => ErrorKind::NoAcknowledge(source),
            TwiError::ArbitrationLost => ErrorKind::ArbitrationLoss,
            TwiError::Bus(_) => ErrorKind::Bus,
        }
    }
}

impl core::fmt::Display for TwiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TwiError::NoAcknowledge(NoAcknowledgeSource::Address) => {
                f.write_str("address not acknowledged")
            }
            TwiError::NoAcknowledge(NoAcknowledgeSource::Data) => {
                f.write_str("data not acknowledged")
            }
            TwiError::NoAcknowledge(NoAcknowledgeSource::Unknown) => {
                f.write_str("not acknowledged")
            }
            TwiError::ArbitrationLost => f.write_str("arbitration lost"),
            TwiError::Bus(code) => write!(f, "unexpected bus status {code:#04x}"),
        }
    }
}

impl core::error::Error for TwiError {}

const TWINT: u8 = twcr::TWINT.bits() as u8;
const TWEN: u8 = twcr::TWEN.bits() as u8;
const TWSTA: u8 = twcr::TWSTA.bits() as u8;
const TWSTO: u8 = twcr::TWSTO.bits() as u8;
const TWEA: u8 = twcr::TWEA.bits() as u8;

/// Master-mode TWI block with SCL and SDA.
pub struct Twi {
    regs: &'static TwiRegisters,
    scl: PullUpInput,
    sda: PullUpInput,
    claim: PeripheralClaim,
}

impl Twi {
    /// Claim the TWI block at `address` and its pins, and program the bit rate.
    pub fn new<C: Chip + ?Sized>(
        chip: &C,
        address: usize,
        config: &TwiConfig,
    ) -> Result<Self, Error> {
        let peripheral = Peripheral::twi(address);
        let claim = chip.claim_peripheral(peripheral)?;
        let scl = Pin::for_signal(chip, peripheral, Signal::Scl)?;
        let sda = Pin::for_signal(chip, peripheral, Signal::Sda)?;

        let regs = unsafe { TwiRegisters::at(address) };
        let rate = BitRate::new(config);
        regs.twcr.clear_field(twcr::TWEN);
        regs.twsr.write_field(twsr::TWPS, rate.twps);
        regs.twbr.write(rate.twbr);

        Ok(Self {
            regs,
            scl: PullUpInput::new(scl),
            sda: PullUpInput::new(sda),
            claim,
        })
    }

    /// Enable the internal pull-ups on both lines and switch the block on.
    pub fn initialize(&mut self) {
        self.scl.initialize(PullUp::Enabled);
        self.sda.initialize(PullUp::Enabled);
        self.regs.twcr.write(TWEN);
        debug!("twi enabled at {=usize:#x}", self.claim.peripheral().address);
    }

    pub fn registers(&self) -> &'static TwiRegisters {
        self.regs
    }

    /// Current status code with the prescaler bits masked off.
    #[inline]
    pub fn status(&self) -> u8 {
        self.regs.twsr.read() & twsr::TWS.mask::<u8>()
    }

    fn step(&mut self, control: u8) -> u8 {
        self.regs.twcr.write(TWINT | TWEN | control);
        #[cfg(test)]
        crate::sim::twi_step(self.regs);
        while !self.regs.twcr.is_set(twcr::TWINT) {
            spin_loop();
        }
        self.status()
    }

    fn unexpected(code: u8) -> TwiError {
        if code == status::ARBITRATION_LOST {
            TwiError::ArbitrationLost
        } else {
            TwiError::Bus(code)
        }
    }

    /// Send a START, or a repeated START while the bus is held.
    pub fn start(&mut self) -> Result<(), TwiError> {
        match self.step(TWSTA) {
            status::START | status::REPEATED_START => Ok(()),
            code => Err(Self::unexpected(code)),
        }
    }

    /// Send SLA+R or SLA+W.
    pub fn write_address(&mut self, address: SevenBitAddress, read: bool) -> Result<(), TwiError> {
        self.regs.twdr.write((address << 1) | read as u8);
        match (self.step(0), read) {
            (status::MT_SLA_ACK, false) | (status::MR_SLA_ACK, true) => Ok(()),
            (status::MT_SLA_NACK, false) | (status::MR_SLA_NACK, true) => Err(
                TwiError::NoAcknowledge(NoAcknowledgeSource::Address),
            ),
            (code, _) => Err(Self::unexpected(code)),
        }
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), TwiError> {
        self.regs.twdr.write(byte);
        match self.step(0) {
            status::MT_DATA_ACK => Ok(()),
            status::MT_DATA_NACK => Err(TwiError::NoAcknowledge(NoAcknowledgeSource::Data)),
            code => Err(Self::unexpected(code)),
        }
    }

    /// Receive one byte, answering ACK (more to come) or NACK (last byte).
    pub fn read_byte(&mut self, ack: bool) -> Result<u8, TwiError> {
        let expected = if ack {
            status::MR_DATA_ACK
        } else {
            status::MR_DATA_NACK
        };
        let code = self.step(if ack { TWEA } else { 0 });
        if code != expected {
            return Err(Self::unexpected(code));
        }
        Ok(self.regs.twdr.read())
    }

    /// Send a STOP and wait for the hardware to finish it.
    pub fn stop(&mut self) {
        self.regs.twcr.write(TWINT | TWEN | TWSTO);
        #[cfg(test)]
        crate::sim::twi_control(self.regs);
        while self.regs.twcr.is_set(twcr::TWSTO) {
            spin_loop();
        }
    }

    /// Give the bus up without a STOP, after arbitration was lost to another master.
    fn release(&mut self) {
        self.regs.twcr.write(TWINT | TWEN);
        #[cfg(test)]
        crate::sim::twi_control(self.regs);
    }

    fn run(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), TwiError> {
        let mut previous_read = None;
        for i in 0..operations.len() {
            let read = matches!(operations[i], Operation::Read(_));
            // The NACK goes on the last byte of the burst, so empty reads after this one
            // do not count.
            let last_of_burst = operations[i + 1..]
                .iter()
                .take_while(|op| matches!(op, Operation::Read(_)))
                .all(|op| matches!(op, Operation::Read(buffer) if buffer.is_empty()));

            if previous_read != Some(read) {
                self.start()?;
                self.write_address(address, read)?;
            }
            previous_read = Some(read);

            match &mut operations[i] {
                Operation::Write(bytes) => {
                    for &b in bytes.iter() {
                        self.write_byte(b)?;
                    }
                }
                Operation::Read(buffer) => {
                    let len = buffer.len();
                    for (j, slot) in buffer.iter_mut().enumerate() {
                        let last = last_of_burst && j + 1 == len;
                        *slot = self.read_byte(!last)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl i2c::ErrorType for Twi {
    type Error = TwiError;
}

impl i2c::I2c for Twi {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.run(address, operations);
        match result {
            Err(TwiError::ArbitrationLost) => {
                warn!("twi arbitration lost, address {=u8:#x}", address);
                self.release();
            }
            _ => self.stop(),
        }
        result
    }
}

impl Drop for Twi {
    fn drop(&mut self) {
        self.regs.twcr.clear_field(twcr::TWEN);
        debug!("twi released at {=usize:#x}", self.claim.peripheral().address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::PortId;
    use crate::register;
    use crate::sim::{script_twi, twi_log, Reply, SimChip};
    use embedded_hal::i2c::I2c as _;

    const STA: u8 = TWINT | TWEN | TWSTA;
    const GO: u8 = TWINT | TWEN;
    const ACK: u8 = TWINT | TWEN | TWEA;
    const STO: u8 = TWINT | TWEN | TWSTO;

    fn twi(sim: &SimChip) -> Twi {
        let mut twi = Twi::new(sim, sim.twi_block, &TwiConfig::default()).unwrap();
        twi.initialize();
        twi
    }

    /// Make the next step complete immediately with `code`.
    fn respond(twi: &Twi, code: u8) {
        let regs = twi.registers();
        regs.twsr.write((regs.twsr.read() & 0b11) | code);
    }

    #[test]
    fn register_layouts_cover_every_bit() {
        assert!(register::field::partitions(twcr::LAYOUT, 8));
        assert!(register::field::partitions(twsr::LAYOUT, 8));
        assert_eq!(TWINT, 0x80);
        assert_eq!(TWEN, 0x04);
        assert_eq!(twsr::TWS.mask::<u8>(), 0xF8);
    }

    #[test]
    fn bit_rate() {
        assert_eq!(
            BitRate::new(&TwiConfig::new(16_000_000, 100_000)),
            BitRate { twbr: 72, twps: 0 }
        );
        assert_eq!(
            BitRate::new(&TwiConfig::new(16_000_000, 400_000)),
            BitRate { twbr: 12, twps: 0 }
        );
        // Too slow for TWBR alone: the prescaler steps up.
        let slow = BitRate::new(&TwiConfig::new(16_000_000, 10_000));
        assert_eq!(slow, BitRate { twbr: 198, twps: 1 });
        assert!(slow.scl_hz(16_000_000) <= 10_000);
        assert_eq!(
            BitRate::new(&TwiConfig::new(16_000_000, 2_000_000)),
            BitRate { twbr: 0, twps: 0 }
        );
        assert_eq!(
            BitRate::new(&TwiConfig::new(16_000_000, 1)),
            BitRate { twbr: 255, twps: 3 }
        );
    }

    #[test]
    fn new_programs_the_rate_and_initialize_enables() {
        let sim = SimChip::new();
        let twi = twi(&sim);
        let regs = twi.registers();
        assert_eq!(regs.twbr.read(), 72);
        assert_eq!(regs.twsr.read_field(twsr::TWPS), 0);
        assert_eq!(regs.twcr.read(), TWEN);
        // SDA C4, SCL C5 as pulled-up inputs.
        assert_eq!(sim.portc.direction.read(), 0);
        assert_eq!(sim.portc.output.read(), 0b0011_0000);
    }

    #[test]
    fn start_accepts_start_and_repeated_start() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);
        respond(&twi, status::START);
        assert_eq!(twi.start(), Ok(()));
        assert_eq!(twi.registers().twcr.read(), TWINT | TWEN | TWSTA);

        respond(&twi, status::REPEATED_START);
        assert_eq!(twi.start(), Ok(()));
        respond(&twi, status::ARBITRATION_LOST);
        assert_eq!(twi.start(), Err(TwiError::ArbitrationLost));
    }

    #[test]
    fn address_phase() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);

        respond(&twi, status::MT_SLA_ACK);
        assert_eq!(twi.write_address(0x50, false), Ok(()));
        assert_eq!(twi.registers().twdr.read(), 0xA0);

        respond(&twi, status::MR_SLA_ACK);
        assert_eq!(twi.write_address(0x50, true), Ok(()));
        assert_eq!(twi.registers().twdr.read(), 0xA1);

        respond(&twi, status::MT_SLA_NACK);
        assert_eq!(
            twi.write_address(0x50, false),
            Err(TwiError::NoAcknowledge(NoAcknowledgeSource::Address))
        );
        // Acknowledged, but for the wrong direction.
        respond(&twi, status::MT_SLA_ACK);
        assert_eq!(
            twi.write_address(0x50, true),
            Err(TwiError::Bus(status::MT_SLA_ACK))
        );
    }

    #[test]
    fn data_phase() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);

        respond(&twi, status::MT_DATA_ACK);
        assert_eq!(twi.write_byte(0x3C), Ok(()));
        respond(&twi, status::MT_DATA_NACK);
        assert_eq!(
            twi.write_byte(0x3C),
            Err(TwiError::NoAcknowledge(NoAcknowledgeSource::Data))
        );

        respond(&twi, status::MR_DATA_ACK);
        twi.registers().twdr.write(0x99);
        assert_eq!(twi.read_byte(true), Ok(0x99));
        assert_eq!(twi.registers().twcr.read(), TWINT | TWEN | TWEA);

        respond(&twi, status::MR_DATA_NACK);
        assert_eq!(twi.read_byte(false), Ok(0x99));
        assert_eq!(twi.registers().twcr.read(), TWINT | TWEN);
        assert!(twi.read_byte(true).is_err());
    }

    #[test]
    fn write_read_turns_around_with_a_repeated_start() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);
        script_twi(&[
            Reply::status(status::START),
            Reply::status(status::MT_SLA_ACK),
            Reply::status(status::MT_DATA_ACK),
            Reply::status(status::REPEATED_START),
            Reply::status(status::MR_SLA_ACK),
            Reply::data(status::MR_DATA_ACK, 0x11),
            Reply::data(status::MR_DATA_NACK, 0x22),
        ]);

        let mut buf = [0u8; 2];
        assert_eq!(twi.write_read(0x50, &[0x01], &mut buf), Ok(()));
        assert_eq!(buf, [0x11, 0x22]);
        assert_eq!(
            twi_log(),
            (std::vec![STA, GO, GO, STA, GO, ACK, GO, STO], 0)
        );
        assert_eq!(twi.registers().twcr.read(), GO);
    }

    #[test]
    fn adjacent_operations_of_one_kind_share_the_address_phase() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);

        script_twi(&[
            Reply::status(status::START),
            Reply::status(status::MR_SLA_ACK),
            Reply::data(status::MR_DATA_ACK, 1),
            Reply::data(status::MR_DATA_ACK, 2),
            Reply::data(status::MR_DATA_NACK, 3),
        ]);
        let (mut a, mut b) = ([0u8; 2], [0u8; 1]);
        twi.transaction(0x50, &mut [Operation::Read(&mut a), Operation::Read(&mut b)])
            .unwrap();
        assert_eq!((a, b), ([1, 2], [3]));
        // ACK carries across the boundary; only the final byte is NACKed.
        assert_eq!(twi_log(), (std::vec![STA, GO, ACK, ACK, GO, STO], 0));

        script_twi(&[
            Reply::status(status::START),
            Reply::status(status::MT_SLA_ACK),
            Reply::status(status::MT_DATA_ACK),
            Reply::status(status::MT_DATA_ACK),
        ]);
        twi.transaction(0x50, &mut [Operation::Write(&[1]), Operation::Write(&[2])])
            .unwrap();
        assert_eq!(twi_log(), (std::vec![STA, GO, GO, GO, STO], 0));
    }

    #[test]
    fn trailing_empty_reads_do_not_delay_the_nack() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);
        script_twi(&[
            Reply::status(status::START),
            Reply::status(status::MR_SLA_ACK),
            Reply::data(status::MR_DATA_NACK, 0x7E),
        ]);

        let mut a = [0u8; 1];
        let mut empty = [0u8; 0];
        twi.transaction(
            0x50,
            &mut [Operation::Read(&mut a), Operation::Read(&mut empty)],
        )
        .unwrap();
        assert_eq!(a, [0x7E]);
        assert_eq!(twi_log(), (std::vec![STA, GO, GO, STO], 0));
    }

    #[test]
    fn a_failed_transaction_still_sends_stop() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);

        script_twi(&[
            Reply::status(status::START),
            Reply::status(status::MT_SLA_NACK),
        ]);
        assert_eq!(
            twi.write(0x50, &[0x01]),
            Err(TwiError::NoAcknowledge(NoAcknowledgeSource::Address))
        );
        assert_eq!(twi_log(), (std::vec![STA, GO, STO], 0));

        script_twi(&[
            Reply::status(status::START),
            Reply::status(status::MT_SLA_ACK),
            Reply::status(status::MT_DATA_NACK),
        ]);
        assert_eq!(
            twi.write(0x50, &[0x01, 0x02]),
            Err(TwiError::NoAcknowledge(NoAcknowledgeSource::Data))
        );
        assert_eq!(twi_log(), (std::vec![STA, GO, GO, STO], 0));
    }

    #[test]
    fn arbitration_loss_releases_without_stop() {
        let sim = SimChip::new();
        let mut twi = twi(&sim);
        script_twi(&[
            Reply::status(status::START),
            Reply::status(status::ARBITRATION_LOST),
        ]);

        assert_eq!(twi.write(0x50, &[0x01]), Err(TwiError::ArbitrationLost));
        let (controls, left) = twi_log();
        assert_eq!(controls, std::vec![STA, GO, GO]);
        assert_eq!(left, 0);
        assert!(controls.iter().all(|c| c & TWSTO == 0));
    }

    #[test]
    fn error_kinds() {
        use embedded_hal::i2c::Error as _;
        assert_eq!(
            TwiError::NoAcknowledge(NoAcknowledgeSource::Data).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(TwiError::ArbitrationLost.kind(), ErrorKind::ArbitrationLoss);
        assert_eq!(TwiError::Bus(0x00).kind(), ErrorKind::Bus);
    }

    #[test]
    fn drop_disables_and_frees_the_pins() {
        let sim = SimChip::new();
        drop(twi(&sim));
        let regs = unsafe { TwiRegisters::at(sim.twi_block) };
        assert!(!regs.twcr.is_set(twcr::TWEN));
        assert_eq!(sim.portc.output.read(), 0);
        assert!(!sim.registry().is_pin_claimed(PortId::C, 5));
    }
}
