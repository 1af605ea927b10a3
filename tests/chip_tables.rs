use megahal::chip::{
    atmega2560::{self, Atmega2560},
    atmega328p::{self, Atmega328p},
    atmega32u4::{self, Atmega32u4},
    Chip, Peripheral, PeripheralKind, PinLocation, PortId, Signal,
};
use megahal::Error;

fn location(chip: &dyn Chip, peripheral: Peripheral, signal: Signal) -> (PortId, u8) {
    let PinLocation { port, bit } = chip.signal_location(peripheral, signal).unwrap();
    (port, bit)
}

// ---------------------------------------------------------------------------
// ATmega328P
// ---------------------------------------------------------------------------

#[test]
fn atmega328p_signal_routing() {
    let chip = Atmega328p;
    let spi = Peripheral::spi(atmega328p::SPI0);
    let usart = Peripheral::usart(atmega328p::USART0);
    let twi = Peripheral::twi(atmega328p::TWI0);

    assert_eq!(location(&chip, spi, Signal::Ss), (PortId::B, 2));
    assert_eq!(location(&chip, spi, Signal::Mosi), (PortId::B, 3));
    assert_eq!(location(&chip, spi, Signal::Miso), (PortId::B, 4));
    assert_eq!(location(&chip, spi, Signal::Sck), (PortId::B, 5));

    assert_eq!(location(&chip, usart, Signal::Rxd), (PortId::D, 0));
    assert_eq!(location(&chip, usart, Signal::Txd), (PortId::D, 1));
    assert_eq!(location(&chip, usart, Signal::Xck), (PortId::D, 4));

    assert_eq!(location(&chip, twi, Signal::Sda), (PortId::C, 4));
    assert_eq!(location(&chip, twi, Signal::Scl), (PortId::C, 5));

    assert_eq!(chip.bit_number_for(spi, Signal::Sck), Ok(5));
    assert_eq!(chip.mask_for(usart, Signal::Xck), Ok(0b0001_0000));
}

#[test]
fn atmega328p_addresses() {
    let chip = Atmega328p;
    assert_eq!(chip.port_address(PortId::B), Ok(0x23));
    assert_eq!(chip.port_address(PortId::C), Ok(0x26));
    assert_eq!(chip.port_address(PortId::D), Ok(0x29));
    assert_eq!(
        chip.port_address(PortId::A),
        Err(Error::UnsupportedPort(PortId::A))
    );
    assert_eq!(chip.status_register_address(), 0x5F);
}

// ---------------------------------------------------------------------------
// ATmega2560
// ---------------------------------------------------------------------------

#[test]
fn atmega2560_has_four_usarts() {
    let chip = Atmega2560;
    let expected = [
        (atmega2560::USART0, PortId::E, 0),
        (atmega2560::USART1, PortId::D, 2),
        (atmega2560::USART2, PortId::H, 0),
        (atmega2560::USART3, PortId::J, 0),
    ];
    for (address, port, rxd) in expected {
        let usart = Peripheral::usart(address);
        assert_eq!(location(&chip, usart, Signal::Rxd), (port, rxd));
        assert_eq!(location(&chip, usart, Signal::Txd), (port, rxd + 1));
    }
    assert_eq!(
        location(&chip, Peripheral::usart(atmega2560::USART1), Signal::Xck),
        (PortId::D, 5)
    );
}

#[test]
fn atmega2560_spi_and_twi() {
    let chip = Atmega2560;
    let spi = Peripheral::spi(atmega2560::SPI0);
    assert_eq!(location(&chip, spi, Signal::Ss), (PortId::B, 0));
    assert_eq!(location(&chip, spi, Signal::Sck), (PortId::B, 1));
    assert_eq!(location(&chip, spi, Signal::Mosi), (PortId::B, 2));
    assert_eq!(location(&chip, spi, Signal::Miso), (PortId::B, 3));

    let twi = Peripheral::twi(atmega2560::TWI0);
    assert_eq!(location(&chip, twi, Signal::Scl), (PortId::D, 0));
    assert_eq!(location(&chip, twi, Signal::Sda), (PortId::D, 1));

    // Extended I/O ports.
    assert_eq!(chip.port_address(PortId::H), Ok(0x100));
    assert_eq!(chip.port_address(PortId::L), Ok(0x109));
}

// ---------------------------------------------------------------------------
// ATmega32U4
// ---------------------------------------------------------------------------

#[test]
fn atmega32u4_routes_usart1_only() {
    let chip = Atmega32u4;
    let usart = Peripheral::usart(atmega32u4::USART1);
    assert_eq!(location(&chip, usart, Signal::Rxd), (PortId::D, 2));
    assert_eq!(location(&chip, usart, Signal::Txd), (PortId::D, 3));
    assert_eq!(location(&chip, usart, Signal::Xck), (PortId::D, 5));

    assert_eq!(
        chip.signal_location(Peripheral::usart(0xC0), Signal::Txd),
        Err(Error::UnsupportedInstance {
            kind: PeripheralKind::Usart,
            address: 0xC0
        })
    );
}

// ---------------------------------------------------------------------------
// Shared policy
// ---------------------------------------------------------------------------

#[test]
fn unsupported_instances_fail_on_every_chip() {
    let chips: [&dyn Chip; 3] = [&Atmega328p, &Atmega2560, &Atmega32u4];
    for chip in chips {
        let stray = Peripheral::spi(0x1234);
        assert!(matches!(
            chip.port_for(stray, Signal::Sck),
            Err(Error::UnsupportedInstance { .. })
        ));
        assert!(chip.bit_number_for(stray, Signal::Sck).is_err());
        assert!(chip.mask_for(stray, Signal::Sck).is_err());
        assert!(chip.spi_block(0x1234).is_err());
        assert!(chip.claim_peripheral(stray).is_err());
    }
}

#[test]
fn foreign_signals_are_rejected() {
    let chip = Atmega328p;
    assert_eq!(
        chip.signal_location(Peripheral::spi(atmega328p::SPI0), Signal::Txd),
        Err(Error::UnsupportedSignal {
            kind: PeripheralKind::Spi,
            signal: Signal::Txd
        })
    );
}

#[test]
fn every_binding_points_at_a_known_port() {
    let chips: [&dyn Chip; 3] = [&Atmega328p, &Atmega2560, &Atmega32u4];
    for chip in chips {
        let table = chip.table();
        for binding in table.signals {
            assert!(binding.signal.belongs_to(binding.peripheral.kind));
            assert!(table.peripherals.contains(&binding.peripheral));
            assert!(
                chip.port_address(binding.location.port).is_ok(),
                "{}: {:?}",
                chip.name(),
                binding
            );
        }
    }
}

#[test]
fn peripheral_claims_are_exclusive() {
    // No other test claims from the 2560 registry.
    let chip = Atmega2560;
    let usart3 = Peripheral::usart(atmega2560::USART3);

    let claim = chip.claim_peripheral(usart3).unwrap();
    assert_eq!(claim.peripheral(), usart3);
    assert_eq!(
        chip.claim_peripheral(usart3).err(),
        Some(Error::PeripheralInUse {
            kind: PeripheralKind::Usart,
            address: atmega2560::USART3
        })
    );
    drop(claim);
    assert!(chip.claim_peripheral(usart3).is_ok());
}
