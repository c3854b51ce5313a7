//! ATmega328P TWI registers for the duowire driver
//!
//! Implements [`duowire_hal::TwiRegisters`] over the `avr-device`
//! peripheral access crate. SDA is PC4 and SCL is PC5.
//!
//! # Interrupt binding
//!
//! The peripherals only exist at runtime, so the bus instance lives in a
//! `static` cell filled once from `main`. The TWI vector forwards to it
//! once it is set:
//!
//! ```rust,ignore
//! use embassy_sync::once_lock::OnceLock;
//!
//! static BUS: OnceLock<TwiMaster<Atmega328pTwi, Delay>> = OnceLock::new();
//!
//! #[avr_device::interrupt(atmega328p)]
//! fn TWI() {
//!     if let Some(bus) = BUS.try_get() {
//!         bus.on_interrupt();
//!     }
//! }
//!
//! let dp = avr_device::atmega328p::Peripherals::take().unwrap();
//! let bus = BUS.get_or_init(|| {
//!     TwiMaster::new(Atmega328pTwi::new(dp.TWI, dp.PORTC), Delay)
//! });
//! bus.init(&TwiConfig::STANDARD)?;
//! unsafe { avr_device::interrupt::enable() };
//! ```

#![no_std]

use avr_device::atmega328p::{PORTC, TWI};
use duowire_hal::{Control, Prescaler, TwiRegisters};

/// PC4 (SDA) and PC5 (SCL)
const BUS_PINS: u8 = (1 << 4) | (1 << 5);

/// TWI peripheral together with the port carrying its pins
pub struct Atmega328pTwi {
    twi: TWI,
    portc: PORTC,
}

impl Atmega328pTwi {
    /// Take ownership of the TWI peripheral and port C
    pub fn new(twi: TWI, portc: PORTC) -> Self {
        Self { twi, portc }
    }

    /// Give the peripherals back
    pub fn release(self) -> (TWI, PORTC) {
        (self.twi, self.portc)
    }
}

impl TwiRegisters for Atmega328pTwi {
    fn configure_pins(&mut self, pullups: bool) {
        self.portc
            .ddrc
            .modify(|r, w| unsafe { w.bits(r.bits() & !BUS_PINS) });
        if pullups {
            self.portc
                .portc
                .modify(|r, w| unsafe { w.bits(r.bits() | BUS_PINS) });
        }
    }

    fn set_bit_rate(&mut self, divisor: u8, prescaler: Prescaler) {
        self.twi.twbr.write(|w| unsafe { w.bits(divisor) });
        // Status bits are read-only, only TWPS1:0 take the write
        self.twi
            .twsr
            .write(|w| unsafe { w.bits(0xF8 | prescaler.bits()) });
    }

    fn status(&self) -> u8 {
        self.twi.twsr.read().bits()
    }

    fn data(&self) -> u8 {
        self.twi.twdr.read().bits()
    }

    fn set_data(&mut self, byte: u8) {
        self.twi.twdr.write(|w| unsafe { w.bits(byte) });
    }

    fn set_control(&mut self, control: Control) {
        self.twi.twcr.write(|w| unsafe { w.bits(control.bits()) });
    }
}
