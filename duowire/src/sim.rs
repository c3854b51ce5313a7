//! Simulated TWI controller for host tests
//!
//! Models the master-mode status machine of the AVR TWI: a write to the
//! control register with `TWINT` set runs one bus operation and raises the
//! completion interrupt with the resulting status. Memory-style devices
//! answer on the bus; every condition and byte lands in the wire trace.

use std::cell::RefCell;
use std::convert::Infallible;
use std::future::Future;
use std::mem;
use std::rc::Rc;
use std::vec::Vec;

use duowire_hal::{Control, Prescaler, TwiRegisters};
use embassy_futures::select::{select, Either};
use embassy_futures::{block_on, yield_now};
use embedded_hal_async::delay::DelayNs;

use crate::config::TwiConfig;
use crate::master::TwiMaster;

pub type SimMaster = TwiMaster<SimTwi, PollDelay>;
pub type SimHandle = Rc<RefCell<SimBus>>;

/// Observable bus activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Start,
    RepeatedStart,
    Address(u8),
    Write(u8),
    Read { byte: u8, ack: bool },
    Stop,
}

/// Register-pointer device (EEPROM/sensor style)
///
/// The first written byte of a transaction sets the pointer (the second,
/// for wide devices); further bytes are stored at the pointer. Reads
/// stream from the pointer.
pub struct Device {
    pub address: u8,
    pub memory: [u8; 256],
    pub pointer: u8,
    pub wide: bool,
    /// NACK the n-th byte written in a transaction
    pub nack_byte: Option<usize>,
    pub received: Vec<u8>,
    written: usize,
}

impl Device {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            memory: [0; 256],
            pointer: 0,
            wide: false,
            nack_byte: None,
            received: Vec::new(),
            written: 0,
        }
    }

    /// Two-byte register pointer, high byte first
    pub fn wide(mut self) -> Self {
        self.wide = true;
        self
    }

    fn begin_write(&mut self) {
        self.written = 0;
    }

    fn write(&mut self, byte: u8) -> bool {
        let index = self.written;
        self.written += 1;
        self.received.push(byte);

        let pointer_len = if self.wide { 2 } else { 1 };
        if index == pointer_len - 1 {
            self.pointer = byte;
        } else if index >= pointer_len {
            self.memory[usize::from(self.pointer)] = byte;
            self.pointer = self.pointer.wrapping_add(1);
        }

        self.nack_byte != Some(index)
    }

    fn read(&mut self) -> u8 {
        let byte = self.memory[usize::from(self.pointer)];
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Writing(usize),
    Reading(usize),
    Nacked,
}

pub struct SimBus {
    pub devices: Vec<Device>,
    pub wire: Vec<Wire>,
    pub controls: Vec<Control>,
    pub pullups: Option<bool>,
    pub bit_rate: Option<(u8, Prescaler)>,
    /// Never raise the completion interrupt
    pub stalled: bool,
    /// Lose arbitration while clocking the n-th byte after START
    pub lose_arbitration_at: Option<usize>,
    /// Report a bus error while clocking the n-th byte after START
    pub bus_error_at: Option<usize>,
    status: u8,
    data: u8,
    interrupt: bool,
    phase: Phase,
    clocked: usize,
}

impl SimBus {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            wire: Vec::new(),
            controls: Vec::new(),
            pullups: None,
            bit_rate: None,
            stalled: false,
            lose_arbitration_at: None,
            bus_error_at: None,
            status: 0xF8,
            data: 0xFF,
            interrupt: false,
            phase: Phase::Idle,
            clocked: 0,
        }
    }

    /// Overwrite the status register, as a late hardware event would
    pub fn force_status(&mut self, status: u8) {
        self.status = status;
    }

    pub fn take_interrupt(&mut self) -> bool {
        mem::take(&mut self.interrupt)
    }

    /// ACK/NACK asserted by the master for each received byte
    pub fn read_acks(&self) -> Vec<bool> {
        self.wire
            .iter()
            .filter_map(|event| match event {
                Wire::Read { ack, .. } => Some(*ack),
                _ => None,
            })
            .collect()
    }

    /// Data bytes sent by the master
    pub fn written(&self) -> Vec<u8> {
        self.wire
            .iter()
            .filter_map(|event| match event {
                Wire::Write(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }

    fn raise(&mut self, status: u8) {
        self.status = status;
        if !self.stalled {
            self.interrupt = true;
        }
    }

    fn control(&mut self, control: Control) {
        self.controls.push(control);
        if !control.starts_operation() {
            return;
        }
        self.interrupt = false;

        if control.is_stop() {
            self.wire.push(Wire::Stop);
            self.phase = Phase::Idle;
            self.status = 0xF8;
            return;
        }

        if control.is_start() {
            let repeated = self.phase != Phase::Idle;
            self.wire.push(if repeated {
                Wire::RepeatedStart
            } else {
                Wire::Start
            });
            self.phase = Phase::Started;
            self.clocked = 0;
            self.raise(if repeated { 0x10 } else { 0x08 });
            return;
        }

        if self.phase == Phase::Idle {
            return;
        }

        let index = self.clocked;
        self.clocked += 1;
        if self.lose_arbitration_at == Some(index) {
            self.phase = Phase::Idle;
            self.raise(0x38);
            return;
        }
        if self.bus_error_at == Some(index) {
            self.phase = Phase::Idle;
            self.raise(0x00);
            return;
        }

        match self.phase {
            Phase::Started => self.address(),
            Phase::Writing(device) => {
                let byte = self.data;
                self.wire.push(Wire::Write(byte));
                let ack = self.devices[device].write(byte);
                self.raise(if ack { 0x28 } else { 0x30 });
            }
            Phase::Reading(device) => {
                let byte = self.devices[device].read();
                let ack = control.acknowledges();
                self.data = byte;
                self.wire.push(Wire::Read { byte, ack });
                self.raise(if ack { 0x50 } else { 0x58 });
            }
            Phase::Nacked | Phase::Idle => self.raise(0x00),
        }
    }

    fn address(&mut self) {
        let byte = self.data;
        self.wire.push(Wire::Address(byte));
        let read = byte & 1 == 1;

        match self.devices.iter().position(|d| d.address == byte >> 1) {
            Some(device) if read => {
                self.phase = Phase::Reading(device);
                self.raise(0x40);
            }
            Some(device) => {
                self.devices[device].begin_write();
                self.phase = Phase::Writing(device);
                self.raise(0x18);
            }
            None => {
                self.phase = Phase::Nacked;
                self.raise(if read { 0x48 } else { 0x20 });
            }
        }
    }
}

/// Register view handed to the driver
pub struct SimTwi {
    bus: SimHandle,
}

impl TwiRegisters for SimTwi {
    fn configure_pins(&mut self, pullups: bool) {
        self.bus.borrow_mut().pullups = Some(pullups);
    }

    fn set_bit_rate(&mut self, divisor: u8, prescaler: Prescaler) {
        self.bus.borrow_mut().bit_rate = Some((divisor, prescaler));
    }

    fn status(&self) -> u8 {
        self.bus.borrow().status
    }

    fn data(&self) -> u8 {
        self.bus.borrow().data
    }

    fn set_data(&mut self, byte: u8) {
        self.bus.borrow_mut().data = byte;
    }

    fn set_control(&mut self, control: Control) {
        self.bus.borrow_mut().control(control);
    }
}

/// One executor poll per millisecond
pub struct PollDelay;

impl DelayNs for PollDelay {
    async fn delay_ns(&mut self, ns: u32) {
        for _ in 0..ns.div_ceil(1_000_000) {
            yield_now().await;
        }
    }

    async fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            yield_now().await;
        }
    }
}

/// Bus with `devices` attached, not yet initialized
pub fn unconfigured(devices: Vec<Device>) -> (SimMaster, SimHandle) {
    let bus = Rc::new(RefCell::new(SimBus::new(devices)));
    let master = TwiMaster::new(SimTwi { bus: bus.clone() }, PollDelay);
    (master, bus)
}

/// Bus with `devices` attached, initialized for standard mode
pub fn setup(devices: Vec<Device>) -> (SimMaster, SimHandle) {
    let (master, bus) = unconfigured(devices);
    master.init(&TwiConfig::default()).unwrap();
    (master, bus)
}

/// Run `transfer` to completion while servicing controller interrupts
pub fn drive<F: Future>(master: &SimMaster, bus: &SimHandle, transfer: F) -> F::Output {
    block_on(async {
        match select(transfer, interrupts(master, bus)).await {
            Either::First(output) => output,
            Either::Second(never) => match never {},
        }
    })
}

async fn interrupts(master: &SimMaster, bus: &SimHandle) -> Infallible {
    loop {
        let pending = bus.borrow_mut().take_interrupt();
        if pending {
            master.on_interrupt();
        }
        yield_now().await;
    }
}
