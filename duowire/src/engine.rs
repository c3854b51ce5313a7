//! Master-mode protocol engine
//!
//! The engine is advanced once per TWI interrupt. Each call takes the
//! controller's post-operation [`Status`] and returns a [`Step`]: the next
//! bus command and, on terminal states, the transaction outcome.
//!
//! | Status                  | Action                                        | Terminal  |
//! |-------------------------|-----------------------------------------------|-----------|
//! | bus error               | STOP                                          | BUS-FAIL  |
//! | START sent              | load SLA+R (plain read) or SLA+W              |           |
//! | repeated START sent     | load SLA+R (register read)                    |           |
//! | SLA+W ACK / data ACK    | next register byte, repeated START, next data byte, or STOP | OK when drained |
//! | SLA+W / data / SLA+R NACK | STOP                                        | NACK      |
//! | arbitration lost        | STOP                                          | COLLISION |
//! | SLA+R ACK               | request byte, ACK unless it is the last       |           |
//! | data received, ACK      | store, request next, ACK unless last          |           |
//! | data received, NACK     | store, STOP                                   | OK        |
//! | anything else           | STOP                                          | BUS-FAIL  |
//!
//! Every terminal step carries [`Command::Stop`], so the bus is released
//! before the outcome is posted to the waiting task.

use duowire_hal::Status;
use heapless::Vec;

use crate::error::Error;
use crate::flags::Completion;

/// Largest 7-bit device address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Transaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// SLA+W, payload
    Write,
    /// SLA+R, payload
    Read,
    /// SLA+W, register, payload
    WriteRegister,
    /// SLA+W, register, repeated START, SLA+R, payload
    ReadRegister,
}

/// Device register id shifted out before the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// 8-bit register
    U8(u8),
    /// 16-bit register, sent high byte first
    U16(u16),
}

impl Register {
    fn bytes(self) -> Vec<u8, 2> {
        let mut bytes = Vec::new();
        match self {
            Register::U8(reg) => {
                let _ = bytes.push(reg);
            }
            Register::U16(reg) => {
                let _ = bytes.extend_from_slice(&reg.to_be_bytes());
            }
        }
        bytes
    }
}

impl From<u8> for Register {
    fn from(reg: u8) -> Self {
        Register::U8(reg)
    }
}

impl From<u16> for Register {
    fn from(reg: u16) -> Self {
        Register::U16(reg)
    }
}

/// Next operation for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Load the data register and clock the byte out
    Send(u8),
    /// Clock a byte in, acknowledging it or not
    Receive {
        /// Assert ACK after the byte
        ack: bool,
    },
    /// Generate a repeated START
    RepeatedStart,
    /// Generate STOP and release the bus
    Stop,
}

/// Terminal transaction outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// All bytes transferred
    Complete,
    /// Address or data NACK
    Nack,
    /// Arbitration lost
    Collision,
    /// Bus error or unexpected status
    BusFault,
}

impl Outcome {
    /// Completion flag posted for this outcome
    pub fn flag(self) -> Completion {
        match self {
            Outcome::Complete => Completion::OK,
            Outcome::Nack => Completion::NACK,
            Outcome::Collision => Completion::COLLISION,
            Outcome::BusFault => Completion::BUS_FAIL,
        }
    }

    /// Most significant outcome among raised flags
    ///
    /// Success wins over NACK, which wins over the failure flags.
    pub fn from_flags(flags: Completion) -> Option<Self> {
        if flags.contains(Completion::OK) {
            Some(Outcome::Complete)
        } else if flags.contains(Completion::NACK) {
            Some(Outcome::Nack)
        } else if flags.contains(Completion::COLLISION) {
            Some(Outcome::Collision)
        } else if flags.contains(Completion::BUS_FAIL) {
            Some(Outcome::BusFault)
        } else {
            None
        }
    }

    /// Caller-facing result
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Outcome::Complete => Ok(()),
            Outcome::Nack => Err(Error::Nack),
            Outcome::Collision => Err(Error::ArbitrationLost),
            Outcome::BusFault => Err(Error::BusFault),
        }
    }
}

/// One engine transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// Command to issue
    pub command: Command,
    /// Set when the transaction has ended
    pub outcome: Option<Outcome>,
}

impl Step {
    const fn send(byte: u8) -> Self {
        Self {
            command: Command::Send(byte),
            outcome: None,
        }
    }

    const fn receive(ack: bool) -> Self {
        Self {
            command: Command::Receive { ack },
            outcome: None,
        }
    }

    const fn repeated_start() -> Self {
        Self {
            command: Command::RepeatedStart,
            outcome: None,
        }
    }

    const fn stop(outcome: Outcome) -> Self {
        Self {
            command: Command::Stop,
            outcome: Some(outcome),
        }
    }
}

/// Request context for one transaction
///
/// Holds the target, the mode and the payload. For writes the engine walks
/// through the payload; for reads it fills it in bus order.
#[derive(Debug, Clone)]
pub struct Transfer<const N: usize> {
    address: u8,
    mode: Mode,
    register: Vec<u8, 2>,
    register_sent: usize,
    restarted: bool,
    buffer: Vec<u8, N>,
    cursor: usize,
}

impl<const N: usize> Transfer<N> {
    /// Write `data` to `address`
    pub fn write(address: u8, data: &[u8]) -> Result<Self, Error> {
        Self::outgoing(address, Mode::Write, None, data)
    }

    /// Read `len` bytes from `address`
    pub fn read(address: u8, len: usize) -> Result<Self, Error> {
        Self::incoming(address, Mode::Read, None, len)
    }

    /// Address-only write: stops right after the address is acknowledged
    pub fn probe(address: u8) -> Result<Self, Error> {
        Self::new(address, Mode::Write, None)
    }

    /// Write `data` to `register` of `address`
    ///
    /// `data` may be empty: only the register id is sent, which sets the
    /// device's register pointer.
    pub fn write_register(address: u8, register: Register, data: &[u8]) -> Result<Self, Error> {
        Self::outgoing(address, Mode::WriteRegister, Some(register), data)
    }

    /// Read `len` bytes from `register` of `address`
    pub fn read_register(address: u8, register: Register, len: usize) -> Result<Self, Error> {
        Self::incoming(address, Mode::ReadRegister, Some(register), len)
    }

    fn new(address: u8, mode: Mode, register: Option<Register>) -> Result<Self, Error> {
        if address > MAX_ADDRESS {
            return Err(Error::InvalidArg);
        }

        Ok(Self {
            address,
            mode,
            register: register.map(Register::bytes).unwrap_or_default(),
            register_sent: 0,
            restarted: false,
            buffer: Vec::new(),
            cursor: 0,
        })
    }

    fn outgoing(
        address: u8,
        mode: Mode,
        register: Option<Register>,
        data: &[u8],
    ) -> Result<Self, Error> {
        if data.is_empty() && register.is_none() {
            return Err(Error::InvalidArg);
        }
        let mut transfer = Self::new(address, mode, register)?;
        transfer
            .buffer
            .extend_from_slice(data)
            .map_err(|_| Error::InvalidSize)?;
        Ok(transfer)
    }

    fn incoming(
        address: u8,
        mode: Mode,
        register: Option<Register>,
        len: usize,
    ) -> Result<Self, Error> {
        if len == 0 {
            return Err(Error::InvalidArg);
        }
        let mut transfer = Self::new(address, mode, register)?;
        transfer
            .buffer
            .resize(len, 0)
            .map_err(|_| Error::InvalidSize)?;
        Ok(transfer)
    }

    /// Target device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Transaction mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Payload bytes not yet transferred
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Payload; for reads, the bytes received so far in bus order
    pub fn payload(&self) -> &[u8] {
        &self.buffer
    }

    /// Advance the transaction by one controller status
    ///
    /// `data` is the current data register contents, consumed only when a
    /// byte has been received.
    pub fn advance(&mut self, status: Status, data: u8) -> Step {
        match status {
            Status::BusError => Step::stop(Outcome::BusFault),
            Status::Start => Step::send(self.address_byte(self.mode == Mode::Read)),
            Status::RepeatedStart if self.awaiting_restart() => {
                self.restarted = true;
                Step::send(self.address_byte(true))
            }
            Status::AddressWriteAck | Status::DataSentAck if self.writing() => self.next_write(),
            Status::AddressWriteNack | Status::DataSentNack | Status::AddressReadNack => {
                Step::stop(Outcome::Nack)
            }
            Status::ArbitrationLost => Step::stop(Outcome::Collision),
            Status::AddressReadAck if self.reading() => self.request_byte(),
            Status::DataReceivedAck if self.reading() => {
                self.store(data);
                self.request_byte()
            }
            Status::DataReceivedNack if self.reading() => {
                self.store(data);
                Step::stop(Outcome::Complete)
            }
            _ => Step::stop(Outcome::BusFault),
        }
    }

    fn address_byte(&self, read: bool) -> u8 {
        (self.address << 1) | u8::from(read)
    }

    fn register_done(&self) -> bool {
        self.register_sent == self.register.len()
    }

    fn awaiting_restart(&self) -> bool {
        self.mode == Mode::ReadRegister && !self.restarted && self.register_done()
    }

    fn writing(&self) -> bool {
        match self.mode {
            Mode::Write | Mode::WriteRegister => true,
            Mode::ReadRegister => !self.restarted,
            Mode::Read => false,
        }
    }

    fn reading(&self) -> bool {
        match self.mode {
            Mode::Read => true,
            Mode::ReadRegister => self.restarted,
            Mode::Write | Mode::WriteRegister => false,
        }
    }

    fn next_write(&mut self) -> Step {
        if let Some(&byte) = self.register.get(self.register_sent) {
            self.register_sent += 1;
            return Step::send(byte);
        }

        if self.mode == Mode::ReadRegister {
            return Step::repeated_start();
        }

        match self.buffer.get(self.cursor) {
            Some(&byte) => {
                self.cursor += 1;
                Step::send(byte)
            }
            None => Step::stop(Outcome::Complete),
        }
    }

    fn request_byte(&self) -> Step {
        match self.remaining() {
            0 => Step::stop(Outcome::Complete),
            // NACK the final byte so the device stops driving SDA
            1 => Step::receive(false),
            _ => Step::receive(true),
        }
    }

    fn store(&mut self, byte: u8) {
        if let Some(slot) = self.buffer.get_mut(self.cursor) {
            *slot = byte;
            self.cursor += 1;
        }
    }
}
