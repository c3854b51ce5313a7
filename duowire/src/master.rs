//! Bus request facade
//!
//! [`TwiMaster`] owns one TWI controller. Tasks call the async transfer
//! operations; the controller's interrupt vector calls
//! [`TwiMaster::on_interrupt`]. A transfer stages its request context,
//! fires a START and awaits the completion flags or the timeout, whichever
//! comes first. Callers are serialized by a request lock so only one
//! transaction is ever in flight. Dropping a transfer future mid-flight
//! issues STOP and discards the request before the next caller gets in.
//!
//! ```rust,ignore
//! static BUS: OnceLock<TwiMaster<Atmega328pTwi, Delay>> = OnceLock::new();
//!
//! let bus = BUS.get_or_init(|| TwiMaster::new(registers, Delay));
//! bus.init(&TwiConfig::STANDARD)?;
//! bus.probe(0x50, 10).await?;
//! bus.transmit(0x50, &[0x00, 0x10, 0xAB], 10).await?;
//! ```

use core::cell::RefCell;
use core::mem;

use duowire_hal::{Control, Status, TwiRegisters};
use embassy_futures::select::{select, Either};
use embassy_hal_internal::drop::OnDrop;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;

use crate::config::{BitRate, TwiConfig};
use crate::engine::{Command, Outcome, Register, Transfer};
use crate::error::Error;
use crate::flags::{Completion, EventFlags};

/// Default transfer buffer size
pub const DEFAULT_CAPACITY: usize = 32;

/// Where the request context currently is
enum Slot<const N: usize> {
    /// No transaction staged
    Idle,
    /// Owned by the interrupt handler
    Busy(Transfer<N>),
    /// Finished, waiting to be collected by the caller
    Done(Transfer<N>),
}

/// State shared with the interrupt handler
struct Inner<T, const N: usize> {
    registers: T,
    initialized: bool,
    slot: Slot<N>,
}

/// Interrupt-driven TWI master
///
/// `N` bounds the payload of a single transfer.
pub struct TwiMaster<T, D, const N: usize = DEFAULT_CAPACITY> {
    inner: BlockingMutex<CriticalSectionRawMutex, RefCell<Inner<T, N>>>,
    flags: EventFlags,
    request: Mutex<CriticalSectionRawMutex, D>,
}

impl<T: TwiRegisters, D: DelayNs, const N: usize> TwiMaster<T, D, N> {
    /// Create an unconfigured bus
    ///
    /// `delay` times out transfers; on target this is usually
    /// `embassy_time::Delay`.
    pub const fn new(registers: T, delay: D) -> Self {
        Self {
            inner: BlockingMutex::new(RefCell::new(Inner {
                registers,
                initialized: false,
                slot: Slot::Idle,
            })),
            flags: EventFlags::new(),
            request: Mutex::new(delay),
        }
    }

    /// Configure pins and bus speed
    ///
    /// Registers are written with interrupts disabled. A second call fails
    /// with [`Error::InvalidState`].
    pub fn init(&self, config: &TwiConfig) -> Result<(), Error> {
        let rate = BitRate::for_config(config)?;

        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            if inner.initialized {
                return Err(Error::InvalidState);
            }

            inner.registers.configure_pins(config.pullups);
            inner.registers.set_bit_rate(rate.divisor, rate.prescaler);
            inner.initialized = true;
            Ok(())
        })?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "TWI configured: {=u32} Hz (divisor {=u8}, {}), pull-ups {=bool}",
            rate.scl_frequency(config.cpu_hz),
            rate.divisor,
            rate.prescaler,
            config.pullups
        );

        Ok(())
    }

    /// Whether `init` has completed
    pub fn is_initialized(&self) -> bool {
        self.inner.lock(|inner| inner.borrow().initialized)
    }

    /// Check whether a device acknowledges `address`
    ///
    /// No data byte is transferred.
    pub async fn probe(&self, address: u8, timeout_ms: u32) -> Result<(), Error> {
        let transfer = Transfer::probe(address)?;
        self.execute(transfer, timeout_ms).await.map(|_| ())
    }

    /// Write `data` to the device at `address`
    pub async fn transmit(&self, address: u8, data: &[u8], timeout_ms: u32) -> Result<(), Error> {
        let transfer = Transfer::write(address, data)?;
        self.execute(transfer, timeout_ms).await.map(|_| ())
    }

    /// Fill `data` from the device at `address`
    ///
    /// `data` is only written when the transfer succeeds.
    pub async fn receive(&self, address: u8, data: &mut [u8], timeout_ms: u32) -> Result<(), Error> {
        let transfer = Transfer::read(address, data.len())?;
        let done = self.execute(transfer, timeout_ms).await?;
        data.copy_from_slice(done.payload());
        Ok(())
    }

    /// Write `data` to `register` of the device at `address`
    ///
    /// An empty `data` only sets the device's register pointer.
    pub async fn transmit_register(
        &self,
        address: u8,
        register: impl Into<Register>,
        data: &[u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let transfer = Transfer::write_register(address, register.into(), data)?;
        self.execute(transfer, timeout_ms).await.map(|_| ())
    }

    /// Read `register` of the device at `address` into `data`
    ///
    /// The register id is written, then a repeated START turns the bus
    /// around for the read.
    pub async fn receive_register(
        &self,
        address: u8,
        register: impl Into<Register>,
        data: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let transfer = Transfer::read_register(address, register.into(), data.len())?;
        let done = self.execute(transfer, timeout_ms).await?;
        data.copy_from_slice(done.payload());
        Ok(())
    }

    /// TWI interrupt entry point
    ///
    /// Advances the staged transfer by one step. An interrupt with no
    /// transfer in flight only releases the bus.
    pub fn on_interrupt(&self) {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            let inner = &mut *inner;

            let Slot::Busy(transfer) = &mut inner.slot else {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "TWI interrupt with no transfer in flight (status {=u8:#x})",
                    inner.registers.status()
                );
                inner.registers.set_control(Control::STOP);
                return;
            };

            let status = Status::from_register(inner.registers.status());
            let step = transfer.advance(status, inner.registers.data());
            issue(&mut inner.registers, step.command);

            if let Some(outcome) = step.outcome {
                if let Slot::Busy(transfer) = mem::replace(&mut inner.slot, Slot::Idle) {
                    inner.slot = Slot::Done(transfer);
                }
                // STOP is already on the bus
                self.flags.post(outcome.flag());
            }
        });
    }

    async fn execute(&self, transfer: Transfer<N>, timeout_ms: u32) -> Result<Transfer<N>, Error> {
        let mut delay = self.request.lock().await;

        #[cfg(feature = "defmt")]
        let (address, mode) = (transfer.address(), transfer.mode());

        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            if !inner.initialized {
                return Err(Error::InvalidState);
            }

            self.flags.clear(Completion::all());
            inner.slot = Slot::Busy(transfer);
            inner.registers.set_control(Control::START);
            Ok(())
        })?;

        // Caller dropped the future mid-transaction: release the bus before
        // the request lock goes
        let on_drop = OnDrop::new(|| self.abandon());

        let waited = match select(
            self.flags.wait_any(Completion::all()),
            delay.delay_ms(timeout_ms),
        )
        .await
        {
            Either::First(flags) => flags,
            Either::Second(()) => Completion::empty(),
        };
        on_drop.defuse();

        let (flags, finished) = self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            // Picks up a completion that raced the timeout
            let flags = waited | self.flags.take(Completion::all());
            match mem::replace(&mut inner.slot, Slot::Idle) {
                Slot::Done(transfer) => (flags, Some(transfer)),
                Slot::Busy(_) => {
                    // Abandon the hardware transaction; late interrupts now
                    // find no transfer and post nothing
                    inner.registers.set_control(Control::STOP);
                    (flags, None)
                }
                Slot::Idle => (flags, None),
            }
        });

        let Some(outcome) = Outcome::from_flags(flags) else {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "TWI {} to {=u8:#x} timed out after {=u32} ms",
                mode,
                address,
                timeout_ms
            );
            return Err(Error::Timeout);
        };

        #[cfg(feature = "defmt")]
        defmt::trace!("TWI {} to {=u8:#x}: {}", mode, address, outcome);

        outcome.into_result()?;
        finished.ok_or(Error::InvalidState)
    }

    fn abandon(&self) {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            if let Slot::Busy(_) = mem::replace(&mut inner.slot, Slot::Idle) {
                inner.registers.set_control(Control::STOP);
            }
            self.flags.clear(Completion::all());
        });

        #[cfg(feature = "defmt")]
        defmt::warn!("TWI transfer cancelled, bus released");
    }
}

fn issue<T: TwiRegisters>(registers: &mut T, command: Command) {
    match command {
        Command::Send(byte) => {
            registers.set_data(byte);
            registers.set_control(Control::CONTINUE);
        }
        Command::Receive { ack: true } => registers.set_control(Control::CONTINUE_ACK),
        Command::Receive { ack: false } => registers.set_control(Control::CONTINUE),
        Command::RepeatedStart => registers.set_control(Control::START),
        Command::Stop => registers.set_control(Control::STOP),
    }
}
