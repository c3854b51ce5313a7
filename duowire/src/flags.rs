//! Completion flag-set shared between the interrupt handler and tasks
//!
//! The interrupt handler [`post`](EventFlags::post)s outcome bits; a task
//! waits for any bit of a mask with [`wait_any`](EventFlags::wait_any).
//! Matched bits are cleared in the same critical section that observes
//! them, so a posted outcome is consumed exactly once.

use core::cell::Cell;
use core::future::{poll_fn, Future};
use core::task::Poll;

use bitflags::bitflags;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::waitqueue::AtomicWaker;

bitflags! {
    /// Terminal outcomes of a bus transaction
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Completion: u8 {
        /// Transaction finished
        const OK = 1 << 0;
        /// Address or data byte not acknowledged
        const NACK = 1 << 1;
        /// Arbitration lost
        const COLLISION = 1 << 2;
        /// Bus error or protocol violation
        const BUS_FAIL = 1 << 3;
    }
}

/// Interrupt-safe flag-set with a single waiting task
pub struct EventFlags {
    bits: BlockingMutex<CriticalSectionRawMutex, Cell<u8>>,
    waker: AtomicWaker,
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFlags {
    /// Create an empty flag-set
    pub const fn new() -> Self {
        Self {
            bits: BlockingMutex::new(Cell::new(0)),
            waker: AtomicWaker::new(),
        }
    }

    /// Raise flags and wake the waiter. Safe to call from interrupt context.
    pub fn post(&self, flags: Completion) {
        self.bits.lock(|bits| bits.set(bits.get() | flags.bits()));
        self.waker.wake();
    }

    /// Currently raised flags, without clearing them
    pub fn pending(&self) -> Completion {
        Completion::from_bits_retain(self.bits.lock(Cell::get))
    }

    /// Clear the flags in `mask`
    pub fn clear(&self, mask: Completion) {
        self.take(mask);
    }

    /// Clear and return the raised flags in `mask`
    pub fn take(&self, mask: Completion) -> Completion {
        self.bits.lock(|bits| {
            let raised = Completion::from_bits_retain(bits.get());
            let hit = raised & mask;
            bits.set((raised - hit).bits());
            hit
        })
    }

    /// Wait until any flag in `mask` is raised; the matched flags are cleared
    pub fn wait_any(&self, mask: Completion) -> impl Future<Output = Completion> + '_ {
        poll_fn(move |cx| {
            self.waker.register(cx.waker());
            let hit = self.take(mask);
            if hit.is_empty() {
                Poll::Pending
            } else {
                Poll::Ready(hit)
            }
        })
    }
}
