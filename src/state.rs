//! Shared coordination state for the worklet/worker pair.
//!
//! A fixed array of nine 32-bit cells drives both ring channels and the wake
//! handshake. The slot order is part of the shared layout: both sides index
//! the same array, so [`StateField`] discriminants must never be reordered.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

/// Number of coordination slots.
pub const STATE_SLOTS: usize = 9;

/// Named slots of the coordination array.
///
/// `RingBufferLength` and `KernelLength` are written once during setup and
/// are read-only for the rest of the session. Each index slot is written by
/// exactly one side: the producer owns its write index, the consumer owns
/// its read index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum StateField {
    /// Wake signal cell. Carries the count of pending render requests.
    RequestRender = 0,
    InputFramesAvailable = 1,
    InputReadIndex = 2,
    InputWriteIndex = 3,
    OutputFramesAvailable = 4,
    OutputReadIndex = 5,
    OutputWriteIndex = 6,
    RingBufferLength = 7,
    KernelLength = 8,
}

/// Lock-free coordination cells plus the condvar backing the wake signal.
///
/// All slot accesses are single `AtomicI32` operations with relaxed ordering.
/// Only the owning side writes each index, so no stronger ordering is needed
/// for the counters themselves; the condvar pairing provides the
/// happens-before edge for the wake handshake.
pub struct CoordinationState {
    slots: [AtomicI32; STATE_SLOTS],
    wake_lock: Mutex<()>,
    wake_cond: Condvar,
}

impl CoordinationState {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicI32::new(0)),
            wake_lock: Mutex::new(()),
            wake_cond: Condvar::new(),
        }
    }

    #[inline]
    pub fn get(&self, field: StateField) -> i32 {
        self.slots[field as usize].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, field: StateField, value: i32) {
        self.slots[field as usize].store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(&self, field: StateField, value: i32) {
        self.slots[field as usize].fetch_add(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn sub(&self, field: StateField, value: i32) {
        self.slots[field as usize].fetch_sub(value, Ordering::Relaxed);
    }

    /// Issue one render request and wake one waiting worker.
    ///
    /// The request is recorded in the `RequestRender` slot before the notify,
    /// so a request issued while no worker is parked is observed on the
    /// worker's next wait instead of being lost.
    pub fn notify_render(&self) {
        self.slots[StateField::RequestRender as usize].fetch_add(1, Ordering::Relaxed);
        let _guard = self.wake_lock.lock();
        self.wake_cond.notify_one();
    }

    /// Number of render requests not yet consumed by a waiter.
    #[inline]
    pub fn pending_renders(&self) -> i32 {
        self.get(StateField::RequestRender)
    }

    /// Block until a render request is pending, then consume it.
    pub fn wait_for_render(&self) {
        let mut guard = self.wake_lock.lock();
        while self.get(StateField::RequestRender) == 0 {
            self.wake_cond.wait(&mut guard);
        }
        self.sub(StateField::RequestRender, 1);
    }

    /// Like [`wait_for_render`](Self::wait_for_render), but gives up after
    /// `timeout`. Returns `true` if a request was consumed.
    ///
    /// The worker loop uses the timed variant so it can re-check its shutdown
    /// flag between waits.
    pub fn wait_for_render_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.wake_lock.lock();
        while self.get(StateField::RequestRender) == 0 {
            if self.wake_cond.wait_for(&mut guard, timeout).timed_out() {
                if self.get(StateField::RequestRender) == 0 {
                    return false;
                }
                break;
            }
        }
        self.sub(StateField::RequestRender, 1);
        true
    }
}

impl Default for CoordinationState {
    fn default() -> Self {
        Self::new()
    }
}
