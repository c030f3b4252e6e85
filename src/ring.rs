//! Fixed-capacity wraparound sample channels.
//!
//! A [`RingChannel`] holds one circular `f32` buffer per logical channel.
//! All channels of a ring share a single (available, read, write) slot triple
//! in the [`CoordinationState`]; the producer advances only the write index
//! and the consumer advances only the read index, so no lock is needed for
//! the intended single-producer/single-consumer access pattern.

use crate::error::{BridgeError, Result};
use crate::state::{CoordinationState, StateField};
use std::cell::UnsafeCell;
use std::sync::Arc;

/// Uses `UnsafeCell` for interior mutability since the sample buffers are
/// written through a shared reference from the producer side. This is safe
/// because:
/// 1. Only one side writes to the ring at a time (single producer)
/// 2. Reader and writer each advance only their own index
/// 3. A race on sample data under overrun reads stale audio, which is the
///    documented behavior, not undefined behavior at the index level
pub struct RingChannel {
    state: Arc<CoordinationState>,
    buffers: Vec<UnsafeCell<Box<[f32]>>>,
    len: usize,
    available: StateField,
    read: StateField,
    write: StateField,
}

// SAFETY: see the struct-level contract. Index slots are atomics; sample
// buffers follow the single-writer/single-reader discipline enforced by the
// processor/worker split.
unsafe impl Send for RingChannel {}
unsafe impl Sync for RingChannel {}

impl RingChannel {
    /// Capture-path ring: the real-time side pushes, the worker drains.
    pub(crate) fn input(state: Arc<CoordinationState>, channels: usize, len: usize) -> Self {
        Self::new(
            state,
            channels,
            len,
            StateField::InputFramesAvailable,
            StateField::InputReadIndex,
            StateField::InputWriteIndex,
        )
    }

    /// Render-path ring: the worker fills, the real-time side drains.
    pub(crate) fn output(state: Arc<CoordinationState>, channels: usize, len: usize) -> Self {
        Self::new(
            state,
            channels,
            len,
            StateField::OutputFramesAvailable,
            StateField::OutputReadIndex,
            StateField::OutputWriteIndex,
        )
    }

    fn new(
        state: Arc<CoordinationState>,
        channels: usize,
        len: usize,
        available: StateField,
        read: StateField,
        write: StateField,
    ) -> Self {
        let buffers = (0..channels)
            .map(|_| UnsafeCell::new(vec![0.0f32; len].into_boxed_slice()))
            .collect();

        Self {
            state,
            buffers,
            len,
            available,
            read,
            write,
        }
    }

    /// Ring capacity in frames.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn channels(&self) -> usize {
        self.buffers.len()
    }

    /// Frames pushed but not yet consumed.
    ///
    /// Pulling does not touch this counter; consumers call [`consume`]
    /// (Self::consume) once they have drained frames.
    pub fn available(&self) -> i32 {
        self.state.get(self.available)
    }

    /// Record that the consumer has drained `n` frames.
    pub fn consume(&self, n: i32) {
        self.state.sub(self.available, n);
    }

    /// Copy one quantum into the ring and advance the shared write index.
    ///
    /// `frames[ch]` is channel `ch`'s quantum; all channels must be the same
    /// length. The write index advances once per call regardless of channel
    /// count. The available counter is incremented unconditionally; overrun
    /// handling belongs to the consumer.
    ///
    /// Never blocks, never allocates.
    pub fn push(&self, frames: &[&[f32]]) -> Result<()> {
        if frames.len() != self.buffers.len() {
            return Err(BridgeError::ChannelMismatch {
                expected: self.buffers.len(),
                actual: frames.len(),
            });
        }

        let n = frames.first().map_or(0, |f| f.len());
        if n == 0 {
            return Ok(());
        }
        if n > self.len {
            return Err(BridgeError::QuantumTooLarge {
                quantum: n,
                capacity: self.len,
            });
        }
        for (channel, data) in frames.iter().enumerate() {
            if data.len() != n {
                return Err(BridgeError::QuantumSizeMismatch {
                    channel,
                    expected: n,
                    actual: data.len(),
                });
            }
        }

        let w = self.state.get(self.write) as usize;

        // Strict less-than: a push landing exactly on the boundary takes the
        // wrap path and leaves the write index at 0.
        if w + n < self.len {
            for (ch, data) in frames.iter().enumerate() {
                let buffer = self.channel_mut(ch);
                buffer[w..w + n].copy_from_slice(data);
            }
            self.state.set(self.write, (w + n) as i32);
        } else {
            let split = self.len - w;
            for (ch, data) in frames.iter().enumerate() {
                let buffer = self.channel_mut(ch);
                buffer[w..].copy_from_slice(&data[..split]);
                buffer[..n - split].copy_from_slice(&data[split..]);
            }
            self.state.set(self.write, (n - split) as i32);
        }

        self.state.add(self.available, n as i32);
        Ok(())
    }

    /// Fill one quantum from the ring and advance the shared read index.
    ///
    /// Always fills the destination in full. No available-frames check is
    /// performed: if the producer has fallen behind, the destination receives
    /// whatever stale or zeroed samples currently occupy the buffer. The
    /// available counter is left untouched; see [`consume`](Self::consume).
    ///
    /// Never blocks, never allocates.
    pub fn pull(&self, frames: &mut [&mut [f32]]) -> Result<()> {
        if frames.len() != self.buffers.len() {
            return Err(BridgeError::ChannelMismatch {
                expected: self.buffers.len(),
                actual: frames.len(),
            });
        }

        let n = frames.first().map_or(0, |f| f.len());
        if n == 0 {
            return Ok(());
        }
        if n > self.len {
            return Err(BridgeError::QuantumTooLarge {
                quantum: n,
                capacity: self.len,
            });
        }
        for (channel, data) in frames.iter().enumerate() {
            if data.len() != n {
                return Err(BridgeError::QuantumSizeMismatch {
                    channel,
                    expected: n,
                    actual: data.len(),
                });
            }
        }

        let r = self.state.get(self.read) as usize;
        let next = r + n;

        if next < self.len {
            for (ch, dest) in frames.iter_mut().enumerate() {
                let buffer = self.channel_ref(ch);
                dest.copy_from_slice(&buffer[r..next]);
            }
            self.state.set(self.read, next as i32);
        } else {
            let overflow = next - self.len;
            let first = self.len - r;
            for (ch, dest) in frames.iter_mut().enumerate() {
                let buffer = self.channel_ref(ch);
                dest[..first].copy_from_slice(&buffer[r..]);
                dest[first..].copy_from_slice(&buffer[..overflow]);
            }
            self.state.set(self.read, overflow as i32);
        }

        Ok(())
    }

    #[allow(clippy::mut_from_ref)]
    #[inline]
    fn channel_mut(&self, ch: usize) -> &mut [f32] {
        // SAFETY: single writer per ring (struct-level contract).
        unsafe { &mut *self.buffers[ch].get() }
    }

    #[inline]
    fn channel_ref(&self, ch: usize) -> &[f32] {
        // SAFETY: reads race only with sample data, never with index slots.
        unsafe { &*self.buffers[ch].get() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateField;

    fn test_ring(channels: usize, len: usize) -> (Arc<CoordinationState>, RingChannel) {
        let state = Arc::new(CoordinationState::new());
        let ring = RingChannel::input(Arc::clone(&state), channels, len);
        (state, ring)
    }

    #[test]
    fn test_contiguous_push_advances_write_index() {
        let (state, ring) = test_ring(1, 256);
        let quantum: Vec<f32> = (0..128).map(|i| i as f32).collect();

        ring.push(&[&quantum]).unwrap();

        assert_eq!(state.get(StateField::InputWriteIndex), 128);
        assert_eq!(ring.available(), 128);
    }

    #[test]
    fn test_wraparound_push_splits_at_boundary() {
        // ring 256: push 200 then 200; the second push splits at offset 56.
        let (state, ring) = test_ring(1, 256);
        let first: Vec<f32> = (0..200).map(|i| i as f32).collect();
        let second: Vec<f32> = (200..400).map(|i| i as f32).collect();

        ring.push(&[&first]).unwrap();
        assert_eq!(state.get(StateField::InputWriteIndex), 200);

        ring.push(&[&second]).unwrap();
        // 200 + 200 wraps: 56 samples land at [200, 256), 144 at [0, 144).
        assert_eq!(state.get(StateField::InputWriteIndex), 144);
        assert_eq!(ring.available(), 400);

        let mut out = vec![0.0f32; 200];
        ring.pull(&mut [&mut out]).unwrap();
        assert_eq!(out, first);

        ring.pull(&mut [&mut out]).unwrap();
        assert_eq!(out, second);
        assert_eq!(state.get(StateField::InputReadIndex), 144);
    }

    #[test]
    fn test_push_landing_exactly_on_boundary_wraps_to_zero() {
        let (state, ring) = test_ring(1, 128);
        let quantum = vec![1.0f32; 128];

        ring.push(&[&quantum]).unwrap();

        // w + n == len takes the wrap path: empty second half, index 0.
        assert_eq!(state.get(StateField::InputWriteIndex), 0);
        assert_eq!(ring.available(), 128);
    }

    #[test]
    fn test_pull_landing_exactly_on_boundary_wraps_to_zero() {
        let (state, ring) = test_ring(1, 128);
        let quantum: Vec<f32> = (0..128).map(|i| i as f32).collect();
        ring.push(&[&quantum]).unwrap();

        let mut out = vec![0.0f32; 128];
        ring.pull(&mut [&mut out]).unwrap();

        assert_eq!(out, quantum);
        assert_eq!(state.get(StateField::InputReadIndex), 0);
    }

    #[test]
    fn test_pull_does_not_touch_available() {
        let (_state, ring) = test_ring(1, 256);
        ring.push(&[&vec![0.5f32; 64][..]]).unwrap();

        let mut out = vec![0.0f32; 64];
        ring.pull(&mut [&mut out]).unwrap();
        assert_eq!(ring.available(), 64);

        ring.consume(64);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn test_multi_channel_push_advances_index_once() {
        let (state, ring) = test_ring(2, 256);
        let left = vec![1.0f32; 64];
        let right = vec![-1.0f32; 64];

        ring.push(&[&left, &right]).unwrap();

        assert_eq!(state.get(StateField::InputWriteIndex), 64);
        assert_eq!(ring.available(), 64);

        let mut out_l = vec![0.0f32; 64];
        let mut out_r = vec![0.0f32; 64];
        ring.pull(&mut [&mut out_l, &mut out_r]).unwrap();
        assert_eq!(out_l, left);
        assert_eq!(out_r, right);
    }

    #[test]
    fn test_channel_count_mismatch() {
        let (_state, ring) = test_ring(2, 256);
        let mono = vec![0.0f32; 64];

        let err = ring.push(&[&mono[..]]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ChannelMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_ragged_quantum_rejected() {
        let (_state, ring) = test_ring(2, 256);
        let left = vec![0.0f32; 64];
        let right = vec![0.0f32; 32];

        let err = ring.push(&[&left[..], &right[..]]).unwrap_err();
        assert!(matches!(err, BridgeError::QuantumSizeMismatch { channel: 1, .. }));
    }

    #[test]
    fn test_oversized_quantum_rejected() {
        let (_state, ring) = test_ring(1, 128);
        let too_big = vec![0.0f32; 129];

        assert!(matches!(
            ring.push(&[&too_big[..]]).unwrap_err(),
            BridgeError::QuantumTooLarge { .. }
        ));

        let mut dest = vec![0.0f32; 129];
        assert!(matches!(
            ring.pull(&mut [&mut dest[..]]).unwrap_err(),
            BridgeError::QuantumTooLarge { .. }
        ));
    }

    #[test]
    fn test_zero_length_push_is_noop() {
        let (state, ring) = test_ring(1, 128);
        ring.push(&[&[][..]]).unwrap();
        assert_eq!(state.get(StateField::InputWriteIndex), 0);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn test_pull_from_untouched_ring_yields_zeros() {
        // No underrun detection: pulling ahead of the producer returns
        // whatever occupies the buffer, zeros at session start.
        let (_state, ring) = test_ring(1, 128);
        let mut out = vec![9.9f32; 64];
        ring.pull(&mut [&mut out]).unwrap();
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
