//! Real-time side of the bridge.
//!
//! [`WorkletProcessor::process`] is designed to run inside an audio device
//! callback: it never blocks, never allocates, and performs no logging. Until
//! the setup handshake arrives the processor is a harmless no-op.

use crate::protocol::{Ready, SetupMessage, SharedBuffers, WakeTrigger};
use crate::state::StateField;
use crossbeam_channel::Receiver;

struct SessionState {
    buffers: SharedBuffers,
    kernel_length: i32,
    wake_trigger: WakeTrigger,
}

/// Per-quantum push/pull driver plus the threshold-triggered wake.
///
/// Two-phase lifecycle: constructed uninitialized around a handshake
/// receiver, becomes operable on the first `process` call after the
/// [`SetupMessage`] is delivered.
pub struct WorkletProcessor {
    setup_rx: Receiver<SetupMessage>,
    session: Option<SessionState>,
    /// Frames seen since the last wake. Private to the real-time side.
    quantum_frames: i32,
    error_count: u64,
}

impl WorkletProcessor {
    pub fn new(setup_rx: Receiver<SetupMessage>) -> Self {
        Self {
            setup_rx,
            session: None,
            quantum_frames: 0,
            error_count: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Push/pull errors swallowed on the real-time path so far.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Frames accumulated toward the next wake.
    pub fn accumulated_frames(&self) -> i32 {
        self.quantum_frames
    }

    /// Process one device quantum.
    ///
    /// Pushes `inputs` into the capture ring, fills `outputs` from the render
    /// ring, and wakes the worker when the configured trigger fires. Before
    /// the handshake this is a no-op. The return value is the processor
    /// lifetime flag; it is always `true`.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> bool {
        if self.session.is_none() && !self.try_initialize() {
            return true;
        }
        let Some(session) = self.session.as_ref() else {
            return true;
        };

        let has_input = !inputs.is_empty() && inputs.iter().all(|ch| !ch.is_empty());
        if has_input && session.buffers.input().push(inputs).is_err() {
            self.error_count += 1;
        }

        let has_output = !outputs.is_empty() && outputs.iter().all(|ch| !ch.is_empty());
        if has_output && session.buffers.output().pull(outputs).is_err() {
            self.error_count += 1;
        }

        let quantum = outputs
            .first()
            .map(|ch| ch.len())
            .or_else(|| inputs.first().map(|ch| ch.len()))
            .unwrap_or(0) as i32;

        match session.wake_trigger {
            WakeTrigger::QuantumClock => {
                // Fixed-schedule trigger: counts quanta whether or not input
                // arrived. Inherited behavior; see WakeTrigger::InputFrames
                // for the input-driven alternative.
                self.quantum_frames += quantum;
                if self.quantum_frames >= session.kernel_length {
                    session.buffers.state().notify_render();
                    self.quantum_frames = 0;
                }
            }
            WakeTrigger::InputFrames => {
                // One outstanding request at most: re-arm only after the
                // worker consumed the previous wake.
                if session.buffers.state().pending_renders() == 0
                    && session.buffers.input().available() >= session.kernel_length
                {
                    session.buffers.state().notify_render();
                }
            }
        }

        true
    }

    /// Non-blocking handshake poll. Returns `true` once initialized.
    fn try_initialize(&mut self) -> bool {
        let Ok(message) = self.setup_rx.try_recv() else {
            return false;
        };

        let kernel_length = message.buffers.state().get(StateField::KernelLength);
        let wake_trigger = message.buffers.config().wake_trigger;

        self.session = Some(SessionState {
            buffers: message.buffers,
            kernel_length,
            wake_trigger,
        });

        // Listener may already be gone; the processor keeps running either way.
        let _ = message.ready_tx.send(Ready);
        true
    }
}
