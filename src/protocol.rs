//! Bridge configuration and the setup handshake.
//!
//! The bridge becomes operable only after an external initializer allocates
//! the shared buffers and delivers them to the real-time side as a
//! [`SetupMessage`]. The processor answers with a single [`Ready`]
//! notification once it has adopted the shared state.

use crate::error::{BridgeError, Result};
use crate::ring::RingChannel;
use crate::state::{CoordinationState, StateField};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What drives the worker wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeTrigger {
    /// Wake on a fixed schedule: every quantum adds its frame count to an
    /// accumulator, firing once it reaches the kernel length, whether or not
    /// any input arrived. This is the inherited production behavior.
    QuantumClock,
    /// Wake only once the input ring actually holds a kernel's worth of
    /// frames. At most one request is kept pending at a time.
    InputFrames,
}

#[allow(clippy::derivable_impls)]
impl Default for WakeTrigger {
    fn default() -> Self {
        WakeTrigger::QuantumClock
    }
}

/// Bridge session parameters, fixed for the lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Capacity of each ring in frames.
    pub ring_length: usize,
    /// Frames the worker processes per activation; also the wake threshold.
    pub kernel_length: usize,
    /// Logical channels per ring.
    pub channels: usize,
    #[serde(default)]
    pub wake_trigger: WakeTrigger,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ring_length: 4096,
            kernel_length: 2048,
            channels: 1,
            wake_trigger: WakeTrigger::default(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ring_length == 0 {
            return Err(BridgeError::InvalidConfig("ring_length must be > 0".into()));
        }
        if self.kernel_length == 0 {
            return Err(BridgeError::InvalidConfig(
                "kernel_length must be > 0".into(),
            ));
        }
        if self.channels == 0 {
            return Err(BridgeError::InvalidConfig("channels must be > 0".into()));
        }
        if self.kernel_length > self.ring_length {
            return Err(BridgeError::InvalidConfig(format!(
                "kernel_length {} exceeds ring_length {}",
                self.kernel_length, self.ring_length
            )));
        }
        // Indices live in i32 coordination slots.
        if self.ring_length > i32::MAX as usize {
            return Err(BridgeError::InvalidConfig(
                "ring_length does not fit a 32-bit coordination slot".into(),
            ));
        }
        Ok(())
    }
}

/// Handles to the coordination state and both ring channels.
///
/// Allocated once by the external initializer; cloning is cheap, shared
/// state is behind Arcs.
#[derive(Clone)]
pub struct SharedBuffers {
    state: Arc<CoordinationState>,
    input: Arc<RingChannel>,
    output: Arc<RingChannel>,
    config: BridgeConfig,
}

impl SharedBuffers {
    /// Allocate the coordination state and both rings, and populate the
    /// one-time `RingBufferLength` / `KernelLength` slots.
    pub fn allocate(config: &BridgeConfig) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(CoordinationState::new());
        state.set(StateField::RingBufferLength, config.ring_length as i32);
        state.set(StateField::KernelLength, config.kernel_length as i32);

        let input = Arc::new(RingChannel::input(
            Arc::clone(&state),
            config.channels,
            config.ring_length,
        ));
        let output = Arc::new(RingChannel::output(
            Arc::clone(&state),
            config.channels,
            config.ring_length,
        ));

        Ok(Self {
            state,
            input,
            output,
            config: config.clone(),
        })
    }

    pub fn state(&self) -> &CoordinationState {
        &self.state
    }

    /// Capture-path ring (real-time side pushes, worker drains).
    pub fn input(&self) -> &RingChannel {
        &self.input
    }

    /// Render-path ring (worker fills, real-time side drains).
    pub fn output(&self) -> &RingChannel {
        &self.output
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

/// One-shot readiness notification emitted by the real-time side after it
/// adopts the shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready;

/// Setup handshake payload delivered to the real-time processor.
pub struct SetupMessage {
    pub buffers: SharedBuffers,
    pub ready_tx: Sender<Ready>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        BridgeConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_degenerate_configs() {
        let mut config = BridgeConfig {
            ring_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = BridgeConfig {
            kernel_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = BridgeConfig {
            channels: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = BridgeConfig {
            ring_length: 256,
            kernel_length: 512,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allocate_populates_one_time_slots() {
        let config = BridgeConfig {
            ring_length: 1024,
            kernel_length: 512,
            channels: 2,
            wake_trigger: WakeTrigger::QuantumClock,
        };
        let buffers = SharedBuffers::allocate(&config).unwrap();

        assert_eq!(buffers.state().get(StateField::RingBufferLength), 1024);
        assert_eq!(buffers.state().get(StateField::KernelLength), 512);
        assert_eq!(buffers.input().len(), 1024);
        assert_eq!(buffers.output().len(), 1024);
        assert_eq!(buffers.input().channels(), 2);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = BridgeConfig {
            ring_length: 512,
            kernel_length: 128,
            channels: 2,
            wake_trigger: WakeTrigger::InputFrames,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ring_length, 512);
        assert_eq!(back.kernel_length, 128);
        assert_eq!(back.wake_trigger, WakeTrigger::InputFrames);
    }

    #[test]
    fn test_wake_trigger_defaults_to_quantum_clock() {
        // Configs serialized before the trigger was configurable deserialize
        // to the inherited behavior.
        let back: BridgeConfig =
            serde_json::from_str(r#"{"ring_length":256,"kernel_length":128,"channels":1}"#)
                .unwrap();
        assert_eq!(back.wake_trigger, WakeTrigger::QuantumClock);
    }
}
