//! Error types for the worklet bridge

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid bridge configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel count mismatch: ring has {expected} channels, caller supplied {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Quantum size mismatch on channel {channel}: expected {expected} frames, got {actual}")]
    QuantumSizeMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Quantum of {quantum} frames exceeds ring capacity of {capacity}")]
    QuantumTooLarge { quantum: usize, capacity: usize },

    #[error("Setup channel closed before the handshake was delivered")]
    SetupChannelClosed,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
