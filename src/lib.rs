//! Real-time audio bridge between a device callback and a render worker.
//!
//! A pair of fixed-capacity wraparound sample buffers plus an atomic
//! coordination protocol: the real-time side pushes captured frames and
//! pulls rendered frames without ever blocking or allocating, while the
//! worker side sleeps until a threshold's worth of frames justifies a
//! processing pass.
//!
//! # Architecture
//!
//! ```text
//! device callback                              render worker
//!   push input  ──► [ capture ring ]  ──drain──►  RenderKernel
//!   pull output ◄── [ render ring  ]  ◄─deposit──     │
//!   wake on threshold ──────────────────notify────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use worklet_bridge::{
//!     BridgeConfig, RenderWorker, SetupMessage, SharedBuffers, WorkletProcessor,
//! };
//!
//! let buffers = SharedBuffers::allocate(&BridgeConfig::default())?;
//! let _worker = RenderWorker::spawn(buffers.clone(), my_kernel);
//!
//! let (setup_tx, setup_rx) = crossbeam_channel::unbounded();
//! let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
//! let mut processor = WorkletProcessor::new(setup_rx);
//! setup_tx.send(SetupMessage { buffers, ready_tx })?;
//!
//! // Inside the audio callback, once per quantum:
//! processor.process(&captured_channels, &mut playback_channels);
//! ```

pub mod error;
pub use error::{BridgeError, Result};

mod state;
pub use state::{CoordinationState, StateField, STATE_SLOTS};

mod ring;
pub use ring::RingChannel;

pub mod protocol;
pub use protocol::{BridgeConfig, Ready, SetupMessage, SharedBuffers, WakeTrigger};

mod processor;
pub use processor::WorkletProcessor;

mod worker;
pub use worker::{RenderKernel, RenderWorker, WorkerHandle};
