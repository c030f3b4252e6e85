//! Worker side of the bridge.
//!
//! A [`RenderWorker`] sleeps on the wake signal, and on each wake drains one
//! kernel's worth of frames from the capture ring, hands them to the
//! [`RenderKernel`], and deposits the rendered frames into the render ring.
//! The worker thread is not real-time: it may allocate, block, and log.

use crate::protocol::{SharedBuffers, WakeTrigger};
use crate::state::StateField;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// How often a parked worker re-checks its shutdown flag.
const WAKE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The seam to the synthesis/processing engine.
///
/// `input` and `output` hold one buffer per channel, each exactly the
/// kernel length configured for the session.
pub trait RenderKernel: Send {
    fn render(&mut self, input: &[Vec<f32>], output: &mut [Vec<f32>]);
}

impl<F> RenderKernel for F
where
    F: FnMut(&[Vec<f32>], &mut [Vec<f32>]) + Send,
{
    fn render(&mut self, input: &[Vec<f32>], output: &mut [Vec<f32>]) {
        self(input, output)
    }
}

pub struct RenderWorker;

impl RenderWorker {
    /// Spawn the render thread. It waits for wake signals until the returned
    /// handle shuts it down.
    pub fn spawn<K: RenderKernel + 'static>(buffers: SharedBuffers, kernel: K) -> WorkerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let thread_buffers = buffers.clone();

        let thread_handle = thread::Builder::new()
            .name("render-worker".to_string())
            .spawn(move || {
                worker_main(thread_buffers, kernel, thread_running);
            })
            .expect("Failed to spawn render worker thread");

        WorkerHandle {
            buffers,
            running,
            thread_handle: Some(thread_handle),
        }
    }
}

/// Worker thread handle. Shuts down gracefully when dropped.
pub struct WorkerHandle {
    buffers: SharedBuffers,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        // Extra wake so a parked worker observes the cleared flag promptly.
        self.buffers.state().notify_render();

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_main<K: RenderKernel>(buffers: SharedBuffers, mut kernel: K, running: Arc<AtomicBool>) {
    let kernel_length = buffers.state().get(StateField::KernelLength) as usize;
    let channels = buffers.input().channels();
    let wake_trigger = buffers.config().wake_trigger;

    let mut input_frames = vec![vec![0.0f32; kernel_length]; channels];
    let mut output_frames = vec![vec![0.0f32; kernel_length]; channels];

    debug!(kernel_length, channels, "render worker started");

    while running.load(Ordering::Relaxed) {
        if !buffers.state().wait_for_render_timeout(WAKE_POLL_INTERVAL) {
            continue;
        }
        if !running.load(Ordering::Relaxed) {
            break;
        }

        render_pass(
            &buffers,
            &mut kernel,
            kernel_length,
            wake_trigger,
            &mut input_frames,
            &mut output_frames,
        );
    }

    debug!("render worker stopped");
}

fn render_pass<K: RenderKernel>(
    buffers: &SharedBuffers,
    kernel: &mut K,
    kernel_length: usize,
    wake_trigger: WakeTrigger,
    input_frames: &mut [Vec<f32>],
    output_frames: &mut [Vec<f32>],
) {
    let available = buffers.input().available();
    if wake_trigger == WakeTrigger::InputFrames && (available as usize) < kernel_length {
        warn!(available, kernel_length, "woken with a short input ring");
    }

    let mut input_refs: Vec<&mut [f32]> = input_frames
        .iter_mut()
        .map(|ch| ch.as_mut_slice())
        .collect();
    if let Err(e) = buffers.input().pull(&mut input_refs) {
        warn!(error = %e, "input drain failed, skipping render pass");
        return;
    }
    buffers.input().consume(kernel_length as i32);

    kernel.render(input_frames, output_frames);

    let output_refs: Vec<&[f32]> = output_frames.iter().map(|ch| ch.as_slice()).collect();
    if let Err(e) = buffers.output().push(&output_refs) {
        warn!(error = %e, "output deposit failed");
        return;
    }

    trace!(kernel_length, "render pass complete");
}
