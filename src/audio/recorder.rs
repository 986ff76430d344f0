//! Record-then-submit recorder
//!
//! Owns the capture device for the duration of one recording cycle:
//! start acquires the microphone and accumulates periodic chunk flushes
//! in memory, stop releases the device and assembles the chunks into a
//! single audio container for batch submission.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::HostTrait;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::container::AudioRecording;
use super::types::{AudioCaptureError, AudioCaptureHandle, AudioChunk, CaptureSettings};
use super::SPEECH_SAMPLE_RATE;

/// Microphone recorder seam. The production implementation captures via
/// cpal; tests script their own.
#[async_trait]
pub trait Recorder: Send {
    /// Acquire the input device and begin accumulating chunks.
    fn start(&mut self, settings: &CaptureSettings) -> Result<(), AudioCaptureError>;

    /// Release the input device and assemble everything captured so far.
    ///
    /// The device is released even when assembly fails.
    async fn stop(&mut self) -> Result<AudioRecording, AudioCaptureError>;

    /// Whether a recording cycle is in progress.
    fn is_active(&self) -> bool;
}

struct ActiveRecording {
    handle: AudioCaptureHandle,
    chunks: Arc<Mutex<Vec<AudioChunk>>>,
    drain_task: JoinHandle<()>,
}

/// cpal-backed [`Recorder`].
#[derive(Default)]
pub struct CpalRecorder {
    active: Option<ActiveRecording>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Recorder for CpalRecorder {
    fn start(&mut self, settings: &CaptureSettings) -> Result<(), AudioCaptureError> {
        if self.active.is_some() {
            warn!("Recorder already active, ignoring start");
            return Ok(());
        }

        // The capture thread reports device errors asynchronously; check for
        // the common failure (no microphone) up front so start can refuse.
        if cpal::default_host().default_input_device().is_none() {
            return Err(AudioCaptureError::NoInputDevice);
        }

        let (handle, mut chunk_rx) = super::start_capture(settings)?;

        let chunks: Arc<Mutex<Vec<AudioChunk>>> = Arc::new(Mutex::new(Vec::new()));
        let chunks_for_drain = chunks.clone();
        let drain_task = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if let Ok(mut buffered) = chunks_for_drain.lock() {
                    buffered.push(chunk);
                }
            }
        });

        self.active = Some(ActiveRecording {
            handle,
            chunks,
            drain_task,
        });
        info!("Recorder started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<AudioRecording, AudioCaptureError> {
        let mut active = self.active.take().ok_or(AudioCaptureError::NotRecording)?;

        // Stops the capture thread, which releases the device and closes
        // the chunk channel; the drain task then finishes on its own.
        active.handle.stop();
        let _ = active.drain_task.await;

        let chunks = active
            .chunks
            .lock()
            .map(|mut buffered| std::mem::take(&mut *buffered))
            .unwrap_or_default();

        if chunks.is_empty() {
            return Err(AudioCaptureError::NoAudioCaptured);
        }

        let sample_rate = chunks
            .first()
            .map(|chunk| chunk.sample_rate)
            .unwrap_or(SPEECH_SAMPLE_RATE);
        let recording = AudioRecording::assemble(&chunks, sample_rate);
        info!(
            chunks = chunks.len(),
            bytes = recording.data.len(),
            duration_secs = recording.duration_secs(sample_rate),
            "Recording assembled"
        );
        Ok(recording)
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }
}
