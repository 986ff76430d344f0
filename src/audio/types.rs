//! Audio types and error definitions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::info;

/// A flushed buffer of captured audio
///
/// PCM mono samples at the capture module's target rate. The recorder
/// accumulates these in memory until the session stops.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM 16-bit signed samples (mono)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Input-stream processing requested from the capture backend.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// Handle for controlling audio capture from outside the capture thread
///
/// The input device belongs exclusively to the capture thread this handle
/// controls; stopping joins the thread and releases the device.
pub struct AudioCaptureHandle {
    pub(crate) is_capturing: Arc<AtomicBool>,
    pub(crate) thread_handle: Option<JoinHandle<()>>,
}

impl AudioCaptureHandle {
    /// Stop capturing audio and release the input device
    pub fn stop(&mut self) {
        self.is_capturing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        info!("Audio capture stopped");
    }

    /// Check if currently capturing
    #[allow(dead_code)]
    pub fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }
}

/// Errors that can occur during audio capture
#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("No supported audio configuration found")]
    NoSupportedConfig,

    #[error("Audio configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("No recording in progress")]
    NotRecording,

    #[error("No audio data was captured")]
    NoAudioCaptured,

    #[error("Audio device error: {0}")]
    DeviceError(#[from] cpal::DevicesError),

    #[error("Audio stream error: {0}")]
    StreamError(#[from] cpal::BuildStreamError),

    #[error("Audio play error: {0}")]
    PlayError(#[from] cpal::PlayStreamError),

    #[error("Default config error: {0}")]
    DefaultConfigError(#[from] cpal::DefaultStreamConfigError),
}
