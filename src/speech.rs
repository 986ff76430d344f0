//! Speech synthesis for translation read-back
//!
//! Synthesis is single-slot: speaking a new utterance always displaces
//! whatever was pending, so at most one utterance is audible at a time.
//! The OS synthesizer is an opaque capability; when the platform has
//! none, read-back silently degrades to display-only.

/// Fixed read-back delivery profile: slightly slow, slightly raised,
/// slightly quiet. Values are 1.0-centered multipliers (volume is a
/// 0.0..=1.0 gain); backends map them to their own ranges.
#[derive(Debug, Clone, Copy)]
pub struct VoiceProfile {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl VoiceProfile {
    /// The profile translation read-back always uses.
    pub fn read_back() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.1,
            volume: 0.8,
        }
    }
}

/// An OS speech synthesizer.
pub trait SpeechSynthesizer: Send {
    /// Speak `text` in the voice for `locale_tag`, canceling any
    /// utterance still pending or in flight first.
    fn speak(&mut self, text: &str, locale_tag: &str, profile: &VoiceProfile);

    /// Drop any pending utterance.
    fn cancel(&mut self);
}

/// Probe for an OS synthesizer.
#[cfg(target_os = "windows")]
pub fn detect() -> Option<Box<dyn SpeechSynthesizer>> {
    match sapi::SapiSynthesizer::new() {
        Ok(synthesizer) => Some(Box::new(synthesizer)),
        Err(e) => {
            tracing::warn!("SAPI synthesizer unavailable: {}", e);
            None
        }
    }
}

/// Probe for an OS synthesizer.
#[cfg(not(target_os = "windows"))]
pub fn detect() -> Option<Box<dyn SpeechSynthesizer>> {
    tracing::debug!("No speech synthesis backend on this platform");
    None
}

#[cfg(target_os = "windows")]
mod sapi {
    //! SAPI-backed synthesizer.
    //!
    //! A dedicated worker thread owns the SAPI voice (COM objects are
    //! apartment-bound). Utterances go through a single replaceable slot:
    //! a new one overwrites whatever is still waiting, which is how the
    //! cancel-before-speak contract is met. An utterance already being
    //! voiced finishes; the binding exposes no mid-utterance purge.

    use std::sync::{Arc, Condvar, Mutex};
    use std::thread;
    use std::time::Duration;

    use sapi_lite::tts::{Pitch, Rate, SpeechBuilder, SyncSynthesizer, Volume};
    use tracing::{error, info};

    use super::{SpeechSynthesizer, VoiceProfile};

    /// Upper bound per utterance; translations are sentence-sized.
    const UTTERANCE_TIMEOUT: Duration = Duration::from_secs(30);

    struct Utterance {
        text: String,
        rate: i32,
        pitch: i32,
        volume: u32,
    }

    #[derive(Default)]
    struct Slot {
        pending: Option<Utterance>,
        shutdown: bool,
    }

    pub(super) struct SapiSynthesizer {
        slot: Arc<(Mutex<Slot>, Condvar)>,
        worker: Option<thread::JoinHandle<()>>,
    }

    impl SapiSynthesizer {
        pub(super) fn new() -> Result<Self, String> {
            sapi_lite::initialize().map_err(|e| format!("failed to initialize SAPI: {:?}", e))?;

            let slot: Arc<(Mutex<Slot>, Condvar)> = Arc::default();
            let worker_slot = slot.clone();
            let worker = thread::spawn(move || run_worker(worker_slot));

            info!("SAPI synthesizer initialized");
            Ok(Self {
                slot,
                worker: Some(worker),
            })
        }
    }

    fn run_worker(slot: Arc<(Mutex<Slot>, Condvar)>) {
        let synthesizer = match SyncSynthesizer::new() {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to create SAPI voice: {:?}", e);
                return;
            }
        };

        let (lock, condvar) = &*slot;
        loop {
            let utterance = {
                let mut guard = match lock.lock() {
                    Ok(g) => g,
                    Err(_) => return,
                };
                while guard.pending.is_none() && !guard.shutdown {
                    guard = match condvar.wait(guard) {
                        Ok(g) => g,
                        Err(_) => return,
                    };
                }
                if guard.shutdown {
                    return;
                }
                guard.pending.take()
            };

            if let Some(utterance) = utterance {
                let speech = SpeechBuilder::new()
                    .start_rate(Rate::new(utterance.rate))
                    .start_pitch(Pitch::new(utterance.pitch))
                    .start_volume(Volume::new(utterance.volume))
                    .say(&utterance.text)
                    .build();
                if let Err(e) = synthesizer.speak(&speech, Some(UTTERANCE_TIMEOUT)) {
                    error!("SAPI speak failed: {:?}", e);
                }
            }
        }
    }

    impl SpeechSynthesizer for SapiSynthesizer {
        fn speak(&mut self, text: &str, _locale_tag: &str, profile: &VoiceProfile) {
            // TODO: pick a voice matching the locale via SAPI token
            // attributes instead of the OS default voice.
            let utterance = Utterance {
                text: text.to_string(),
                // Map the 1.0-centered profile onto SAPI's -10..10 / 0..100
                rate: (((profile.rate - 1.0) * 10.0).round() as i32).clamp(-10, 10),
                pitch: (((profile.pitch - 1.0) * 10.0).round() as i32).clamp(-10, 10),
                volume: ((profile.volume * 100.0).round() as u32).min(100),
            };
            let (lock, condvar) = &*self.slot;
            if let Ok(mut guard) = lock.lock() {
                guard.pending = Some(utterance);
                condvar.notify_one();
            }
        }

        fn cancel(&mut self) {
            let (lock, _) = &*self.slot;
            if let Ok(mut guard) = lock.lock() {
                guard.pending = None;
            }
        }
    }

    impl Drop for SapiSynthesizer {
        fn drop(&mut self) {
            {
                let (lock, condvar) = &*self.slot;
                if let Ok(mut guard) = lock.lock() {
                    guard.shutdown = true;
                    guard.pending = None;
                    condvar.notify_one();
                }
            }
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
            sapi_lite::finalize();
        }
    }
}
