//! Native recognizer seam
//!
//! The OS speech recognizer is an opaque capability provider: it is
//! probed once at startup and, when present, drives live recognition
//! through a stream of events. The orchestrator never sees engine
//! internals, only [`RecognizerEvent`]s.

use std::fmt;

use tokio::sync::mpsc;

/// How the orchestrator configures a live recognition run.
#[derive(Debug, Clone)]
pub struct RecognizerSettings {
    /// BCP-47 source language tag (e.g. "ja-JP").
    pub language: String,
    /// Keep recognizing across pauses instead of stopping after one phrase.
    pub continuous: bool,
    /// Emit provisional text before a segment is finalized.
    pub interim_results: bool,
    /// Number of alternative transcriptions per segment.
    pub max_alternatives: u32,
}

/// Events a live recognizer delivers, in order.
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// The engine began listening.
    Started,
    /// New results became available. `finals` are confirmed, non-revisable
    /// segments in arrival order; `interim` is the current provisional text
    /// (replaces any previous interim text).
    Result {
        finals: Vec<String>,
        interim: String,
    },
    /// The engine signaled an error; the session may continue.
    Error(RecognizerErrorKind),
    /// The engine stopped on its own. While a session is live this is
    /// unexpected and triggers a restart.
    Ended,
}

/// Engine error signals, partitioned by how the session treats them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum RecognizerErrorKind {
    /// Nothing was heard for a while. Routine; suppressed.
    NoSpeech,
    /// Microphone/input trouble.
    AudioCapture,
    /// The engine's own network dependency failed.
    Network,
    Other(String),
}

impl fmt::Display for RecognizerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognizerErrorKind::NoSpeech => write!(f, "no-speech"),
            RecognizerErrorKind::AudioCapture => write!(f, "audio-capture"),
            RecognizerErrorKind::Network => write!(f, "network"),
            RecognizerErrorKind::Other(detail) => write!(f, "{}", detail),
        }
    }
}

/// Errors starting or controlling the engine itself.
#[derive(Debug, thiserror::Error)]
#[allow(dead_code)]
pub enum RecognizerError {
    #[error("Recognizer is not available on this platform")]
    Unavailable,

    #[error("Failed to start recognizer: {0}")]
    Start(String),
}

/// A live, in-runtime speech recognizer.
pub trait NativeRecognizer: Send {
    /// Begin a recognition run, delivering events on `events` until
    /// stopped or the engine ends on its own.
    fn start(
        &mut self,
        settings: &RecognizerSettings,
        events: mpsc::UnboundedSender<RecognizerEvent>,
    ) -> Result<(), RecognizerError>;

    /// Stop the current run. Idempotent.
    fn stop(&mut self);
}

/// Probe for an OS dictation engine.
///
/// No dictation-capable backend is wired up in this build: sapi-lite, the
/// SAPI binding used for synthesis, exposes phrase grammars but not
/// dictation topics. Detection reporting `None` sends sessions down the
/// record-then-submit path, which is the production path today.
// TODO: back this with a SAPI dictation grammar once sapi-lite exposes
// dictation topics (ISpRecoGrammar::LoadDictation).
pub fn detect() -> Option<Box<dyn NativeRecognizer>> {
    None
}
