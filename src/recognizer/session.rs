//! Recording session state

use crate::engine::RecognitionEngine;

/// Lifecycle of one start→stop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Recognizing,
    Stopping,
}

/// Transient per-session data. Created on start; the transcript survives
/// stop (for export) until the next start resets it.
#[derive(Debug, Default)]
pub struct Session {
    pub is_recording: bool,
    pub selected_engine: RecognitionEngine,
    /// Accumulated final text for the session.
    pub current_transcript: String,
    /// Provisional text, overwritten on every update. Never persisted.
    pub interim_text: String,
}

impl Session {
    pub fn new(selected_engine: RecognitionEngine) -> Self {
        Self {
            selected_engine,
            ..Default::default()
        }
    }

    /// What the live transcript area shows: confirmed text followed by
    /// the current provisional text. Final text is authoritative and is
    /// never overwritten by interim text.
    pub fn display_text(&self) -> String {
        format!("{}{}", self.current_transcript, self.interim_text)
    }

    pub fn has_transcript(&self) -> bool {
        !self.current_transcript.trim().is_empty()
    }
}
