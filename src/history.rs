//! Bounded recognition and translation history
//!
//! Two ordered logs, newest first: recognized text and translations.
//! Both outlive a single recording session and are cleared only by
//! explicit user action or process exit. Rendering is a projection of
//! the stored data, never the other way around.

use chrono::{Local, SecondsFormat, Utc};
use tracing::debug;

use crate::translate::TargetLanguage;

/// Maximum number of entries retained per log.
pub const HISTORY_CAP: usize = 50;

/// Maximum number of entries shown in a rendered view.
pub const RENDER_CAP: usize = 10;

/// One finalized recognition result.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub text: String,
    pub timestamp_iso: String,
    pub timestamp_display: String,
}

/// One completed translation.
#[derive(Debug, Clone)]
pub struct TranslationEntry {
    pub original_text: String,
    pub translated_text: String,
    pub target_language: TargetLanguage,
    pub timestamp_iso: String,
    pub timestamp_display: String,
}

/// Current wall-clock time as an ISO-8601 string plus a localized
/// display form (date and time, second precision).
pub fn now_timestamps() -> (String, String) {
    let iso = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let display = Local::now().format("%Y/%m/%d %H:%M:%S").to_string();
    (iso, display)
}

/// Both history logs, owned by the orchestrator.
#[derive(Debug, Default)]
pub struct History {
    recognized: Vec<HistoryEntry>,
    translations: Vec<TranslationEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finalized recognition result. Text is stored trimmed;
    /// blank results are dropped.
    pub fn push_recognized(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let (timestamp_iso, timestamp_display) = now_timestamps();
        let entry = HistoryEntry {
            text: text.to_string(),
            timestamp_iso,
            timestamp_display,
        };
        debug!(timestamp = %entry.timestamp_iso, "Recognition history entry added");
        self.recognized.insert(0, entry);
        self.recognized.truncate(HISTORY_CAP);
    }

    /// Record a completed translation.
    pub fn push_translation(
        &mut self,
        original_text: &str,
        translated_text: &str,
        target_language: TargetLanguage,
    ) {
        let (timestamp_iso, timestamp_display) = now_timestamps();
        let entry = TranslationEntry {
            original_text: original_text.to_string(),
            translated_text: translated_text.to_string(),
            target_language,
            timestamp_iso,
            timestamp_display,
        };
        debug!(timestamp = %entry.timestamp_iso, "Translation history entry added");
        self.translations.insert(0, entry);
        self.translations.truncate(HISTORY_CAP);
    }

    /// All stored recognition entries, newest first.
    pub fn recognized(&self) -> &[HistoryEntry] {
        &self.recognized
    }

    /// All stored translation entries, newest first.
    pub fn translations(&self) -> &[TranslationEntry] {
        &self.translations
    }

    /// The bounded slice a view renders, newest first.
    pub fn rendered_recognized(&self) -> &[HistoryEntry] {
        &self.recognized[..self.recognized.len().min(RENDER_CAP)]
    }

    /// The bounded slice a translation view renders, newest first.
    pub fn rendered_translations(&self) -> &[TranslationEntry] {
        &self.translations[..self.translations.len().min(RENDER_CAP)]
    }

    /// True when both logs are empty.
    pub fn is_empty(&self) -> bool {
        self.recognized.is_empty() && self.translations.is_empty()
    }

    /// Empty both logs at once.
    pub fn clear(&mut self) {
        self.recognized.clear();
        self.translations.clear();
    }
}
