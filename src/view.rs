//! Rendering surface
//!
//! The data model lives in the orchestrator; a [`View`] is a pure
//! projection of it. The terminal implementation prints; tests record
//! calls and assert on them.

use std::io::{self, BufRead, Write};

use crate::engine::{EngineOption, RecognitionEngine};
use crate::history::{HistoryEntry, TranslationEntry};

/// Status message severity, mirrored in the rendered prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Waiting,
    Recording,
    Processing,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    fn tag(&self) -> &'static str {
        match self {
            StatusLevel::Info => "info",
            StatusLevel::Waiting => "wait",
            StatusLevel::Recording => "rec",
            StatusLevel::Processing => "proc",
            StatusLevel::Success => "ok",
            StatusLevel::Warning => "warn",
            StatusLevel::Error => "error",
        }
    }
}

/// Which history pane the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryTab {
    #[default]
    Source,
    Translation,
}

/// Enablement of every user control, always derived from current data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub export_current_enabled: bool,
    pub export_history_enabled: bool,
    pub clear_history_enabled: bool,
}

/// Rendering surface the orchestrator drives.
pub trait View: Send {
    fn status(&mut self, level: StatusLevel, message: &str);

    /// Live transcript area: confirmed + provisional text.
    fn show_transcript(&mut self, text: &str);

    /// Accumulated translation display (may include an in-progress or
    /// error marker).
    fn show_translation(&mut self, text: &str);

    /// Bounded recognition history, newest first.
    fn render_history(&mut self, entries: &[HistoryEntry]);

    /// Bounded translation history, newest first.
    fn render_translation_history(&mut self, entries: &[TranslationEntry]);

    fn set_active_tab(&mut self, tab: HistoryTab);

    fn update_controls(&mut self, controls: &Controls);

    fn render_engine_menu(&mut self, options: &[EngineOption], selected: RecognitionEngine);

    /// Ask the user to confirm a destructive action.
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Console renderer.
#[derive(Default)]
pub struct TerminalView;

impl TerminalView {
    pub fn new() -> Self {
        Self
    }
}

impl View for TerminalView {
    fn status(&mut self, level: StatusLevel, message: &str) {
        println!("[{}] {}", level.tag(), message);
    }

    fn show_transcript(&mut self, text: &str) {
        if text.is_empty() {
            println!("認識結果: (なし)");
        } else {
            println!("認識結果: {}", text);
        }
    }

    fn show_translation(&mut self, text: &str) {
        if text.is_empty() {
            println!("翻訳: (なし)");
        } else {
            println!("翻訳: {}", text);
        }
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        println!("--- 認識履歴 ({}件表示) ---", entries.len());
        for entry in entries {
            println!("{}  {}", entry.timestamp_display, entry.text);
        }
    }

    fn render_translation_history(&mut self, entries: &[TranslationEntry]) {
        println!("--- 翻訳履歴 ({}件表示) ---", entries.len());
        for entry in entries {
            println!(
                "{}  [{}] {} → {}",
                entry.timestamp_display,
                entry.target_language.label(),
                entry.original_text,
                entry.translated_text
            );
        }
    }

    fn set_active_tab(&mut self, tab: HistoryTab) {
        let label = match tab {
            HistoryTab::Source => "認識履歴",
            HistoryTab::Translation => "翻訳履歴",
        };
        println!("表示タブ: {}", label);
    }

    fn update_controls(&mut self, controls: &Controls) {
        // The console has no persistent buttons; enablement is enforced
        // by the orchestrator's guards and surfaced via status messages.
        tracing::debug!(
            start = controls.start_enabled,
            stop = controls.stop_enabled,
            export_current = controls.export_current_enabled,
            export_history = controls.export_history_enabled,
            clear_history = controls.clear_history_enabled,
            "Controls updated"
        );
    }

    fn render_engine_menu(&mut self, options: &[EngineOption], selected: RecognitionEngine) {
        println!("音声認識エンジン:");
        for option in options {
            let marker = if option.engine == selected { "*" } else { " " };
            let note = if option.available {
                ""
            } else {
                " (利用不可)"
            };
            println!(" {} {} - {}{}", marker, option.engine, option.engine.label(), note);
        }
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} [y/N]: ", prompt);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}
