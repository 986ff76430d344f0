//! Recognition orchestration
//!
//! The single owner of all session state. Decides between live native
//! recognition and record-then-submit cloud recognition, drives the
//! start/stop lifecycle, merges interim and final results into the
//! running transcript, and dispatches the side effects: history append,
//! translation, read-back, clipboard, export.
//!
//! Engine callbacks arrive as [`AppEvent`]s over one channel and are
//! consumed by a single transition function, so behaviors like the
//! auto-restart on an unexpected engine end are explicit transitions.

pub mod native;
mod session;

pub use session::{Session, SessionState};

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioCaptureError, AudioRecording, CaptureSettings, Recorder};
use crate::clipboard;
use crate::engine::{engine_menu, EngineAvailability, RecognitionEngine};
use crate::export;
use crate::history::History;
use crate::proxy::{ProxyError, RemoteProxy, TranslationResponse};
use crate::speech::{SpeechSynthesizer, VoiceProfile};
use crate::translate::TargetLanguage;
use crate::view::{Controls, HistoryTab, StatusLevel, View};

use native::{NativeRecognizer, RecognizerErrorKind, RecognizerEvent, RecognizerSettings};

/// Everything the orchestrator reacts to besides direct user commands.
#[derive(Debug)]
pub enum AppEvent {
    /// Native engine callback.
    Recognizer(RecognizerEvent),
    /// Outcome of a batch speech-to-text submission.
    BatchTranscription {
        result: Result<String, ProxyError>,
    },
    /// Outcome of a translation request.
    Translation {
        /// Matches requests to the translation state they were issued
        /// under; results from a superseded state are dropped.
        generation: u64,
        original: String,
        result: Result<TranslationResponse, ProxyError>,
    },
}

/// Translation pipeline state.
struct TranslationState {
    enabled: bool,
    read_back: bool,
    target: TargetLanguage,
    /// Accumulated translated text, space-separated, shown alongside the
    /// transcript. Cleared when translation is toggled off or retargeted.
    display: String,
    /// In-flight request count; non-zero renders the progress marker.
    pending: usize,
    /// Bumped whenever the display is invalidated (toggle off, language
    /// change, new session).
    generation: u64,
}

/// Startup snapshot handed to the orchestrator.
pub struct OrchestratorOptions {
    /// Fixed source-language tag for recognition.
    pub language: String,
    pub availability: EngineAvailability,
    pub selected_engine: RecognitionEngine,
    pub translation_enabled: bool,
    pub read_back_enabled: bool,
    pub target_language: TargetLanguage,
    /// Export directory override (None = Documents/kikigaki).
    pub export_dir: Option<PathBuf>,
}

/// The recognition orchestrator. All state is owned here; collaborating
/// engines and surfaces are injected behind traits.
pub struct Orchestrator {
    language: String,
    availability: EngineAvailability,
    state: SessionState,
    session: Session,
    history: History,
    translation: TranslationState,
    active_tab: HistoryTab,
    export_dir: Option<PathBuf>,

    native: Option<Box<dyn NativeRecognizer>>,
    recorder: Box<dyn Recorder>,
    synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    proxy: Arc<dyn RemoteProxy>,
    view: Box<dyn View>,

    event_tx: mpsc::UnboundedSender<AppEvent>,
    recognizer_tx: mpsc::UnboundedSender<RecognizerEvent>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        options: OrchestratorOptions,
        native: Option<Box<dyn NativeRecognizer>>,
        recorder: Box<dyn Recorder>,
        synthesizer: Option<Box<dyn SpeechSynthesizer>>,
        proxy: Arc<dyn RemoteProxy>,
        view: Box<dyn View>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        // Engine callbacks are funneled into the main event channel so
        // the orchestrator consumes exactly one ordered stream.
        let (recognizer_tx, mut recognizer_rx) = mpsc::unbounded_channel();
        let forward_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = recognizer_rx.recv().await {
                if forward_tx.send(AppEvent::Recognizer(event)).is_err() {
                    break;
                }
            }
        });

        let translation = TranslationState {
            enabled: options.translation_enabled && options.availability.translate,
            read_back: options.read_back_enabled && synthesizer.is_some(),
            target: options.target_language,
            display: String::new(),
            pending: 0,
            generation: 0,
        };

        Self {
            language: options.language,
            availability: options.availability,
            state: SessionState::Idle,
            session: Session::new(options.selected_engine),
            history: History::new(),
            translation,
            active_tab: HistoryTab::Source,
            export_dir: options.export_dir,
            native,
            recorder,
            synthesizer,
            proxy,
            view,
            event_tx,
            recognizer_tx,
        }
    }

    // --- accessors -------------------------------------------------------

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn active_tab(&self) -> HistoryTab {
        self.active_tab
    }

    pub fn translation_display(&self) -> &str {
        &self.translation.display
    }

    /// Control enablement, always derived from current data.
    pub fn controls(&self) -> Controls {
        let has_history = !self.history.is_empty();
        Controls {
            start_enabled: !self.session.is_recording && self.availability.any(),
            stop_enabled: self.session.is_recording,
            export_current_enabled: self.session.has_transcript(),
            export_history_enabled: has_history,
            clear_history_enabled: has_history,
        }
    }

    pub fn show_engine_menu(&mut self) {
        let menu = engine_menu(&self.availability);
        self.view.render_engine_menu(&menu, self.session.selected_engine);
    }

    // --- session lifecycle -----------------------------------------------

    /// Start a recording session.
    pub fn start(&mut self) {
        if self.session.is_recording {
            self.view.status(StatusLevel::Warning, "すでに録音中です");
            return;
        }
        if !self.availability.any() {
            self.view
                .status(StatusLevel::Error, "利用可能な音声認識エンジンがありません");
            return;
        }

        self.state = SessionState::Starting;
        let engine = self.session.selected_engine;
        self.session = Session::new(engine);
        self.session.is_recording = true;

        // A fresh session also resets the translation display.
        self.translation.display.clear();
        self.translation.pending = 0;
        self.translation.generation += 1;

        self.view.show_transcript("");
        self.view.show_translation("");
        self.refresh_controls();
        self.view.status(StatusLevel::Waiting, "音声認識を開始します...");

        // Native recognition takes priority whenever present, even over
        // an explicitly selected cloud engine.
        if self.availability.native && self.native.is_some() {
            self.start_native();
        } else {
            self.start_batch();
        }
    }

    /// Stop the current session.
    ///
    /// Flags flip synchronously so engine callbacks observe them; in
    /// record-then-submit mode the assembled recording is submitted from
    /// here and its result arrives later as an event.
    pub async fn stop(&mut self) {
        if !self.session.is_recording {
            self.view.status(StatusLevel::Info, "録音していません");
            return;
        }

        self.session.is_recording = false;
        self.state = SessionState::Stopping;

        if let Some(recognizer) = self.native.as_mut() {
            recognizer.stop();
        }

        self.session.interim_text.clear();
        self.state = SessionState::Idle;
        self.refresh_controls();

        if self.session.has_transcript() {
            let transcript = self.session.current_transcript.clone();
            self.view.show_transcript(&transcript);
            clipboard::copy_transcript(&transcript);
            self.view.status(StatusLevel::Success, "音声認識完了");
        } else {
            self.view.status(StatusLevel::Info, "音声認識を停止しました");
        }

        if self.recorder.is_active() {
            match self.recorder.stop().await {
                Ok(recording) => {
                    self.view.status(StatusLevel::Processing, "音声認識処理中...");
                    self.submit_recording(recording);
                }
                Err(AudioCaptureError::NoAudioCaptured) => {
                    self.view
                        .status(StatusLevel::Error, "音声データが記録されませんでした");
                }
                Err(e) => {
                    error!("Failed to stop recorder: {}", e);
                    self.view.status(StatusLevel::Error, "録音の停止に失敗しました");
                }
            }
        }
    }

    fn start_native(&mut self) {
        let settings = RecognizerSettings {
            language: self.language.clone(),
            continuous: true,
            interim_results: true,
            max_alternatives: 1,
        };
        info!(
            language = %settings.language,
            continuous = settings.continuous,
            interim_results = settings.interim_results,
            max_alternatives = settings.max_alternatives,
            "Starting native recognition"
        );
        let started = match self.native.as_mut() {
            Some(recognizer) => recognizer.start(&settings, self.recognizer_tx.clone()),
            None => Err(native::RecognizerError::Unavailable),
        };
        match started {
            Ok(()) => {
                self.state = SessionState::Recognizing;
            }
            Err(e) => {
                error!("Failed to start native recognizer: {}", e);
                self.fail_start();
            }
        }
    }

    fn start_batch(&mut self) {
        let engine = self.session.selected_engine;
        match self.recorder.start(&CaptureSettings::default()) {
            Ok(()) => {
                self.state = SessionState::Recognizing;
                let label = match engine {
                    RecognitionEngine::Native => "クラウド音声認識",
                    other => other.label(),
                };
                self.view.status(
                    StatusLevel::Recording,
                    &format!("録音中... 話してください（{}使用）", label),
                );
                info!(engine = %engine, "Record-then-submit recording started");
            }
            Err(e) => {
                error!("Failed to start recorder: {}", e);
                self.fail_start();
            }
        }
    }

    /// Error transient: surface and route back to Idle with controls
    /// restored.
    fn fail_start(&mut self) {
        self.session.is_recording = false;
        self.state = SessionState::Idle;
        self.view
            .status(StatusLevel::Error, "音声認識の開始に失敗しました");
        self.refresh_controls();
    }

    fn submit_recording(&self, recording: AudioRecording) {
        let proxy = self.proxy.clone();
        let tx = self.event_tx.clone();
        let language = self.language.clone();
        tokio::spawn(async move {
            let result = proxy.speech_to_text(recording, &language).await;
            let _ = tx.send(AppEvent::BatchTranscription { result });
        });
    }

    // --- event transitions -------------------------------------------------

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Recognizer(recognizer_event) => {
                self.handle_recognizer_event(recognizer_event)
            }
            AppEvent::BatchTranscription { result } => self.handle_batch_result(result),
            AppEvent::Translation {
                generation,
                original,
                result,
            } => self.handle_translation_result(generation, original, result),
        }
    }

    fn handle_recognizer_event(&mut self, event: RecognizerEvent) {
        match event {
            RecognizerEvent::Started => {
                if self.session.is_recording {
                    self.view.status(
                        StatusLevel::Recording,
                        "音声認識中... 話してください（ローカル音声認識使用）",
                    );
                }
            }
            RecognizerEvent::Result { finals, interim } => {
                if !self.session.is_recording {
                    debug!("Recognizer result after stop, ignoring");
                    return;
                }
                for text in &finals {
                    // Final text is authoritative: append, never replace.
                    self.session.current_transcript.push_str(text);
                    self.history.push_recognized(text);
                    self.request_translation(text.clone());
                }
                if !finals.is_empty() {
                    self.view.render_history(self.history.rendered_recognized());
                }
                self.session.interim_text = interim;
                let display = self.session.display_text();
                self.view.show_transcript(&display);
                self.refresh_controls();
            }
            RecognizerEvent::Error(RecognizerErrorKind::NoSpeech) => {
                // Routine pause; the session continues silently.
                debug!("Recognizer reported no speech");
            }
            RecognizerEvent::Error(kind) => {
                error!("Recognition error: {}", kind);
                self.view
                    .status(StatusLevel::Error, &format!("音声認識エラー: {}", kind));
            }
            RecognizerEvent::Ended => {
                // The engine stops on its own after pauses; while the
                // session is live that end is unexpected and we restart
                // immediately to get continuous recognition.
                if self.session.is_recording {
                    info!("Recognizer ended while session live, restarting");
                    self.start_native();
                }
            }
        }
    }

    fn handle_batch_result(&mut self, result: Result<String, ProxyError>) {
        match result {
            Ok(text) => {
                if self.session.is_recording {
                    debug!("Batch transcription arrived after a new session started, ignoring");
                    return;
                }
                if text.trim().is_empty() {
                    self.view
                        .status(StatusLevel::Warning, "音声が認識されませんでした");
                    return;
                }
                // Batch results replace the transcript, unlike the
                // incremental append of live recognition.
                self.session.current_transcript = text.clone();
                self.session.interim_text.clear();
                self.view.show_transcript(&text);
                self.history.push_recognized(&text);
                self.view.render_history(self.history.rendered_recognized());
                self.request_translation(text.clone());
                clipboard::copy_transcript(&text);
                self.view.status(StatusLevel::Success, "音声認識完了");
                self.refresh_controls();
            }
            Err(e) => {
                error!("Speech-to-text request failed: {}", e);
                if self.availability.native && self.session.is_recording {
                    // Only fall back while the session is still live; a
                    // stopped session must not be resurrected.
                    self.view.status(
                        StatusLevel::Warning,
                        "クラウドAPIが利用できません。ローカル音声認識に切り替えます...",
                    );
                    self.start_native();
                } else {
                    self.view.status(
                        StatusLevel::Error,
                        &format!("音声認識に失敗しました: {}", e),
                    );
                }
            }
        }
    }

    // --- translation pipeline ----------------------------------------------

    fn request_translation(&mut self, text: String) {
        if !self.translation.enabled {
            return;
        }
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        self.translation.pending += 1;
        self.render_translation_display(false);

        let proxy = self.proxy.clone();
        let tx = self.event_tx.clone();
        let generation = self.translation.generation;
        let target = self.translation.target.code();
        tokio::spawn(async move {
            let result = proxy.translate(&text, target).await;
            let _ = tx.send(AppEvent::Translation {
                generation,
                original: text,
                result,
            });
        });
    }

    fn handle_translation_result(
        &mut self,
        generation: u64,
        original: String,
        result: Result<TranslationResponse, ProxyError>,
    ) {
        if generation != self.translation.generation {
            debug!("Translation result from superseded state, dropping");
            return;
        }
        self.translation.pending = self.translation.pending.saturating_sub(1);

        match result {
            Ok(response) => {
                debug!(
                    target = %response.target_language,
                    timestamp = ?response.timestamp,
                    "Translation received"
                );
                // Prefer the relay's echo of the original text when present
                let original = if response.original_text.is_empty() {
                    original
                } else {
                    response.original_text.clone()
                };
                if !self.translation.display.is_empty() {
                    self.translation.display.push(' ');
                }
                self.translation.display.push_str(&response.translated_text);
                self.render_translation_display(false);

                self.history.push_translation(
                    &original,
                    &response.translated_text,
                    self.translation.target,
                );
                self.view
                    .render_translation_history(self.history.rendered_translations());
                self.refresh_controls();

                if self.translation.read_back {
                    if let Some(synthesizer) = self.synthesizer.as_mut() {
                        let profile = VoiceProfile::read_back();
                        debug!(
                            rate = profile.rate,
                            pitch = profile.pitch,
                            volume = profile.volume,
                            "Synthesizing translation read-back"
                        );
                        // speak() displaces anything still in flight:
                        // new translations interrupt prior ones.
                        synthesizer.speak(
                            &response.translated_text,
                            self.translation.target.locale_tag(),
                            &profile,
                        );
                    }
                }
            }
            Err(e) => {
                warn!("Translation failed: {}", e);
                // Placeholder is gone (pending decremented); mark the
                // failure inline, no retry.
                self.render_translation_display(true);
            }
        }
    }

    fn render_translation_display(&mut self, error_marker: bool) {
        let mut text = self.translation.display.clone();
        if self.translation.pending > 0 {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str("翻訳中...");
        }
        if error_marker {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str("[翻訳エラー]");
        }
        self.view.show_translation(&text);
    }

    // --- user settings -----------------------------------------------------

    /// Select the engine used when native recognition is unavailable.
    /// Returns false when the engine cannot be selected.
    pub fn set_engine(&mut self, engine: RecognitionEngine) -> bool {
        if !self.availability.is_available(engine) {
            self.view
                .status(StatusLevel::Warning, &format!("{}は利用できません", engine.label()));
            return false;
        }
        self.session.selected_engine = engine;
        self.view
            .status(StatusLevel::Info, &format!("認識エンジン: {}", engine.label()));
        true
    }

    /// Toggle translation of finalized chunks. Returns false when the
    /// relay has no translation backend.
    pub fn set_translation_enabled(&mut self, enabled: bool) -> bool {
        if enabled {
            if !self.availability.translate {
                self.view
                    .status(StatusLevel::Warning, "翻訳APIが設定されていません");
                return false;
            }
            self.translation.enabled = true;
            self.view.status(
                StatusLevel::Info,
                &format!("翻訳を有効にしました（{}）", self.translation.target.label()),
            );
        } else {
            self.translation.enabled = false;
            self.translation.generation += 1;
            self.translation.pending = 0;
            self.translation.display.clear();
            self.view.show_translation("");
            if self.active_tab == HistoryTab::Translation {
                self.set_active_tab(HistoryTab::Source);
            }
            self.view.status(StatusLevel::Info, "翻訳を無効にしました");
        }
        true
    }

    /// Change the translation target. Stale translations for the previous
    /// language must not linger, so the display resets.
    pub fn set_target_language(&mut self, language: TargetLanguage) {
        if self.translation.target == language {
            return;
        }
        self.translation.target = language;
        self.translation.generation += 1;
        self.translation.pending = 0;
        self.translation.display.clear();
        self.view.show_translation("");
        self.view
            .status(StatusLevel::Info, &format!("翻訳先言語: {}", language.label()));
    }

    /// Toggle spoken read-back of translations. Returns false when no
    /// synthesizer is available.
    pub fn set_read_back_enabled(&mut self, enabled: bool) -> bool {
        if enabled && self.synthesizer.is_none() {
            self.view
                .status(StatusLevel::Warning, "音声合成を利用できません");
            return false;
        }
        self.translation.read_back = enabled;
        if !enabled {
            if let Some(synthesizer) = self.synthesizer.as_mut() {
                synthesizer.cancel();
            }
        }
        let message = if enabled {
            "読み上げを有効にしました"
        } else {
            "読み上げを無効にしました"
        };
        self.view.status(StatusLevel::Info, message);
        true
    }

    pub fn set_active_tab(&mut self, tab: HistoryTab) {
        self.active_tab = tab;
        self.view.set_active_tab(tab);
        match tab {
            HistoryTab::Source => {
                self.view.render_history(self.history.rendered_recognized());
            }
            HistoryTab::Translation => {
                self.view
                    .render_translation_history(self.history.rendered_translations());
            }
        }
    }

    // --- export -------------------------------------------------------------

    /// Export the live transcript. Never propagates an error.
    pub fn export_current(&mut self) {
        if !self.session.has_transcript() {
            self.view
                .status(StatusLevel::Warning, "エクスポートする認識結果がありません");
            return;
        }
        match export::write_current(&self.session.current_transcript, self.export_dir.as_deref()) {
            Ok(path) => {
                self.view.status(
                    StatusLevel::Success,
                    &format!("ファイルを保存しました: {}", path.display()),
                );
            }
            Err(e) => {
                error!("Transcript export failed: {}", e);
                self.view
                    .status(StatusLevel::Error, "ファイルの保存に失敗しました");
            }
        }
    }

    /// Export both history logs. Never propagates an error.
    pub fn export_history(&mut self) {
        if self.history.is_empty() {
            self.view
                .status(StatusLevel::Warning, "エクスポートする履歴がありません");
            return;
        }
        match export::write_history(&self.history, self.export_dir.as_deref()) {
            Ok(path) => {
                self.view.status(
                    StatusLevel::Success,
                    &format!("ファイルを保存しました: {}", path.display()),
                );
            }
            Err(e) => {
                error!("History export failed: {}", e);
                self.view
                    .status(StatusLevel::Error, "ファイルの保存に失敗しました");
            }
        }
    }

    /// Clear both history logs after confirmation. No-op when already
    /// empty; idempotent.
    pub fn clear_history(&mut self) {
        if self.history.is_empty() {
            return;
        }
        if !self.view.confirm("履歴をすべて削除してもよろしいですか？") {
            return;
        }
        self.history.clear();
        self.view.render_history(self.history.rendered_recognized());
        self.view
            .render_translation_history(self.history.rendered_translations());
        self.refresh_controls();
        self.view.status(StatusLevel::Success, "履歴をクリアしました");
    }

    fn refresh_controls(&mut self) {
        let controls = self.controls();
        self.view.update_controls(&controls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use crate::engine::EngineAvailability;
    use crate::proxy::{HealthResponse, HealthServices, RelayConfig};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // --- scripted collaborators ------------------------------------------

    #[derive(Default)]
    struct ViewLog {
        statuses: Vec<(StatusLevel, String)>,
        transcripts: Vec<String>,
        translations: Vec<String>,
        tabs: Vec<HistoryTab>,
        controls: Vec<Controls>,
        confirms: usize,
    }

    struct TestView {
        log: Arc<Mutex<ViewLog>>,
        confirm_answer: bool,
    }

    impl View for TestView {
        fn status(&mut self, level: StatusLevel, message: &str) {
            self.log
                .lock()
                .unwrap()
                .statuses
                .push((level, message.to_string()));
        }
        fn show_transcript(&mut self, text: &str) {
            self.log.lock().unwrap().transcripts.push(text.to_string());
        }
        fn show_translation(&mut self, text: &str) {
            self.log.lock().unwrap().translations.push(text.to_string());
        }
        fn render_history(&mut self, _entries: &[crate::history::HistoryEntry]) {}
        fn render_translation_history(&mut self, _entries: &[crate::history::TranslationEntry]) {}
        fn set_active_tab(&mut self, tab: HistoryTab) {
            self.log.lock().unwrap().tabs.push(tab);
        }
        fn update_controls(&mut self, controls: &Controls) {
            self.log.lock().unwrap().controls.push(*controls);
        }
        fn render_engine_menu(
            &mut self,
            _options: &[crate::engine::EngineOption],
            _selected: RecognitionEngine,
        ) {
        }
        fn confirm(&mut self, _prompt: &str) -> bool {
            self.log.lock().unwrap().confirms += 1;
            self.confirm_answer
        }
    }

    #[derive(Default)]
    struct EngineLog {
        starts: usize,
        stops: usize,
    }

    struct ScriptedRecognizer {
        log: Arc<Mutex<EngineLog>>,
    }

    impl NativeRecognizer for ScriptedRecognizer {
        fn start(
            &mut self,
            _settings: &RecognizerSettings,
            _events: mpsc::UnboundedSender<RecognizerEvent>,
        ) -> Result<(), native::RecognizerError> {
            self.log.lock().unwrap().starts += 1;
            Ok(())
        }
        fn stop(&mut self) {
            self.log.lock().unwrap().stops += 1;
        }
    }

    struct ScriptedRecorder {
        log: Arc<Mutex<EngineLog>>,
        active: bool,
        samples: Vec<i16>,
    }

    #[async_trait]
    impl Recorder for ScriptedRecorder {
        fn start(&mut self, _settings: &CaptureSettings) -> Result<(), AudioCaptureError> {
            self.log.lock().unwrap().starts += 1;
            self.active = true;
            Ok(())
        }
        async fn stop(&mut self) -> Result<AudioRecording, AudioCaptureError> {
            self.log.lock().unwrap().stops += 1;
            self.active = false;
            if self.samples.is_empty() {
                return Err(AudioCaptureError::NoAudioCaptured);
            }
            let chunk = AudioChunk {
                samples: self.samples.clone(),
                sample_rate: 16_000,
            };
            Ok(AudioRecording::assemble(&[chunk], 16_000))
        }
        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct ScriptedProxy {
        stt: Mutex<Option<Result<String, ProxyError>>>,
        translation: Mutex<Option<Result<TranslationResponse, ProxyError>>>,
    }

    impl ScriptedProxy {
        fn new() -> Self {
            Self {
                stt: Mutex::new(None),
                translation: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl RemoteProxy for ScriptedProxy {
        async fn fetch_config(&self) -> Result<RelayConfig, ProxyError> {
            Ok(serde_json::from_str("{}").unwrap())
        }
        async fn speech_to_text(
            &self,
            _recording: AudioRecording,
            _language: &str,
        ) -> Result<String, ProxyError> {
            self.stt
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(String::new()))
        }
        async fn translate(
            &self,
            text: &str,
            target_language: &str,
        ) -> Result<TranslationResponse, ProxyError> {
            self.translation.lock().unwrap().take().unwrap_or_else(|| {
                Ok(TranslationResponse {
                    translated_text: format!("<{}>", text),
                    original_text: text.to_string(),
                    target_language: target_language.to_string(),
                    timestamp: None,
                })
            })
        }
        async fn health(&self) -> Result<HealthResponse, ProxyError> {
            Ok(HealthResponse {
                status: "OK".to_string(),
                services: HealthServices::default(),
            })
        }
    }

    struct ScriptedSynthesizer {
        spoken: Arc<Mutex<Vec<String>>>,
    }

    impl SpeechSynthesizer for ScriptedSynthesizer {
        fn speak(&mut self, text: &str, _locale_tag: &str, _profile: &VoiceProfile) {
            self.spoken.lock().unwrap().push(text.to_string());
        }
        fn cancel(&mut self) {}
    }

    // --- harness -----------------------------------------------------------

    struct Harness {
        orchestrator: Orchestrator,
        events: mpsc::UnboundedReceiver<AppEvent>,
        view: Arc<Mutex<ViewLog>>,
        recognizer_log: Arc<Mutex<EngineLog>>,
        recorder_log: Arc<Mutex<EngineLog>>,
        spoken: Arc<Mutex<Vec<String>>>,
        proxy: Arc<ScriptedProxy>,
    }

    struct HarnessConfig {
        availability: EngineAvailability,
        selected_engine: RecognitionEngine,
        translation_enabled: bool,
        read_back_enabled: bool,
        recorder_samples: Vec<i16>,
        confirm_answer: bool,
    }

    impl Default for HarnessConfig {
        fn default() -> Self {
            Self {
                availability: EngineAvailability {
                    native: true,
                    google: true,
                    azure: false,
                    aws: false,
                    translate: true,
                },
                selected_engine: RecognitionEngine::Native,
                translation_enabled: false,
                read_back_enabled: false,
                recorder_samples: vec![1, 2, 3],
                confirm_answer: true,
            }
        }
    }

    fn harness(config: HarnessConfig) -> Harness {
        let (event_tx, events) = mpsc::unbounded_channel();
        let view_log = Arc::new(Mutex::new(ViewLog::default()));
        let recognizer_log = Arc::new(Mutex::new(EngineLog::default()));
        let recorder_log = Arc::new(Mutex::new(EngineLog::default()));
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let proxy = Arc::new(ScriptedProxy::new());

        let orchestrator = Orchestrator::new(
            OrchestratorOptions {
                language: "ja-JP".to_string(),
                availability: config.availability,
                selected_engine: config.selected_engine,
                translation_enabled: config.translation_enabled,
                read_back_enabled: config.read_back_enabled,
                target_language: TargetLanguage::English,
                export_dir: None,
            },
            Some(Box::new(ScriptedRecognizer {
                log: recognizer_log.clone(),
            })),
            Box::new(ScriptedRecorder {
                log: recorder_log.clone(),
                active: false,
                samples: config.recorder_samples,
            }),
            Some(Box::new(ScriptedSynthesizer {
                spoken: spoken.clone(),
            })),
            proxy.clone(),
            Box::new(TestView {
                log: view_log.clone(),
                confirm_answer: config.confirm_answer,
            }),
            event_tx,
        );

        Harness {
            orchestrator,
            events,
            view: view_log,
            recognizer_log,
            recorder_log,
            spoken,
            proxy,
        }
    }

    fn result_event(finals: &[&str], interim: &str) -> AppEvent {
        AppEvent::Recognizer(RecognizerEvent::Result {
            finals: finals.iter().map(|s| s.to_string()).collect(),
            interim: interim.to_string(),
        })
    }

    // --- native live mode ----------------------------------------------------

    #[tokio::test]
    async fn test_finals_append_in_arrival_order() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();

        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));
        h.orchestrator.handle_event(result_event(&["世界", "です"], ""));

        assert_eq!(
            h.orchestrator.session().current_transcript,
            "こんにちは世界です"
        );
        assert_eq!(h.orchestrator.history().recognized().len(), 3);
        // Newest first in the log
        assert_eq!(h.orchestrator.history().recognized()[0].text, "です");
    }

    #[tokio::test]
    async fn test_interim_text_renders_but_is_not_persisted() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();

        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));
        h.orchestrator.handle_event(result_event(&[], "せかい"));

        let log = h.view.lock().unwrap();
        assert_eq!(log.transcripts.last().unwrap(), "こんにちはせかい");
        drop(log);

        // Final text is authoritative: a later update replaces interim
        h.orchestrator.handle_event(result_event(&["世界"], ""));
        assert_eq!(h.orchestrator.session().current_transcript, "こんにちは世界");
        assert!(h.orchestrator.session().interim_text.is_empty());
        assert_eq!(h.orchestrator.history().recognized().len(), 2);
    }

    #[tokio::test]
    async fn test_native_preempts_explicit_cloud_selection() {
        let mut h = harness(HarnessConfig {
            selected_engine: RecognitionEngine::Google,
            ..Default::default()
        });
        h.orchestrator.start();

        assert_eq!(h.recognizer_log.lock().unwrap().starts, 1);
        assert_eq!(h.recorder_log.lock().unwrap().starts, 0);
    }

    #[tokio::test]
    async fn test_auto_restart_on_unexpected_end() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        assert_eq!(h.recognizer_log.lock().unwrap().starts, 1);

        h.orchestrator
            .handle_event(AppEvent::Recognizer(RecognizerEvent::Ended));
        assert_eq!(h.recognizer_log.lock().unwrap().starts, 2);

        // After stop the liveness flag is down: no restart
        h.orchestrator.stop().await;
        h.orchestrator
            .handle_event(AppEvent::Recognizer(RecognizerEvent::Ended));
        assert_eq!(h.recognizer_log.lock().unwrap().starts, 2);
    }

    #[tokio::test]
    async fn test_no_speech_error_is_suppressed() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        let statuses_before = h.view.lock().unwrap().statuses.len();

        h.orchestrator.handle_event(AppEvent::Recognizer(RecognizerEvent::Error(
            RecognizerErrorKind::NoSpeech,
        )));
        assert_eq!(h.view.lock().unwrap().statuses.len(), statuses_before);

        // Other errors surface but keep the session alive
        h.orchestrator.handle_event(AppEvent::Recognizer(RecognizerEvent::Error(
            RecognizerErrorKind::Network,
        )));
        let log = h.view.lock().unwrap();
        let (level, message) = log.statuses.last().unwrap();
        assert_eq!(*level, StatusLevel::Error);
        assert!(message.contains("音声認識エラー"));
        drop(log);
        assert!(h.orchestrator.session().is_recording);
    }

    #[tokio::test]
    async fn test_results_after_stop_are_ignored() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        h.orchestrator.stop().await;

        h.orchestrator.handle_event(result_event(&["遅延結果"], ""));
        assert_eq!(h.orchestrator.session().current_transcript, "");
        assert!(h.orchestrator.history().is_empty());
    }

    // --- record-then-submit mode ----------------------------------------------

    fn cloud_only() -> EngineAvailability {
        EngineAvailability {
            native: false,
            google: true,
            azure: false,
            aws: false,
            translate: true,
        }
    }

    #[tokio::test]
    async fn test_cloud_selection_drives_batch_path() {
        let mut h = harness(HarnessConfig {
            availability: cloud_only(),
            selected_engine: RecognitionEngine::Google,
            ..Default::default()
        });
        h.orchestrator.start();

        assert_eq!(h.recorder_log.lock().unwrap().starts, 1);
        assert_eq!(h.recognizer_log.lock().unwrap().starts, 0);
        assert_eq!(h.orchestrator.state(), SessionState::Recognizing);
    }

    #[tokio::test]
    async fn test_batch_result_replaces_transcript() {
        let mut h = harness(HarnessConfig {
            availability: cloud_only(),
            selected_engine: RecognitionEngine::Google,
            ..Default::default()
        });
        *h.proxy.stt.lock().unwrap() = Some(Ok("こんにちは世界".to_string()));

        h.orchestrator.start();
        h.orchestrator.stop().await;
        assert_eq!(h.recorder_log.lock().unwrap().stops, 1);

        // The submission was spawned by stop; its result arrives as an event
        let event = h.events.recv().await.unwrap();
        h.orchestrator.handle_event(event);

        assert_eq!(
            h.orchestrator.session().current_transcript,
            "こんにちは世界"
        );
        assert_eq!(h.orchestrator.history().recognized().len(), 1);
        let log = h.view.lock().unwrap();
        assert!(log
            .statuses
            .iter()
            .any(|(level, m)| *level == StatusLevel::Success && m == "音声認識完了"));
    }

    #[tokio::test]
    async fn test_empty_batch_result_warns() {
        let mut h = harness(HarnessConfig {
            availability: cloud_only(),
            selected_engine: RecognitionEngine::Google,
            ..Default::default()
        });
        h.orchestrator.start();
        h.orchestrator.stop().await;
        let event = h.events.recv().await.unwrap();
        h.orchestrator.handle_event(event);

        let log = h.view.lock().unwrap();
        let (level, message) = log.statuses.last().unwrap();
        assert_eq!(*level, StatusLevel::Warning);
        assert_eq!(message, "音声が認識されませんでした");
        drop(log);
        assert!(h.orchestrator.history().is_empty());
    }

    #[tokio::test]
    async fn test_batch_failure_after_stop_never_resurrects_session() {
        // Native exists, but the session is no longer live; the liveness
        // rule forbids restarting it from a failed submission.
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.handle_event(AppEvent::BatchTranscription {
            result: Err(ProxyError::Status {
                status: 500,
                message: "boom".to_string(),
            }),
        });

        assert_eq!(h.recognizer_log.lock().unwrap().starts, 0);
        let log = h.view.lock().unwrap();
        let (level, message) = log.statuses.last().unwrap();
        assert_eq!(*level, StatusLevel::Error);
        assert!(message.starts_with("音声認識に失敗しました"));
    }

    #[tokio::test]
    async fn test_stale_batch_result_does_not_clobber_new_session() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        h.orchestrator.handle_event(AppEvent::BatchTranscription {
            result: Ok("古い結果".to_string()),
        });
        assert_eq!(h.orchestrator.session().current_transcript, "");
        assert!(h.orchestrator.history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_recording_reports_no_audio() {
        let mut h = harness(HarnessConfig {
            availability: cloud_only(),
            selected_engine: RecognitionEngine::Google,
            recorder_samples: Vec::new(),
            ..Default::default()
        });
        h.orchestrator.start();
        h.orchestrator.stop().await;

        let log = h.view.lock().unwrap();
        assert!(log
            .statuses
            .iter()
            .any(|(_, m)| m == "音声データが記録されませんでした"));
    }

    // --- lifecycle & controls ---------------------------------------------------

    #[tokio::test]
    async fn test_stop_restores_controls() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        assert!(h.orchestrator.controls().stop_enabled);
        assert!(!h.orchestrator.controls().start_enabled);

        h.orchestrator.stop().await;
        let controls = h.orchestrator.controls();
        assert!(controls.start_enabled);
        assert!(!controls.stop_enabled);
    }

    #[tokio::test]
    async fn test_start_resets_previous_transcript() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));
        h.orchestrator.stop().await;
        assert!(h.orchestrator.controls().export_current_enabled);

        h.orchestrator.start();
        assert_eq!(h.orchestrator.session().current_transcript, "");
        assert!(!h.orchestrator.controls().export_current_enabled);
        // History persists across sessions
        assert_eq!(h.orchestrator.history().recognized().len(), 1);
    }

    #[tokio::test]
    async fn test_start_refused_when_nothing_available() {
        let mut h = harness(HarnessConfig {
            availability: EngineAvailability::default(),
            ..Default::default()
        });
        h.orchestrator.start();
        assert!(!h.orchestrator.session().is_recording);
        assert_eq!(h.orchestrator.state(), SessionState::Idle);
        let log = h.view.lock().unwrap();
        let (level, _) = log.statuses.last().unwrap();
        assert_eq!(*level, StatusLevel::Error);
    }

    #[tokio::test]
    async fn test_set_engine_rejects_unavailable() {
        let mut h = harness(HarnessConfig::default());
        assert!(!h.orchestrator.set_engine(RecognitionEngine::Aws));
        assert!(h.orchestrator.set_engine(RecognitionEngine::Google));
        assert_eq!(
            h.orchestrator.session().selected_engine,
            RecognitionEngine::Google
        );
    }

    // --- translation pipeline -----------------------------------------------------

    fn translation_harness() -> Harness {
        harness(HarnessConfig {
            translation_enabled: true,
            read_back_enabled: true,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_translations_accumulate_and_feed_history() {
        let mut h = translation_harness();
        h.orchestrator.start();

        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));
        // Progress marker while the request is in flight
        assert_eq!(
            h.view.lock().unwrap().translations.last().unwrap(),
            "翻訳中..."
        );

        let event = h.events.recv().await.unwrap();
        h.orchestrator.handle_event(event);
        assert_eq!(h.orchestrator.translation_display(), "<こんにちは>");
        assert_eq!(h.orchestrator.history().translations().len(), 1);
        assert_eq!(h.spoken.lock().unwrap().as_slice(), ["<こんにちは>"]);

        h.orchestrator.handle_event(result_event(&["世界"], ""));
        let event = h.events.recv().await.unwrap();
        h.orchestrator.handle_event(event);
        // Translations accumulate space-separated, like transcripts
        assert_eq!(h.orchestrator.translation_display(), "<こんにちは> <世界>");
        assert_eq!(h.spoken.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_translation_failure_is_isolated() {
        let mut h = translation_harness();
        *h.proxy.translation.lock().unwrap() = Some(Err(ProxyError::Status {
            status: 500,
            message: "translate down".to_string(),
        }));
        h.orchestrator.start();
        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));

        let event = h.events.recv().await.unwrap();
        h.orchestrator.handle_event(event);

        let log = h.view.lock().unwrap();
        assert!(log.translations.last().unwrap().contains("[翻訳エラー]"));
        drop(log);
        // The primary transcript and session are unaffected
        assert!(h.orchestrator.history().translations().is_empty());
        assert_eq!(h.orchestrator.session().current_transcript, "こんにちは");
        assert!(h.orchestrator.session().is_recording);
        assert!(h.spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_off_switches_translation_tab_back() {
        let mut h = translation_harness();
        h.orchestrator.set_active_tab(HistoryTab::Translation);
        assert_eq!(h.orchestrator.active_tab(), HistoryTab::Translation);

        h.orchestrator.set_translation_enabled(false);
        assert_eq!(h.orchestrator.active_tab(), HistoryTab::Source);
        let log = h.view.lock().unwrap();
        assert_eq!(*log.tabs.last().unwrap(), HistoryTab::Source);
        // Displayed translation was cleared
        assert_eq!(log.translations.last().unwrap(), "");
    }

    #[tokio::test]
    async fn test_in_flight_translation_dropped_after_toggle_off() {
        let mut h = translation_harness();
        h.orchestrator.start();
        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));
        h.orchestrator.set_translation_enabled(false);

        let event = h.events.recv().await.unwrap();
        h.orchestrator.handle_event(event);
        assert_eq!(h.orchestrator.translation_display(), "");
        assert!(h.orchestrator.history().translations().is_empty());
    }

    #[tokio::test]
    async fn test_changing_target_language_clears_display() {
        let mut h = translation_harness();
        h.orchestrator.start();
        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));
        let event = h.events.recv().await.unwrap();
        h.orchestrator.handle_event(event);
        assert!(!h.orchestrator.translation_display().is_empty());

        h.orchestrator.set_target_language(TargetLanguage::Korean);
        assert_eq!(h.orchestrator.translation_display(), "");
        assert_eq!(h.view.lock().unwrap().translations.last().unwrap(), "");
    }

    #[tokio::test]
    async fn test_translation_disabled_sends_no_requests() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));

        // No translation event is pending
        assert!(h.events.try_recv().is_err());
    }

    // --- history & export ---------------------------------------------------------

    #[tokio::test]
    async fn test_clear_history_requires_confirmation_and_is_idempotent() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.start();
        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));

        h.orchestrator.clear_history();
        assert!(h.orchestrator.history().is_empty());
        assert!(!h.orchestrator.controls().export_history_enabled);
        assert!(!h.orchestrator.controls().clear_history_enabled);
        assert_eq!(h.view.lock().unwrap().confirms, 1);

        // Second call is a no-op: empty history never prompts
        h.orchestrator.clear_history();
        assert!(h.orchestrator.history().is_empty());
        assert_eq!(h.view.lock().unwrap().confirms, 1);
    }

    #[tokio::test]
    async fn test_clear_history_declined_keeps_entries() {
        let mut h = harness(HarnessConfig {
            confirm_answer: false,
            ..Default::default()
        });
        h.orchestrator.start();
        h.orchestrator.handle_event(result_event(&["こんにちは"], ""));

        h.orchestrator.clear_history();
        assert_eq!(h.orchestrator.history().recognized().len(), 1);
    }

    #[tokio::test]
    async fn test_export_current_with_empty_transcript_warns() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.export_current();
        let log = h.view.lock().unwrap();
        let (level, message) = log.statuses.last().unwrap();
        assert_eq!(*level, StatusLevel::Warning);
        assert_eq!(message, "エクスポートする認識結果がありません");
    }

    #[tokio::test]
    async fn test_export_history_with_empty_logs_warns() {
        let mut h = harness(HarnessConfig::default());
        h.orchestrator.export_history();
        let log = h.view.lock().unwrap();
        let (level, message) = log.statuses.last().unwrap();
        assert_eq!(*level, StatusLevel::Warning);
        assert_eq!(message, "エクスポートする履歴がありません");
    }

    #[tokio::test]
    async fn test_export_writes_through_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let (event_tx, _events) = mpsc::unbounded_channel();
        let view_log = Arc::new(Mutex::new(ViewLog::default()));
        let mut orchestrator = Orchestrator::new(
            OrchestratorOptions {
                language: "ja-JP".to_string(),
                availability: EngineAvailability {
                    native: true,
                    ..Default::default()
                },
                selected_engine: RecognitionEngine::Native,
                translation_enabled: false,
                read_back_enabled: false,
                target_language: TargetLanguage::English,
                export_dir: Some(dir.path().to_path_buf()),
            },
            Some(Box::new(ScriptedRecognizer {
                log: Arc::new(Mutex::new(EngineLog::default())),
            })),
            Box::new(ScriptedRecorder {
                log: Arc::new(Mutex::new(EngineLog::default())),
                active: false,
                samples: vec![1],
            }),
            None,
            Arc::new(ScriptedProxy::new()),
            Box::new(TestView {
                log: view_log.clone(),
                confirm_answer: true,
            }),
            event_tx,
        );

        orchestrator.start();
        orchestrator.handle_event(result_event(&["こんにちは"], ""));
        orchestrator.export_current();
        orchestrator.export_history();

        let files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 2);
        assert!(files
            .iter()
            .any(|f| f.starts_with("speech-recognition-current-")));
        assert!(files
            .iter()
            .any(|f| f.starts_with("speech-recognition-history-")));
    }

    #[tokio::test]
    async fn test_read_back_requires_synthesizer() {
        let (event_tx, _events) = mpsc::unbounded_channel();
        let view_log = Arc::new(Mutex::new(ViewLog::default()));
        let mut orchestrator = Orchestrator::new(
            OrchestratorOptions {
                language: "ja-JP".to_string(),
                availability: EngineAvailability {
                    native: true,
                    translate: true,
                    ..Default::default()
                },
                selected_engine: RecognitionEngine::Native,
                translation_enabled: true,
                read_back_enabled: true,
                target_language: TargetLanguage::English,
                export_dir: None,
            },
            None,
            Box::new(ScriptedRecorder {
                log: Arc::new(Mutex::new(EngineLog::default())),
                active: false,
                samples: vec![1],
            }),
            // No synthesizer on this platform
            None,
            Arc::new(ScriptedProxy::new()),
            Box::new(TestView {
                log: view_log.clone(),
                confirm_answer: true,
            }),
            event_tx,
        );

        assert!(!orchestrator.set_read_back_enabled(true));
        let log = view_log.lock().unwrap();
        let (level, _) = log.statuses.last().unwrap();
        assert_eq!(*level, StatusLevel::Warning);
    }
}
