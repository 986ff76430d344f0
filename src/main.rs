#![deny(clippy::all)]

mod audio;
mod clipboard;
mod config;
mod engine;
mod export;
mod history;
mod preferences;
mod proxy;
mod recognizer;
mod speech;
mod translate;
mod view;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::CpalRecorder;
use crate::engine::{EngineAvailability, RecognitionEngine};
use crate::proxy::{ProxyClient, RemoteProxy};
use crate::recognizer::{native, AppEvent, Orchestrator, OrchestratorOptions};
use crate::translate::TargetLanguage;
use crate::view::{HistoryTab, TerminalView};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    tracing_subscriber::fmt::init();

    // Pick up a .env file if present (relay URL override)
    dotenvy::dotenv().ok();

    // Load configuration from embedded config.toml
    let config = config::load().context("Failed to parse embedded config.toml")?;

    let prefs = preferences::load_preferences();

    // Probe local capabilities
    let native_recognizer = native::detect();
    let native_present = native_recognizer.is_some();
    if native_present {
        info!("Native speech recognizer found");
    } else {
        info!("No native speech recognizer - cloud engines only");
    }
    let synthesizer = speech::detect();

    let proxy: Arc<dyn RemoteProxy> = Arc::new(ProxyClient::new(&config.proxy.base_url)?);

    // Probe remote capabilities; failure silently disables cloud engines
    info!(base_url = %config.proxy.base_url, "Probing engine availability");
    let availability = EngineAvailability::probe(native_present, proxy.as_ref()).await;
    if !availability.any() {
        warn!("No recognition engine is available; sessions cannot start");
    }

    // Restore the preferred engine when it is still usable, otherwise
    // fall back to the probe's default (native first, then first cloud)
    let selected_engine = prefs
        .selected_engine
        .filter(|engine| availability.is_available(*engine))
        .or_else(|| availability.default_engine())
        .unwrap_or_default();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();

    let mut app = Orchestrator::new(
        OrchestratorOptions {
            language: config.speech.language.clone(),
            availability,
            selected_engine,
            translation_enabled: prefs.translation_enabled.unwrap_or(false),
            read_back_enabled: prefs.read_back_enabled.unwrap_or(false),
            target_language: prefs.target_language.unwrap_or_default(),
            export_dir: prefs.export_location.clone(),
        },
        native_recognizer,
        Box::new(CpalRecorder::new()),
        synthesizer,
        proxy.clone(),
        Box::new(TerminalView::new()),
        event_tx,
    );

    app.show_engine_menu();
    print_help();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !dispatch(&mut app, proxy.as_ref(), line.trim()).await {
                            break;
                        }
                    }
                    // stdin closed
                    None => break,
                }
            }
            Some(event) = event_rx.recv() => {
                app.handle_event(event);
            }
        }
    }

    info!("Shutting down");
    Ok(())
}

/// Handle one console command. Returns false when the app should exit.
async fn dispatch(app: &mut Orchestrator, proxy: &dyn RemoteProxy, input: &str) -> bool {
    let mut parts = input.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let argument = parts.next();

    match (command, argument) {
        ("start", _) => app.start(),
        ("stop", _) => app.stop().await,

        ("engine", None) => app.show_engine_menu(),
        ("engine", Some(name)) => match RecognitionEngine::parse(name) {
            Some(engine) => {
                if app.set_engine(engine) {
                    persist(preferences::set_selected_engine(engine));
                }
            }
            None => println!("不明なエンジンです: {}", name),
        },

        ("translate", Some("on")) => {
            if app.set_translation_enabled(true) {
                persist(preferences::set_translation_enabled(true));
            }
        }
        ("translate", Some("off")) => {
            app.set_translation_enabled(false);
            persist(preferences::set_translation_enabled(false));
        }

        ("lang", Some(code)) => match TargetLanguage::parse(code) {
            Some(language) => {
                app.set_target_language(language);
                persist(preferences::set_target_language(language));
            }
            None => println!("対応していない言語です: {} (en / zh / ko)", code),
        },

        ("speak", Some("on")) => {
            if app.set_read_back_enabled(true) {
                persist(preferences::set_read_back_enabled(true));
            }
        }
        ("speak", Some("off")) => {
            app.set_read_back_enabled(false);
            persist(preferences::set_read_back_enabled(false));
        }

        ("tab", Some("source")) => app.set_active_tab(HistoryTab::Source),
        ("tab", Some("translation")) => app.set_active_tab(HistoryTab::Translation),

        ("export", _) => app.export_current(),
        ("export-history", _) => app.export_history(),
        ("clear", _) => app.clear_history(),

        ("health", _) => match proxy.health().await {
            Ok(health) => println!(
                "リレーサーバー: {} (google: {}, azure: {}, aws: {})",
                health.status,
                health.services.google,
                health.services.azure,
                health.services.aws
            ),
            Err(e) => println!("リレーサーバーに接続できません: {}", e),
        },

        ("help", _) => print_help(),
        ("quit", _) | ("exit", _) => return false,

        _ => println!("不明なコマンドです。help で一覧を表示します。"),
    }
    true
}

fn persist(result: Result<(), preferences::PreferencesError>) {
    if let Err(e) = result {
        warn!("Failed to save preferences: {}", e);
    }
}

fn print_help() {
    println!("コマンド:");
    println!("  start             録音・音声認識を開始");
    println!("  stop              録音を停止");
    println!("  engine [名前]     認識エンジンを表示/選択 (local/google/azure/aws)");
    println!("  translate on|off  翻訳の有効/無効");
    println!("  lang <code>       翻訳先言語 (en/zh/ko)");
    println!("  speak on|off      翻訳の読み上げ");
    println!("  tab source|translation  履歴タブの切り替え");
    println!("  export            現在の認識結果をエクスポート");
    println!("  export-history    履歴をエクスポート");
    println!("  clear             履歴をクリア");
    println!("  health            リレーサーバーの状態を確認");
    println!("  quit              終了");
}
