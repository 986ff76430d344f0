//! Recognition engine selection
//!
//! The closed set of recognition engines and the availability snapshot
//! derived once per app load from the local capability probe plus the
//! relay server's configuration endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::proxy::{ProxyError, RemoteProxy};

/// Recognition engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionEngine {
    /// OS-provided live recognizer, no network round trip per utterance
    #[default]
    Native,
    Google,
    Azure,
    Aws,
}

impl RecognitionEngine {
    /// All engines, in menu order.
    pub const ALL: [RecognitionEngine; 4] = [
        RecognitionEngine::Native,
        RecognitionEngine::Google,
        RecognitionEngine::Azure,
        RecognitionEngine::Aws,
    ];

    /// The label status messages use.
    pub fn label(&self) -> &'static str {
        match self {
            RecognitionEngine::Native => "ローカル音声認識",
            RecognitionEngine::Google => "Google音声認識",
            RecognitionEngine::Azure => "Azure音声認識",
            RecognitionEngine::Aws => "AWS音声認識",
        }
    }

    /// Parse a console command argument.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "local" | "native" => Some(RecognitionEngine::Native),
            "google" => Some(RecognitionEngine::Google),
            "azure" => Some(RecognitionEngine::Azure),
            "aws" => Some(RecognitionEngine::Aws),
            _ => None,
        }
    }
}

impl fmt::Display for RecognitionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecognitionEngine::Native => "local",
            RecognitionEngine::Google => "google",
            RecognitionEngine::Azure => "azure",
            RecognitionEngine::Aws => "aws",
        };
        write!(f, "{}", name)
    }
}

/// Which engines are usable, snapshotted at startup.
///
/// Immutable after the probe; re-derived on every app load.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineAvailability {
    pub native: bool,
    pub google: bool,
    pub azure: bool,
    pub aws: bool,
    /// Whether the relay has a translation backend configured.
    pub translate: bool,
}

impl EngineAvailability {
    /// Probe local and remote capabilities once.
    ///
    /// A failed or non-2xx config fetch means no cloud engines: the app
    /// falls back silently to whatever the local probe found.
    pub async fn probe(native_present: bool, proxy: &dyn RemoteProxy) -> Self {
        let mut availability = EngineAvailability {
            native: native_present,
            ..Default::default()
        };

        match proxy.fetch_config().await {
            Ok(config) => {
                availability.google = config.has_google_api;
                availability.azure = config.has_azure_api;
                availability.aws = config.has_aws_api;
                availability.translate = config.has_translate_api;
            }
            Err(ProxyError::Status { status, .. }) => {
                warn!(status, "relay config fetch rejected, cloud engines disabled");
            }
            Err(e) => {
                warn!("relay config fetch failed, cloud engines disabled: {}", e);
            }
        }

        availability
    }

    pub fn is_available(&self, engine: RecognitionEngine) -> bool {
        match engine {
            RecognitionEngine::Native => self.native,
            RecognitionEngine::Google => self.google,
            RecognitionEngine::Azure => self.azure,
            RecognitionEngine::Aws => self.aws,
        }
    }

    /// First usable cloud engine in menu order.
    pub fn first_available_cloud(&self) -> Option<RecognitionEngine> {
        RecognitionEngine::ALL
            .into_iter()
            .filter(|e| *e != RecognitionEngine::Native)
            .find(|e| self.is_available(*e))
    }

    /// True when at least one engine can run a session.
    pub fn any(&self) -> bool {
        self.native || self.google || self.azure || self.aws
    }

    /// The engine a fresh session should default to: native when present,
    /// otherwise the first available cloud engine.
    pub fn default_engine(&self) -> Option<RecognitionEngine> {
        if self.native {
            Some(RecognitionEngine::Native)
        } else {
            self.first_available_cloud()
        }
    }
}

/// One row of the engine menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOption {
    pub engine: RecognitionEngine,
    pub available: bool,
}

/// The engine menu a view renders: unavailable cloud engines are hidden,
/// the native option stays visible (marked unavailable) when unsupported.
pub fn engine_menu(availability: &EngineAvailability) -> Vec<EngineOption> {
    RecognitionEngine::ALL
        .into_iter()
        .filter_map(|engine| {
            let available = availability.is_available(engine);
            if available || engine == RecognitionEngine::Native {
                Some(EngineOption { engine, available })
            } else {
                None
            }
        })
        .collect()
}
