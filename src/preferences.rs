//! User preferences storage
//!
//! Handles saving and loading user preferences to a JSON file
//! in the application support directory.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::engine::RecognitionEngine;
use crate::translate::TargetLanguage;

/// User preferences
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Recognition engine picked in the engine menu
    pub selected_engine: Option<RecognitionEngine>,
    /// Translation target language
    pub target_language: Option<TargetLanguage>,
    /// Whether finalized chunks are translated
    pub translation_enabled: Option<bool>,
    /// Whether translations are read aloud
    pub read_back_enabled: Option<bool>,
    /// Custom export directory (None = Documents/kikigaki)
    pub export_location: Option<PathBuf>,
}

/// Get the preferences file path
fn preferences_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kikigaki").join("preferences.json"))
}

/// Load preferences from disk
///
/// Returns default preferences if the file doesn't exist or can't be read
pub fn load_preferences() -> Preferences {
    let Some(path) = preferences_path() else {
        return Preferences::default();
    };

    if !path.exists() {
        return Preferences::default();
    }

    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(prefs) => prefs,
            Err(e) => {
                error!("Failed to parse preferences: {}", e);
                Preferences::default()
            }
        },
        Err(e) => {
            error!("Failed to read preferences file: {}", e);
            Preferences::default()
        }
    }
}

/// Save preferences to disk
pub fn save_preferences(prefs: &Preferences) -> Result<(), PreferencesError> {
    let path = preferences_path().ok_or(PreferencesError::NoConfigDir)?;

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            info!("Created preferences directory: {:?}", parent);
        }
    }

    let json = serde_json::to_string_pretty(prefs)?;
    fs::write(&path, json)?;
    info!("Saved preferences to: {:?}", path);

    Ok(())
}

/// Set the selected recognition engine
pub fn set_selected_engine(engine: RecognitionEngine) -> Result<(), PreferencesError> {
    let mut prefs = load_preferences();
    prefs.selected_engine = Some(engine);
    save_preferences(&prefs)
}

/// Set the translation target language
pub fn set_target_language(language: TargetLanguage) -> Result<(), PreferencesError> {
    let mut prefs = load_preferences();
    prefs.target_language = Some(language);
    save_preferences(&prefs)
}

/// Set whether translation is enabled
pub fn set_translation_enabled(enabled: bool) -> Result<(), PreferencesError> {
    let mut prefs = load_preferences();
    prefs.translation_enabled = Some(enabled);
    save_preferences(&prefs)
}

/// Set whether translations are read aloud
pub fn set_read_back_enabled(enabled: bool) -> Result<(), PreferencesError> {
    let mut prefs = load_preferences();
    prefs.read_back_enabled = Some(enabled);
    save_preferences(&prefs)
}

/// Preferences errors
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
