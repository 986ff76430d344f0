//! Transcript and history export
//!
//! Serializes the live transcript or the full history logs to UTF-8 text
//! files in the export directory. File names carry a filesystem-safe
//! timestamp (ISO-8601 with colons replaced, second precision).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use tracing::info;

use crate::history::History;

/// Export errors with contextual information
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Could not find Documents directory")]
    NoDocumentsDir,

    #[error("Transcript is empty")]
    EmptyTranscript,

    #[error("History is empty")]
    EmptyHistory,

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The export directory: the user's override if set, otherwise a
/// `kikigaki` folder under Documents.
pub fn default_export_dir() -> Option<PathBuf> {
    dirs::document_dir().map(|d| d.join("kikigaki"))
}

fn ensure_export_dir(preferred: Option<&Path>) -> Result<PathBuf, ExportError> {
    let dir = match preferred {
        Some(dir) => dir.to_path_buf(),
        None => default_export_dir().ok_or(ExportError::NoDocumentsDir)?,
    };

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| ExportError::CreateDirectory {
            path: dir.clone(),
            source: e,
        })?;
        info!("Created export directory: {:?}", dir);
    }

    Ok(dir)
}

/// Timestamp suffix for export file names: ISO-8601 truncated to seconds,
/// colons replaced with hyphens.
fn file_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Localized timestamp used inside export headers.
fn display_timestamp() -> String {
    Local::now().format("%Y/%m/%d %H:%M:%S").to_string()
}

/// Serialize the live transcript: title, generation timestamp, blank
/// line, trimmed text.
pub fn render_current(transcript: &str) -> String {
    format!(
        "音声認識結果\n日時: {}\n\n{}",
        display_timestamp(),
        transcript.trim()
    )
}

/// Serialize both history logs: header, export timestamp, per-section
/// counts, separator, then a numbered dump of each non-empty section in
/// insertion order (oldest first).
pub fn render_history(history: &History) -> String {
    let mut content = String::new();
    content.push_str("音声認識履歴\n");
    content.push_str(&format!("エクスポート日時: {}\n", display_timestamp()));
    content.push_str(&format!("認識件数: {}件\n", history.recognized().len()));
    content.push_str(&format!("翻訳件数: {}件\n\n", history.translations().len()));
    content.push_str("==========================================\n");

    if !history.recognized().is_empty() {
        content.push_str("\n【認識結果】\n\n");
        // Stored newest-first; dump in insertion order
        for (index, entry) in history.recognized().iter().rev().enumerate() {
            content.push_str(&format!("{}. {}\n", index + 1, entry.timestamp_display));
            content.push_str(&format!("{}\n\n", entry.text));
        }
    }

    if !history.translations().is_empty() {
        content.push_str("==========================================\n");
        content.push_str("\n【翻訳結果】\n\n");
        for (index, entry) in history.translations().iter().rev().enumerate() {
            content.push_str(&format!(
                "{}. {} [{}]\n",
                index + 1,
                entry.timestamp_display,
                entry.target_language.label()
            ));
            content.push_str(&format!("原文: {}\n", entry.original_text));
            content.push_str(&format!("訳文: {}\n\n", entry.translated_text));
        }
    }

    content
}

/// Write the live transcript to a timestamped file.
///
/// Returns the path to the written file.
pub fn write_current(transcript: &str, preferred_dir: Option<&Path>) -> Result<PathBuf, ExportError> {
    if transcript.trim().is_empty() {
        return Err(ExportError::EmptyTranscript);
    }
    let filename = format!("speech-recognition-current-{}.txt", file_timestamp());
    write_file(&render_current(transcript), &filename, preferred_dir)
}

/// Write both history logs to a timestamped file.
pub fn write_history(history: &History, preferred_dir: Option<&Path>) -> Result<PathBuf, ExportError> {
    if history.is_empty() {
        return Err(ExportError::EmptyHistory);
    }
    let filename = format!("speech-recognition-history-{}.txt", file_timestamp());
    write_file(&render_history(history), &filename, preferred_dir)
}

fn write_file(
    content: &str,
    filename: &str,
    preferred_dir: Option<&Path>,
) -> Result<PathBuf, ExportError> {
    let dir = ensure_export_dir(preferred_dir)?;
    let filepath = dir.join(filename);

    let mut file = fs::File::create(&filepath).map_err(|e| ExportError::CreateFile {
        path: filepath.clone(),
        source: e,
    })?;

    file.write_all(content.as_bytes())
        .map_err(|e| ExportError::WriteFile {
            path: filepath.clone(),
            source: e,
        })?;

    file.flush().map_err(|e| ExportError::WriteFile {
        path: filepath.clone(),
        source: e,
    })?;

    info!("Saved export to: {:?}", filepath);
    Ok(filepath)
}
