//! Clipboard access
//!
//! The finished transcript is copied to the system clipboard when a
//! session stops, so it can be pasted without exporting.

use arboard::Clipboard;
use tracing::{error, info};

/// Copy a transcript to the clipboard. Failures are logged, never surfaced.
pub fn copy_transcript(transcript: &str) {
    if transcript.trim().is_empty() {
        info!("No transcript to copy (empty)");
        return;
    }
    match Clipboard::new() {
        Ok(mut clipboard) => match clipboard.set_text(transcript) {
            Ok(_) => {
                info!("Transcript copied to clipboard ({} chars)", transcript.len());
            }
            Err(e) => {
                error!("Failed to copy transcript to clipboard: {}", e);
            }
        },
        Err(e) => {
            error!("Failed to initialize clipboard: {}", e);
        }
    }
}
